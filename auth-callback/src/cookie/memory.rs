//! In-memory cookie store.

use std::collections::HashMap;

use super::{CookieOptions, CookieStore};

/// A single write recorded by [`MemoryCookieStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieWrite {
    Set {
        name: String,
        value: String,
        options: CookieOptions,
    },
    Delete {
        name: String,
        options: CookieOptions,
    },
}

/// Cookie store backed by a `HashMap` that also records every write.
///
/// Reads reflect earlier writes in the same evaluation, mirroring how a
/// browser would see the jar after the response is applied.
#[derive(Debug, Default, Clone)]
pub struct MemoryCookieStore {
    cookies: HashMap<String, String>,
    writes: Vec<CookieWrite>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cookie as if the request carried it.
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    /// Every set/delete in the order it happened.
    pub fn writes(&self) -> &[CookieWrite] {
        &self.writes
    }

    /// Number of times `name` was deleted.
    pub fn deletions_of(&self, name: &str) -> usize {
        self.writes
            .iter()
            .filter(|write| matches!(write, CookieWrite::Delete { name: n, .. } if n == name))
            .count()
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: &str, options: &CookieOptions) {
        self.cookies.insert(name.to_string(), value.to_string());
        self.writes.push(CookieWrite::Set {
            name: name.to_string(),
            value: value.to_string(),
            options: options.clone(),
        });
    }

    fn delete(&mut self, name: &str, options: &CookieOptions) {
        self.cookies.remove(name);
        self.writes.push(CookieWrite::Delete {
            name: name.to_string(),
            options: options.clone(),
        });
    }
}
