//! PKCE session state kept in cookies between login start and callback.
//!
//! The cookies are written by the login initiation flow; the callback only
//! reads and removes them.

use crate::cookie::{CookieOptions, CookieStore};

/// Anti-forgery value generated at login start.
pub const STATE_COOKIE: &str = "sb-oauth-state";
/// PKCE code verifier generated at login start.
pub const CODE_VERIFIER_COOKIE: &str = "sb-oauth-code-verifier";
/// Absolute URL to return to after a successful login.
pub const REDIRECT_TO_COOKIE: &str = "sb-redirect-to";

/// Remove the single-use PKCE cookies.
///
/// `sb-redirect-to` is left alone; it is overwritten by the next login start.
pub fn clear<C: CookieStore + ?Sized>(store: &mut C, options: &CookieOptions) {
    store.delete(STATE_COOKIE, options);
    store.delete(CODE_VERIFIER_COOKIE, options);
}
