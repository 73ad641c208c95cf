//! Cookie handling for the callback pipeline.
//!
//! Provides the cookie domain resolver, the cookie store seam supplied by the
//! caller, and the session cookie codec.

mod domain;
mod memory;
mod session;
mod store;

pub use domain::{resolve, CookieDomain, CookieDomainResolver, DEFAULT_DEV_SUFFIX};
pub use memory::{CookieWrite, MemoryCookieStore};
pub use session::{decode_access_token, encode_session, SessionCookieSettings};
pub use store::{CookieOptions, CookieStore, SameSite};
