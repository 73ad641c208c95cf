//! # auth-callback
//!
//! Authentication callback and session-establishment pipeline for the admin
//! application:
//! - Cookie domain resolution across subdomains and environments
//! - Redirect target validation against an origin allow-list
//! - Cookie store and identity backend seams supplied by the caller
//! - The callback orchestrator (PKCE/state, code exchange, token hash verification)
//! - Multi-factor assurance checks and the session requirement guard
//!
//! ## Architecture
//!
//! Everything that touches the outside world goes through one of two traits:
//! [`cookie::CookieStore`] for the request/response cookie jar and
//! [`backend::IdentityBackend`] for the identity provider. The `web` crate
//! supplies the real implementations; tests use in-memory doubles.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_callback::{
//!     callback::{CallbackHandler, CallbackRequest, CallbackSettings},
//!     guard::{require_user, GuardPaths},
//! };
//!
//! let outcome = handler.handle(&request, &mut cookies).await;
//! ```

pub mod backend;
pub mod callback;
pub mod cookie;
pub mod error;
pub mod guard;
pub mod messages;
pub mod mfa;
pub mod redirect;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
