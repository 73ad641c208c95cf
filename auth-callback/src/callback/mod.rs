//! Identity provider callback handling.

mod handler;
mod outcome;
pub mod pkce;
mod request;

pub use handler::{
    resolve_next_path, CallbackHandler, CallbackSettings, DEFAULT_ERROR_PATH, DEFAULT_REDIRECT_PATH,
};
pub use outcome::{sanitize_provider_code, CallbackErrorCode, CallbackOutcome};
pub use request::{CallbackRequest, RequestHeaders, DEFAULT_FALLBACK_HOST};
