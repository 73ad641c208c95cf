//! Typed parameters for endpoint inputs and JSON responses.

pub(crate) mod callback_error;
pub(crate) mod user;
