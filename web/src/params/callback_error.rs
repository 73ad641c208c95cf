//! Query parameters of the callback error page.

use serde::Deserialize;

/// Appended to the error page URL by a failed callback. All values are
/// browser-controlled and untrusted.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorPageParams {
    /// Callback failure code, e.g. `STATE_MISMATCH`
    pub error_code: Option<String>,
    /// Provider error code, e.g. `otp_expired`
    pub code: Option<String>,
    /// Human readable message
    pub error: Option<String>,
}
