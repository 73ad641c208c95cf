//! Multi-factor assurance gate.

use tracing::{debug, warn};

use crate::backend::{AssuranceLevel, AssuranceLevels, IdentityBackend};
use crate::error::{Error, ErrorKind, MfaErrorKind};

/// `true` when an upgrade to the elevated level is pending but not yet
/// satisfied.
pub fn second_factor_pending(levels: &AssuranceLevels) -> bool {
    levels.next_level == Some(AssuranceLevel::Aal2) && levels.next_level != levels.current_level
}

/// Sets the backend's context-warning suppression for as long as it lives and
/// restores the previous setting when dropped.
struct ContextWarningSuppression<'a, B: IdentityBackend + ?Sized> {
    backend: &'a B,
    previous: bool,
}

impl<'a, B: IdentityBackend + ?Sized> ContextWarningSuppression<'a, B> {
    fn new(backend: &'a B) -> Self {
        let previous = backend.set_suppress_context_warning(true);
        Self { backend, previous }
    }
}

impl<B: IdentityBackend + ?Sized> Drop for ContextWarningSuppression<'_, B> {
    fn drop(&mut self) {
        self.backend.set_suppress_context_warning(self.previous);
    }
}

/// Check whether the current session still needs a second factor.
///
/// Errors from the assurance query are returned as
/// [`MfaErrorKind::AssuranceQueryFailed`], never swallowed.
pub async fn requires_second_factor<B>(backend: &B) -> Result<bool, Error>
where
    B: IdentityBackend + ?Sized,
{
    let levels = {
        let _suppression = ContextWarningSuppression::new(backend);
        backend.authenticator_assurance_level().await
    }
    .map_err(|e| {
        warn!("Failed to query authenticator assurance level: {}", e);
        Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Mfa(MfaErrorKind::AssuranceQueryFailed),
        }
    })?;

    let pending = second_factor_pending(&levels);
    debug!("Assurance levels {:?}, second factor pending: {}", levels, pending);
    Ok(pending)
}
