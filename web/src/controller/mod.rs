use serde::Serialize;
pub(crate) mod auth_callback_controller;
pub(crate) mod callback_error_controller;
pub(crate) mod health_check_controller;
pub(crate) mod mfa_controller;
pub(crate) mod user_controller;

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status_code: u16, data: T) -> Self {
        Self {
            status_code,
            data: Some(data),
        }
    }
}
