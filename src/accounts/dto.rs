use serde::{Deserialize, Serialize};

use super::services::{AuthForm, AuthMode};
use crate::navigation::Screen;

/// Body of `POST /auth`.
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub mode: AuthMode,
    #[serde(flatten)]
    pub form: AuthForm,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub logged_in: bool,
    pub user_id: Option<String>,
    pub start: Screen,
    pub start_route: String,
}
