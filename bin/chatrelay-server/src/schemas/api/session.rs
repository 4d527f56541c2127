use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Who the fronting auth layer says the caller is.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub user: Option<String>,
}
