//! Authenticated identity. Its presence switches the session to cloud mode.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}
