//! Shared request types for REST API

use serde::Deserialize;

/// Marker value browsers send in place of a real `DELETE` request
pub const DELETE_OVERRIDE: &str = "DELETE";

/// Form body of `POST /delete/{name}`
#[derive(Deserialize)]
pub struct DeleteForm {
    #[serde(rename = "_method")]
    pub method: Option<String>,
}

impl DeleteForm {
    pub fn is_delete(&self) -> bool {
        self.method.as_deref() == Some(DELETE_OVERRIDE)
    }
}
