use serde::{Deserialize, Serialize};

/// Body of `POST /api/predictions`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitRequest {
    #[serde(default)]
    pub image: Option<String>,
}

/// Error body attached to every non-success response.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorBody {
    pub detail: String,
}
