use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LastFetchInfo {
    pub success: bool,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "successCount", skip_serializing_if = "Option::is_none")]
    pub success_count: Option<usize>,
    #[serde(rename = "failureCount", skip_serializing_if = "Option::is_none")]
    pub failure_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindStatusResponse {
    pub running: bool,
    #[serde(rename = "lastFetch")]
    pub last_fetch: Option<LastFetchInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindRefreshResponse {
    pub success: bool,
    pub status: WindStatusResponse,
}
