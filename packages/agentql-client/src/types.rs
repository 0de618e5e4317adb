use serde::{Deserialize, Serialize};

/// Body for `POST /query-data`.
///
/// Exactly one of `url` or `html` should be set. The scraper always sends the
/// rendered HTML of the page it already has open, so the service never has to
/// re-authenticate against the target site.
#[derive(Debug, Clone, Serialize)]
pub struct QueryDataRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    pub params: QueryParams,
}

/// Tuning knobs for a data query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryParams {
    pub mode: QueryMode,
    pub wait_for: u32,
    pub is_scroll_to_bottom_enabled: bool,
    pub is_screenshot_enabled: bool,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            mode: QueryMode::Standard,
            wait_for: 0,
            is_scroll_to_bottom_enabled: false,
            is_screenshot_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Fast,
    Standard,
}

/// Response from `POST /query-data`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryDataResponse {
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMetadata {
    pub request_id: Option<String>,
}
