//! Pure AgentQL REST API client.
//!
//! A minimal client for the AgentQL query service. Given a query in AgentQL's
//! shape syntax and a document (rendered HTML or a public URL), the service
//! returns JSON shaped like the query.
//!
//! # Example
//!
//! ```rust,ignore
//! use agentql_client::AgentQlClient;
//!
//! let client = AgentQlClient::new("your-api-key".into());
//!
//! let query = "{ job_posts[] { org_name job_title } }";
//! let data = client.query_html(query, &rendered_html).await?;
//! println!("{}", data["job_posts"]);
//! ```

pub mod error;
pub mod types;

pub use error::{AgentQlError, Result};
pub use types::{QueryDataRequest, QueryDataResponse, QueryMode, QueryParams};

const BASE_URL: &str = "https://api.agentql.com/v1";

pub struct AgentQlClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AgentQlClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at a different deployment (self-hosted or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Run a data query against already-rendered HTML.
    pub async fn query_html(&self, query: &str, html: &str) -> Result<serde_json::Value> {
        let request = QueryDataRequest {
            query: query.to_string(),
            url: None,
            html: Some(html.to_string()),
            params: QueryParams::default(),
        };
        self.query_data(&request).await
    }

    /// Run a data query against a publicly reachable URL.
    pub async fn query_url(&self, query: &str, url: &str) -> Result<serde_json::Value> {
        let request = QueryDataRequest {
            query: query.to_string(),
            url: Some(url.to_string()),
            html: None,
            params: QueryParams::default(),
        };
        self.query_data(&request).await
    }

    pub async fn query_data(&self, request: &QueryDataRequest) -> Result<serde_json::Value> {
        let url = format!("{}/query-data", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentQlError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: QueryDataResponse = resp.json().await?;
        let request_id = body.metadata.request_id.unwrap_or_default();
        tracing::debug!(request_id = %request_id, "AgentQL query completed");

        body.data
            .ok_or(AgentQlError::MissingData { request_id })
    }
}
