use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentQlError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AgentQL API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("AgentQL response carried no data (request {request_id})")]
    MissingData { request_id: String },
}

pub type Result<T> = std::result::Result<T, AgentQlError>;
