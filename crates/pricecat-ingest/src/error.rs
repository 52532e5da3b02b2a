use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("catalog API rate limited the request (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("catalog API rejected the API key")]
    Unauthorized,

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("catalog API error: {0}")]
    Api(String),

    #[error("invalid catalog API base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("no parsable capacity for item {external_id}")]
    UnparsableCapacity { external_id: String },

    #[error("normalization error for item {external_id}: {reason}")]
    Normalization { external_id: String, reason: String },
}
