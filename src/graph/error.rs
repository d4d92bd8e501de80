use thiserror::Error;

/// Failure issuing an HTTP request. Non-2xx statuses are not transport
/// errors; they are handed back to the caller for classification.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Fetch-stage errors. Any of these fails the whole fetch for one edge.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Malformed Graph response (HTTP {status}): {source}")]
    MalformedResponse {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("Graph API error (HTTP {status}): code {}, subcode {}{}",
        opt(.code), opt(.subcode), suffix(.message))]
    Api {
        status: u16,
        code: Option<i64>,
        subcode: Option<i64>,
        message: Option<String>,
    },

    #[error("Unexpected item shape from {edge}: {source}")]
    UnexpectedShape {
        edge: String,
        #[source]
        source: serde_json::Error,
    },
}

fn opt(v: &Option<i64>) -> String {
    v.map_or_else(|| "none".to_string(), |v| v.to_string())
}

fn suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

/// OAuth error code returned for expired or revoked tokens.
const OAUTH_EXCEPTION_CODE: i64 = 190;

impl GraphError {
    /// Whether the remote side rejected the access token itself. Every
    /// other edge will fail the same way, so the caller can stop early.
    pub fn is_auth_error(&self) -> bool {
        match self {
            GraphError::Api { status, code, .. } => {
                *code == Some(OAUTH_EXCEPTION_CODE) || *status == 401
            }
            _ => false,
        }
    }
}
