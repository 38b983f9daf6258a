use reqwest::StatusCode;

/// Errors surfaced by the controller client.
///
/// Read-path problems (a query answered with a non-200 status or without an
/// `items` key) are not represented here: they are logged and degrade to an
/// empty result.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("controller rejected write ({status}): {body}")]
    Write { status: StatusCode, body: String },

    #[error("controller answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("still rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("input schema mismatch: {0}")]
    Schema(String),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
