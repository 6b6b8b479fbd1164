use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Credentials are missing or were refused by the service.
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("{service} rejected the request ({status}): {message}")]
    RemoteRejected {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    /// A setting the command needs has no value.
    #[error("missing configuration: {0}")]
    Configuration(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("{failed} of {total} operations failed")]
    PassFailed { failed: usize, total: usize },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Whether a reconciliation or removal pass has to stop instead of moving
    /// on to the next item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Authentication(_) | SyncError::Configuration(_) | SyncError::Unsupported(_)
        )
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Configuration(_) => 2,
            SyncError::Authentication(_) => 3,
            SyncError::RemoteRejected { .. } | SyncError::PassFailed { .. } => 4,
            SyncError::NotFound(_) => 5,
            SyncError::Unsupported(_) => 6,
            SyncError::Http(_) | SyncError::Csv(_) | SyncError::Io(_) => 1,
        }
    }
}

/// Map an error chain to the process exit code of the first `SyncError` in it.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SyncError>())
        .map(SyncError::exit_code)
        .unwrap_or(1)
}

/// Turn a non-2xx response into the matching `SyncError`.
pub async fn check_status(
    service: &'static str,
    what: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, SyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let message = resp.text().await.unwrap_or_default();
    let message = message.trim().chars().take(300).collect::<String>();
    match status.as_u16() {
        401 => Err(SyncError::Authentication(format!("{service} refused the credentials"))),
        404 => Err(SyncError::NotFound(what.to_string())),
        code => Err(SyncError::RemoteRejected {
            service,
            status: code,
            message,
        }),
    }
}
