use crate::hazard::{Hazard, HazardSnapshot};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// How often the hazard snapshot is re-synchronized from the backend.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Fetch errors from the report backend.
#[derive(Debug, Clone)]
pub enum FetchError {
    NetworkTimeout,
    HttpError(u16),
    ParseError(String),
    LocalFileError(String),
    UnknownError(String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            FetchError::NetworkTimeout => write!(f, "Network timeout"),
            FetchError::HttpError(code) => write!(f, "HTTP error: {}", code),
            FetchError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            FetchError::LocalFileError(msg) => write!(f, "Local fallback failed: {}", msg),
            FetchError::UnknownError(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// HTTP client for the detection backend's `/reports` feed.
///
/// # Behavior
/// - GET `{base_url}/reports`, 10-second timeout
/// - On any backend failure, fall back to a local reports file if one was
///   configured (the UI ships a bundled `reports.json` for offline demos)
/// - Each successful fetch becomes a wholesale snapshot replacement;
///   there is no incremental merge
///
/// # Error Handling
/// - Timeout and HTTP errors are transient; the caller keeps the previous
///   snapshot and retries on the next refresh tick
/// - A malformed body is a `ParseError`, logged but never fatal
pub struct ReportFetcher {
    client: reqwest::Client,
    base_url: String,
    fallback_path: Option<PathBuf>,
}

impl ReportFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("hazard-alert/0.1.0")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        ReportFetcher {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fallback_path: None,
        }
    }

    /// Configure a local reports file used when the backend is unreachable.
    pub fn with_fallback(mut self, path: PathBuf) -> Self {
        self.fallback_path = Some(path);
        self
    }

    /// Fetch the current report batch, falling back to the local file on
    /// backend failure.
    pub async fn fetch_snapshot(&self) -> Result<HazardSnapshot, FetchError> {
        match self.fetch_remote().await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => match &self.fallback_path {
                Some(path) => {
                    log::warn!("backend fetch failed ({}), trying local file", e);
                    self.load_local(path)
                }
                None => Err(e),
            },
        }
    }

    async fn fetch_remote(&self) -> Result<HazardSnapshot, FetchError> {
        let url = format!("{}/reports", self.base_url);

        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    return Err(FetchError::NetworkTimeout);
                }
                return Err(FetchError::UnknownError(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpError(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::UnknownError(format!("Failed to read response: {}", e)))?;

        parse_reports(&body)
    }

    fn load_local(&self, path: &PathBuf) -> Result<HazardSnapshot, FetchError> {
        let body = std::fs::read_to_string(path)
            .map_err(|e| FetchError::LocalFileError(e.to_string()))?;
        parse_reports(&body)
    }
}

/// Parse a `/reports` body into a snapshot. An empty array is a valid,
/// empty snapshot.
pub fn parse_reports(body: &str) -> Result<HazardSnapshot, FetchError> {
    let hazards: Vec<Hazard> =
        serde_json::from_str(body).map_err(|e| FetchError::ParseError(e.to_string()))?;
    Ok(HazardSnapshot::new(hazards))
}
