// Error types for the media resolution pipeline

use std::fmt;
use std::io;

/// Maximum number of characters of raw tool output that may reach a
/// user-facing message.
pub const ERROR_MESSAGE_BUDGET: usize = 100;

#[derive(Debug, Clone)]
pub enum DownloadError {
    /// The source platform is throttling us (HTTP 429 / "Too Many Requests")
    RateLimited(String),

    /// The post exists but carries no video ("no video" reported by the
    /// extraction tool); triggers the photo fallback where one exists
    NoMedia(String),

    /// The extractor returned a payload with zero downloadable entries
    EmptyPlaylist,

    /// The artifact exceeded the per-content-type size ceiling and was deleted
    Oversized {
        kind: &'static str,
        limit_mb: u64,
    },

    /// yt-dlp or gallery-dl not found on this system
    ToolNotFound(String),

    /// Failed to parse tool JSON output
    ParseError(String),

    /// Subprocess or I/O failure
    ExecutionError(String),

    /// Subprocess exceeded its hard timeout
    Timeout(u64),

    /// Anything we could not classify
    Unknown(String),
}

impl DownloadError {
    /// Rate-limit signal; retried with a strictly longer backoff.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Structural "post has no video" failure; not worth retrying.
    pub fn is_no_media(&self) -> bool {
        matches!(self, Self::NoMedia(_))
    }
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited(msg) => write!(f, "Rate limited by the source platform: {}", msg),
            Self::NoMedia(msg) => write!(f, "No video found: {}", msg),
            Self::EmptyPlaylist => write!(f, "No extractable content in the post"),
            Self::Oversized { kind, limit_mb } => {
                write!(f, "File exceeds the {} size limit of {} MB", kind, limit_mb)
            }
            Self::ToolNotFound(tool) => write!(f, "Tool not found: {}", tool),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Self::ExecutionError(msg) => write!(f, "Execution error: {}", msg),
            Self::Timeout(secs) => write!(f, "Timed out after {}s", secs),
            Self::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}

/// Classify raw tool stderr by substring.
///
/// The extraction tools run as subprocesses, so human-readable stderr text is
/// the only error channel that crosses the boundary. The "no video" match in
/// particular tracks the wording of current tool releases and may need
/// updating when they change.
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        if lower.contains("429") || lower.contains("too many") {
            return Self::RateLimited(s);
        }

        if lower.contains("no video") {
            return Self::NoMedia(s);
        }

        if lower.contains("not found") || lower.contains("no such file") {
            return Self::ToolNotFound(s);
        }

        Self::Unknown(s)
    }
}

impl From<io::Error> for DownloadError {
    fn from(e: io::Error) -> Self {
        Self::ExecutionError(e.to_string())
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        Self::ExecutionError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_classification() {
        let err = DownloadError::from("ERROR: HTTP Error 429: Too Many Requests".to_string());
        assert!(err.is_rate_limited());

        let err = DownloadError::from("Too Many Requests, slow down".to_string());
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_no_media_classification() {
        let err = DownloadError::from("ERROR: No video could be found in this tweet".to_string());
        assert!(err.is_no_media());
    }

    #[test]
    fn test_tool_not_found_classification() {
        let err = DownloadError::from("yt-dlp: command not found".to_string());
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }

    #[test]
    fn test_unclassified_falls_through() {
        let err = DownloadError::from("something odd happened".to_string());
        assert!(matches!(err, DownloadError::Unknown(_)));
        assert!(!err.is_rate_limited());
        assert!(!err.is_no_media());
    }

    #[test]
    fn test_oversized_display_names_ceiling() {
        let err = DownloadError::Oversized {
            kind: "video",
            limit_mb: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("video"));
        assert!(msg.contains("100 MB"));
    }
}
