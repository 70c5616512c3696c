//! Error types for iflowkit-cpi.

use thiserror::Error;

use iflowkit_core::CoreError;

fn http_display(context: &str, status_line: &str, body: &str) -> String {
    if body.is_empty() {
        format!("{context} ({status_line})")
    } else {
        format!("{context} ({status_line}): {body}")
    }
}

/// All errors that can arise from CPI API calls.
#[derive(Debug, Error)]
pub enum CpiError {
    /// A non-2xx response; callers branch on `status` for fallbacks.
    #[error("{}", http_display(.context, .status_line, .body))]
    HttpStatus {
        /// Operation label, e.g. "CPI request failed".
        context: &'static str,
        status: u16,
        status_line: String,
        body: String,
    },

    /// Connection / TLS / timeout level failure.
    #[error("CPI request failed: {0}")]
    Transport(String),

    #[error("token request failed: {0}")]
    Token(String),

    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("token response missing access_token")]
    MissingAccessToken,

    #[error("CSRF token missing in response")]
    CsrfMissing,

    /// A response body that should be OData JSON but is not.
    #[error("invalid CPI response: {0}")]
    InvalidResponse(String),

    /// Update needs either `__metadata.uri` or a version for the fallback URL.
    #[error("cannot update artifact '{id}': missing __metadata.uri and Version")]
    MissingArtifactUri { id: String },

    /// Filesystem/zip failures while exporting.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl CpiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CpiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// HTTP 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// HTTP 400.
    pub fn is_bad_request(&self) -> bool {
        self.status() == Some(400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_display_with_and_without_body() {
        let with_body = CpiError::HttpStatus {
            context: "CPI upload failed",
            status: 500,
            status_line: "500 Internal Server Error".into(),
            body: "boom".into(),
        };
        assert_eq!(
            with_body.to_string(),
            "CPI upload failed (500 Internal Server Error): boom"
        );

        let without_body = CpiError::HttpStatus {
            context: "CPI request failed",
            status: 404,
            status_line: "404 Not Found".into(),
            body: String::new(),
        };
        assert_eq!(without_body.to_string(), "CPI request failed (404 Not Found)");
    }

    #[test]
    fn status_code_predicates() {
        let err = CpiError::HttpStatus {
            context: "CPI request failed",
            status: 404,
            status_line: "404 Not Found".into(),
            body: String::new(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_bad_request());
        assert!(!CpiError::CsrfMissing.is_not_found());
    }
}
