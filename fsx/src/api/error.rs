use thiserror::Error;

/// Error codes the service uses for a missing resource
const NOT_FOUND_CODES: &[&str] = &["VolumeNotFound", "FileSystemNotFound", "ResourceNotFound"];

/// Error codes for rejected credentials or signatures, whatever the status
const AUTH_CODES: &[&str] = &[
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "AccessDeniedException",
    "InvalidClientTokenId",
    "ExpiredTokenException",
    "MissingAuthenticationTokenException",
];

/// Error codes that mean "slow down"
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("{code}: {message}")]
    NotFound { code: String, message: String },

    #[error("API returned error (HTTP {status}) {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Failed to sign request: {0}")]
    Signing(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("timeout while waiting for {what} to become {target} (last state: {last_state})")]
    WaitTimeout {
        what: String,
        target: String,
        last_state: String,
    },

    #[error("cancelled while waiting for {0}")]
    Cancelled(String),

    #[error("{what} entered unexpected state {state}: {reason}")]
    UnexpectedState {
        what: String,
        state: String,
        reason: String,
    },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Classify an error body from the JSON protocol
    pub(crate) fn from_service(status: u16, code: &str, message: String) -> Self {
        if NOT_FOUND_CODES.contains(&code) {
            return ApiError::NotFound {
                code: code.to_string(),
                message,
            };
        }
        if status == 401 || AUTH_CODES.contains(&code) {
            return ApiError::AuthError(format!("{}: {}", code, message));
        }
        ApiError::Service {
            status,
            code: code.to_string(),
            message,
        }
    }

    pub(crate) fn is_throttling_code(code: &str) -> bool {
        THROTTLING_CODES.contains(&code)
    }
}
