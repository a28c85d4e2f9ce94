use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Feature service {operation} failed: {message}")]
    ServiceError { operation: String, message: String },

    #[error("Upstream API error: {message}")]
    UpstreamError { message: String },

    #[error("Upload incomplete: {uploaded} features added, {failed} rejected")]
    PartialUploadError { uploaded: usize, failed: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Authentication,
    Data,
    Service,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::IoError(_) => ErrorCategory::System,
            EtlError::SerializationError(_) => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::AuthError { .. } => ErrorCategory::Authentication,
            EtlError::ServiceError { .. } | EtlError::PartialUploadError { .. } => {
                ErrorCategory::Service
            }
            EtlError::UpstreamError { .. } => ErrorCategory::Network,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Service => ErrorSeverity::Medium,
            ErrorCategory::Configuration
            | ErrorCategory::Authentication
            | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 根據錯誤類型給出處理建議
    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ApiError(_) => {
                "Check network connectivity and that the service URLs are reachable".to_string()
            }
            EtlError::IoError(_) => "Check file paths and permissions".to_string(),
            EtlError::SerializationError(_) => {
                "Check that the field map and service responses are valid JSON".to_string()
            }
            EtlError::ConfigError { .. } | EtlError::ConfigValidationError { .. } => {
                "Review the job file and command line flags".to_string()
            }
            EtlError::MissingConfigError { field } => format!(
                "Provide --{} on the command line, in the environment or in the job file",
                field.replace('_', "-")
            ),
            EtlError::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}'", field)
            }
            EtlError::AuthError { .. } => {
                "Verify the username, password and organization URL".to_string()
            }
            EtlError::ServiceError { .. } => {
                "Verify the layer URL and that the account can edit the layer".to_string()
            }
            EtlError::UpstreamError { .. } => {
                "Verify the API URL and resource id; the layer was left untouched".to_string()
            }
            EtlError::PartialUploadError { .. } => {
                "Compare the field map against the layer schema and re-run".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not reach a remote service: {}", self),
            ErrorCategory::Authentication => format!("Could not sign in: {}", self),
            ErrorCategory::Data => format!("Unexpected data: {}", self),
            ErrorCategory::Service => format!("Feature layer update failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let missing = EtlError::MissingConfigError {
            field: "org_url".to_string(),
        };
        assert_eq!(missing.category(), ErrorCategory::Configuration);
        assert_eq!(missing.severity(), ErrorSeverity::High);

        let partial = EtlError::PartialUploadError {
            uploaded: 10,
            failed: 2,
        };
        assert_eq!(partial.severity(), ErrorSeverity::Medium);

        let io = EtlError::IoError(std::io::Error::other("disk"));
        assert_eq!(io.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_missing_config_suggests_flag_name() {
        let err = EtlError::MissingConfigError {
            field: "layer_url".to_string(),
        };
        assert!(err.recovery_suggestion().contains("--layer-url"));
    }
}
