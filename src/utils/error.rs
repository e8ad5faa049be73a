use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned status {status} for {url}")]
    ApiStatusError { status: u16, url: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Reconciliation failed for membership {membership_id}: {message}")]
    ReconciliationError {
        membership_id: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Network,
    Data,
    Configuration,
    Validation,
    Billing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BillingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BillingError::IoError(_) | BillingError::ZipError(_) => ErrorCategory::Io,
            BillingError::ApiError(_) | BillingError::ApiStatusError { .. } => {
                ErrorCategory::Network
            }
            BillingError::CsvError(_) | BillingError::SerializationError(_) => ErrorCategory::Data,
            BillingError::ConfigError { .. }
            | BillingError::ConfigValidationError { .. }
            | BillingError::InvalidConfigValueError { .. }
            | BillingError::MissingConfigError { .. } => ErrorCategory::Configuration,
            BillingError::ValidationError { .. } => ErrorCategory::Validation,
            BillingError::ProcessingError { .. } | BillingError::ReconciliationError { .. } => {
                ErrorCategory::Billing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路問題通常可以重試
            BillingError::ApiError(_) => ErrorSeverity::Medium,
            BillingError::ApiStatusError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            BillingError::ApiStatusError { .. } => ErrorSeverity::High,
            BillingError::IoError(_) | BillingError::ZipError(_) => ErrorSeverity::Critical,
            BillingError::ReconciliationError { .. } => ErrorSeverity::Low,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Io => "Check that the input/output directories exist and are writable",
            ErrorCategory::Network => {
                "Check the backend endpoint, API key and network connectivity, then retry"
            }
            ErrorCategory::Data => {
                "Check the exported CSV/JSON files: headers, date format (YYYY-MM-DD) and months (YYYY-MM)"
            }
            ErrorCategory::Configuration => "Review the command line flags or the TOML config file",
            ErrorCategory::Validation => "Fix the offending record and run again",
            ErrorCategory::Billing => "Inspect the membership and plan records for this gym",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BillingError::ApiStatusError { status: 401, .. }
            | BillingError::ApiStatusError { status: 403, .. } => {
                "The backend rejected the API key".to_string()
            }
            BillingError::MissingConfigError { field } => {
                format!("Missing required setting '{}'", field)
            }
            BillingError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    /// 嚴重程度對應的程式結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        BillingError::ValidationError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        BillingError::ProcessingError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
