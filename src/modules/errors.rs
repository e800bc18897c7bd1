//! Load Errors and Error Reporting
//!
//! Every failure funnels through `ErrorReporter`, which records the message
//! and then applies the configured `ErrorLevel`:
//! - `none` - silent (the message is still retained)
//! - `warn` - non-fatal notification through `tracing` and the notifier hook
//! - `die` - returned to the caller as `LoadError::Reported`

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

/// How reported errors are surfaced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    /// Suppress errors; only the last message is kept.
    #[default]
    None,
    /// Notify, then continue.
    Warn,
    /// Fail the current operation.
    Die,
}

impl ErrorLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorLevel::None => "none",
            ErrorLevel::Warn => "warn",
            ErrorLevel::Die => "die",
        }
    }
}

impl std::fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ErrorLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ErrorLevel::None),
            "warn" => Ok(ErrorLevel::Warn),
            "die" => Ok(ErrorLevel::Die),
            other => Err(format!(
                "unknown error level '{}' (expected none, warn or die)",
                other
            )),
        }
    }
}

/// Transport failure while fetching source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    /// Address that was being fetched.
    pub address: String,
    /// Transport-specific description.
    pub message: String,
}

impl FetchError {
    pub fn new(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to fetch '{}': {}", self.address, self.message)
    }
}

impl std::error::Error for FetchError {}

/// Failure to turn source text into a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError(pub String);

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for EvalError {}

/// Result type for resolver operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors that can escape resolver operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No location yielded the package.
    NotFound(String),
    /// Transport failure on the last location tried.
    Fetch(FetchError),
    /// Source could not be materialized into a definition.
    Evaluation(String, EvalError),
    /// An error raised by the reporter under `die`.
    Reported(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::NotFound(pkg) => write!(f, "Could not find package [{}]", pkg),
            LoadError::Fetch(err) => write!(f, "{}", err),
            LoadError::Evaluation(pkg, err) => {
                write!(f, "Could not create namespace[{}]: {}", pkg, err)
            }
            LoadError::Reported(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Fetch(err) => Some(err),
            LoadError::Evaluation(_, err) => Some(err),
            _ => None,
        }
    }
}

impl From<FetchError> for LoadError {
    fn from(err: FetchError) -> Self {
        LoadError::Fetch(err)
    }
}

/// Callback invoked for `warn`-level reports.
pub type Notifier = Arc<dyn Fn(&str) + Send + Sync>;

/// The single choke point for reporting load failures.
#[derive(Clone, Default)]
pub struct ErrorReporter {
    level: ErrorLevel,
    last_message: String,
    notifier: Option<Notifier>,
}

impl ErrorReporter {
    pub fn new(level: ErrorLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn level(&self) -> ErrorLevel {
        self.level
    }

    pub fn set_level(&mut self, level: ErrorLevel) {
        self.level = level;
    }

    /// Install a hook called with the message of every `warn`-level report.
    pub fn set_notifier<F>(&mut self, notifier: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.notifier = Some(Arc::new(notifier));
    }

    /// Text of the most recent report, whatever the level. Empty if none.
    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    /// Report `message` using `level`, or the configured level if `None`.
    ///
    /// The last message is always overwritten.
    pub fn report(&mut self, message: impl Into<String>, level: Option<ErrorLevel>) -> LoadResult<()> {
        let message = message.into();
        self.last_message = message.clone();

        match level.unwrap_or(self.level) {
            ErrorLevel::None => Ok(()),
            ErrorLevel::Warn => {
                warn!(target: "just::resolver", error = %message, "Package load failed");
                if let Some(notifier) = &self.notifier {
                    notifier(&message);
                }
                Ok(())
            }
            ErrorLevel::Die => Err(LoadError::Reported(message)),
        }
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("level", &self.level)
            .field("last_message", &self.last_message)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}
