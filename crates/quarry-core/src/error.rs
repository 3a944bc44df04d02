//! Error types for Quarry operations.

use std::fmt;

/// The primary error type for all Quarry operations.
#[derive(Debug)]
pub enum Error {
    /// Cursor state errors (closed-cursor use, unsupported scrolling)
    Cursor(CursorError),
    /// Underlying data-access failures wrapped with context
    Data(DataError),
    /// Load orchestration errors (profile lookup, identifier validation)
    Load(LoadError),
    /// Filter definition and rendering errors
    Filter(FilterError),
    /// Query parameter errors (unknown or unbound names)
    Query(QueryError),
    /// Connection-access errors (statement, transaction, release)
    Access(AccessError),
    /// Type conversion errors
    Type(TypeError),
    /// Configuration errors
    Config(ConfigError),
    /// I/O errors
    Io(std::io::Error),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct CursorError {
    pub kind: CursorErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorErrorKind {
    /// Operation requires an open cursor
    Closed,
    /// Operation is not supported for this cursor/query shape
    Unsupported,
}

#[derive(Debug)]
pub struct DataError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct LoadError {
    pub kind: LoadErrorKind,
    /// Offending name (profile, entity), when one exists
    pub name: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// Fetch profile name not registered with the owning factory
    UnknownProfile,
    /// Identifier value unusable for loading (null, wrong shape)
    Identifier,
}

#[derive(Debug)]
pub struct FilterError {
    pub kind: FilterErrorKind,
    /// Filter name, when the error is tied to one definition
    pub filter: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterErrorKind {
    /// Filter name not registered with the owning factory
    UnknownFilter,
    /// Parameter name not declared by the filter's condition
    UnknownParameter,
    /// A placeholder could not be resolved to a table alias
    UnresolvedAlias,
    /// Condition template failed to parse
    BadTemplate,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    /// Offending parameter name
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Parameter name not declared in the statement text
    UnknownParameter,
    /// Declared parameter executed without a bound value
    UnboundParameter,
}

#[derive(Debug)]
pub struct AccessError {
    pub kind: AccessErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessErrorKind {
    /// Statement execution failed
    Statement,
    /// Transaction begin/commit/rollback failed
    Transaction,
    /// Resource release failed
    Release,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct ConfigError {
    /// Settings key the failure is tied to, when one exists
    pub key: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Build the closed-cursor state error.
    pub fn cursor_closed() -> Self {
        Error::Cursor(CursorError {
            kind: CursorErrorKind::Closed,
            message: "cursor is closed".to_string(),
        })
    }

    /// Build an unsupported-operation cursor error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::Cursor(CursorError {
            kind: CursorErrorKind::Unsupported,
            message: message.into(),
        })
    }

    /// Wrap an underlying failure with a data-access message.
    pub fn data(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Data(DataError {
            message: message.into(),
            source: Some(Box::new(source)),
        })
    }

    /// Build the unknown-fetch-profile lookup error.
    pub fn unknown_profile(name: impl Into<String>) -> Self {
        let name = name.into();
        Error::Load(LoadError {
            kind: LoadErrorKind::UnknownProfile,
            message: format!("no fetch profile named '{name}' is registered"),
            name: Some(name),
        })
    }

    /// Build the unknown-filter lookup error.
    pub fn unknown_filter(name: impl Into<String>) -> Self {
        let name = name.into();
        Error::Filter(FilterError {
            kind: FilterErrorKind::UnknownFilter,
            message: format!("no filter named '{name}' is registered"),
            filter: Some(name),
        })
    }

    /// Is this the closed-cursor state error?
    pub fn is_cursor_closed(&self) -> bool {
        matches!(
            self,
            Error::Cursor(CursorError {
                kind: CursorErrorKind::Closed,
                ..
            })
        )
    }

    /// Is this an unsupported-operation error?
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Error::Cursor(CursorError {
                kind: CursorErrorKind::Unsupported,
                ..
            })
        )
    }

    /// Is this an unknown-fetch-profile lookup error?
    pub fn is_unknown_profile(&self) -> bool {
        matches!(
            self,
            Error::Load(LoadError {
                kind: LoadErrorKind::UnknownProfile,
                ..
            })
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Cursor(e) => write!(f, "Cursor error: {}", e.message),
            Error::Data(e) => write!(f, "Data access error: {}", e.message),
            Error::Load(e) => write!(f, "Load error: {}", e.message),
            Error::Filter(e) => {
                if let Some(name) = &e.filter {
                    write!(f, "Filter error in '{}': {}", name, e.message)
                } else {
                    write!(f, "Filter error: {}", e.message)
                }
            }
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Access(e) => write!(f, "Access error: {}", e.message),
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Config(e) => {
                if let Some(key) = &e.key {
                    write!(f, "Configuration error for '{}': {}", key, e.message)
                } else {
                    write!(f, "Configuration error: {}", e.message)
                }
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Data(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Access(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<CursorError> for Error {
    fn from(err: CursorError) -> Self {
        Error::Cursor(err)
    }
}

impl From<DataError> for Error {
    fn from(err: DataError) -> Self {
        Error::Data(err)
    }
}

impl From<LoadError> for Error {
    fn from(err: LoadError) -> Self {
        Error::Load(err)
    }
}

impl From<FilterError> for Error {
    fn from(err: FilterError) -> Self {
        Error::Filter(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<AccessError> for Error {
    fn from(err: AccessError) -> Self {
        Error::Access(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for Quarry operations.
pub type Result<T> = std::result::Result<T, Error>;
