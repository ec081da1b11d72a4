/// Error types for sqlx-statement
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed named-parameter syntax in a SQL template
    #[error("{message} at position {position}")]
    Syntax { message: String, position: usize },

    /// A named parameter had no value and nothing bound it later
    #[error("No value supplied for named parameter '{0}'")]
    UnresolvedParameter(String),

    /// A value was bound to a name the statement never mentions
    #[error("Named parameter '{0}' does not occur in the statement")]
    UnknownParameter(String),

    /// Number of supplied values differs from the markers allocated for a name
    #[error("Parameter '{name}' expects {expected} value(s) but {actual} were supplied")]
    BindingArity {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A zero-element collection was supplied for a template parameter
    #[error("Collection bound to parameter '{0}' is empty")]
    EmptyCollection(String),

    /// The criteria chain holds no predicate at all
    #[error("Criteria must not be empty")]
    EmptyCriteria,

    /// INSERT or UPDATE without any column assignment
    #[error("{0} requires at least one column assignment")]
    EmptyAssignment(&'static str),

    /// The active dialect cannot render the comparator
    #[error("Comparator {comparator} is not supported by dialect {dialect}")]
    UnsupportedComparator {
        comparator: &'static str,
        dialect: &'static str,
    },

    /// The execution sink cannot encode the value or bind target
    #[error("Unsupported binding: {0}")]
    UnsupportedBinding(String),

    /// The value converter rejected a value
    #[error("Value conversion failed: {0}")]
    Conversion(String),

    /// Engine configuration could not be read
    #[error("Invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Error from SQLx database operations
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        Error::Syntax {
            message: message.into(),
            position,
        }
    }
}

/// Result type alias for sqlx-statement operations
pub type Result<T> = std::result::Result<T, Error>;
