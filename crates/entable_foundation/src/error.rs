//! Error types for the Entable core.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//! Every kind maps onto a stable symbolic code and an HTTP-style status so
//! the request layer can render a precise diagnostic.

use std::fmt;

use thiserror::Error;

/// The main error type for Entable operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a required-field-missing error for the named property.
    #[must_use]
    pub fn required_field_missing(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::InputRequiredFieldMissing(name.into()))
    }

    /// Creates a field format error for the named property.
    #[must_use]
    pub fn field_format(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestFieldFormatError(name.into()))
    }

    /// Creates a structural limit error.
    #[must_use]
    pub fn structural_limit(slots: usize, limit: usize) -> Self {
        Self::new(ErrorKind::StructuralLimitExceeded { slots, limit })
    }

    /// Creates a `$filter` grammar error.
    #[must_use]
    pub fn filter_parse(message: impl Into<String>, column: u32) -> Self {
        Self::new(ErrorKind::FilterParseError {
            message: message.into(),
            column,
        })
    }

    /// Creates an operand type mismatch error for the named operand.
    #[must_use]
    pub fn type_mismatch(operand: impl Into<String>) -> Self {
        Self::new(ErrorKind::OperatorAndOperandTypeMismatched(operand.into()))
    }

    /// Creates an unsupported operand format error for the named operand.
    #[must_use]
    pub fn unsupported_operand(operand: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedOperandFormat(operand.into()))
    }

    /// Creates an unknown query key error.
    #[must_use]
    pub fn unknown_query_key(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownQueryKey(key.into()))
    }

    /// Creates a query option syntax error.
    #[must_use]
    pub fn query_parse(option: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QueryParseError {
            option,
            message: message.into(),
        })
    }

    /// Creates a link conflict error.
    #[must_use]
    pub fn conflict(reason: ConflictReason) -> Self {
        Self::new(ErrorKind::Conflict(reason))
    }

    /// Creates a schema definition error.
    #[must_use]
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSchema(message.into()))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// Returns the stable symbolic code of this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Returns the HTTP-style status of this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.kind.status()
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// A non-nullable leaf was absent or null at write time.
    #[error("required field missing: {0}")]
    InputRequiredFieldMissing(String),

    /// A written literal does not match its declared type's grammar or bound.
    #[error("field format error: {0}")]
    RequestFieldFormatError(String),

    /// The entity body expands to more primitive slots than allowed.
    #[error("structural limitation exceeded: {slots} slots (limit {limit})")]
    StructuralLimitExceeded {
        /// Slots counted in the rejected body.
        slots: usize,
        /// The configured maximum.
        limit: usize,
    },

    /// `$filter` text rejected by the grammar.
    #[error("filter parse error at column {column}: {message}")]
    FilterParseError {
        /// Description of the parse error.
        message: String,
        /// Column number (1-indexed) in the decoded filter text.
        column: u32,
    },

    /// Literal lexical kind does not match the operand's type class.
    #[error("operator and operand type mismatched: {0}")]
    OperatorAndOperandTypeMismatched(String),

    /// Literal has the right lexical kind but lies outside the type's domain.
    #[error("unsupported operand format: {0}")]
    UnsupportedOperandFormat(String),

    /// Operand resolves to no usable property.
    #[error("unknown query key: {0}")]
    UnknownQueryKey(String),

    /// A list-typed property was used as an `$orderby` key.
    #[error("cannot specify the list type to $orderby: {0}")]
    CannotOrderByListType(String),

    /// Malformed `$orderby`, `$select`, `$top` or `$skip` option.
    #[error("invalid {option}: {message}")]
    QueryParseError {
        /// The offending system query option.
        option: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// A link mutation or entity delete violates association rules.
    #[error("conflict: {0}")]
    Conflict(ConflictReason),

    /// Entity type is not declared in the schema.
    #[error("entity type not found: {0}")]
    EntityTypeNotFound(String),

    /// Entity instance does not exist.
    #[error("entity not found: {entity_type}('{id}')")]
    EntityNotFound {
        /// Entity type name.
        entity_type: String,
        /// Instance id.
        id: String,
    },

    /// Entity instance with the same id already exists.
    #[error("entity already exists: {entity_type}('{id}')")]
    EntityAlreadyExists {
        /// Entity type name.
        entity_type: String,
        /// Instance id.
        id: String,
    },

    /// No association joins the two entity types.
    #[error("association not found: {source_type} -> {target_type}")]
    AssociationNotFound {
        /// Source entity type name.
        source_type: String,
        /// Target entity type name.
        target_type: String,
    },

    /// The link to delete does not exist.
    #[error("link not found")]
    LinkNotFound,

    /// Schema definition is malformed.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A conditional store write found its precondition violated.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorKind {
    /// Returns the stable symbolic code for this kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InputRequiredFieldMissing(_) => "INPUT_REQUIRED_FIELD_MISSING",
            Self::RequestFieldFormatError(_) => "REQUEST_FIELD_FORMAT_ERROR",
            Self::StructuralLimitExceeded { .. } => "ENTITYTYPE_STRUCTUAL_LIMITATION_EXCEEDED",
            Self::FilterParseError { .. } => "FILTER_PARSE_ERROR",
            Self::OperatorAndOperandTypeMismatched(_) => "OPERATOR_AND_OPERAND_TYPE_MISMATCHED",
            Self::UnsupportedOperandFormat(_) => "UNSUPPORTED_OPERAND_FORMAT",
            Self::UnknownQueryKey(_) => "UNKNOWN_QUERY_KEY",
            Self::CannotOrderByListType(_) => "CANNOT_SPECIFY_THE_LIST_TYPE_TO_ORDERBY",
            Self::QueryParseError { .. } => "QUERY_PARSE_ERROR",
            Self::Conflict(reason) => reason.code(),
            Self::EntityTypeNotFound(_) => "ENTITY_TYPE_NOT_FOUND",
            Self::EntityNotFound { .. } => "ENTITY_NOT_FOUND",
            Self::EntityAlreadyExists { .. } => "ENTITY_ALREADY_EXISTS",
            Self::AssociationNotFound { .. } => "ASSOCIATION_NOT_FOUND",
            Self::LinkNotFound => "LINK_NOT_FOUND",
            Self::InvalidSchema(_) => "INVALID_SCHEMA",
            Self::PreconditionFailed(_) => "PRECONDITION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP-style status for this kind.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::InputRequiredFieldMissing(_)
            | Self::RequestFieldFormatError(_)
            | Self::StructuralLimitExceeded { .. }
            | Self::FilterParseError { .. }
            | Self::OperatorAndOperandTypeMismatched(_)
            | Self::UnsupportedOperandFormat(_)
            | Self::UnknownQueryKey(_)
            | Self::CannotOrderByListType(_)
            | Self::QueryParseError { .. }
            | Self::InvalidSchema(_) => 400,
            Self::EntityTypeNotFound(_)
            | Self::EntityNotFound { .. }
            | Self::AssociationNotFound { .. }
            | Self::LinkNotFound => 404,
            Self::Conflict(_) | Self::EntityAlreadyExists { .. } => 409,
            Self::PreconditionFailed(_) => 412,
            Self::Internal(_) => 500,
        }
    }

    /// Returns the property or operand name this error refers to, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::InputRequiredFieldMissing(name)
            | Self::RequestFieldFormatError(name)
            | Self::OperatorAndOperandTypeMismatched(name)
            | Self::UnsupportedOperandFormat(name)
            | Self::UnknownQueryKey(name)
            | Self::CannotOrderByListType(name) => Some(name),
            _ => None,
        }
    }
}

/// Why a link mutation or entity delete was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictReason {
    /// A link between the exact instance pair already exists.
    DuplicateLink,
    /// The bounded multiplicity of one end is already used up.
    MultiplicityExceeded,
    /// The entity is still referenced through an unbounded association end.
    LinkedEntityExists,
    /// Another instance already holds the value of a unique property.
    UniqueKeyViolated,
}

impl ConflictReason {
    /// Returns the stable symbolic code for this reason.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::DuplicateLink => "CONFLICT_DUPLICATED_LINK",
            Self::MultiplicityExceeded => "CONFLICT_LINKS_MULTIPLICITY",
            Self::LinkedEntityExists => "CONFLICT_LINKED_ENTITY",
            Self::UniqueKeyViolated => "CONFLICT_UNIQUE_KEY",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateLink => write!(f, "link already exists"),
            Self::MultiplicityExceeded => write!(f, "association multiplicity exceeded"),
            Self::LinkedEntityExists => write!(f, "entity is still linked"),
            Self::UniqueKeyViolated => write!(f, "unique property value already taken"),
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Collection the request addressed.
    pub collection: Option<String>,
    /// Entity type the request addressed.
    pub entity_type: Option<String>,
    /// Property path leading to the failure, outermost first.
    pub path: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the collection.
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Sets the entity type.
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Sets the property path.
    #[must_use]
    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(collection) = &self.collection {
            write!(f, "in {collection}")?;
        }
        if let Some(entity_type) = &self.entity_type {
            write!(f, " at {entity_type}")?;
        }
        if !self.path.is_empty() {
            write!(f, " ({})", self.path.join("/"))?;
        }
        Ok(())
    }
}

/// Result type alias using the Entable error.
pub type Result<T> = std::result::Result<T, Error>;
