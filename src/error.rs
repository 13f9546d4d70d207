use thiserror::Error;

pub type Result<T> = std::result::Result<T, AbiError>;

#[derive(Debug, Error)]
pub enum AbiError {
    #[error("unrecognized ABI type '{0}'")]
    UnrecognizedType(String),

    #[error("invalid ABI type '{ty}': {reason}")]
    InvalidType { ty: String, reason: String },

    #[error("argument mismatch at {path}: expected {expected}, found {actual}")]
    ArgumentMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("list length mismatch at {path}: declared {expected} elements, found {actual}")]
    ListLengthMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("missing field '{field}' at {path}")]
    MissingField { path: String, field: String },

    #[error("decode failed at byte offset {offset}: {reason}")]
    Decode { offset: usize, reason: String },

    #[error("no function matches selector 0x{0}")]
    SelectorNotFound(String),

    #[error("no overload of '{name}' takes {arg_count} argument(s)")]
    NoMatchingOverload { name: String, arg_count: usize },

    #[error("event not found: {0}")]
    EventNotFound(String),

    #[error("invalid ABI JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid hex input: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("failed to read ABI file: {0}")]
    Io(#[from] std::io::Error),
}

impl AbiError {
    pub(crate) fn mismatch(
        path: impl ToString,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        AbiError::ArgumentMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn decode(offset: usize, reason: impl Into<String>) -> Self {
        AbiError::Decode {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_type(ty: &str, reason: impl Into<String>) -> Self {
        AbiError::InvalidType {
            ty: ty.to_string(),
            reason: reason.into(),
        }
    }
}
