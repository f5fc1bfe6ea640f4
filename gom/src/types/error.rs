// gom/src/types/error.rs
use thiserror::Error;

/// Result type used across the reflection runtime.
pub type GomResult<T> = Result<T, GomError>;

/// Every failure the runtime reports. Failures are logged on their
/// channel where they happen and then returned as one of these.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GomError {
    // Registry
    #[error("meta type '{0}' is already bound")]
    DuplicateType(String),
    #[error("no such meta type: {0}")]
    UnknownType(String),
    #[error("{0} is not a meta class")]
    NotAClass(String),
    #[error("the type registry was shut down")]
    RegistryShutDown,

    // Values
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("invalid value '{value}' for {type_name}")]
    InvalidValue { value: String, type_name: String },
    #[error("cannot cast {from} to {to}")]
    InvalidCast { from: String, to: String },
    #[error("null value")]
    NullValue,

    // Dispatch
    #[error("{class}::{name} : no such method")]
    NoSuchMethod { class: String, name: String },
    #[error("{class}::{name} : no such property")]
    NoSuchProperty { class: String, name: String },
    #[error("property {class}::{name} is read-only")]
    ReadOnlyProperty { class: String, name: String },
    #[error("{method} : missing argument '{arg}'")]
    MissingArgument { method: String, arg: String },
    #[error("arg type error: {name} has type {actual}, expected {expected}")]
    ArgTypeError { name: String, expected: String, actual: String },
    #[error("{method} : expected {expected} args, got {actual}")]
    WrongArgCount { method: String, expected: usize, actual: usize },
    #[error("{0} does not have a method adapter")]
    NoAdapter(String),
    #[error("{0} is abstract (cannot create instances)")]
    AbstractClass(String),
    #[error("{0} does not have a matching constructor")]
    NoMatchingConstructor(String),
    #[error("{0} is not implemented")]
    NotImplemented(String),

    // Commands
    #[error("tried to invoke {0} from locked Commands class")]
    CommandLocked(String),

    // Connections
    #[error("connection on signal '{0}' is disconnected")]
    Disconnected(String),

    // Scripting
    #[error("{language} error: {message}")]
    Script { language: String, message: String },
}

impl GomError {
    /// Builds a scripting error for the given language.
    pub fn script(language: &str, message: impl Into<String>) -> Self {
        GomError::Script { language: language.to_string(), message: message.into() }
    }
}

impl From<GomError> for mlua::Error {
    fn from(error: GomError) -> Self {
        mlua::Error::RuntimeError(error.to_string())
    }
}
