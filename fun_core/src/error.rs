// fun_project_root/fun_core/src/error.rs
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunError {
    /// A step could not be turned into an instruction (not callable, bad payload, ...).
    #[error("Construction Error: {0}")]
    Construction(String),
    /// The current value lacks the capability an instruction needs.
    #[error("Unsupported Operation: {0}")]
    UnsupportedOperation(String),
    #[error("Unknown Opcode: {0} is not a valid chain opcode")]
    UnknownOpcode(u8),
    /// Plain-container read of an absent key.
    #[error("Key Not Found: {0}")]
    KeyNotFound(String),
    #[error("Lexer Error: {0}")]
    Lexer(String),
    #[error("Parser Error: {0}")]
    Parser(String),
    #[error("Type Error: {0}")]
    Type(String),
    #[error("Argument Error: {0}")] // For incorrect callable arguments, etc.
    Argument(String),
}

impl FunError {
    /// Folds expression compile failures into the construction-time error the
    /// normalizer reports to its caller.
    pub fn into_construction(self, context: &str) -> FunError {
        match self {
            FunError::Construction(_) => self,
            other => FunError::Construction(format!("{}: {}", context, other)),
        }
    }
}

pub type FunResult<T> = Result<T, FunError>;
