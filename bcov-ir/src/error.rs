use bcov_isa::{Opcode, OperandForm};
use thiserror::Error;

use crate::instruction::LabelId;

/// Errors from [`MethodBuilder::build`](crate::MethodBuilder::build).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The opcode's operand form does not match the builder call used.
    #[error("{opcode} has operand form {actual:?}, expected {expected:?} (node {index})")]
    OperandForm {
        index: usize,
        opcode: Opcode,
        expected: OperandForm,
        actual: Option<OperandForm>,
    },

    #[error("label {0:?} is placed more than once")]
    DuplicateLabel(LabelId),

    #[error("label {0:?} is referenced but never placed")]
    UnplacedLabel(LabelId),
}

/// Errors from [`parse_methods`](crate::text::parse_methods).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unknown mnemonic `{mnemonic}`")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("line {line}: {opcode} expects {expected}")]
    BadOperand {
        line: usize,
        opcode: Opcode,
        expected: &'static str,
    },

    #[error("line {line}: {opcode} operands are not supported in listings")]
    UnsupportedForm { line: usize, opcode: Opcode },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: `{directive}` outside of a method")]
    OutsideMethod { line: usize, directive: String },

    #[error("line {line}: method `{name}` is missing `end`")]
    UnterminatedMethod { line: usize, name: String },

    #[error("method `{name}`: {source}")]
    Build {
        name: String,
        #[source]
        source: BuildError,
    },
}

pub type Result<T> = std::result::Result<T, ParseError>;
