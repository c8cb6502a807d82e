//! Instruction model for JVM method bodies.
//!
//! A method body is an [`InsnList`]: an ordered, index-addressed sequence of
//! instructions and pseudo-nodes (labels, line markers, stack map frames),
//! together with its exception table. Everything here is read-only once
//! built, so analyses can share a body across threads.

pub mod builder;
pub mod error;
pub mod instruction;
pub mod list;
pub mod method;
pub mod text;

pub use builder::MethodBuilder;
pub use error::{BuildError, ParseError};
pub use instruction::{FieldRef, Insn, InsnId, InsnKind, LabelId, MethodRef};
pub use list::InsnList;
pub use method::{MethodBody, TryCatchBlock};

pub use bcov_isa::Opcode;
