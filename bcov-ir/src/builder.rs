//! Method body builder.
//!
//! Mirrors the visitor calls a class-file decoder makes while reading a
//! `Code` attribute: one call per instruction or pseudo-node, in order.

use std::collections::HashSet;

use bcov_isa::{Opcode, OperandForm};

use crate::error::BuildError;
use crate::instruction::{FieldRef, Insn, InsnId, LabelId, MethodRef};
use crate::list::InsnList;
use crate::method::{MethodBody, TryCatchBlock};

/// Incrementally builds a [`MethodBody`].
///
/// Operand-form mismatches are recorded and reported by [`build`](Self::build),
/// so construction code can chain calls without checking each one.
#[derive(Debug)]
pub struct MethodBuilder {
    name: String,
    desc: String,
    insns: Vec<Insn>,
    try_catch_blocks: Vec<TryCatchBlock>,
    next_label: u32,
    error: Option<BuildError>,
}

impl MethodBuilder {
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            insns: Vec::new(),
            try_catch_blocks: Vec::new(),
            next_label: 0,
            error: None,
        }
    }

    /// Allocate a fresh label. It must be placed with [`label`](Self::label)
    /// before [`build`](Self::build) if anything refers to it.
    pub fn new_label(&mut self) -> LabelId {
        let label = LabelId(self.next_label);
        self.next_label += 1;
        label
    }

    /// Id the next appended node will get.
    pub fn position(&self) -> InsnId {
        InsnId(self.insns.len() as u32)
    }

    pub fn insn(&mut self, opcode: Opcode) -> &mut Self {
        self.push(opcode, OperandForm::Plain, Insn::Op(opcode))
    }

    pub fn int_insn(&mut self, opcode: Opcode, operand: i32) -> &mut Self {
        self.push(opcode, OperandForm::Int, Insn::Int { opcode, operand })
    }

    pub fn var_insn(&mut self, opcode: Opcode, var: u16) -> &mut Self {
        self.push(opcode, OperandForm::Var, Insn::Var { opcode, var })
    }

    pub fn iinc_insn(&mut self, var: u16, incr: i16) -> &mut Self {
        self.insns.push(Insn::Iinc { var, incr });
        self
    }

    pub fn type_insn(&mut self, opcode: Opcode, desc: impl Into<String>) -> &mut Self {
        let desc = desc.into();
        self.push(opcode, OperandForm::Type, Insn::Type { opcode, desc })
    }

    pub fn field_insn(
        &mut self,
        opcode: Opcode,
        owner: impl Into<String>,
        name: impl Into<String>,
        desc: impl Into<String>,
    ) -> &mut Self {
        let field = FieldRef {
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
        };
        self.push(opcode, OperandForm::Field, Insn::Field { opcode, field })
    }

    /// Append an invocation. The interface flag follows the opcode.
    pub fn method_insn(
        &mut self,
        opcode: Opcode,
        owner: impl Into<String>,
        name: impl Into<String>,
        desc: impl Into<String>,
    ) -> &mut Self {
        let method = MethodRef {
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
            itf: opcode == Opcode::INVOKEINTERFACE,
        };
        self.push(opcode, OperandForm::Method, Insn::Method { opcode, method })
    }

    pub fn jump_insn(&mut self, opcode: Opcode, label: LabelId) -> &mut Self {
        self.push(opcode, OperandForm::Jump, Insn::Jump { opcode, label })
    }

    pub fn ldc_insn(&mut self, opcode: Opcode, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        self.push(opcode, OperandForm::Ldc, Insn::Ldc { opcode, value })
    }

    /// Place `label` at the current position.
    pub fn label(&mut self, label: LabelId) -> &mut Self {
        self.insns.push(Insn::Label(label));
        self
    }

    pub fn line_number(&mut self, line: u32, start: LabelId) -> &mut Self {
        self.insns.push(Insn::Line { line, start });
        self
    }

    pub fn frame(&mut self) -> &mut Self {
        self.insns.push(Insn::Frame);
        self
    }

    /// Add an exception table entry; `ty` is `None` for a catch-all handler.
    pub fn try_catch_block(
        &mut self,
        start: LabelId,
        end: LabelId,
        handler: LabelId,
        ty: Option<&str>,
    ) -> &mut Self {
        self.try_catch_blocks.push(TryCatchBlock {
            start,
            end,
            handler,
            ty: ty.map(str::to_owned),
        });
        self
    }

    /// Validate and finish the method body.
    pub fn build(self) -> Result<MethodBody, BuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut placed = HashSet::new();
        for insn in &self.insns {
            if let Insn::Label(label) = insn {
                if !placed.insert(*label) {
                    return Err(BuildError::DuplicateLabel(*label));
                }
            }
        }

        let referenced = self
            .insns
            .iter()
            .filter_map(|insn| match insn {
                Insn::Jump { label, .. } => Some(*label),
                Insn::Line { start, .. } => Some(*start),
                _ => None,
            })
            .chain(
                self.try_catch_blocks
                    .iter()
                    .flat_map(|tc| [tc.start, tc.end, tc.handler]),
            );
        for label in referenced {
            if !placed.contains(&label) {
                return Err(BuildError::UnplacedLabel(label));
            }
        }

        Ok(MethodBody {
            name: self.name,
            desc: self.desc,
            insns: InsnList::new(self.insns),
            try_catch_blocks: self.try_catch_blocks,
        })
    }

    fn push(&mut self, opcode: Opcode, expected: OperandForm, insn: Insn) -> &mut Self {
        let actual = opcode.form();
        if actual != Some(expected) && self.error.is_none() {
            self.error = Some(BuildError::OperandForm {
                index: self.insns.len(),
                opcode,
                expected,
                actual,
            });
        }
        self.insns.push(insn);
        self
    }
}
