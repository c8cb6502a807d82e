use bcov_isa::Opcode;

/// Position of a node within an [`InsnList`](crate::InsnList).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InsnId(pub u32);

impl InsnId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a label.
///
/// Jump targets, line markers and try-catch ranges refer to labels by
/// handle; two labels are the same label only if their handles are equal,
/// regardless of where they are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelId(pub u32);

/// Target of a method invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    /// Internal name of the owner type, e.g. `java/lang/Throwable`.
    pub owner: String,
    pub name: String,
    pub desc: String,
    /// Whether the owner is an interface.
    pub itf: bool,
}

/// Target of a field access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
    pub desc: String,
}

/// A node of a method body: a real instruction or a pseudo-node.
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    /// Instruction without operands.
    Op(Opcode),
    /// `bipush`, `sipush`, `newarray`.
    Int { opcode: Opcode, operand: i32 },
    /// Load, store or `ret` of a local variable slot.
    Var { opcode: Opcode, var: u16 },
    Iinc { var: u16, incr: i16 },
    /// `new`, `anewarray`, `checkcast`, `instanceof`.
    Type { opcode: Opcode, desc: String },
    Field { opcode: Opcode, field: FieldRef },
    Method { opcode: Opcode, method: MethodRef },
    Jump { opcode: Opcode, label: LabelId },
    /// Constant pool load, kept as its source text.
    Ldc { opcode: Opcode, value: String },
    /// Placement of a label (pseudo-node).
    Label(LabelId),
    /// Source line marker (pseudo-node).
    Line { line: u32, start: LabelId },
    /// Stack map frame (pseudo-node).
    Frame,
}

/// Node category, independent of operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsnKind {
    Op,
    Int,
    Var,
    Iinc,
    Type,
    Field,
    Method,
    Jump,
    Ldc,
    Label,
    Line,
    Frame,
}

impl Insn {
    /// Opcode of a real instruction; `None` for pseudo-nodes.
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Insn::Op(opcode)
            | Insn::Int { opcode, .. }
            | Insn::Var { opcode, .. }
            | Insn::Type { opcode, .. }
            | Insn::Field { opcode, .. }
            | Insn::Method { opcode, .. }
            | Insn::Jump { opcode, .. }
            | Insn::Ldc { opcode, .. } => Some(*opcode),
            Insn::Iinc { .. } => Some(Opcode::IINC),
            Insn::Label(_) | Insn::Line { .. } | Insn::Frame => None,
        }
    }

    pub fn kind(&self) -> InsnKind {
        match self {
            Insn::Op(_) => InsnKind::Op,
            Insn::Int { .. } => InsnKind::Int,
            Insn::Var { .. } => InsnKind::Var,
            Insn::Iinc { .. } => InsnKind::Iinc,
            Insn::Type { .. } => InsnKind::Type,
            Insn::Field { .. } => InsnKind::Field,
            Insn::Method { .. } => InsnKind::Method,
            Insn::Jump { .. } => InsnKind::Jump,
            Insn::Ldc { .. } => InsnKind::Ldc,
            Insn::Label(_) => InsnKind::Label,
            Insn::Line { .. } => InsnKind::Line,
            Insn::Frame => InsnKind::Frame,
        }
    }

    /// Labels, line markers and frames carry no executable code.
    #[inline]
    pub fn is_pseudo(&self) -> bool {
        matches!(self, Insn::Label(_) | Insn::Line { .. } | Insn::Frame)
    }

    /// Local variable slot of a var-op.
    pub fn as_var(&self) -> Option<u16> {
        match self {
            Insn::Var { var, .. } => Some(*var),
            _ => None,
        }
    }

    /// Target label of a jump-op.
    pub fn as_jump(&self) -> Option<LabelId> {
        match self {
            Insn::Jump { label, .. } => Some(*label),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodRef> {
        match self {
            Insn::Method { method, .. } => Some(method),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<LabelId> {
        match self {
            Insn::Label(label) => Some(*label),
            _ => None,
        }
    }
}
