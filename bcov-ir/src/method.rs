use crate::instruction::{InsnId, LabelId};
use crate::list::InsnList;

/// One entry of a method's exception table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryCatchBlock {
    pub start: LabelId,
    pub end: LabelId,
    pub handler: LabelId,
    /// Internal name of the caught type, or `None` for a catch-all handler.
    pub ty: Option<String>,
}

impl TryCatchBlock {
    #[inline]
    pub fn is_catch_all(&self) -> bool {
        self.ty.is_none()
    }
}

/// A method body as handed over by the class-file decoder.
#[derive(Debug, Clone)]
pub struct MethodBody {
    pub name: String,
    pub desc: String,
    pub insns: InsnList,
    pub try_catch_blocks: Vec<TryCatchBlock>,
}

impl MethodBody {
    /// Position of a try-catch handler.
    pub fn handler_position(&self, tc: &TryCatchBlock) -> Option<InsnId> {
        self.insns.label_position(tc.handler)
    }
}
