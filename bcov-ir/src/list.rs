use std::collections::HashMap;
use std::ops::Index;

use crate::instruction::{Insn, InsnId, LabelId};

/// Read-only, index-addressed instruction sequence of one method body.
///
/// Navigation is position arithmetic: `next`/`prev` are O(1) and never
/// allocate. Label placements are indexed once at construction.
#[derive(Debug, Clone, Default)]
pub struct InsnList {
    insns: Vec<Insn>,
    labels: HashMap<LabelId, InsnId>,
}

impl InsnList {
    /// Wrap a node sequence.
    ///
    /// If a label is placed more than once the last placement wins;
    /// [`MethodBuilder`](crate::MethodBuilder) rejects that case up front.
    pub fn new(insns: Vec<Insn>) -> Self {
        let labels = insns
            .iter()
            .enumerate()
            .filter_map(|(i, insn)| insn.as_label().map(|l| (l, InsnId(i as u32))))
            .collect();
        Self { insns, labels }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.insns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    #[inline]
    pub fn get(&self, id: InsnId) -> Option<&Insn> {
        self.insns.get(id.index())
    }

    /// The node after `id`, or `None` at the end of the list.
    #[inline]
    pub fn next(&self, id: InsnId) -> Option<InsnId> {
        let n = id.index() + 1;
        (n < self.insns.len()).then(|| InsnId(n as u32))
    }

    /// The node before `id`, or `None` at the start of the list.
    #[inline]
    pub fn prev(&self, id: InsnId) -> Option<InsnId> {
        if id.index() == 0 || id.index() > self.insns.len() {
            return None;
        }
        Some(InsnId(id.0 - 1))
    }

    /// Where `label` is placed.
    pub fn label_position(&self, label: LabelId) -> Option<InsnId> {
        self.labels.get(&label).copied()
    }

    /// Node ids in sequence order.
    pub fn ids(&self) -> impl Iterator<Item = InsnId> + '_ {
        (0..self.insns.len()).map(|i| InsnId(i as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (InsnId, &Insn)> + '_ {
        self.insns
            .iter()
            .enumerate()
            .map(|(i, insn)| (InsnId(i as u32), insn))
    }

    /// Nodes from `from` to `to`, both inclusive.
    pub fn range(&self, from: InsnId, to: InsnId) -> impl Iterator<Item = InsnId> + '_ {
        let end = (to.index() + 1).min(self.insns.len());
        (from.index()..end).map(|i| InsnId(i as u32))
    }

    pub fn as_slice(&self) -> &[Insn] {
        &self.insns
    }
}

impl Index<InsnId> for InsnList {
    type Output = Insn;

    fn index(&self, id: InsnId) -> &Insn {
        &self.insns[id.index()]
    }
}

impl From<Vec<Insn>> for InsnList {
    fn from(insns: Vec<Insn>) -> Self {
        Self::new(insns)
    }
}
