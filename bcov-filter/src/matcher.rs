//! Cursor-and-bindings matching over an instruction list.
//!
//! A [`Matcher`] walks forward from an anchor. Each primitive moves the
//! cursor to the next node it inspects and either succeeds or fails; a
//! failed primitive leaves the matcher in an unspecified position, so
//! callers restart from the anchor (or from a [`Snapshot`]).
//!
//! Symbols name operands that must agree across the window: a local slot,
//! a branch target or the owner type of a `close()` call. The first
//! reference binds a symbol and every later reference must see the same
//! value.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

use bcov_ir::{Insn, InsnId, InsnList, LabelId};
use bcov_isa::Opcode;

/// Namespace a symbol lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Whole attempt.
    Method,
    /// Cleanup on the normal completion path.
    Normal,
    /// Cleanup on the exceptional path.
    Exceptional,
    /// Cleanup of the n-th resource of a chain, innermost first.
    Resource(u32),
    /// The handler that rethrows the primary exception.
    Outermost,
}

/// A fully qualified symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub scope: Scope,
    pub name: &'static str,
}

impl Key {
    pub const fn new(scope: Scope, name: &'static str) -> Self {
        Self { scope, name }
    }
}

/// A symbol as written in a step table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sym {
    /// Same key wherever the step runs.
    Global(Key),
    /// Qualified by the scope of the segment that runs the step.
    Local(&'static str),
}

impl Sym {
    pub const fn global(scope: Scope, name: &'static str) -> Self {
        Sym::Global(Key::new(scope, name))
    }

    pub fn resolve(self, scope: Scope) -> Key {
        match self {
            Sym::Global(key) => key,
            Sym::Local(name) => Key::new(scope, name),
        }
    }
}

/// One entry of a shape table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Next instruction has this opcode.
    Op(Opcode),
    /// Var-op with this opcode; its slot unifies with the symbol.
    Var(Opcode, Sym),
    /// Jump with this opcode; its target unifies with the symbol.
    Jump(Opcode, Sym),
    /// The literal next node is a label that unifies with the symbol.
    Label(Sym),
    /// `ALOAD resource` followed by `resource.close()`.
    Close(Sym),
    /// `primaryExc.addSuppressed(exc)`.
    AddSuppressed(Sym),
    /// Method call with this opcode, name and descriptor.
    Invoke(Opcode, &'static str, &'static str),
    /// Typed value return, or `GOTO` to the symbol.
    Exit(Sym),
    /// The symbol's label, if the symbol is still bound.
    JoinLabel(Sym),
}

/// Slot holding the exception that propagates to the caller.
pub const PRIMARY_EXC: Sym = Sym::global(Scope::Method, "primaryExc");

const THROWABLE: &str = "java/lang/Throwable";

#[derive(Debug, Clone, Default)]
struct Bindings<'a> {
    vars: HashMap<Key, u16>,
    labels: HashMap<Key, LabelId>,
    owners: HashMap<Key, &'a str>,
}

fn unify<K: Eq + Hash, V: PartialEq>(map: &mut HashMap<K, V>, key: K, value: V) -> bool {
    match map.entry(key) {
        Entry::Occupied(bound) => *bound.get() == value,
        Entry::Vacant(slot) => {
            slot.insert(value);
            true
        }
    }
}

/// Saved cursor and bindings.
#[derive(Debug, Clone)]
pub struct Snapshot<'a> {
    cursor: Option<InsnId>,
    env: Bindings<'a>,
}

/// Backtracking matcher state for one attempt.
#[derive(Debug, Clone)]
pub struct Matcher<'a> {
    insns: &'a InsnList,
    cursor: Option<InsnId>,
    env: Bindings<'a>,
}

impl<'a> Matcher<'a> {
    /// Matcher whose first primitive inspects `start` (or the first real
    /// instruction after it). `None` if `start` has no predecessor.
    pub fn before(insns: &'a InsnList, start: InsnId) -> Option<Self> {
        let cursor = insns.prev(start)?;
        Some(Self::at(insns, cursor))
    }

    /// Matcher whose first primitive inspects the node after `pos`.
    pub fn at(insns: &'a InsnList, pos: InsnId) -> Self {
        Self {
            insns,
            cursor: Some(pos),
            env: Bindings::default(),
        }
    }

    /// Node the last primitive inspected; `None` once past the end.
    pub fn position(&self) -> Option<InsnId> {
        self.cursor
    }

    /// Nodes after the cursor.
    pub fn remaining(&self) -> usize {
        match self.cursor {
            Some(id) => self.insns.len().saturating_sub(id.index() + 1),
            None => 0,
        }
    }

    pub fn snapshot(&self) -> Snapshot<'a> {
        Snapshot {
            cursor: self.cursor,
            env: self.env.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: Snapshot<'a>) {
        self.cursor = snapshot.cursor;
        self.env = snapshot.env;
    }

    fn current(&self) -> Option<&'a Insn> {
        self.cursor.and_then(|id| self.insns.get(id))
    }

    fn step_literal(&mut self) {
        self.cursor = self.cursor.and_then(|id| self.insns.next(id));
    }

    fn real_after(&self, mut cursor: Option<InsnId>) -> Option<InsnId> {
        loop {
            cursor = cursor.and_then(|id| self.insns.next(id));
            match cursor {
                Some(id) if self.insns[id].is_pseudo() => continue,
                _ => return cursor,
            }
        }
    }

    /// Move past labels, line markers and frames to the next real
    /// instruction.
    pub fn advance(&mut self) {
        self.cursor = self.real_after(self.cursor);
    }

    /// Opcode of the next real instruction, without moving.
    pub fn peek(&self) -> Option<Opcode> {
        self.real_after(self.cursor)
            .and_then(|id| self.insns[id].opcode())
    }

    pub fn expect(&mut self, opcode: Opcode) -> bool {
        self.advance();
        self.current().and_then(Insn::opcode) == Some(opcode)
    }

    pub fn expect_var(&mut self, opcode: Opcode, key: Key) -> bool {
        if !self.expect(opcode) {
            return false;
        }
        match self.current().and_then(Insn::as_var) {
            Some(var) => unify(&mut self.env.vars, key, var),
            None => false,
        }
    }

    pub fn expect_jump(&mut self, opcode: Opcode, key: Key) -> bool {
        if !self.expect(opcode) {
            return false;
        }
        match self.current().and_then(Insn::as_jump) {
            Some(label) => unify(&mut self.env.labels, key, label),
            None => false,
        }
    }

    /// The literal next node must be a label; pseudo-nodes are not skipped.
    pub fn expect_label(&mut self, key: Key) -> bool {
        self.step_literal();
        match self.current().and_then(Insn::as_label) {
            Some(label) => unify(&mut self.env.labels, key, label),
            None => false,
        }
    }

    /// `ALOAD key` then an interface or virtual `close()V`. The owner type
    /// is bound under the same key.
    pub fn expect_close(&mut self, key: Key) -> bool {
        if !self.expect_var(Opcode::ALOAD, key) {
            return false;
        }
        self.advance();
        let Some(Insn::Method { opcode, method }) = self.current() else {
            return false;
        };
        if *opcode != Opcode::INVOKEINTERFACE && *opcode != Opcode::INVOKEVIRTUAL {
            return false;
        }
        if method.name != "close" || method.desc != "()V" {
            return false;
        }
        unify(&mut self.env.owners, key, method.owner.as_str())
    }

    /// `ALOAD primaryExc`, `ALOAD key`, `Throwable.addSuppressed`.
    pub fn expect_add_suppressed(&mut self, key: Key) -> bool {
        if !self.expect_var(Opcode::ALOAD, PRIMARY_EXC.resolve(Scope::Method))
            || !self.expect_var(Opcode::ALOAD, key)
            || !self.expect(Opcode::INVOKEVIRTUAL)
        {
            return false;
        }
        self.current()
            .and_then(Insn::as_method)
            .is_some_and(|m| m.owner == THROWABLE && m.name == "addSuppressed")
    }

    pub fn expect_invoke(&mut self, opcode: Opcode, name: &str, desc: &str) -> bool {
        if !self.expect(opcode) {
            return false;
        }
        self.current()
            .and_then(Insn::as_method)
            .is_some_and(|m| m.name == name && m.desc == desc)
    }

    /// Advance and accept an `IRETURN`..`ARETURN`.
    pub fn expect_value_return(&mut self) -> bool {
        self.advance();
        self.current()
            .and_then(Insn::opcode)
            .is_some_and(Opcode::is_value_return)
    }

    /// Leave a cleanup block: either `xLOAD; xRETURN`, which unbinds `key`,
    /// or `GOTO key`.
    pub fn exit(&mut self, key: Key) -> bool {
        if self.peek().is_some_and(Opcode::is_var_load) {
            self.advance();
            self.env.labels.remove(&key);
            return self.expect_value_return();
        }
        self.expect_jump(Opcode::GOTO, key)
    }

    /// [`expect_label`](Self::expect_label) if `key` is bound; otherwise
    /// succeed without moving.
    pub fn join_label(&mut self, key: Key) -> bool {
        !self.env.labels.contains_key(&key) || self.expect_label(key)
    }

    pub fn step(&mut self, scope: Scope, step: Step) -> bool {
        match step {
            Step::Op(opcode) => self.expect(opcode),
            Step::Var(opcode, sym) => self.expect_var(opcode, sym.resolve(scope)),
            Step::Jump(opcode, sym) => self.expect_jump(opcode, sym.resolve(scope)),
            Step::Label(sym) => self.expect_label(sym.resolve(scope)),
            Step::Close(sym) => self.expect_close(sym.resolve(scope)),
            Step::AddSuppressed(sym) => self.expect_add_suppressed(sym.resolve(scope)),
            Step::Invoke(opcode, name, desc) => self.expect_invoke(opcode, name, desc),
            Step::Exit(sym) => self.exit(sym.resolve(scope)),
            Step::JoinLabel(sym) => self.join_label(sym.resolve(scope)),
        }
    }

    /// Run steps in order, stopping at the first failure.
    pub fn run(&mut self, scope: Scope, steps: &[Step]) -> bool {
        steps.iter().all(|&step| self.step(scope, step))
    }

    /// Run `(scope, steps)` segments in order.
    pub fn run_segments(&mut self, segments: &[(Scope, &[Step])]) -> bool {
        segments
            .iter()
            .all(|&(scope, steps)| self.run(scope, steps))
    }
}
