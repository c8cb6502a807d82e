//! JVM instruction set definitions, generated from `isa/opcodes.yaml`.
//!
//! This crate provides the opcode constants, operand forms and
//! classification flags that the instruction model and the coverage
//! filters are written against.

use std::fmt;

pub use bitflags;

bitflags::bitflags! {
    /// Control-flow and local-variable classification of an opcode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpcodeFlags: u16 {
        /// Transfers control to a label (includes switches).
        const JUMP = 1 << 0;
        /// Jump that may fall through.
        const CONDITIONAL = 1 << 1;
        /// Any return, including `return` from a void method.
        const RETURN = 1 << 2;
        const THROW = 1 << 3;
        /// Loads a local variable slot (`iload` .. `aload`).
        const LOAD = 1 << 4;
        /// Stores into a local variable slot (`istore` .. `astore`).
        const STORE = 1 << 5;
        const INVOKE = 1 << 6;
        const MONITOR = 1 << 7;
    }
}

/// Operand shape carried by an instruction node of a given opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandForm {
    /// No operands.
    Plain,
    /// A single integer operand (`bipush`, `sipush`, `newarray`).
    Int,
    /// A local variable slot.
    Var,
    /// A local variable slot and an increment.
    Iinc,
    /// A type descriptor or internal name.
    Type,
    /// Field owner, name and descriptor.
    Field,
    /// Method owner, name and descriptor.
    Method,
    InvokeDynamic,
    /// A branch target label.
    Jump,
    /// A constant pool entry.
    Ldc,
    Switch,
    MultiANewArray,
}

/// A JVM opcode.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Opcode(pub u8);

/// Static metadata for one opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    opcode: Opcode,
    mnemonic: &'static str,
    form: OperandForm,
    flags: OpcodeFlags,
}

include!(concat!(env!("OUT_DIR"), "/generated.rs"));

impl OpcodeInfo {
    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Lowercase mnemonic, e.g. `invokevirtual`.
    #[inline]
    pub fn mnemonic(&self) -> &'static str {
        self.mnemonic
    }

    #[inline]
    pub fn form(&self) -> OperandForm {
        self.form
    }

    #[inline]
    pub fn flags(&self) -> OpcodeFlags {
        self.flags
    }
}

impl Opcode {
    /// Raw opcode byte.
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Table entry for this opcode, if it is a defined JVM opcode.
    pub fn info(self) -> Option<&'static OpcodeInfo> {
        OPCODE_TABLE.get(self.0 as usize)
    }

    /// Lowercase mnemonic, or `"<invalid>"` for undefined opcode bytes.
    pub fn mnemonic(self) -> &'static str {
        self.info().map_or("<invalid>", |info| info.mnemonic)
    }

    pub fn form(self) -> Option<OperandForm> {
        self.info().map(|info| info.form)
    }

    pub fn flags(self) -> OpcodeFlags {
        self.info().map_or(OpcodeFlags::empty(), |info| info.flags)
    }

    /// Look up an opcode by mnemonic, ignoring ASCII case.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        OPCODE_TABLE
            .iter()
            .find(|info| info.mnemonic.eq_ignore_ascii_case(mnemonic))
            .map(|info| info.opcode)
    }

    /// `iload`, `lload`, `fload`, `dload` or `aload`.
    pub fn is_var_load(self) -> bool {
        self.flags().contains(OpcodeFlags::LOAD)
    }

    /// A return that hands a value back to the caller (`ireturn` .. `areturn`).
    pub fn is_value_return(self) -> bool {
        self.flags().contains(OpcodeFlags::RETURN) && self != Opcode::RETURN
    }

    pub fn is_jump(self) -> bool {
        self.flags().contains(OpcodeFlags::JUMP)
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opcode({:#04x} {})", self.0, self.mnemonic())
    }
}

impl fmt::Display for Opcode {
    /// Uppercase mnemonic, the way bytecode listings print it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.mnemonic().to_ascii_uppercase())
    }
}

/// Look up opcode metadata by raw opcode byte.
pub fn lookup(raw: u8) -> Option<OpcodeInfo> {
    OPCODE_TABLE.get(raw as usize).copied()
}

/// All defined opcodes, ordered by opcode value.
pub fn opcode_table() -> &'static [OpcodeInfo] {
    &OPCODE_TABLE
}

pub fn opcode_count() -> usize {
    OPCODE_TABLE.len()
}
