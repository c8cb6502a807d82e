//! Textual method listings.
//!
//! A listing holds one or more methods in a format close to what bytecode
//! disassemblers print:
//!
//! ```text
//! method close (Ljava/io/Closeable;)V
//!     ALOAD 0
//!     IFNULL L0
//!     ALOAD 0
//!     INVOKEINTERFACE java/io/Closeable.close ()V
//!   L0:
//!     RETURN
//! end
//! ```
//!
//! Labels are declared by placing `name:` on a line of its own and are
//! scoped to their method. A `//` at the start of a token begins a
//! comment. A leading `<n>:` index, as printed by [`disasm`], is accepted
//! and ignored.

use std::collections::HashMap;
use std::fmt::{self, Write as _};

use bcov_isa::{Opcode, OperandForm};

use crate::builder::MethodBuilder;
use crate::error::{ParseError, Result};
use crate::instruction::{Insn, LabelId};
use crate::method::MethodBody;

/// Parse every method of a listing.
pub fn parse_methods(source: &str) -> Result<Vec<MethodBody>> {
    let mut methods = Vec::new();
    let mut current: Option<MethodParser> = None;

    for (i, raw) in source.lines().enumerate() {
        let line = i + 1;
        let text = strip_comment(raw).trim();
        let mut tokens: Vec<&str> = text.split_whitespace().collect();
        if let Some(first) = tokens.first() {
            if is_index_prefix(first) {
                tokens.remove(0);
            }
        }
        let Some(&head) = tokens.first() else {
            continue;
        };

        match head {
            "method" => {
                if let Some(open) = &current {
                    return Err(ParseError::UnterminatedMethod {
                        line: open.line,
                        name: open.name.clone(),
                    });
                }
                let [_, name, desc] = tokens[..] else {
                    return Err(syntax(line, "expected `method <name> <descriptor>`"));
                };
                current = Some(MethodParser::new(line, name, desc));
            }
            "end" => {
                let Some(open) = current.take() else {
                    return Err(outside(line, head));
                };
                methods.push(open.finish()?);
            }
            _ => {
                let Some(open) = current.as_mut() else {
                    return Err(outside(line, head));
                };
                open.line_item(line, text, &tokens)?;
            }
        }
    }

    if let Some(open) = current {
        return Err(ParseError::UnterminatedMethod {
            line: open.line,
            name: open.name,
        });
    }
    Ok(methods)
}

/// Cut `raw` at a `//` that starts a token outside a string literal.
fn strip_comment(raw: &str) -> &str {
    let mut quoted = false;
    let mut prev: Option<char> = None;
    for (i, c) in raw.char_indices() {
        match c {
            '"' if prev != Some('\\') => quoted = !quoted,
            '/' if !quoted
                && raw[i..].starts_with("//")
                && prev.is_none_or(char::is_whitespace) =>
            {
                return &raw[..i];
            }
            _ => {}
        }
        prev = Some(c);
    }
    raw
}

fn is_index_prefix(token: &str) -> bool {
    token
        .strip_suffix(':')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn syntax(line: usize, message: &str) -> ParseError {
    ParseError::Syntax {
        line,
        message: message.to_string(),
    }
}

fn outside(line: usize, directive: &str) -> ParseError {
    ParseError::OutsideMethod {
        line,
        directive: directive.to_string(),
    }
}

struct MethodParser {
    line: usize,
    name: String,
    builder: MethodBuilder,
    labels: HashMap<String, LabelId>,
}

impl MethodParser {
    fn new(line: usize, name: &str, desc: &str) -> Self {
        Self {
            line,
            name: name.to_string(),
            builder: MethodBuilder::new(name, desc),
            labels: HashMap::new(),
        }
    }

    fn label(&mut self, name: &str) -> LabelId {
        if let Some(&label) = self.labels.get(name) {
            return label;
        }
        let label = self.builder.new_label();
        self.labels.insert(name.to_string(), label);
        label
    }

    fn finish(self) -> Result<MethodBody> {
        let name = self.name;
        self.builder
            .build()
            .map_err(|source| ParseError::Build { name, source })
    }

    fn line_item(&mut self, line: usize, text: &str, tokens: &[&str]) -> Result<()> {
        let head = tokens[0];

        if let Some(name) = head.strip_suffix(':') {
            if tokens.len() != 1 || name.is_empty() {
                return Err(syntax(line, "a label must stand on its own line"));
            }
            let label = self.label(name);
            self.builder.label(label);
            return Ok(());
        }

        match head {
            "FRAME" => {
                self.builder.frame();
                return Ok(());
            }
            "LINENUMBER" => {
                let [_, number, start] = tokens[..] else {
                    return Err(syntax(line, "expected `LINENUMBER <line> <label>`"));
                };
                let number = number
                    .parse()
                    .map_err(|_| syntax(line, "line number must be an unsigned integer"))?;
                let start = self.label(start);
                self.builder.line_number(number, start);
                return Ok(());
            }
            "TRYCATCHBLOCK" => {
                let [_, start, end, handler, ty] = tokens[..] else {
                    return Err(syntax(
                        line,
                        "expected `TRYCATCHBLOCK <start> <end> <handler> <type|null>`",
                    ));
                };
                let (start, end, handler) =
                    (self.label(start), self.label(end), self.label(handler));
                let ty = (ty != "null").then_some(ty);
                self.builder.try_catch_block(start, end, handler, ty);
                return Ok(());
            }
            _ => {}
        }

        let opcode = Opcode::from_mnemonic(head).ok_or_else(|| ParseError::UnknownMnemonic {
            line,
            mnemonic: head.to_string(),
        })?;
        let bad = |expected| ParseError::BadOperand {
            line,
            opcode,
            expected,
        };

        match opcode.form() {
            Some(OperandForm::Plain) => {
                if tokens.len() != 1 {
                    return Err(bad("no operands"));
                }
                self.builder.insn(opcode);
            }
            Some(OperandForm::Int) => {
                let [_, value] = tokens[..] else {
                    return Err(bad("one integer operand"));
                };
                let value = value.parse().map_err(|_| bad("one integer operand"))?;
                self.builder.int_insn(opcode, value);
            }
            Some(OperandForm::Var) => {
                let [_, var] = tokens[..] else {
                    return Err(bad("a local variable slot"));
                };
                let var = var.parse().map_err(|_| bad("a local variable slot"))?;
                self.builder.var_insn(opcode, var);
            }
            Some(OperandForm::Iinc) => {
                let [_, var, incr] = tokens[..] else {
                    return Err(bad("a slot and an increment"));
                };
                let var = var.parse().map_err(|_| bad("a slot and an increment"))?;
                let incr = incr.parse().map_err(|_| bad("a slot and an increment"))?;
                self.builder.iinc_insn(var, incr);
            }
            Some(OperandForm::Type) => {
                let [_, desc] = tokens[..] else {
                    return Err(bad("a type"));
                };
                self.builder.type_insn(opcode, desc);
            }
            Some(OperandForm::Field) => {
                let [_, target, ":", desc] = tokens[..] else {
                    return Err(bad("`owner.name : descriptor`"));
                };
                let (owner, name) =
                    split_member(target).ok_or_else(|| bad("`owner.name : descriptor`"))?;
                self.builder.field_insn(opcode, owner, name, desc);
            }
            Some(OperandForm::Method) => {
                let [_, target, desc] = tokens[..] else {
                    return Err(bad("`owner.name descriptor`"));
                };
                let (owner, name) =
                    split_member(target).ok_or_else(|| bad("`owner.name descriptor`"))?;
                self.builder.method_insn(opcode, owner, name, desc);
            }
            Some(OperandForm::Jump) => {
                let [_, target] = tokens[..] else {
                    return Err(bad("a label"));
                };
                let label = self.label(target);
                self.builder.jump_insn(opcode, label);
            }
            Some(OperandForm::Ldc) => {
                let value = text.split_once(head).map_or("", |(_, rest)| rest.trim());
                if value.is_empty() {
                    return Err(bad("a constant"));
                }
                self.builder.ldc_insn(opcode, value);
            }
            _ => return Err(ParseError::UnsupportedForm { line, opcode }),
        }
        Ok(())
    }
}

/// Split `owner.name` at the last dot.
fn split_member(target: &str) -> Option<(&str, &str)> {
    let (owner, name) = target.rsplit_once('.')?;
    (!name.is_empty()).then_some((owner, name))
}

/// Assigns `L<n>` names to labels in order of first appearance, so printed
/// names do not depend on allocation order. Labels it has not seen print
/// with their raw handle.
#[derive(Debug, Default)]
pub struct LabelNames {
    names: HashMap<LabelId, usize>,
}

impl LabelNames {
    pub fn for_method(method: &MethodBody) -> Self {
        let mut names = Self::default();
        for (_, insn) in method.insns.iter() {
            match insn {
                Insn::Label(label) | Insn::Jump { label, .. } | Insn::Line { start: label, .. } => {
                    names.intern(*label);
                }
                _ => {}
            }
        }
        for tc in &method.try_catch_blocks {
            for label in [tc.start, tc.end, tc.handler] {
                names.intern(label);
            }
        }
        names
    }

    fn intern(&mut self, label: LabelId) {
        let next = self.names.len();
        self.names.entry(label).or_insert(next);
    }

    pub fn name(&self, label: LabelId) -> String {
        match self.names.get(&label) {
            Some(n) => format!("L{n}"),
            None => format!("L{}", label.0),
        }
    }
}

/// Write one node in listing syntax, without indentation.
pub fn write_insn(out: &mut impl fmt::Write, insn: &Insn, names: &LabelNames) -> fmt::Result {
    match insn {
        Insn::Op(opcode) => write!(out, "{opcode}"),
        Insn::Int { opcode, operand } => write!(out, "{opcode} {operand}"),
        Insn::Var { opcode, var } => write!(out, "{opcode} {var}"),
        Insn::Iinc { var, incr } => write!(out, "{} {var} {incr}", Opcode::IINC),
        Insn::Type { opcode, desc } => write!(out, "{opcode} {desc}"),
        Insn::Field { opcode, field } => {
            write!(out, "{opcode} {}.{} : {}", field.owner, field.name, field.desc)
        }
        Insn::Method { opcode, method } => {
            write!(out, "{opcode} {}.{} {}", method.owner, method.name, method.desc)
        }
        Insn::Jump { opcode, label } => write!(out, "{opcode} {}", names.name(*label)),
        Insn::Ldc { opcode, value } => write!(out, "{opcode} {value}"),
        Insn::Label(label) => write!(out, "{}:", names.name(*label)),
        Insn::Line { line, start } => write!(out, "LINENUMBER {line} {}", names.name(*start)),
        Insn::Frame => write!(out, "FRAME"),
    }
}

fn write_method(out: &mut impl fmt::Write, method: &MethodBody, indices: bool) -> fmt::Result {
    let names = LabelNames::for_method(method);
    writeln!(out, "method {} {}", method.name, method.desc)?;
    for (id, insn) in method.insns.iter() {
        if indices {
            write!(out, "{:>4}: ", id.0)?;
        }
        // Labels sit two columns left of instructions.
        out.write_str(if insn.as_label().is_some() { "  " } else { "    " })?;
        write_insn(out, insn, &names)?;
        out.write_char('\n')?;
    }
    for tc in &method.try_catch_blocks {
        if indices {
            out.write_str("      ")?;
        }
        writeln!(
            out,
            "    TRYCATCHBLOCK {} {} {} {}",
            names.name(tc.start),
            names.name(tc.end),
            names.name(tc.handler),
            tc.ty.as_deref().unwrap_or("null")
        )?;
    }
    writeln!(out, "end")
}

/// Listing of `method` that [`parse_methods`] reads back.
pub fn to_listing(method: &MethodBody) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_method(&mut out, method, false);
    out
}

/// Listing of `method` with a node index in front of every line.
pub fn disasm(method: &MethodBody) -> String {
    let mut out = String::new();
    let _ = write_method(&mut out, method, true);
    out
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_insn(f, self, &LabelNames::default())
    }
}

impl fmt::Display for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_method(f, self, false)
    }
}
