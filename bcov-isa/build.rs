// Build script for bcov-isa.
//
// Reads `isa/opcodes.yaml` and writes `generated.rs` into OUT_DIR: one
// associated constant per opcode on `Opcode`, plus the static opcode table
// indexed by opcode value.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Deserialize)]
struct Isa {
    opcodes: Vec<OpcodeDef>,
}

#[derive(Deserialize)]
struct OpcodeDef {
    code: u8,
    mnemonic: String,
    form: String,
    #[serde(default)]
    flags: Vec<String>,
}

// Bit positions must stay in sync with `OpcodeFlags` in src/lib.rs.
fn flag_bit(name: &str) -> u16 {
    match name {
        "jump" => 1 << 0,
        "conditional" => 1 << 1,
        "return" => 1 << 2,
        "throw" => 1 << 3,
        "load" => 1 << 4,
        "store" => 1 << 5,
        "invoke" => 1 << 6,
        "monitor" => 1 << 7,
        other => panic!("unknown opcode flag `{other}` in opcodes.yaml"),
    }
}

fn form_variant(name: &str) -> &'static str {
    match name {
        "plain" => "Plain",
        "int" => "Int",
        "var" => "Var",
        "iinc" => "Iinc",
        "type" => "Type",
        "field" => "Field",
        "method" => "Method",
        "indy" => "InvokeDynamic",
        "jump" => "Jump",
        "ldc" => "Ldc",
        "switch" => "Switch",
        "multianewarray" => "MultiANewArray",
        other => panic!("unknown operand form `{other}` in opcodes.yaml"),
    }
}

fn main() {
    let manifest = env::var("CARGO_MANIFEST_DIR").unwrap();
    let out_dir = env::var("OUT_DIR").unwrap();

    let isa_yaml = format!("{manifest}/isa/opcodes.yaml");
    println!("cargo:rerun-if-changed={isa_yaml}");

    let source = fs::read_to_string(&isa_yaml)
        .unwrap_or_else(|e| panic!("failed to read {isa_yaml}: {e}"));
    let isa: Isa = serde_yaml::from_str(&source)
        .unwrap_or_else(|e| panic!("failed to parse {isa_yaml}: {e}"));

    // The table is indexed by opcode value, so codes must be dense.
    for (i, op) in isa.opcodes.iter().enumerate() {
        assert_eq!(
            op.code as usize, i,
            "opcodes.yaml: `{}` has code {:#04x}, expected {:#04x}",
            op.mnemonic, op.code, i
        );
    }

    let mut out = String::new();
    out.push_str("// @generated by build.rs from isa/opcodes.yaml\n\n");

    out.push_str("impl Opcode {\n");
    for op in &isa.opcodes {
        writeln!(out, "    /// `{}` ({:#04x})", op.mnemonic, op.code).unwrap();
        writeln!(
            out,
            "    pub const {}: Opcode = Opcode({:#04x});",
            op.mnemonic.to_ascii_uppercase(),
            op.code
        )
        .unwrap();
    }
    out.push_str("}\n\n");

    writeln!(
        out,
        "static OPCODE_TABLE: [OpcodeInfo; {}] = [",
        isa.opcodes.len()
    )
    .unwrap();
    for op in &isa.opcodes {
        let bits = op.flags.iter().fold(0u16, |acc, f| acc | flag_bit(f));
        writeln!(
            out,
            "    OpcodeInfo {{ opcode: Opcode({:#04x}), mnemonic: \"{}\", form: OperandForm::{}, flags: OpcodeFlags::from_bits_retain({:#06x}) }},",
            op.code,
            op.mnemonic,
            form_variant(&op.form),
            bits
        )
        .unwrap();
    }
    out.push_str("];\n");

    let out_path = PathBuf::from(&out_dir).join("generated.rs");
    fs::write(&out_path, out).expect("failed to write generated.rs");
}
