//! Monitor release generated for `synchronized` blocks.

use bcov_ir::{InsnId, InsnList, TryCatchBlock};
use bcov_isa::Opcode;

use crate::matcher::{Matcher, Scope, Step};

// catch (any t) { monitorexit(lock); throw t; }
const JAVAC: &[Step] = &[
    Step::Op(Opcode::ASTORE),
    Step::Op(Opcode::ALOAD),
    Step::Op(Opcode::MONITOREXIT),
    Step::Op(Opcode::ALOAD),
    Step::Op(Opcode::ATHROW),
];

// ecj leaves the exception on the stack.
const ECJ: &[Step] = &[
    Step::Op(Opcode::ALOAD),
    Step::Op(Opcode::MONITOREXIT),
    Step::Op(Opcode::ATHROW),
];

/// Last instruction of the monitor release at the handler of `tc`.
///
/// Only catch-all handlers qualify. An entry whose handler is its own
/// start (javac guards the release code with one) is skipped.
pub fn match_synchronized(insns: &InsnList, tc: &TryCatchBlock) -> Option<InsnId> {
    if !tc.is_catch_all() || tc.start == tc.handler {
        return None;
    }
    let handler = insns.label_position(tc.handler)?;
    for (compiler, shape) in [("javac", JAVAC), ("ecj", ECJ)] {
        let mut m = Matcher::at(insns, handler);
        if m.run(Scope::Method, shape) {
            log::trace!("{compiler} monitor release at handler {}", handler.0);
            return m.position();
        }
    }
    None
}
