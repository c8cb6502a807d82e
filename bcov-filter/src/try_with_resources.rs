//! Resource cleanup generated for `try`-with-resources.
//!
//! javac and ecj expand the statement into cleanup code with no source
//! line of its own. Five shapes are recognised, tried in this order:
//!
//! - ecj, any number of chained resources
//! - javac 9+ when the resource is known to be non-null and the cleanup
//!   goes through the synthetic `$closeResource` helper
//! - javac 7/8, with null checks on the resource and the primary exception
//! - javac 9+ without the resource null check
//! - javac 9+ calling `$closeResource` under a null check

use bcov_ir::{InsnId, InsnList};
use bcov_isa::Opcode;

use crate::matcher::{Matcher, PRIMARY_EXC, Scope, Step, Sym};

use Step::{AddSuppressed, Close, Exit, Invoke, JoinLabel, Jump, Label, Op, Var};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Ecj,
    JavacOptimal,
    JavacFull,
    JavacOmittedNullCheck,
    JavacMethod,
}

const SHAPES: [Shape; 5] = [
    Shape::Ecj,
    Shape::JavacOptimal,
    Shape::JavacFull,
    Shape::JavacOmittedNullCheck,
    Shape::JavacMethod,
];

const CLOSE_RESOURCE_DESC: &str = "(Ljava/lang/Throwable;Ljava/lang/AutoCloseable;)V";

/// Second argument of `$closeResource`.
const SUPPRESSED_EXC: Sym = Sym::global(Scope::Method, "suppressedExc");
/// The resource closed by the javac shapes.
const RESOURCE: Sym = Sym::global(Scope::Method, "r");
const NORMAL_EXIT: Sym = Sym::global(Scope::Normal, "finallyExit");
const EXCEPTIONAL_EXIT: Sym = Sym::global(Scope::Exceptional, "finallyExit");
const CAUGHT: Sym = Sym::global(Scope::Method, "t1");
const CAUGHT_ANY: Sym = Sym::global(Scope::Method, "t2");

const FINALLY_EXIT: Sym = Sym::Local("finallyExit");
const CLOSE_LABEL: Sym = Sym::Local("closeLabel");
const SUPPRESSED: Sym = Sym::Local("t");

// `$closeResource(primaryExc, r)`
const CLOSE_RESOURCE: &[Step] = &[
    Var(Opcode::ALOAD, PRIMARY_EXC),
    Var(Opcode::ALOAD, SUPPRESSED_EXC),
    Invoke(Opcode::INVOKESTATIC, "$closeResource", CLOSE_RESOURCE_DESC),
];

// catch (Throwable t) { primaryExc = t; throw t; }
const SAVE_PRIMARY_EXC: &[Step] = &[
    Op(Opcode::ASTORE),
    Var(Opcode::ALOAD, CAUGHT),
    Var(Opcode::ASTORE, PRIMARY_EXC),
    Var(Opcode::ALOAD, CAUGHT),
    Op(Opcode::ATHROW),
];

const JAVAC_OPTIMAL: &[(Scope, &[Step])] = &[
    (Scope::Method, CLOSE_RESOURCE),
    (Scope::Method, &[Exit(NORMAL_EXIT)]),
    (Scope::Method, SAVE_PRIMARY_EXC),
    (Scope::Method, &[Op(Opcode::ASTORE)]),
    (Scope::Method, CLOSE_RESOURCE),
    (
        Scope::Method,
        &[Op(Opcode::ALOAD), Op(Opcode::ATHROW), JoinLabel(NORMAL_EXIT)],
    ),
];

const FULL_FINALLY: &[Step] = &[
    Op(Opcode::ALOAD),
    // if (r != null)
    Jump(Opcode::IFNULL, FINALLY_EXIT),
    // if (primaryExc != null)
    Var(Opcode::ALOAD, PRIMARY_EXC),
    Jump(Opcode::IFNULL, CLOSE_LABEL),
    Close(RESOURCE),
    Jump(Opcode::GOTO, FINALLY_EXIT),
    // catch (Throwable t) { primaryExc.addSuppressed(t); }
    Var(Opcode::ASTORE, SUPPRESSED),
    AddSuppressed(SUPPRESSED),
    Jump(Opcode::GOTO, FINALLY_EXIT),
    Label(CLOSE_LABEL),
    Close(RESOURCE),
];

/// [`FULL_FINALLY`] without the resource null check.
const OMITTED_NULL_CHECK_FINALLY: &[Step] = FULL_FINALLY.split_at(2).1;

const METHOD_FINALLY: &[Step] = &[
    Op(Opcode::ALOAD),
    Jump(Opcode::IFNULL, FINALLY_EXIT),
    Var(Opcode::ALOAD, PRIMARY_EXC),
    Var(Opcode::ALOAD, SUPPRESSED_EXC),
    Invoke(Opcode::INVOKESTATIC, "$closeResource", CLOSE_RESOURCE_DESC),
];

/// Cleanup duplicated on the normal and the exceptional path, joined by
/// the rethrow of the pending exception.
fn javac_segments(finally: &'static [Step]) -> [(Scope, &'static [Step]); 6] {
    [
        (Scope::Normal, finally),
        (Scope::Method, &[Exit(NORMAL_EXIT)]),
        (Scope::Method, SAVE_PRIMARY_EXC),
        (Scope::Method, &[Var(Opcode::ASTORE, CAUGHT_ANY)]),
        (Scope::Exceptional, finally),
        (
            Scope::Method,
            &[
                Label(EXCEPTIONAL_EXIT),
                Var(Opcode::ALOAD, CAUGHT_ANY),
                Op(Opcode::ATHROW),
                JoinLabel(NORMAL_EXIT),
            ],
        ),
    ]
}

const ECJ_RESOURCE: Sym = Sym::Local("r");
const ECJ_END: Sym = Sym::Local("end");
const ECJ_THROW: Sym = Sym::Local("throw");
const SUPPRESS_START: Sym = Sym::Local("suppressStart");
const SUPPRESS_END: Sym = Sym::Local("suppressEnd");

// if (r != null) r.close();
const ECJ_CLOSE: &[Step] = &[
    Var(Opcode::ALOAD, ECJ_RESOURCE),
    Jump(Opcode::IFNULL, ECJ_END),
    Close(ECJ_RESOURCE),
];

// if (r != null) r.close(); throw primaryExc;
const ECJ_CLOSE_AND_THROW: &[Step] = &[
    Var(Opcode::ALOAD, ECJ_RESOURCE),
    Jump(Opcode::IFNULL, ECJ_THROW),
    Close(ECJ_RESOURCE),
    Label(ECJ_THROW),
    Op(Opcode::ALOAD),
    Op(Opcode::ATHROW),
];

// catch (Throwable t) {
//   if (primaryExc == null) primaryExc = t;
//   else if (primaryExc != t) primaryExc.addSuppressed(t);
// }
const ECJ_SUPPRESS: &[Step] = &[
    Var(Opcode::ASTORE, SUPPRESSED),
    Var(Opcode::ALOAD, PRIMARY_EXC),
    Jump(Opcode::IFNONNULL, SUPPRESS_START),
    Op(Opcode::ALOAD),
    Var(Opcode::ASTORE, PRIMARY_EXC),
    Jump(Opcode::GOTO, SUPPRESS_END),
    Label(SUPPRESS_START),
    Var(Opcode::ALOAD, PRIMARY_EXC),
    Op(Opcode::ALOAD),
    Jump(Opcode::IF_ACMPEQ, SUPPRESS_END),
    AddSuppressed(SUPPRESSED),
    Label(SUPPRESS_END),
];

const ECJ_THROW_PRIMARY: &[Step] = &[Var(Opcode::ALOAD, PRIMARY_EXC), Op(Opcode::ATHROW)];

/// Last instruction of the try-with-resources cleanup starting at `start`,
/// or `None` if no cleanup starts there.
pub fn match_try_with_resources(insns: &InsnList, start: InsnId) -> Option<InsnId> {
    for shape in SHAPES {
        let mut m = Matcher::before(insns, start)?;
        let matched = match shape {
            Shape::Ecj => ecj(&mut m),
            Shape::JavacOptimal => m.run_segments(JAVAC_OPTIMAL),
            Shape::JavacFull => m.run_segments(&javac_segments(FULL_FINALLY)),
            Shape::JavacOmittedNullCheck => {
                m.run_segments(&javac_segments(OMITTED_NULL_CHECK_FINALLY))
            }
            Shape::JavacMethod => m.run_segments(&javac_segments(METHOD_FINALLY)),
        };
        if !matched {
            continue;
        }
        if let Some(end) = m.position() {
            log::trace!("{shape:?} cleanup at {}..={}", start.0, end.0);
            return Some(end);
        }
    }
    None
}

fn ecj(m: &mut Matcher<'_>) -> bool {
    if !m.run(Scope::Resource(0), ECJ_CLOSE) {
        return false;
    }
    if m.peek() != Some(Opcode::GOTO) {
        return ecj_no_flow_out(m);
    }
    // goto end; catch (Throwable t) { primaryExc = t; ... }
    let inner = [
        Jump(Opcode::GOTO, ECJ_END),
        Var(Opcode::ASTORE, PRIMARY_EXC),
    ];
    if !m.run(Scope::Resource(0), &inner) || !m.run(Scope::Resource(0), ECJ_CLOSE_AND_THROW) {
        return false;
    }

    // Each enclosing resource adds one layer; the chain ends with the
    // outermost handler, which throws the primary exception.
    let limit = m.remaining() as u32;
    for layer in 1..=limit {
        let snapshot = m.snapshot();
        if m.run(Scope::Outermost, ECJ_SUPPRESS) {
            return m.run(Scope::Method, ECJ_THROW_PRIMARY);
        }
        m.restore(snapshot);
        if !ecj_layer(m, layer) {
            return false;
        }
    }
    false
}

fn ecj_layer(m: &mut Matcher<'_>, layer: u32) -> bool {
    let scope = Scope::Resource(layer);
    m.run(Scope::Resource(layer - 1), &[Label(ECJ_END)])
        && m.run(scope, ECJ_CLOSE)
        && m.run(scope, &[Jump(Opcode::GOTO, ECJ_END)])
        && m.run(scope, ECJ_SUPPRESS)
        && m.run(scope, ECJ_CLOSE_AND_THROW)
}

/// Body ends with a value return: every resource is closed before the
/// return and no join label follows the handlers.
fn ecj_no_flow_out(m: &mut Matcher<'_>) -> bool {
    let mut resources = 1;
    loop {
        let snapshot = m.snapshot();
        if m.expect_value_return() {
            break;
        }
        m.restore(snapshot);
        if !m.run(Scope::Resource(resources), ECJ_CLOSE) {
            return false;
        }
        resources += 1;
    }
    if !m.run(Scope::Method, &[Var(Opcode::ASTORE, PRIMARY_EXC)]) {
        return false;
    }
    (0..resources).all(|r| {
        m.run(Scope::Resource(r), ECJ_CLOSE_AND_THROW) && m.run(Scope::Resource(r), ECJ_SUPPRESS)
    }) && m.run(Scope::Method, ECJ_THROW_PRIMARY)
}
