//! Method bodies shaped like javac and ecj output.
//!
//! Node indices in the comments count labels, since matchers report
//! positions in the full node sequence.

#![allow(dead_code)]

use bcov_ir::{InsnId, LabelId, MethodBody, MethodBuilder, Opcode};

pub const CLOSE_RESOURCE_DESC: &str = "(Ljava/lang/Throwable;Ljava/lang/AutoCloseable;)V";

fn method() -> MethodBuilder {
    MethodBuilder::new("name", "()V")
}

fn owner(r: u16) -> String {
    format!("Resource{r}")
}

/// `primaryExc = null` then the resource acquisition.
fn javac_prologue(m: &mut MethodBuilder) {
    m.insn(Opcode::ACONST_NULL)
        .var_insn(Opcode::ASTORE, 1)
        .insn(Opcode::NOP);
}

fn close(m: &mut MethodBuilder, slot: u16) {
    close_with(m, slot, "Resource");
}

fn close_with(m: &mut MethodBuilder, slot: u16, owner: &str) {
    m.var_insn(Opcode::ALOAD, slot)
        .method_insn(Opcode::INVOKEVIRTUAL, owner, "close", "()V");
}

fn add_suppressed(m: &mut MethodBuilder, primary: u16, suppressed: u16) {
    m.var_insn(Opcode::ALOAD, primary)
        .var_insn(Opcode::ALOAD, suppressed)
        .method_insn(
            Opcode::INVOKEVIRTUAL,
            "java/lang/Throwable",
            "addSuppressed",
            "(Ljava/lang/Throwable;)V",
        );
}

fn close_resource(m: &mut MethodBuilder, primary: u16, resource: u16) {
    m.var_insn(Opcode::ALOAD, primary)
        .var_insn(Opcode::ALOAD, resource)
        .method_insn(
            Opcode::INVOKESTATIC,
            "CurrentClass",
            "$closeResource",
            CLOSE_RESOURCE_DESC,
        );
}

/// catch (Throwable t) { primaryExc = t; throw t; }
fn save_primary_exc(m: &mut MethodBuilder, t: u16, primary: u16) {
    save_primary_exc_rethrowing(m, t, primary, t);
}

/// [`save_primary_exc`] that rethrows whatever `rethrow` holds.
fn save_primary_exc_rethrowing(m: &mut MethodBuilder, t: u16, primary: u16, rethrow: u16) {
    m.var_insn(Opcode::ASTORE, t)
        .var_insn(Opcode::ALOAD, t)
        .var_insn(Opcode::ASTORE, primary)
        .var_insn(Opcode::ALOAD, rethrow)
        .insn(Opcode::ATHROW);
}

/// Deviations from the javac 7/8 cleanup in [`javac`].
#[derive(Debug, Clone, Copy)]
pub struct JavacFull {
    /// Slot the catch-all handler reloads before its final `ATHROW`.
    pub rethrow: u16,
    /// Slot the `primaryExc = t; throw t` bridge rethrows.
    pub bridge_rethrow: u16,
    /// Owner of `close()` on the exceptional path.
    pub exceptional_owner: &'static str,
    /// Put a `FRAME` right before the exceptional path's exit label.
    pub frame_before_exit: bool,
}

impl Default for JavacFull {
    fn default() -> Self {
        Self {
            rethrow: 4,
            bridge_rethrow: 3,
            exceptional_owner: "Resource",
            frame_before_exit: false,
        }
    }
}

/// javac 7/8; cleanup spans 3..=43.
pub fn javac() -> MethodBody {
    javac_full(JavacFull::default())
}

pub fn javac_full(v: JavacFull) -> MethodBody {
    let mut m = method();
    javac_prologue(&mut m);
    let end = m.new_label();

    // "finally" on the normal path
    let l12 = m.new_label();
    m.var_insn(Opcode::ALOAD, 1)
        .jump_insn(Opcode::IFNULL, end)
        .var_insn(Opcode::ALOAD, 2)
        .jump_insn(Opcode::IFNULL, l12);
    close(&mut m, 1);
    m.jump_insn(Opcode::GOTO, end).var_insn(Opcode::ASTORE, 3);
    add_suppressed(&mut m, 2, 3);
    m.jump_insn(Opcode::GOTO, end).label(l12);
    close(&mut m, 1);
    m.jump_insn(Opcode::GOTO, end);

    save_primary_exc_rethrowing(&mut m, 3, 2, v.bridge_rethrow);
    // catch (any)
    m.var_insn(Opcode::ASTORE, 4);

    // "finally" on the exceptional path
    let l13 = m.new_label();
    let l14 = m.new_label();
    m.var_insn(Opcode::ALOAD, 1)
        .jump_insn(Opcode::IFNULL, l13)
        .var_insn(Opcode::ALOAD, 2)
        .jump_insn(Opcode::IFNULL, l14);
    close_with(&mut m, 1, v.exceptional_owner);
    m.jump_insn(Opcode::GOTO, l13).var_insn(Opcode::ASTORE, 5);
    add_suppressed(&mut m, 2, 5);
    m.jump_insn(Opcode::GOTO, l13).label(l14);
    close_with(&mut m, 1, v.exceptional_owner);
    if v.frame_before_exit {
        m.frame();
    }
    m.label(l13);

    m.var_insn(Opcode::ALOAD, v.rethrow)
        .insn(Opcode::ATHROW)
        .label(end);
    m.build().unwrap()
}

/// javac 9+ without the resource null check; cleanup spans 3..=39.
pub fn javac9_omitted_null_check() -> MethodBody {
    let mut m = method();
    javac_prologue(&mut m);
    let end = m.new_label();

    let close_label = m.new_label();
    m.var_insn(Opcode::ALOAD, 2)
        .jump_insn(Opcode::IFNULL, close_label);
    close(&mut m, 1);
    m.jump_insn(Opcode::GOTO, end).var_insn(Opcode::ASTORE, 3);
    add_suppressed(&mut m, 2, 3);
    m.jump_insn(Opcode::GOTO, end).label(close_label);
    close(&mut m, 1);
    m.jump_insn(Opcode::GOTO, end);

    save_primary_exc(&mut m, 3, 2);
    m.var_insn(Opcode::ASTORE, 4);

    let close_label = m.new_label();
    let finally_end = m.new_label();
    m.var_insn(Opcode::ALOAD, 2)
        .jump_insn(Opcode::IFNULL, close_label);
    close(&mut m, 1);
    m.jump_insn(Opcode::GOTO, finally_end)
        .var_insn(Opcode::ASTORE, 5);
    add_suppressed(&mut m, 2, 5);
    m.jump_insn(Opcode::GOTO, finally_end).label(close_label);
    close(&mut m, 1);
    m.label(finally_end);

    m.var_insn(Opcode::ALOAD, 4).insn(Opcode::ATHROW).label(end);
    m.build().unwrap()
}

/// javac 9+ with `$closeResource` under a null check; cleanup spans 3..=23.
pub fn javac9_method() -> MethodBody {
    let mut m = method();
    javac_prologue(&mut m);
    let end = m.new_label();

    m.var_insn(Opcode::ALOAD, 0).jump_insn(Opcode::IFNULL, end);
    close_resource(&mut m, 1, 0);
    m.jump_insn(Opcode::GOTO, end);

    save_primary_exc(&mut m, 2, 1);
    m.var_insn(Opcode::ASTORE, 3);

    let finally_end = m.new_label();
    m.var_insn(Opcode::ALOAD, 0)
        .jump_insn(Opcode::IFNULL, finally_end);
    close_resource(&mut m, 1, 0);
    m.label(finally_end);

    m.var_insn(Opcode::ALOAD, 3).insn(Opcode::ATHROW).label(end);
    m.build().unwrap()
}

/// javac 9+ with a non-null resource; cleanup spans 3..=18.
pub fn javac9_omitted_null_check_and_method() -> MethodBody {
    javac9_optimal_with(2)
}

/// [`javac9_omitted_null_check_and_method`] where the exceptional path
/// passes `primary` as the pending exception.
pub fn javac9_optimal_with(primary: u16) -> MethodBody {
    let mut m = method();
    javac_prologue(&mut m);

    close_resource(&mut m, 2, 1);
    let end = m.new_label();
    m.jump_insn(Opcode::GOTO, end);

    save_primary_exc(&mut m, 3, 2);
    m.var_insn(Opcode::ASTORE, 4);

    close_resource(&mut m, primary, 1);
    m.var_insn(Opcode::ALOAD, 4).insn(Opcode::ATHROW).label(end);
    m.build().unwrap()
}

/// [`javac9_omitted_null_check_and_method`] interleaved with line markers
/// and frames; cleanup spans 3..=22.
pub fn javac9_optimal_with_pseudo_nodes() -> MethodBody {
    let mut m = method();
    javac_prologue(&mut m);

    close_resource(&mut m, 2, 1);
    let end = m.new_label();
    let handler = m.new_label();
    m.frame()
        .jump_insn(Opcode::GOTO, end)
        .label(handler)
        .line_number(12, handler)
        .frame();

    save_primary_exc(&mut m, 3, 2);
    m.var_insn(Opcode::ASTORE, 4);

    close_resource(&mut m, 2, 1);
    m.var_insn(Opcode::ALOAD, 4)
        .insn(Opcode::ATHROW)
        .label(end)
        .frame()
        .insn(Opcode::RETURN);
    m.build().unwrap()
}

/// javac 9+ optimal cleanup where the body returns a value: no join
/// label is expected, and the cleanup spans 3..=18 ending on `ATHROW`.
pub fn javac9_optimal_value_return() -> MethodBody {
    let mut m = method();
    javac_prologue(&mut m);

    close_resource(&mut m, 2, 1);
    m.var_insn(Opcode::ILOAD, 5).insn(Opcode::IRETURN);

    save_primary_exc(&mut m, 3, 2);
    m.var_insn(Opcode::ASTORE, 4);

    close_resource(&mut m, 2, 1);
    let unused = m.new_label();
    m.var_insn(Opcode::ALOAD, 4)
        .insn(Opcode::ATHROW)
        .label(unused)
        .insn(Opcode::RETURN);
    m.build().unwrap()
}

/// `primaryExc = null; suppressedExc = null`
fn ecj_prologue(m: &mut MethodBuilder) {
    m.insn(Opcode::ACONST_NULL)
        .var_insn(Opcode::ASTORE, 1)
        .insn(Opcode::ACONST_NULL)
        .var_insn(Opcode::ASTORE, 2);
}

/// if (r != null) r.close(); then jump to the join label.
pub fn gen_close(m: &mut MethodBuilder, label: Option<LabelId>, r: u16) -> LabelId {
    if let Some(label) = label {
        m.label(label);
    }
    let next = m.new_label();
    m.var_insn(Opcode::ALOAD, r + 2)
        .jump_insn(Opcode::IFNULL, next)
        .var_insn(Opcode::ALOAD, r + 2)
        .method_insn(Opcode::INVOKEINTERFACE, owner(r), "close", "()V")
        .jump_insn(Opcode::GOTO, next);
    next
}

/// if (r != null) r.close(); throw primaryExc;
pub fn gen_close_and_throw(m: &mut MethodBuilder, r: u16) {
    gen_close_and_throw_with(m, r, &owner(r));
}

pub fn gen_close_and_throw_with(m: &mut MethodBuilder, r: u16, owner: &str) {
    let throw = m.new_label();
    m.var_insn(Opcode::ALOAD, r + 2)
        .jump_insn(Opcode::IFNULL, throw)
        .var_insn(Opcode::ALOAD, r + 2)
        .method_insn(Opcode::INVOKEINTERFACE, owner, "close", "()V")
        .label(throw)
        .var_insn(Opcode::ALOAD, 1)
        .insn(Opcode::ATHROW);
}

/// catch (Throwable t) { record t as primary or suppressed }
pub fn gen_suppress(m: &mut MethodBuilder) {
    let suppress_start = m.new_label();
    let suppress_end = m.new_label();
    m.var_insn(Opcode::ASTORE, 2)
        .var_insn(Opcode::ALOAD, 1)
        .jump_insn(Opcode::IFNONNULL, suppress_start)
        .var_insn(Opcode::ALOAD, 2)
        .var_insn(Opcode::ASTORE, 1)
        .jump_insn(Opcode::GOTO, suppress_end)
        .label(suppress_start)
        .var_insn(Opcode::ALOAD, 1)
        .var_insn(Opcode::ALOAD, 2)
        .jump_insn(Opcode::IF_ACMPEQ, suppress_end);
    add_suppressed(m, 1, 2);
    m.label(suppress_end);
}

/// ecj, one resource; cleanup spans 7..=35.
pub fn ecj_one_resource() -> MethodBody {
    ecj_one_resource_with(&owner(1))
}

/// [`ecj_one_resource`] whose exceptional path closes through `owner`.
pub fn ecj_one_resource_with(handler_owner: &str) -> MethodBody {
    let mut m = method();
    ecj_prologue(&mut m);
    m.method_insn(Opcode::INVOKEVIRTUAL, "Factory", "open", "()Ljava/io/Closeable;")
        .var_insn(Opcode::ASTORE, 3)
        .insn(Opcode::NOP);

    let end = gen_close(&mut m, None, 1);
    m.var_insn(Opcode::ASTORE, 1);
    gen_close_and_throw_with(&mut m, 1, handler_owner);
    gen_suppress(&mut m);

    m.var_insn(Opcode::ALOAD, 1).insn(Opcode::ATHROW);
    // additional handlers
    m.insn(Opcode::NOP).label(end).insn(Opcode::RETURN);
    m.build().unwrap()
}

/// ecj, two chained resources; cleanup spans 5..=60.
pub fn ecj_two_resources() -> MethodBody {
    let mut m = method();
    ecj_prologue(&mut m);
    m.insn(Opcode::NOP);

    let next = gen_close(&mut m, None, 2);
    m.var_insn(Opcode::ASTORE, 1);
    gen_close_and_throw(&mut m, 2);

    let next = gen_close(&mut m, Some(next), 1);
    gen_suppress(&mut m);
    gen_close_and_throw(&mut m, 1);

    gen_suppress(&mut m);
    m.var_insn(Opcode::ALOAD, 1)
        .insn(Opcode::ATHROW)
        .label(next)
        .insn(Opcode::RETURN);
    m.build().unwrap()
}

/// ecj, three chained resources; cleanup spans 5..=87.
pub fn ecj_three_resources() -> MethodBody {
    let mut m = method();
    ecj_prologue(&mut m);
    m.insn(Opcode::NOP);

    let next = gen_close(&mut m, None, 3);
    m.var_insn(Opcode::ASTORE, 1);
    gen_close_and_throw(&mut m, 3);

    let next = gen_close(&mut m, Some(next), 2);
    gen_suppress(&mut m);
    gen_close_and_throw(&mut m, 2);

    let next = gen_close(&mut m, Some(next), 1);
    gen_suppress(&mut m);
    gen_close_and_throw(&mut m, 1);

    gen_suppress(&mut m);
    m.var_insn(Opcode::ALOAD, 1)
        .insn(Opcode::ATHROW)
        .label(next)
        .insn(Opcode::RETURN);
    m.build().unwrap()
}

/// ecj, three resources, body ends in a value return; cleanup spans
/// 4..=85.
pub fn ecj_no_flow_out() -> MethodBody {
    let mut m = method();
    ecj_prologue(&mut m);

    // 4..=18: resources closed innermost first, no jump to a join label
    for r in [3, 2, 1] {
        let next = m.new_label();
        m.var_insn(Opcode::ALOAD, r + 2)
            .jump_insn(Opcode::IFNULL, next)
            .var_insn(Opcode::ALOAD, r + 2)
            .method_insn(Opcode::INVOKEINTERFACE, owner(r), "close", "()V")
            .label(next);
    }
    m.insn(Opcode::ARETURN);

    m.var_insn(Opcode::ASTORE, 1);
    for r in [3, 2, 1] {
        gen_close_and_throw(&mut m, r);
        gen_suppress(&mut m);
    }
    m.var_insn(Opcode::ALOAD, 1).insn(Opcode::ATHROW);
    m.build().unwrap()
}

/// `synchronized` block as javac emits it. The monitor release handler
/// spans 11..=18; a second entry guards the handler with itself.
pub fn javac_synchronized() -> MethodBody {
    let mut m = MethodBuilder::new("sync", "(Ljava/lang/Object;)V");
    let [l0, l1, l2, l3, l4, l5] = [(); 6].map(|_| m.new_label());
    m.label(l0)
        .var_insn(Opcode::ALOAD, 1)
        .insn(Opcode::DUP)
        .var_insn(Opcode::ASTORE, 2)
        .insn(Opcode::MONITORENTER)
        .label(l1)
        .method_insn(Opcode::INVOKESTATIC, "Example", "body", "()V")
        .var_insn(Opcode::ALOAD, 2)
        .insn(Opcode::MONITOREXIT)
        .label(l2)
        .jump_insn(Opcode::GOTO, l4)
        .label(l3)
        .frame()
        .var_insn(Opcode::ASTORE, 3)
        .var_insn(Opcode::ALOAD, 2)
        .insn(Opcode::MONITOREXIT)
        .label(l5)
        .var_insn(Opcode::ALOAD, 3)
        .insn(Opcode::ATHROW)
        .label(l4)
        .insn(Opcode::RETURN)
        .try_catch_block(l1, l2, l3, None)
        .try_catch_block(l3, l5, l3, None);
    m.build().unwrap()
}

/// `synchronized` block as ecj emits it. The handler spans 10..=13.
pub fn ecj_synchronized() -> MethodBody {
    ecj_synchronized_catching(None)
}

/// [`ecj_synchronized`] with the handler catching `ty`.
pub fn ecj_synchronized_catching(ty: Option<&str>) -> MethodBody {
    let mut m = MethodBuilder::new("sync", "(Ljava/lang/Object;)V");
    let [l1, l2, l3, l4] = [(); 4].map(|_| m.new_label());
    m.var_insn(Opcode::ALOAD, 1)
        .insn(Opcode::DUP)
        .var_insn(Opcode::ASTORE, 2)
        .insn(Opcode::MONITORENTER)
        .label(l1)
        .method_insn(Opcode::INVOKESTATIC, "Example", "body", "()V")
        .var_insn(Opcode::ALOAD, 2)
        .insn(Opcode::MONITOREXIT)
        .label(l2)
        .jump_insn(Opcode::GOTO, l4)
        .label(l3)
        .var_insn(Opcode::ALOAD, 2)
        .insn(Opcode::MONITOREXIT)
        .insn(Opcode::ATHROW)
        .label(l4)
        .insn(Opcode::RETURN)
        .try_catch_block(l1, l2, l3, ty);
    m.build().unwrap()
}

pub fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<InsnId> {
    range.map(InsnId).collect()
}
