// hoist.rs — Round-trip transfer-pair hoisting
//
// Scans a loop body for incoming/outgoing transfers, pairs them greedily
// (first symmetric, loop-invariant incoming transfer wins per outgoing
// transfer), and performs the graph surgery that relocates the allocation,
// the matched pair, and the deallocation outside the loop while preserving
// every ordering obligation in the dependency graph.
//
// Preconditions: `loop_op` is a `Loop` in `func`; the IR passes the
//               verifier and was produced by a well-formed builder.
// Postconditions: on `Changed`, at least one pair sits outside the loop and
//                 the dependency graph is consistent; on `NoMatch`, the
//                 function is untouched.
// Failure modes: structural precondition violations panic (malformed input
//                is a programmer error upstream, not a recoverable state).
// Side effects: in-place mutation of `func`.

use std::collections::HashSet;

use crate::classify;
use crate::id::OpId;
use crate::invariance::is_invariant;
use crate::ir::{Func, OpKind};

/// Whether a rewrite changed the function. No-match is an expected, silent
/// outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    Changed,
    NoMatch,
}

/// Hoist every matchable round-trip transfer pair out of `loop_op`.
/// Candidate lists are snapshotted before any mutation; each outgoing
/// transfer is paired at most once per invocation.
pub fn hoist_transfer_pairs(func: &mut Func, loop_op: OpId) -> RewriteOutcome {
    let body = func.loop_spec(loop_op).body;
    let body_ops: Vec<OpId> = func.region(body).ops.clone();

    let mut incoming = Vec::new();
    let mut outgoing = Vec::new();
    for op in body_ops {
        if !matches!(func.op(op).kind, OpKind::Transfer(_)) {
            continue;
        }
        if classify::is_incoming(func, loop_op, op) {
            incoming.push(op);
        }
        if classify::is_outgoing(func, op) {
            outgoing.push(op);
        }
    }

    let mut paired: HashSet<OpId> = HashSet::new();
    let mut hoisted_any = false;
    for out in outgoing {
        for &inc in &incoming {
            if paired.contains(&inc) {
                continue;
            }
            if !classify::are_symmetric(func, inc, out) {
                continue;
            }
            if !is_invariant(func, inc, loop_op) || !is_invariant(func, out, loop_op) {
                continue;
            }
            hoist_pair(func, loop_op, inc, out);
            paired.insert(inc);
            hoisted_any = true;
            break;
        }
    }

    if hoisted_any {
        RewriteOutcome::Changed
    } else {
        RewriteOutcome::NoMatch
    }
}

// ── Graph surgery ───────────────────────────────────────────────────────────

/// Relocate one matched pair: allocation and incoming transfer to before the
/// loop, outgoing transfer and deallocation to after it.
fn hoist_pair(func: &mut Func, loop_op: OpId, inc: OpId, out: OpId) {
    // The allocation scope's only ordering obligation is the iteration
    // token; that edge is superseded by hoisting and removed outright.
    let alloc_scope = classify::alloc_scope_of(func, inc)
        .expect("incoming transfer must wait on an allocation scope");
    assert_eq!(
        func.dependencies(alloc_scope).len(),
        1,
        "allocation scope must wait only on the iteration token"
    );
    func.remove_dependency(alloc_scope, 0);

    // Splice the incoming transfer so it consumes what the loop used to
    // consume: in-loop users of its token fall back to the iteration
    // argument, the loop's first-iteration operand becomes the transfer's
    // token, and the transfer itself waits on the former operand.
    let iter_arg = func.iter_arg(loop_op);
    let init = func.loop_spec(loop_op).init;
    let inc_token = func.token_result(inc).expect("transfer has a completion token");
    func.remove_dependencies_on(inc, iter_arg);
    func.replace_all_uses(inc_token, iter_arg);
    func.replace_all_uses(init, inc_token);
    func.add_dependency(inc, init);

    func.move_before(alloc_scope, loop_op);
    func.move_before(inc, loop_op);

    // Outgoing side: ordering obligations flowing into the outgoing
    // transfer are preserved post-loop by moving them onto the body's join
    // barrier; the barrier's edge on the dealloc token is superseded.
    let dealloc_scope = classify::dealloc_scope_of(func, out)
        .expect("outgoing transfer must feed a deallocation scope");
    let body = func.loop_spec(loop_op).body;
    let term = func.terminator(body).expect("loop body has a terminator");
    let yielded = match &func.op(term).kind {
        OpKind::Yield { values } => values[0],
        other => panic!("loop terminator is not a yield: {:?}", other),
    };
    let barrier = func
        .producer(yielded)
        .expect("yielded token has a defining op");
    assert!(
        matches!(func.op(barrier).kind, OpKind::Barrier),
        "loop must yield a barrier token"
    );

    let out_deps = func.dependencies(out).to_vec();
    for dep in out_deps {
        func.add_dependency(barrier, dep);
    }
    func.clear_dependencies(out);

    let dealloc_token = func
        .token_result(dealloc_scope)
        .expect("scope has a completion token");
    func.remove_dependencies_on(barrier, dealloc_token);

    // External users of the loop's completion now wait on the dealloc
    // scope; the outgoing transfer waits on the loop itself.
    let loop_token = func.token_result(loop_op).expect("loop has a completion token");
    func.replace_all_uses(loop_token, dealloc_token);
    func.add_dependency(out, loop_token);

    func.move_after(dealloc_scope, loop_op);
    func.move_after(out, loop_op);

    // Reposition constant operand producers, outgoing transfer first:
    // a constant shared by both transfers ends up before the incoming one,
    // where it dominates both final positions.
    move_constant_operands(func, out);
    move_constant_operands(func, inc);
}

fn move_constant_operands(func: &mut Func, op: OpId) {
    for operand in func.op(op).operands() {
        if let Some(producer) = func.producer(operand) {
            if !matches!(func.op(producer).kind, OpKind::Constant { .. }) {
                continue;
            }
            // A constant shared with an earlier hoisted pair already sits
            // before those uses; moving it again would drag it past them.
            if func.dominates(producer, op) {
                continue;
            }
            func.move_before(producer, op);
        }
    }
}
