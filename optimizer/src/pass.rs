// pass.rs — Pass metadata and the greedy fixed-point driver
//
// Declares the two phases the driver knows about (verify, hoist) and runs
// the hoisting rewrite over every loop of every function until no more
// rewrites apply. A successful rewrite triggers a re-scan of the whole
// function: newly exposed pairs in nested loops and remaining unpaired
// transfers are caught on the next sweep.
//
// Preconditions: the module verifies cleanly (the CLI enforces this; tests
//               may call the driver directly on built IR).
// Postconditions: no loop in the module contains a hoistable pair.
// Failure modes: none — a function with nothing to optimize reports zero
//               rewrites, indistinguishable from "nothing to optimize here."
// Side effects: in-place mutation of the module.

use crate::hoist::{hoist_transfer_pairs, RewriteOutcome};
use crate::id::OpId;
use crate::ir::{Func, Module, OpKind};

// ── Pass descriptors ───────────────────────────────────────────────────────

/// Identifies each driver phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Verify,
    HoistTransferPairs,
}

/// Static metadata about a phase, for verbose driver output.
pub struct PassDescriptor {
    pub name: &'static str,
    pub invariants: &'static str,
}

pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Verify => PassDescriptor {
            name: "verify",
            invariants: "arena consistency, operand typing, dominance, acyclic token graph",
        },
        PassId::HoistTransferPairs => PassDescriptor {
            name: "hoist-transfer-pairs",
            invariants: "dependency edges redistributed, no ops created or deleted",
        },
    }
}

pub const ALL_PASSES: [PassId; 2] = [PassId::Verify, PassId::HoistTransferPairs];

// ── Driver ─────────────────────────────────────────────────────────────────

/// Upper bound on rewrite sweeps per function. Each productive sweep
/// strictly reduces the number of transfers inside loops, so the cap is
/// unreachable for well-formed input.
const MAX_SWEEPS: usize = 64;

/// Rewrite statistics for one driver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Loops changed, summed over all sweeps.
    pub rewrites: usize,
    /// Sweeps performed, including the final quiescent one.
    pub sweeps: usize,
}

/// Apply the hoisting rewrite to every function, each to a fixed point.
pub fn run(module: &mut Module) -> PassStats {
    let mut total = PassStats::default();
    for func in &mut module.funcs {
        let stats = run_on_func(func);
        total.rewrites += stats.rewrites;
        total.sweeps += stats.sweeps;
    }
    total
}

/// Apply the hoisting rewrite to one function until quiescent.
pub fn run_on_func(func: &mut Func) -> PassStats {
    let mut stats = PassStats::default();
    loop {
        stats.sweeps += 1;
        let mut changed = false;
        for loop_op in collect_loops(func) {
            if hoist_transfer_pairs(func, loop_op) == RewriteOutcome::Changed {
                stats.rewrites += 1;
                changed = true;
            }
        }
        if !changed || stats.sweeps >= MAX_SWEEPS {
            return stats;
        }
    }
}

/// All loop operations in the function, outermost first.
fn collect_loops(func: &Func) -> Vec<OpId> {
    let mut loops = Vec::new();
    func.walk(|op| {
        if matches!(func.op(op).kind, OpKind::Loop(_)) {
            loops.push(op);
        }
    });
    loops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FuncBuilder;
    use crate::ir::Type;

    #[test]
    fn descriptors_have_names() {
        for pass in &ALL_PASSES {
            assert!(!descriptor(*pass).name.is_empty());
        }
    }

    #[test]
    fn collect_loops_sees_nesting() {
        let mut b = FuncBuilder::new("f");
        let (_, t0) = b.barrier(&[]);
        let c0 = b.constant(0);
        let c8 = b.constant(8);
        let c1 = b.constant(1);
        let outer = b.start_loop(c0, c8, c1, t0);
        let inner = b.start_loop(c0, c8, c1, outer.iter_token);
        let (_, bt) = b.barrier(&[inner.iter_token]);
        b.end_loop(&inner, bt);
        let inner_token = b.func().token_result(inner.op).unwrap();
        b.end_loop(&outer, inner_token);
        let f = b.finish();

        assert_eq!(collect_loops(&f), vec![outer.op, inner.op]);
    }

    #[test]
    fn quiescent_function_takes_one_sweep() {
        let mut b = FuncBuilder::new("f");
        let ext = b.arg(Type::Buffer);
        let (_, t0) = b.barrier(&[]);
        let (_, _) = b.transfer_nd(ext, ext, vec![], vec![], &[t0]);
        let mut f = b.finish();

        let stats = run_on_func(&mut f);
        assert_eq!(stats, PassStats { rewrites: 0, sweeps: 1 });
    }
}
