// Property-based tests for the hoisting rewrite.
//
// Two categories:
// 1. Mirror-symmetric, loop-invariant round trips always hoist and leave a
//    verifiable graph, regardless of dimensionality or shape values.
// 2. Perturbing any single shape component breaks symmetry and the loop is
//    left untouched.
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use proptest::prelude::*;
use weft::builder::FuncBuilder;
use weft::hoist::{hoist_transfer_pairs, RewriteOutcome};
use weft::id::OpId;
use weft::ir::{Func, OpKind, ShapeDim, Type};
use weft::pass::run_on_func;
use weft::verify::verify_func;

// ── Generators ──────────────────────────────────────────────────────────────

/// Per-dimension (offset, size, stride) triples. Values only need to be
/// equal across the pair, not meaningful as addresses.
fn arb_dims() -> impl Strategy<Value = Vec<(i64, i64, i64)>> {
    prop::collection::vec((0i64..64, 1i64..256, 1i64..8), 0..=3)
}

/// Build a round-trip loop whose transfer pair mirrors `dims` on the inner
/// buffer side, each transfer materializing its own constants. `perturb`
/// names a (dimension, component) of the outgoing side to offset by one.
fn build_mirrored(dims: &[(i64, i64, i64)], perturb: Option<(usize, usize)>) -> (Func, OpId) {
    let mut b = FuncBuilder::new("main");
    let ext = b.arg(Type::Buffer);
    let (_, t0) = b.barrier(&[]);
    let c0 = b.constant(0);
    let c8 = b.constant(8);
    let c1 = b.constant(1);
    let lp = b.start_loop(c0, c8, c1, t0);
    let (_, at, buf) = b.alloc_scope(&[lp.iter_token]);

    let mut inc_dims = Vec::new();
    for &(off, size, stride) in dims {
        let offset = b.constant(off);
        let size = b.constant(size);
        let stride = b.constant(stride);
        inc_dims.push(ShapeDim {
            offset,
            size,
            stride,
        });
    }
    let mut out_dims = Vec::new();
    for (i, &(off, size, stride)) in dims.iter().enumerate() {
        let (mut off, mut size, mut stride) = (off, size, stride);
        if let Some((dim, component)) = perturb {
            if dim == i {
                match component {
                    0 => off += 1,
                    1 => size += 1,
                    _ => stride += 1,
                }
            }
        }
        let offset = b.constant(off);
        let size = b.constant(size);
        let stride = b.constant(stride);
        out_dims.push(ShapeDim {
            offset,
            size,
            stride,
        });
    }

    let (_, inc_t) = b.transfer_nd(ext, buf, vec![], inc_dims, &[lp.iter_token, at]);
    let (_, out_t) = b.transfer_nd(buf, ext, out_dims, vec![], &[inc_t]);
    let (_, dt) = b.dealloc_scope(buf, &[out_t]);
    let (_, bt) = b.barrier(&[dt]);
    b.end_loop(&lp, bt);
    (b.finish(), lp.op)
}

fn body_transfer_count(func: &Func, loop_op: OpId) -> usize {
    func.region(func.loop_spec(loop_op).body)
        .ops
        .iter()
        .filter(|&&op| matches!(func.op(op).kind, OpKind::Transfer(_)))
        .count()
}

// ── 1. Symmetric invariant pairs always hoist ───────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn symmetric_invariant_pair_always_hoists(dims in arb_dims()) {
        let (mut f, lp) = build_mirrored(&dims, None);
        prop_assert!(verify_func(&f).is_empty());

        let stats = run_on_func(&mut f);
        prop_assert_eq!(stats.rewrites, 1, "pair must hoist for dims {:?}", dims);
        prop_assert_eq!(body_transfer_count(&f, lp), 0);

        let diags = verify_func(&f);
        prop_assert!(diags.is_empty(), "post-hoist verify failed: {:?}", diags);

        // Quiescent on a second run.
        let again = run_on_func(&mut f);
        prop_assert_eq!(again.rewrites, 0);
    }

    #[test]
    fn hoisting_deletes_exactly_one_edge(dims in arb_dims()) {
        let (mut f, _) = build_mirrored(&dims, None);
        let before = f.dep_edge_count();
        let stats = run_on_func(&mut f);
        prop_assert_eq!(stats.rewrites, 1);
        prop_assert_eq!(f.dep_edge_count(), before - 1);
    }
}

// ── 2. Any single shape mismatch blocks the rewrite ─────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn perturbed_component_blocks_hoisting(
        dims in prop::collection::vec((0i64..64, 1i64..256, 1i64..8), 1..=3),
        dim_index in 0usize..3,
        component in 0usize..3,
    ) {
        let dim_index = dim_index % dims.len();
        let (mut f, lp) = build_mirrored(&dims, Some((dim_index, component)));
        let before = f.to_string();

        prop_assert_eq!(
            hoist_transfer_pairs(&mut f, lp),
            RewriteOutcome::NoMatch,
            "mismatch in dim {} component {} must block hoisting",
            dim_index,
            component
        );
        prop_assert_eq!(f.to_string(), before, "loop must be left untouched");
    }
}
