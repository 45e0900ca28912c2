// classify.rs — Transfer-pair classification for the hoisting rewriter
//
// Decides, from the dependency graph alone, whether a transfer inside a loop
// is "incoming" (fills a freshly allocated buffer and waits on the loop's
// iteration token) or "outgoing" (drains a buffer that is deallocated and
// joined right after), and whether an incoming/outgoing pair is a symmetric
// round trip over the same two buffers.
//
// Preconditions: `transfer` is a `Transfer` op directly inside `loop_op`'s
//                body; the IR passes the verifier.
// Postconditions: none (read-only).
// Failure modes: none — a transfer that fits neither role is simply skipped.
// Side effects: none.

use crate::id::{OpId, ValueId};
use crate::ir::{Func, OpKind, TransferShape, TransferSpec};

/// True iff the transfer waits on the loop's iteration-carried token and on
/// an allocation scope: a freshly allocated buffer filled from outside the
/// loop.
pub fn is_incoming(func: &Func, loop_op: OpId, transfer: OpId) -> bool {
    let iter_arg = func.iter_arg(loop_op);
    let mut found_iter_dep = false;
    let mut found_alloc_dep = false;
    for &dep in func.dependencies(transfer) {
        if dep == iter_arg {
            found_iter_dep = true;
        } else if alloc_scope_producing(func, dep).is_some() {
            found_alloc_dep = true;
        }
    }
    found_iter_dep && found_alloc_dep
}

/// The allocation scope in the transfer's dependency list, if any.
pub fn alloc_scope_of(func: &Func, transfer: OpId) -> Option<OpId> {
    func.dependencies(transfer)
        .iter()
        .find_map(|&dep| alloc_scope_producing(func, dep))
}

/// True iff the transfer's token is consumed by a deallocation scope whose
/// own token is in turn consumed by a barrier: a buffer drained, freed, and
/// joined.
pub fn is_outgoing(func: &Func, transfer: OpId) -> bool {
    match dealloc_scope_of(func, transfer) {
        Some(scope) => {
            let scope_token = func.token_result(scope).expect("scope has a token");
            func.consumers(scope_token)
                .iter()
                .any(|&user| matches!(func.op(user).kind, OpKind::Barrier))
        }
        None => false,
    }
}

/// The deallocation scope consuming the transfer's token, if any.
pub fn dealloc_scope_of(func: &Func, transfer: OpId) -> Option<OpId> {
    let token = func.token_result(transfer)?;
    func.consumers(token)
        .into_iter()
        .find(|&user| is_dealloc_scope(func, user))
}

/// True iff the pair forms a round trip: same two buffers with roles
/// swapped, and endpoint shapes that mirror index-wise.
pub fn are_symmetric(func: &Func, incoming: OpId, outgoing: OpId) -> bool {
    let inc = transfer_spec(func, incoming);
    let out = transfer_spec(func, outgoing);
    if inc.src != out.dst || out.src != inc.dst {
        return false;
    }
    match (&inc.shape, &out.shape) {
        (
            TransferShape::Nd {
                src_dims: inc_src,
                dst_dims: inc_dst,
            },
            TransferShape::Nd {
                src_dims: out_src,
                dst_dims: out_dst,
            },
        ) => {
            if inc_dst.len() != out_src.len() || inc_src.len() != out_dst.len() {
                return false;
            }
            let mirrored = |a: &crate::ir::ShapeDim, b: &crate::ir::ShapeDim| {
                equal_indices(func, a.offset, b.offset)
                    && equal_indices(func, a.size, b.size)
                    && equal_indices(func, a.stride, b.stride)
            };
            inc_dst.iter().zip(out_src.iter()).all(|(a, b)| mirrored(a, b))
                && inc_src.iter().zip(out_dst.iter()).all(|(a, b)| mirrored(a, b))
        }
        (
            TransferShape::Plain {
                src_extents: inc_src,
                dst_extents: inc_dst,
                length: inc_len,
            },
            TransferShape::Plain {
                src_extents: out_src,
                dst_extents: out_dst,
                length: out_len,
            },
        ) => {
            // Plain-form fallback: raw per-dimension extents and total length.
            inc_src.len() == out_dst.len()
                && inc_dst.len() == out_src.len()
                && inc_src.iter().zip(out_dst.iter()).all(|(&a, &b)| a == b)
                && inc_dst.iter().zip(out_src.iter()).all(|(&a, &b)| a == b)
                && inc_len == out_len
        }
        // Mixed shape forms never pair.
        _ => false,
    }
}

// ── Internal ────────────────────────────────────────────────────────────────

/// Two shape components are equal if they are the same value, or both
/// resolve to identical compile-time constants.
fn equal_indices(func: &Func, a: ValueId, b: ValueId) -> bool {
    if a == b {
        return true;
    }
    match (constant_value(func, a), constant_value(func, b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn constant_value(func: &Func, v: ValueId) -> Option<i64> {
    let op = func.producer(v)?;
    match func.op(op).kind {
        OpKind::Constant { value } => Some(value),
        _ => None,
    }
}

fn transfer_spec<'f>(func: &'f Func, op: OpId) -> &'f TransferSpec {
    match &func.op(op).kind {
        OpKind::Transfer(spec) => spec,
        other => panic!("op {:?} is not a transfer: {:?}", op, other),
    }
}

fn alloc_scope_producing(func: &Func, token: ValueId) -> Option<OpId> {
    let op = func.producer(token)?;
    match func.op(op).kind {
        OpKind::AllocScope { body } => {
            let ops = &func.region(body).ops;
            if ops.len() == 1 && matches!(func.op(ops[0]).kind, OpKind::Alloc) {
                Some(op)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn is_dealloc_scope(func: &Func, op: OpId) -> bool {
    match func.op(op).kind {
        OpKind::DeallocScope { body } => {
            let ops = &func.region(body).ops;
            ops.len() == 1 && matches!(func.op(ops[0]).kind, OpKind::Dealloc { .. })
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FuncBuilder;
    use crate::ir::{ShapeDim, Type};

    /// A loop holding one incoming and one outgoing whole-buffer transfer
    /// over the same pair of buffers.
    fn round_trip_loop() -> (crate::ir::Func, OpId, OpId, OpId) {
        let mut b = FuncBuilder::new("f");
        let ext = b.arg(Type::Buffer);
        let (_, t0) = b.barrier(&[]);
        let c0 = b.constant(0);
        let c8 = b.constant(8);
        let c1 = b.constant(1);
        let lp = b.start_loop(c0, c8, c1, t0);
        let (_, at, buf) = b.alloc_scope(&[lp.iter_token]);
        let (inc, inc_t) = b.transfer_nd(ext, buf, vec![], vec![], &[lp.iter_token, at]);
        let (out, out_t) = b.transfer_nd(buf, ext, vec![], vec![], &[inc_t]);
        let (_, dt) = b.dealloc_scope(buf, &[out_t]);
        let (_, bt) = b.barrier(&[dt]);
        b.end_loop(&lp, bt);
        (b.finish(), lp.op, inc, out)
    }

    #[test]
    fn detects_incoming_and_outgoing_roles() {
        let (f, lp, inc, out) = round_trip_loop();
        assert!(is_incoming(&f, lp, inc));
        assert!(!is_incoming(&f, lp, out));
        assert!(is_outgoing(&f, out));
        assert!(!is_outgoing(&f, inc));
        assert!(alloc_scope_of(&f, inc).is_some());
        assert!(dealloc_scope_of(&f, out).is_some());
    }

    #[test]
    fn whole_buffer_round_trip_is_symmetric() {
        let (f, _, inc, out) = round_trip_loop();
        assert!(are_symmetric(&f, inc, out));
    }

    #[test]
    fn equal_constants_count_as_equal_indices() {
        let mut b = FuncBuilder::new("f");
        let ext = b.arg(Type::Buffer);
        let buf = b.arg(Type::Buffer);
        let (o1, s1, st1) = (b.constant(0), b.constant(16), b.constant(1));
        let (o2, s2, st2) = (b.constant(0), b.constant(16), b.constant(1));
        let dim1 = ShapeDim {
            offset: o1,
            size: s1,
            stride: st1,
        };
        let dim2 = ShapeDim {
            offset: o2,
            size: s2,
            stride: st2,
        };
        let (inc, _) = b.transfer_nd(ext, buf, vec![], vec![dim1], &[]);
        let (out, _) = b.transfer_nd(buf, ext, vec![dim2], vec![], &[]);
        let f = b.finish();
        // Distinct constant ops with identical values still mirror.
        assert!(are_symmetric(&f, inc, out));
    }

    #[test]
    fn differing_size_breaks_symmetry() {
        let mut b = FuncBuilder::new("f");
        let ext = b.arg(Type::Buffer);
        let buf = b.arg(Type::Buffer);
        let (o, st) = (b.constant(0), b.constant(1));
        let s16 = b.constant(16);
        let s32 = b.constant(32);
        let (inc, _) = b.transfer_nd(
            ext,
            buf,
            vec![],
            vec![ShapeDim {
                offset: o,
                size: s16,
                stride: st,
            }],
            &[],
        );
        let (out, _) = b.transfer_nd(
            buf,
            ext,
            vec![ShapeDim {
                offset: o,
                size: s32,
                stride: st,
            }],
            vec![],
            &[],
        );
        let f = b.finish();
        assert!(!are_symmetric(&f, inc, out));
    }

    #[test]
    fn dimensionality_mismatch_breaks_symmetry() {
        let mut b = FuncBuilder::new("f");
        let ext = b.arg(Type::Buffer);
        let buf = b.arg(Type::Buffer);
        let (o, s, st) = (b.constant(0), b.constant(16), b.constant(1));
        let dim = ShapeDim {
            offset: o,
            size: s,
            stride: st,
        };
        let (inc, _) = b.transfer_nd(ext, buf, vec![], vec![dim, dim], &[]);
        let (out, _) = b.transfer_nd(buf, ext, vec![dim], vec![], &[]);
        let f = b.finish();
        assert!(!are_symmetric(&f, inc, out));
    }

    #[test]
    fn different_buffers_are_not_a_round_trip() {
        let mut b = FuncBuilder::new("f");
        let ext1 = b.arg(Type::Buffer);
        let ext2 = b.arg(Type::Buffer);
        let buf = b.arg(Type::Buffer);
        let (inc, _) = b.transfer_nd(ext1, buf, vec![], vec![], &[]);
        let (out, _) = b.transfer_nd(buf, ext2, vec![], vec![], &[]);
        let f = b.finish();
        assert!(!are_symmetric(&f, inc, out));
    }

    #[test]
    fn plain_form_compares_extents_and_length() {
        let mut b = FuncBuilder::new("f");
        let ext = b.arg(Type::Buffer);
        let buf = b.arg(Type::Buffer);
        let d = b.constant(64);
        let len = b.constant(64);
        let (inc, _) = b.transfer_plain(ext, buf, vec![d], vec![d], len, &[]);
        let (out, _) = b.transfer_plain(buf, ext, vec![d], vec![d], len, &[]);
        let f = b.finish();
        assert!(are_symmetric(&f, inc, out));

        let len2 = {
            let mut b2 = FuncBuilder::new("g");
            let ext = b2.arg(Type::Buffer);
            let buf = b2.arg(Type::Buffer);
            let d = b2.constant(64);
            let la = b2.constant(64);
            let lb = b2.constant(32);
            let (inc, _) = b2.transfer_plain(ext, buf, vec![d], vec![d], la, &[]);
            let (out, _) = b2.transfer_plain(buf, ext, vec![d], vec![d], lb, &[]);
            let f2 = b2.finish();
            !are_symmetric(&f2, inc, out)
        };
        assert!(len2);
    }

    #[test]
    fn mixed_shape_forms_never_pair() {
        let mut b = FuncBuilder::new("f");
        let ext = b.arg(Type::Buffer);
        let buf = b.arg(Type::Buffer);
        let d = b.constant(64);
        let (inc, _) = b.transfer_nd(ext, buf, vec![], vec![], &[]);
        let (out, _) = b.transfer_plain(buf, ext, vec![d], vec![d], d, &[]);
        let f = b.finish();
        assert!(!are_symmetric(&f, inc, out));
    }
}
