// Snapshot tests: lock the textual IR before and after hoisting to detect
// unintended changes to the rewrite or the printer.
//
// Snapshots are managed by `insta` and stored under `optimizer/tests/snapshots/`.
// Run `cargo insta review` after intentional output changes to update baselines.

use weft::builder::FuncBuilder;
use weft::ir::{Func, Type};
use weft::pass::run_on_func;

/// A loop carrying one whole-buffer round trip: allocate, fill from the
/// external buffer, drain back, deallocate, every iteration.
fn round_trip_func() -> Func {
    let mut b = FuncBuilder::new("main");
    let ext = b.arg(Type::Buffer);
    let (_, t0) = b.barrier(&[]);
    let c0 = b.constant(0);
    let c8 = b.constant(8);
    let c1 = b.constant(1);
    let lp = b.start_loop(c0, c8, c1, t0);
    let (_, at, buf) = b.alloc_scope(&[lp.iter_token]);
    let (_, inc_t) = b.transfer_nd(ext, buf, vec![], vec![], &[lp.iter_token, at]);
    let (_, out_t) = b.transfer_nd(buf, ext, vec![], vec![], &[inc_t]);
    let (_, dt) = b.dealloc_scope(buf, &[out_t]);
    let (_, bt) = b.barrier(&[dt]);
    b.end_loop(&lp, bt);
    let loop_token = b.func().token_result(lp.op).unwrap();
    b.barrier(&[loop_token]);
    b.finish()
}

#[test]
fn snapshot_round_trip_before() {
    let f = round_trip_func();
    insta::assert_snapshot!("round_trip_before", f.to_string());
}

#[test]
fn snapshot_round_trip_after() {
    let mut f = round_trip_func();
    let stats = run_on_func(&mut f);
    assert_eq!(stats.rewrites, 1);
    insta::assert_snapshot!("round_trip_after", f.to_string());
}
