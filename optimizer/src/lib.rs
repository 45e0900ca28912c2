// weft — async token-dependency IR and its transfer-hoisting optimizer
//
// Library root.

pub mod builder;
pub mod classify;
pub mod diag;
pub mod dot;
pub mod graph;
pub mod hoist;
pub mod id;
pub mod invariance;
pub mod ir;
pub mod pass;
pub mod verify;
