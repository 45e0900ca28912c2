// dot.rs — Graphviz DOT output for Weft dependency graphs
//
// Renders a module's token-dependency structure: one cluster per function,
// nested clusters for loop and scope bodies, solid edges for dependency
// tokens. Suitable for `dot`, `neato`, or other Graphviz layout engines.
//
// Preconditions: `module` passes the verifier.
// Postconditions: returns a valid DOT string.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::id::RegionId;
use crate::ir::{Func, Module, OpKind, Type};

/// Emit the module's dependency graphs as a Graphviz DOT string.
pub fn emit_dot(module: &Module) -> String {
    let mut buf = String::new();
    writeln!(buf, "digraph weft {{").unwrap();
    writeln!(buf, "    rankdir=LR;").unwrap();
    writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];").unwrap();
    writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];").unwrap();

    for (fi, func) in module.funcs.iter().enumerate() {
        let prefix = format!("f{}", fi);
        writeln!(buf).unwrap();
        writeln!(buf, "    subgraph cluster_{} {{", prefix).unwrap();
        writeln!(buf, "        label=\"func: {}\";", sanitize(&func.name)).unwrap();
        writeln!(buf, "        style=rounded;").unwrap();
        writeln!(buf, "        color=gray50;").unwrap();
        write_region(&mut buf, func, &prefix, func.body, "        ");
        write_dep_edges(&mut buf, func, &prefix);
        writeln!(buf, "    }}").unwrap();
    }

    writeln!(buf, "}}").unwrap();
    buf
}

fn write_region(buf: &mut String, func: &Func, prefix: &str, region: RegionId, pad: &str) {
    for &op in &func.region(region).ops {
        match func.op(op).nested_region() {
            Some(nested) => {
                writeln!(buf, "{}subgraph cluster_{}_r{} {{", pad, prefix, nested.0).unwrap();
                writeln!(buf, "{}    label=\"{}\";", pad, op_label(func, op)).unwrap();
                writeln!(buf, "{}    style=dashed;", pad).unwrap();
                writeln!(buf, "{}    color=gray70;", pad).unwrap();
                writeln!(
                    buf,
                    "{}    {}_n{} [label=\"{}\", shape=box];",
                    pad,
                    prefix,
                    op.0,
                    op_label(func, op)
                )
                .unwrap();
                let deeper = format!("{}    ", pad);
                write_region(buf, func, prefix, nested, &deeper);
                writeln!(buf, "{}}}", pad).unwrap();
            }
            None => {
                writeln!(
                    buf,
                    "{}{}_n{} [label=\"{}\", shape=box];",
                    pad,
                    prefix,
                    op.0,
                    op_label(func, op)
                )
                .unwrap();
            }
        }
    }
}

fn write_dep_edges(buf: &mut String, func: &Func, prefix: &str) {
    for op in &func.ops {
        for v in op.all_operands() {
            if func.value(v).ty != Type::Token {
                continue;
            }
            if let Some(producer) = func.producer(v) {
                writeln!(
                    buf,
                    "        {}_n{} -> {}_n{};",
                    prefix, producer.0, prefix, op.id.0
                )
                .unwrap();
            }
        }
    }
}

fn op_label(func: &Func, op: crate::id::OpId) -> String {
    match &func.op(op).kind {
        OpKind::Constant { value } => format!("const {}", value),
        OpKind::Slice { .. } => "slice".to_string(),
        OpKind::Transfer(_) => "transfer".to_string(),
        OpKind::AllocScope { .. } => "alloc".to_string(),
        OpKind::Alloc => "alloc.inner".to_string(),
        OpKind::DeallocScope { .. } => "dealloc".to_string(),
        OpKind::Dealloc { .. } => "dealloc.inner".to_string(),
        OpKind::Barrier => "barrier".to_string(),
        OpKind::Loop(_) => "loop".to_string(),
        OpKind::Yield { .. } => "yield".to_string(),
    }
}

/// Keep only characters Graphviz accepts unquoted in labels.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
