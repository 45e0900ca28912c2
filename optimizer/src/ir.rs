// ir.rs — Arena IR for Weft token-dependency graphs
//
// A function owns flat arenas of operations, values, and regions, indexed by
// the newtypes in `id.rs`. Ordering between asynchronous operations is
// carried exclusively by explicit dependency edges (completion tokens listed
// in `Operation::deps`); program order within a region is a rewriting
// convenience, not a correctness guarantee.
//
// Preconditions: none (types only).
// Postconditions: accessor methods panic on out-of-range ids (these are
//                 programmer errors, not recoverable conditions).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{OpId, RegionId, ValueId};

// ── Values ──────────────────────────────────────────────────────────────────

/// The type of an IR value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// Completion token of an asynchronous operation.
    Token,
    /// Memory buffer reference.
    Buffer,
    /// Integer index (loop bounds, offsets, sizes, strides).
    Index,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Token => write!(f, "token"),
            Type::Buffer => write!(f, "buffer"),
            Type::Index => write!(f, "index"),
        }
    }
}

/// Where a value is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueDef {
    /// The `index`-th result of an operation.
    OpResult { op: OpId, index: u32 },
    /// The `index`-th argument of a region (loop induction variable,
    /// iteration-carried token, or function argument).
    RegionArg { region: RegionId, index: u32 },
}

/// A value in the IR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Value {
    pub id: ValueId,
    pub ty: Type,
    pub def: ValueDef,
}

// ── Transfer shapes ─────────────────────────────────────────────────────────

/// One dimension of an indexed transfer endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeDim {
    pub offset: ValueId,
    pub size: ValueId,
    pub stride: ValueId,
}

/// Shape description of a transfer. An empty dimension list denotes a
/// whole-buffer endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferShape {
    /// Indexed form: per-endpoint offset/size/stride tuples.
    Nd {
        src_dims: Vec<ShapeDim>,
        dst_dims: Vec<ShapeDim>,
    },
    /// Plain form: raw per-dimension extents and total element count.
    Plain {
        src_extents: Vec<ValueId>,
        dst_extents: Vec<ValueId>,
        length: ValueId,
    },
}

/// Source/destination endpoints of an asynchronous copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSpec {
    pub src: ValueId,
    pub dst: ValueId,
    pub shape: TransferShape,
}

/// Structural payload of a loop operation. The body region's arguments are
/// `[induction variable, iteration-carried token]`; the body terminates in
/// a `Yield` carrying the token threaded to the next iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSpec {
    pub lower: ValueId,
    pub upper: ValueId,
    pub step: ValueId,
    /// Iteration-carried token operand for the first iteration.
    pub init: ValueId,
    pub body: RegionId,
}

// ── Operations ──────────────────────────────────────────────────────────────

/// Closed set of operation kinds relevant to the optimizer. Dispatch is
/// exhaustive matching, never open-ended type inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    /// Compile-time integer constant; result: one `Index` value.
    Constant { value: i64 },
    /// Index-slicing view into a buffer; result: one `Buffer` value.
    Slice { buffer: ValueId, indices: Vec<ValueId> },
    /// Asynchronous copy between two buffer endpoints; result: one token.
    Transfer(TransferSpec),
    /// Scoping construct whose body performs an allocation;
    /// results: one token, one buffer.
    AllocScope { body: RegionId },
    /// The allocation inside an `AllocScope`; no results (the scope exposes
    /// the buffer).
    Alloc,
    /// Scoping construct whose body performs a deallocation; result: one token.
    DeallocScope { body: RegionId },
    /// The deallocation inside a `DeallocScope`; no results.
    Dealloc { buffer: ValueId },
    /// Join/barrier: aggregates its dependency edges into one token result.
    Barrier,
    /// Loop construct; result: one token (complete after the final iteration).
    Loop(LoopSpec),
    /// Region terminator carrying iteration results.
    Yield { values: Vec<ValueId> },
}

/// A node in the IR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: OpId,
    pub kind: OpKind,
    /// Incoming dependency edges: completion tokens this operation waits on.
    pub deps: Vec<ValueId>,
    pub results: Vec<ValueId>,
    /// The region this operation currently sits in.
    pub region: RegionId,
}

impl Operation {
    /// Non-dependency operands, in a fixed per-kind order.
    pub fn operands(&self) -> Vec<ValueId> {
        let mut out = Vec::new();
        match &self.kind {
            OpKind::Constant { .. } | OpKind::Alloc | OpKind::Barrier => {}
            OpKind::Slice { buffer, indices } => {
                out.push(*buffer);
                out.extend_from_slice(indices);
            }
            OpKind::Transfer(spec) => {
                out.push(spec.src);
                out.push(spec.dst);
                match &spec.shape {
                    TransferShape::Nd { src_dims, dst_dims } => {
                        for d in src_dims.iter().chain(dst_dims.iter()) {
                            out.push(d.offset);
                            out.push(d.size);
                            out.push(d.stride);
                        }
                    }
                    TransferShape::Plain {
                        src_extents,
                        dst_extents,
                        length,
                    } => {
                        out.extend_from_slice(src_extents);
                        out.extend_from_slice(dst_extents);
                        out.push(*length);
                    }
                }
            }
            OpKind::AllocScope { .. } | OpKind::DeallocScope { .. } => {}
            OpKind::Dealloc { buffer } => out.push(*buffer),
            OpKind::Loop(spec) => {
                out.push(spec.lower);
                out.push(spec.upper);
                out.push(spec.step);
                out.push(spec.init);
            }
            OpKind::Yield { values } => out.extend_from_slice(values),
        }
        out
    }

    /// Dependency edges followed by non-dependency operands.
    pub fn all_operands(&self) -> Vec<ValueId> {
        let mut out = self.deps.clone();
        out.extend(self.operands());
        out
    }

    /// Visit every operand slot (dependencies included) mutably.
    pub fn for_each_operand_mut(&mut self, mut f: impl FnMut(&mut ValueId)) {
        for d in &mut self.deps {
            f(d);
        }
        match &mut self.kind {
            OpKind::Constant { .. } | OpKind::Alloc | OpKind::Barrier => {}
            OpKind::Slice { buffer, indices } => {
                f(buffer);
                for i in indices {
                    f(i);
                }
            }
            OpKind::Transfer(spec) => {
                f(&mut spec.src);
                f(&mut spec.dst);
                match &mut spec.shape {
                    TransferShape::Nd { src_dims, dst_dims } => {
                        for d in src_dims.iter_mut().chain(dst_dims.iter_mut()) {
                            f(&mut d.offset);
                            f(&mut d.size);
                            f(&mut d.stride);
                        }
                    }
                    TransferShape::Plain {
                        src_extents,
                        dst_extents,
                        length,
                    } => {
                        for e in src_extents.iter_mut().chain(dst_extents.iter_mut()) {
                            f(e);
                        }
                        f(length);
                    }
                }
            }
            OpKind::AllocScope { .. } | OpKind::DeallocScope { .. } => {}
            OpKind::Dealloc { buffer } => f(buffer),
            OpKind::Loop(spec) => {
                f(&mut spec.lower);
                f(&mut spec.upper);
                f(&mut spec.step);
                f(&mut spec.init);
            }
            OpKind::Yield { values } => {
                for v in values {
                    f(v);
                }
            }
        }
    }

    /// Nested region of a structural operation, if any.
    pub fn nested_region(&self) -> Option<RegionId> {
        match &self.kind {
            OpKind::AllocScope { body } | OpKind::DeallocScope { body } => Some(*body),
            OpKind::Loop(spec) => Some(spec.body),
            _ => None,
        }
    }
}

// ── Regions ─────────────────────────────────────────────────────────────────

/// An ordered sequence of operations with explicit argument values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    /// Owning structural operation; `None` for a function body.
    pub parent: Option<OpId>,
    pub args: Vec<ValueId>,
    pub ops: Vec<OpId>,
}

// ── Functions and modules ───────────────────────────────────────────────────

/// A function: a body region plus the arenas backing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Func {
    pub name: String,
    pub body: RegionId,
    pub ops: Vec<Operation>,
    pub values: Vec<Value>,
    pub regions: Vec<Region>,
}

impl Func {
    pub fn op(&self, id: OpId) -> &Operation {
        &self.ops[id.index()]
    }

    pub fn op_mut(&mut self, id: OpId) -> &mut Operation {
        &mut self.ops[id.index()]
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.index()]
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }

    pub fn region_mut(&mut self, id: RegionId) -> &mut Region {
        &mut self.regions[id.index()]
    }

    /// The operation defining `v`, or `None` for region arguments.
    pub fn producer(&self, v: ValueId) -> Option<OpId> {
        match self.value(v).def {
            ValueDef::OpResult { op, .. } => Some(op),
            ValueDef::RegionArg { .. } => None,
        }
    }

    /// The completion-token result of an asynchronous operation.
    pub fn token_result(&self, op: OpId) -> Option<ValueId> {
        self.op(op)
            .results
            .iter()
            .copied()
            .find(|&r| self.value(r).ty == Type::Token)
    }

    /// Loop payload of `op`; panics if `op` is not a loop.
    pub fn loop_spec(&self, op: OpId) -> &LoopSpec {
        match &self.op(op).kind {
            OpKind::Loop(spec) => spec,
            other => panic!("op {:?} is not a loop: {:?}", op, other),
        }
    }

    /// The loop's induction variable (body region argument 0).
    pub fn induction_var(&self, loop_op: OpId) -> ValueId {
        self.region(self.loop_spec(loop_op).body).args[0]
    }

    /// The loop's iteration-carried token (body region argument 1).
    pub fn iter_arg(&self, loop_op: OpId) -> ValueId {
        self.region(self.loop_spec(loop_op).body).args[1]
    }

    /// The terminator of a region, if the region is non-empty.
    pub fn terminator(&self, region: RegionId) -> Option<OpId> {
        self.region(region).ops.last().copied()
    }
}

/// A module: a flat list of functions. Functions share no IR state; the
/// optimizer holds exclusive access to one function at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub funcs: Vec<Func>,
}

// ── Textual form ────────────────────────────────────────────────────────────

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, func) in self.funcs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func @{}(", self.name)?;
        for (i, &a) in self.region(self.body).args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "%{}: {}", a.0, self.value(a).ty)?;
        }
        writeln!(f, ") {{")?;
        self.write_region(f, self.body, 1)?;
        writeln!(f, "}}")
    }
}

impl Func {
    fn write_region(&self, f: &mut fmt::Formatter<'_>, region: RegionId, depth: usize) -> fmt::Result {
        for &op in &self.region(region).ops {
            self.write_op(f, self.op(op), depth)?;
        }
        Ok(())
    }

    fn write_op(&self, f: &mut fmt::Formatter<'_>, op: &Operation, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        write!(f, "{}", pad)?;
        if !op.results.is_empty() {
            for (i, r) in op.results.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "%{}", r.0)?;
            }
            write!(f, " = ")?;
        }
        match &op.kind {
            OpKind::Loop(spec) => {
                write!(
                    f,
                    "loop %{} to %{} step %{} iter(%{}) (%{}, %{})",
                    spec.lower.0,
                    spec.upper.0,
                    spec.step.0,
                    spec.init.0,
                    self.region(spec.body).args[0].0,
                    self.region(spec.body).args[1].0,
                )?;
                self.write_deps(f, op)?;
                writeln!(f, " {{")?;
                self.write_region(f, spec.body, depth + 1)?;
                writeln!(f, "{}}}", pad)
            }
            OpKind::AllocScope { body } | OpKind::DeallocScope { body } => {
                let name = match op.kind {
                    OpKind::AllocScope { .. } => "alloc.scope",
                    _ => "dealloc.scope",
                };
                write!(f, "{}", name)?;
                self.write_deps(f, op)?;
                write!(f, " {{ ")?;
                for (i, &inner) in self.region(*body).ops.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    self.write_kind(f, self.op(inner))?;
                }
                writeln!(f, " }}")
            }
            _ => {
                self.write_kind(f, op)?;
                self.write_deps(f, op)?;
                writeln!(f)
            }
        }
    }

    /// Leaf-kind text, without results, dependencies, or nesting.
    fn write_kind(&self, f: &mut fmt::Formatter<'_>, op: &Operation) -> fmt::Result {
        match &op.kind {
            OpKind::Constant { value } => write!(f, "constant {}", value),
            OpKind::Slice { buffer, indices } => {
                write!(f, "slice %{}[", buffer.0)?;
                for (i, ix) in indices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "%{}", ix.0)?;
                }
                write!(f, "]")
            }
            OpKind::Transfer(spec) => {
                write!(f, "transfer ")?;
                match &spec.shape {
                    TransferShape::Nd { src_dims, dst_dims } => {
                        write_endpoint(f, spec.src, src_dims)?;
                        write!(f, " -> ")?;
                        write_endpoint(f, spec.dst, dst_dims)
                    }
                    TransferShape::Plain {
                        src_extents,
                        dst_extents,
                        length,
                    } => {
                        write_extents(f, spec.src, src_extents)?;
                        write!(f, " -> ")?;
                        write_extents(f, spec.dst, dst_extents)?;
                        write!(f, " len %{}", length.0)
                    }
                }
            }
            OpKind::Alloc => write!(f, "alloc"),
            OpKind::Dealloc { buffer } => write!(f, "dealloc %{}", buffer.0),
            OpKind::Barrier => write!(f, "barrier"),
            OpKind::Yield { values } => {
                write!(f, "yield")?;
                for (i, v) in values.iter().enumerate() {
                    write!(f, "{} %{}", if i > 0 { "," } else { "" }, v.0)?;
                }
                Ok(())
            }
            OpKind::AllocScope { .. } | OpKind::DeallocScope { .. } | OpKind::Loop(_) => {
                // Structural kinds are handled by write_op.
                write!(f, "...")
            }
        }
    }

    fn write_deps(&self, f: &mut fmt::Formatter<'_>, op: &Operation) -> fmt::Result {
        if op.deps.is_empty() {
            return Ok(());
        }
        write!(f, " [")?;
        for (i, d) in op.deps.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "%{}", d.0)?;
        }
        write!(f, "]")
    }
}

fn write_endpoint(f: &mut fmt::Formatter<'_>, buffer: ValueId, dims: &[ShapeDim]) -> fmt::Result {
    write!(f, "%{}", buffer.0)?;
    if dims.is_empty() {
        return Ok(());
    }
    write!(f, "[")?;
    for (i, d) in dims.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "(%{}, %{}, %{})", d.offset.0, d.size.0, d.stride.0)?;
    }
    write!(f, "]")
}

fn write_extents(f: &mut fmt::Formatter<'_>, buffer: ValueId, extents: &[ValueId]) -> fmt::Result {
    write!(f, "%{}", buffer.0)?;
    if extents.is_empty() {
        return Ok(());
    }
    write!(f, "{{")?;
    for (i, e) in extents.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "%{}", e.0)?;
    }
    write!(f, "}}")
}
