// builder.rs — Programmatic construction of Weft functions
//
// Region-stack builder: operations append to the innermost open region,
// `start_loop`/`end_loop` bracket loop bodies. Produces the same structural
// shape the upstream IR builder emits (alloc/dealloc wrapped in single-op
// scopes, loop bodies terminated by a yield).
//
// Preconditions: values passed as operands were created by this builder.
// Postconditions: `finish` returns a function whose region stack is closed.
// Failure modes: unbalanced `start_loop`/`end_loop` panics in `finish`.
// Side effects: none outside the built function.

use crate::id::{OpId, RegionId, ValueId};
use crate::ir::{
    Func, LoopSpec, OpKind, Operation, Region, ShapeDim, TransferShape, TransferSpec, Type, Value,
    ValueDef,
};

/// Handle to a loop under construction.
pub struct LoopHandle {
    pub op: OpId,
    /// Body region argument 0: the induction variable.
    pub induction: ValueId,
    /// Body region argument 1: the iteration-carried completion token.
    pub iter_token: ValueId,
}

pub struct FuncBuilder {
    func: Func,
    stack: Vec<RegionId>,
}

impl FuncBuilder {
    pub fn new(name: &str) -> Self {
        let body = RegionId(0);
        FuncBuilder {
            func: Func {
                name: name.to_string(),
                body,
                ops: Vec::new(),
                values: Vec::new(),
                regions: vec![Region {
                    id: body,
                    parent: None,
                    args: Vec::new(),
                    ops: Vec::new(),
                }],
            },
            stack: vec![body],
        }
    }

    /// Read access to the function under construction.
    pub fn func(&self) -> &Func {
        &self.func
    }

    /// Add a function argument (an argument of the body region).
    pub fn arg(&mut self, ty: Type) -> ValueId {
        let body = self.func.body;
        let index = self.func.region(body).args.len() as u32;
        let v = self.new_value(ty, ValueDef::RegionArg { region: body, index });
        self.func.region_mut(body).args.push(v);
        v
    }

    pub fn constant(&mut self, value: i64) -> ValueId {
        let op = self.push_op(OpKind::Constant { value }, &[], &[Type::Index]);
        self.func.op(op).results[0]
    }

    pub fn slice(&mut self, buffer: ValueId, indices: &[ValueId]) -> ValueId {
        let op = self.push_op(
            OpKind::Slice {
                buffer,
                indices: indices.to_vec(),
            },
            &[],
            &[Type::Buffer],
        );
        self.func.op(op).results[0]
    }

    /// Allocation wrapped in its scoping construct.
    /// Returns (scope op, completion token, allocated buffer).
    pub fn alloc_scope(&mut self, deps: &[ValueId]) -> (OpId, ValueId, ValueId) {
        let scope = self.push_op(
            OpKind::AllocScope { body: RegionId(0) },
            deps,
            &[Type::Token, Type::Buffer],
        );
        let body = self.new_region(Some(scope));
        self.push_inner_op(body, OpKind::Alloc);
        match &mut self.func.op_mut(scope).kind {
            OpKind::AllocScope { body: b } => *b = body,
            _ => unreachable!(),
        }
        let results = &self.func.op(scope).results;
        (scope, results[0], results[1])
    }

    /// Deallocation wrapped in its scoping construct.
    /// Returns (scope op, completion token).
    pub fn dealloc_scope(&mut self, buffer: ValueId, deps: &[ValueId]) -> (OpId, ValueId) {
        let scope = self.push_op(
            OpKind::DeallocScope { body: RegionId(0) },
            deps,
            &[Type::Token],
        );
        let body = self.new_region(Some(scope));
        self.push_inner_op(body, OpKind::Dealloc { buffer });
        match &mut self.func.op_mut(scope).kind {
            OpKind::DeallocScope { body: b } => *b = body,
            _ => unreachable!(),
        }
        (scope, self.func.op(scope).results[0])
    }

    /// Indexed-form transfer. Empty dimension lists denote whole-buffer
    /// endpoints. Returns (op, completion token).
    pub fn transfer_nd(
        &mut self,
        src: ValueId,
        dst: ValueId,
        src_dims: Vec<ShapeDim>,
        dst_dims: Vec<ShapeDim>,
        deps: &[ValueId],
    ) -> (OpId, ValueId) {
        let op = self.push_op(
            OpKind::Transfer(TransferSpec {
                src,
                dst,
                shape: TransferShape::Nd { src_dims, dst_dims },
            }),
            deps,
            &[Type::Token],
        );
        (op, self.func.op(op).results[0])
    }

    /// Plain-form transfer with raw extents and a total length.
    /// Returns (op, completion token).
    pub fn transfer_plain(
        &mut self,
        src: ValueId,
        dst: ValueId,
        src_extents: Vec<ValueId>,
        dst_extents: Vec<ValueId>,
        length: ValueId,
        deps: &[ValueId],
    ) -> (OpId, ValueId) {
        let op = self.push_op(
            OpKind::Transfer(TransferSpec {
                src,
                dst,
                shape: TransferShape::Plain {
                    src_extents,
                    dst_extents,
                    length,
                },
            }),
            deps,
            &[Type::Token],
        );
        (op, self.func.op(op).results[0])
    }

    pub fn barrier(&mut self, deps: &[ValueId]) -> (OpId, ValueId) {
        let op = self.push_op(OpKind::Barrier, deps, &[Type::Token]);
        (op, self.func.op(op).results[0])
    }

    /// Open a loop; subsequent operations land in its body until `end_loop`.
    pub fn start_loop(
        &mut self,
        lower: ValueId,
        upper: ValueId,
        step: ValueId,
        init: ValueId,
    ) -> LoopHandle {
        let op = self.push_op(
            OpKind::Loop(LoopSpec {
                lower,
                upper,
                step,
                init,
                body: RegionId(0),
            }),
            &[],
            &[Type::Token],
        );
        let body = self.new_region(Some(op));
        let induction = self.new_value(
            Type::Index,
            ValueDef::RegionArg {
                region: body,
                index: 0,
            },
        );
        let iter_token = self.new_value(
            Type::Token,
            ValueDef::RegionArg {
                region: body,
                index: 1,
            },
        );
        self.func.region_mut(body).args = vec![induction, iter_token];
        match &mut self.func.op_mut(op).kind {
            OpKind::Loop(spec) => spec.body = body,
            _ => unreachable!(),
        }
        self.stack.push(body);
        LoopHandle {
            op,
            induction,
            iter_token,
        }
    }

    /// Close the innermost loop, yielding `token` to the next iteration.
    pub fn end_loop(&mut self, handle: &LoopHandle, token: ValueId) {
        let body = self.func.loop_spec(handle.op).body;
        assert_eq!(
            self.cur(),
            body,
            "end_loop must close the innermost open loop"
        );
        self.push_op(
            OpKind::Yield {
                values: vec![token],
            },
            &[],
            &[],
        );
        self.stack.pop();
    }

    pub fn finish(self) -> Func {
        assert_eq!(self.stack.len(), 1, "unclosed loop body at finish");
        self.func
    }

    // ── Internal ────────────────────────────────────────────────────────

    fn cur(&self) -> RegionId {
        *self.stack.last().unwrap()
    }

    fn new_region(&mut self, parent: Option<OpId>) -> RegionId {
        let id = RegionId(self.func.regions.len() as u32);
        self.func.regions.push(Region {
            id,
            parent,
            args: Vec::new(),
            ops: Vec::new(),
        });
        id
    }

    fn new_value(&mut self, ty: Type, def: ValueDef) -> ValueId {
        let id = ValueId(self.func.values.len() as u32);
        self.func.values.push(Value { id, ty, def });
        id
    }

    fn push_op(&mut self, kind: OpKind, deps: &[ValueId], result_tys: &[Type]) -> OpId {
        let id = OpId(self.func.ops.len() as u32);
        let results: Vec<ValueId> = result_tys
            .iter()
            .enumerate()
            .map(|(index, &ty)| {
                self.new_value(
                    ty,
                    ValueDef::OpResult {
                        op: id,
                        index: index as u32,
                    },
                )
            })
            .collect();
        let region = self.cur();
        self.func.ops.push(Operation {
            id,
            kind,
            deps: deps.to_vec(),
            results,
            region,
        });
        self.func.region_mut(region).ops.push(id);
        id
    }

    /// Append an op to a scope body without touching the region stack.
    fn push_inner_op(&mut self, region: RegionId, kind: OpKind) -> OpId {
        let id = OpId(self.func.ops.len() as u32);
        self.func.ops.push(Operation {
            id,
            kind,
            deps: Vec::new(),
            results: Vec::new(),
            region,
        });
        self.func.region_mut(region).ops.push(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_have_single_body_op() {
        let mut b = FuncBuilder::new("f");
        let (scope, token, buffer) = b.alloc_scope(&[]);
        let (dscope, _) = b.dealloc_scope(buffer, &[token]);
        let f = b.finish();

        let alloc_body = match f.op(scope).kind {
            OpKind::AllocScope { body } => body,
            _ => panic!("expected alloc scope"),
        };
        assert_eq!(f.region(alloc_body).ops.len(), 1);
        assert!(matches!(
            f.op(f.region(alloc_body).ops[0]).kind,
            OpKind::Alloc
        ));

        let dealloc_body = match f.op(dscope).kind {
            OpKind::DeallocScope { body } => body,
            _ => panic!("expected dealloc scope"),
        };
        assert!(matches!(
            f.op(f.region(dealloc_body).ops[0]).kind,
            OpKind::Dealloc { buffer: bf } if bf == buffer
        ));
    }

    #[test]
    fn loop_body_args_and_terminator() {
        let mut b = FuncBuilder::new("f");
        let (_, t0) = b.barrier(&[]);
        let c0 = b.constant(0);
        let c8 = b.constant(8);
        let c1 = b.constant(1);
        let lp = b.start_loop(c0, c8, c1, t0);
        let (_, bt) = b.barrier(&[lp.iter_token]);
        b.end_loop(&lp, bt);
        let f = b.finish();

        assert_eq!(f.induction_var(lp.op), lp.induction);
        assert_eq!(f.iter_arg(lp.op), lp.iter_token);
        assert_eq!(f.value(lp.induction).ty, Type::Index);
        assert_eq!(f.value(lp.iter_token).ty, Type::Token);
        let body = f.loop_spec(lp.op).body;
        let term = f.terminator(body).unwrap();
        assert!(matches!(&f.op(term).kind, OpKind::Yield { values } if values == &vec![bt]));
    }

    #[test]
    #[should_panic(expected = "unclosed loop body")]
    fn finish_rejects_open_loop() {
        let mut b = FuncBuilder::new("f");
        let (_, t0) = b.barrier(&[]);
        let c0 = b.constant(0);
        let c8 = b.constant(8);
        let c1 = b.constant(1);
        let _lp = b.start_loop(c0, c8, c1, t0);
        let _ = b.finish();
    }
}
