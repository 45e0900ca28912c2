// verify.rs — Structural verifier for Weft IR
//
// Checks the invariants the optimizer relies on and must preserve: arena and
// region back-reference consistency, operand typing, def-before-use
// dominance across nested regions, single-token results on asynchronous
// ops, scope body shape, loop terminators, and acyclicity of the token
// dependency graph.
//
// Preconditions: none.
// Postconditions: returns one diagnostic per violation; an empty vector
//                 means the function is well-formed.
// Failure modes: none (violations are reported, not panicked on).
// Side effects: none.

use crate::diag::{codes, Diagnostic};
use crate::id::{OpId, RegionId, ValueId};
use crate::ir::{Func, Module, OpKind, Type, ValueDef};

/// Verify every function in the module.
pub fn verify(module: &Module) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    for func in &module.funcs {
        diags.extend(verify_func(func));
    }
    diags
}

/// Verify a single function.
pub fn verify_func(func: &Func) -> Vec<Diagnostic> {
    let mut v = Verifier {
        func,
        diags: Vec::new(),
    };
    v.check_regions();
    v.check_ops();
    v.check_dependency_cycles();
    v.diags
}

struct Verifier<'f> {
    func: &'f Func,
    diags: Vec<Diagnostic>,
}

impl<'f> Verifier<'f> {
    fn error(&mut self, code: crate::diag::DiagCode, op: OpId, message: String) {
        self.diags
            .push(Diagnostic::error(message).with_code(code).with_op(op));
    }

    // ── Region structure ────────────────────────────────────────────────

    fn check_regions(&mut self) {
        for region in &self.func.regions {
            for &op in &region.ops {
                if op.index() >= self.func.ops.len() {
                    self.diags.push(
                        Diagnostic::error(format!(
                            "region {} lists out-of-range op {}",
                            region.id.0, op.0
                        ))
                        .with_code(codes::REGION_STRUCTURE),
                    );
                    continue;
                }
                if self.func.op(op).region != region.id {
                    self.error(
                        codes::REGION_STRUCTURE,
                        op,
                        format!(
                            "op sits in region {} but back-references region {}",
                            region.id.0,
                            self.func.op(op).region.0
                        ),
                    );
                }
            }
        }
        for op in &self.func.ops {
            if let Some(nested) = op.nested_region() {
                if self.func.region(nested).parent != Some(op.id) {
                    self.error(
                        codes::REGION_STRUCTURE,
                        op.id,
                        format!("nested region {} does not name this op as parent", nested.0),
                    );
                }
            }
        }
    }

    // ── Per-op checks ───────────────────────────────────────────────────

    fn check_ops(&mut self) {
        for op in &self.func.ops {
            self.check_token_results(op.id);
            self.check_operand_types(op.id);
            self.check_dominance(op.id);
            match &op.kind {
                OpKind::AllocScope { body } => self.check_scope(op.id, *body, true),
                OpKind::DeallocScope { body } => self.check_scope(op.id, *body, false),
                OpKind::Loop(spec) => self.check_loop(op.id, spec.body),
                _ => {}
            }
        }
    }

    fn check_token_results(&mut self, op: OpId) {
        let is_async = matches!(
            self.func.op(op).kind,
            OpKind::Transfer(_)
                | OpKind::AllocScope { .. }
                | OpKind::DeallocScope { .. }
                | OpKind::Barrier
                | OpKind::Loop(_)
        );
        if !is_async {
            return;
        }
        let tokens = self
            .func
            .op(op)
            .results
            .iter()
            .filter(|&&r| self.func.value(r).ty == Type::Token)
            .count();
        if tokens != 1 {
            self.error(
                codes::TOKEN_RESULT,
                op,
                format!("asynchronous op has {} token results, expected 1", tokens),
            );
        }
    }

    fn check_operand_types(&mut self, op: OpId) {
        for &dep in self.func.dependencies(op) {
            self.expect_type(op, dep, Type::Token, "dependency edge");
        }
        match &self.func.op(op).kind {
            OpKind::Slice { buffer, indices } => {
                self.expect_type(op, *buffer, Type::Buffer, "slice buffer");
                for &ix in indices {
                    self.expect_type(op, ix, Type::Index, "slice index");
                }
            }
            OpKind::Transfer(spec) => {
                self.expect_type(op, spec.src, Type::Buffer, "transfer source");
                self.expect_type(op, spec.dst, Type::Buffer, "transfer destination");
                for &shape_value in self
                    .func
                    .op(op)
                    .operands()
                    .iter()
                    .skip(2)
                {
                    self.expect_type(op, shape_value, Type::Index, "shape component");
                }
            }
            OpKind::Dealloc { buffer } => {
                self.expect_type(op, *buffer, Type::Buffer, "dealloc buffer");
            }
            OpKind::Loop(spec) => {
                self.expect_type(op, spec.lower, Type::Index, "loop lower bound");
                self.expect_type(op, spec.upper, Type::Index, "loop upper bound");
                self.expect_type(op, spec.step, Type::Index, "loop step");
                self.expect_type(op, spec.init, Type::Token, "loop iteration operand");
            }
            _ => {}
        }
    }

    fn expect_type(&mut self, op: OpId, v: ValueId, ty: Type, what: &str) {
        if v.index() >= self.func.values.len() {
            self.error(
                codes::OPERAND_TYPE,
                op,
                format!("{} references out-of-range value {}", what, v.0),
            );
            return;
        }
        let actual = self.func.value(v).ty;
        if actual != ty {
            self.error(
                codes::OPERAND_TYPE,
                op,
                format!("{} %{} has type {}, expected {}", what, v.0, actual, ty),
            );
        }
    }

    fn check_scope(&mut self, op: OpId, body: RegionId, alloc: bool) {
        let ops = &self.func.region(body).ops;
        let well_formed = ops.len() == 1
            && match (alloc, &self.func.op(ops[0]).kind) {
                (true, OpKind::Alloc) => true,
                (false, OpKind::Dealloc { .. }) => true,
                _ => false,
            };
        if !well_formed {
            self.error(
                codes::SCOPE_SHAPE,
                op,
                format!(
                    "{} scope body must hold exactly one {} op",
                    if alloc { "allocation" } else { "deallocation" },
                    if alloc { "alloc" } else { "dealloc" },
                ),
            );
        }
    }

    fn check_loop(&mut self, op: OpId, body: RegionId) {
        let region = self.func.region(body);
        if region.args.len() != 2
            || self.func.value(region.args[0]).ty != Type::Index
            || self.func.value(region.args[1]).ty != Type::Token
        {
            self.error(
                codes::LOOP_TERMINATOR,
                op,
                "loop body must take (index, token) arguments".to_string(),
            );
        }
        match region.ops.last() {
            Some(&term) => match &self.func.op(term).kind {
                OpKind::Yield { values }
                    if values.len() == 1
                        && self.func.value(values[0]).ty == Type::Token => {}
                _ => self.error(
                    codes::LOOP_TERMINATOR,
                    op,
                    "loop body must end in a yield of one token".to_string(),
                ),
            },
            None => self.error(
                codes::LOOP_TERMINATOR,
                op,
                "loop body is empty".to_string(),
            ),
        }
    }

    // ── Dominance ───────────────────────────────────────────────────────

    fn check_dominance(&mut self, op: OpId) {
        for v in self.func.op(op).all_operands() {
            if v.index() >= self.func.values.len() {
                continue; // reported by the type check
            }
            match self.func.value(v).def {
                ValueDef::RegionArg { region, .. } => {
                    if !self.region_encloses(region, self.func.op(op).region) {
                        self.error(
                            codes::DOMINANCE,
                            op,
                            format!("uses argument %{} of a non-enclosing region", v.0),
                        );
                    }
                }
                ValueDef::OpResult { op: producer, .. } => {
                    if !self.func.dominates(producer, op) {
                        self.error(
                            codes::DOMINANCE,
                            op,
                            format!("use of %{} is not dominated by its definition", v.0),
                        );
                    }
                }
            }
        }
    }

    /// True iff `outer` is `inner` or an ancestor of `inner`.
    fn region_encloses(&self, outer: RegionId, inner: RegionId) -> bool {
        let mut cur = inner;
        loop {
            if cur == outer {
                return true;
            }
            match self.func.region(cur).parent {
                Some(parent_op) => cur = self.func.op(parent_op).region,
                None => return false,
            }
        }
    }

    // ── Token graph acyclicity ──────────────────────────────────────────

    fn check_dependency_cycles(&mut self) {
        // producer → consumer edges over token-typed operands.
        let n = self.func.ops.len();
        let mut succ: Vec<Vec<OpId>> = vec![Vec::new(); n];
        for op in &self.func.ops {
            for v in op.all_operands() {
                if v.index() >= self.func.values.len() {
                    continue;
                }
                if self.func.value(v).ty != Type::Token {
                    continue;
                }
                if let Some(producer) = self.func.producer(v) {
                    succ[producer.index()].push(op.id);
                }
            }
        }
        // Iterative three-color DFS.
        let mut state = vec![0u8; n]; // 0 white, 1 gray, 2 black
        for start in 0..n {
            if state[start] != 0 {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            state[start] = 1;
            while let Some(top) = stack.last_mut() {
                let (node, edge) = *top;
                if edge == succ[node].len() {
                    state[node] = 2;
                    stack.pop();
                    continue;
                }
                top.1 += 1;
                let next = succ[node][edge].index();
                match state[next] {
                    0 => {
                        state[next] = 1;
                        stack.push((next, 0));
                    }
                    1 => {
                        // Back edge: report and keep scanning so every
                        // independent cycle gets its own diagnostic.
                        self.error(
                            codes::DEPENDENCY_CYCLE,
                            OpId(next as u32),
                            "token dependency graph contains a cycle".to_string(),
                        );
                    }
                    _ => {}
                }
            }
        }
    }
}
