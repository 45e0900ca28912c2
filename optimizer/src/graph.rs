// graph.rs — Dependency graph access and mutation for Weft IR
//
// Read/write view over a function's token-dependency graph: enumerate a
// node's incoming edges, find a token's consumers, add/remove edges, replace
// uses, and reposition an operation in program order (including across
// region boundaries). Mutations apply immediately; the hoisting rewriter is
// responsible for leaving the graph consistent at the end of each pattern
// application.
//
// Preconditions: ids belong to this function's arenas.
// Postconditions: after `move_before`/`move_after`, the op sits in the
//                 anchor's region with its `region` back-reference updated.
// Failure modes: none (malformed ids panic).
// Side effects: in-place mutation of the function.

use crate::id::{OpId, RegionId, ValueId};
use crate::ir::Func;

impl Func {
    /// Incoming dependency edges of `op`, in edge order.
    pub fn dependencies(&self, op: OpId) -> &[ValueId] {
        &self.op(op).deps
    }

    /// Every operation that uses `value` in any operand slot (dependency
    /// edges and structural operands alike), in arena order.
    pub fn consumers(&self, value: ValueId) -> Vec<OpId> {
        self.ops
            .iter()
            .filter(|op| op.all_operands().contains(&value))
            .map(|op| op.id)
            .collect()
    }

    /// Append a dependency edge from `op` onto `token`.
    pub fn add_dependency(&mut self, op: OpId, token: ValueId) {
        self.op_mut(op).deps.push(token);
    }

    /// Remove the dependency edge of `op` at `index`.
    pub fn remove_dependency(&mut self, op: OpId, index: usize) {
        self.op_mut(op).deps.remove(index);
    }

    /// Remove every dependency edge of `op` that points at `token`.
    pub fn remove_dependencies_on(&mut self, op: OpId, token: ValueId) {
        self.op_mut(op).deps.retain(|&d| d != token);
    }

    /// Drop all dependency edges of `op`.
    pub fn clear_dependencies(&mut self, op: OpId) {
        self.op_mut(op).deps.clear();
    }

    /// Point every use of `from` (in any operand slot of any op) at `to`.
    pub fn replace_all_uses(&mut self, from: ValueId, to: ValueId) {
        for op in &mut self.ops {
            op.for_each_operand_mut(|slot| {
                if *slot == from {
                    *slot = to;
                }
            });
        }
    }

    /// Relocate `op` to immediately before `anchor`, possibly across regions.
    pub fn move_before(&mut self, op: OpId, anchor: OpId) {
        self.detach(op);
        let region = self.op(anchor).region;
        let at = self.position(region, anchor);
        self.region_mut(region).ops.insert(at, op);
        self.op_mut(op).region = region;
    }

    /// Relocate `op` to immediately after `anchor`, possibly across regions.
    pub fn move_after(&mut self, op: OpId, anchor: OpId) {
        self.detach(op);
        let region = self.op(anchor).region;
        let at = self.position(region, anchor);
        self.region_mut(region).ops.insert(at + 1, op);
        self.op_mut(op).region = region;
    }

    /// True iff `producer` comes before `user` in program order, walking
    /// `user` up to the producer's region first.
    pub fn dominates(&self, producer: OpId, user: OpId) -> bool {
        let target = self.op(producer).region;
        let mut cur = user;
        while self.op(cur).region != target {
            match self.region(self.op(cur).region).parent {
                Some(parent_op) => cur = parent_op,
                None => return false,
            }
        }
        if cur == producer {
            return false;
        }
        let ops = &self.region(target).ops;
        let p = ops.iter().position(|&o| o == producer);
        let u = ops.iter().position(|&o| o == cur);
        matches!((p, u), (Some(p), Some(u)) if p < u)
    }

    /// Total number of dependency edges in the function.
    pub fn dep_edge_count(&self) -> usize {
        self.ops.iter().map(|op| op.deps.len()).sum()
    }

    /// Pre-order walk over all operations reachable from the body region.
    pub fn walk(&self, mut f: impl FnMut(OpId)) {
        self.walk_region(self.body, &mut f);
    }

    fn walk_region(&self, region: RegionId, f: &mut impl FnMut(OpId)) {
        for &op in &self.region(region).ops {
            f(op);
            if let Some(nested) = self.op(op).nested_region() {
                self.walk_region(nested, f);
            }
        }
    }

    fn detach(&mut self, op: OpId) {
        let region = self.op(op).region;
        let at = self.position(region, op);
        self.region_mut(region).ops.remove(at);
    }

    fn position(&self, region: RegionId, op: OpId) -> usize {
        self.region(region)
            .ops
            .iter()
            .position(|&o| o == op)
            .unwrap_or_else(|| panic!("op {:?} not found in region {:?}", op, region))
    }
}
