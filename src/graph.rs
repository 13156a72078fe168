//! Precedence graph: adjacency lists, topological ordering, cycle detection.
//!
//! The graph is a plain DAG over interned step indexes. It owns no step data;
//! forward and reverse adjacency both index into the template's step list.

use std::collections::VecDeque;

use crate::interner::{StepIdx, StepInterner};
use crate::models::{DependencyKind, Step};

/// Forward and reverse adjacency for the precedence relation.
///
/// `preds(s)` holds the incoming edges declared by step `s`; `succs(s)` the
/// mirrored outgoing edges. Duplicate edges between the same pair are kept;
/// the CPM passes take the max (forward) / min (backward) over all of them,
/// so the stronger constraint wins.
pub struct PrecedenceGraph {
    preds: Vec<Vec<(StepIdx, DependencyKind)>>,
    succs: Vec<Vec<(StepIdx, DependencyKind)>>,
}

impl PrecedenceGraph {
    /// Build adjacency from validated steps. Dependencies referencing
    /// unknown ids have been rejected upstream and are skipped here.
    pub fn new(steps: &[Step], interner: &StepInterner) -> Self {
        let n = steps.len();
        let mut preds: Vec<Vec<(StepIdx, DependencyKind)>> = vec![Vec::new(); n];
        let mut succs: Vec<Vec<(StepIdx, DependencyKind)>> = vec![Vec::new(); n];

        for (idx, step) in steps.iter().enumerate() {
            for dep in &step.dependencies {
                if let Some(pred) = interner.get(&dep.step_id) {
                    preds[idx].push((pred, dep.dependency_type));
                    succs[pred as usize].push((idx as StepIdx, dep.dependency_type));
                }
            }
        }

        Self { preds, succs }
    }

    pub fn len(&self) -> usize {
        self.preds.len()
    }

    pub fn preds(&self, step: usize) -> &[(StepIdx, DependencyKind)] {
        &self.preds[step]
    }

    pub fn succs(&self, step: usize) -> &[(StepIdx, DependencyKind)] {
        &self.succs[step]
    }

    /// Topological ordering via Kahn's algorithm.
    ///
    /// Ties are resolved by ascending step index (declaration order), which
    /// keeps the ordering deterministic. On a cycle, returns one concrete
    /// cycle path with the entry step repeated at the end.
    pub fn topo_sort(&self) -> Result<Vec<StepIdx>, Vec<StepIdx>> {
        let n = self.len();
        let mut in_degree: Vec<usize> = self.preds.iter().map(|p| p.len()).collect();

        let mut queue: VecDeque<usize> = (0..n).filter(|&s| in_degree[s] == 0).collect();
        let mut order: Vec<StepIdx> = Vec::with_capacity(n);

        while let Some(s) = queue.pop_front() {
            order.push(s as StepIdx);
            for &(t, _) in &self.succs[s] {
                let t = t as usize;
                in_degree[t] -= 1;
                if in_degree[t] == 0 {
                    queue.push_back(t);
                }
            }
        }

        if order.len() != n {
            return Err(self.find_cycle());
        }
        Ok(order)
    }

    /// Locate one cycle with a depth-first walk tracking the recursion stack.
    /// Only called after Kahn's algorithm came up short, so a cycle exists.
    fn find_cycle(&self) -> Vec<StepIdx> {
        let n = self.len();
        let mut visited = vec![false; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<StepIdx> = Vec::new();

        for start in 0..n {
            if !visited[start] {
                if let Some(cycle) =
                    self.cycle_dfs(start, &mut visited, &mut on_stack, &mut stack)
                {
                    return cycle;
                }
            }
        }
        Vec::new()
    }

    fn cycle_dfs(
        &self,
        node: usize,
        visited: &mut [bool],
        on_stack: &mut [bool],
        stack: &mut Vec<StepIdx>,
    ) -> Option<Vec<StepIdx>> {
        visited[node] = true;
        on_stack[node] = true;
        stack.push(node as StepIdx);

        for &(next, _) in &self.succs[node] {
            let next_usize = next as usize;
            if on_stack[next_usize] {
                // Back edge: the cycle runs from `next` to the stack top.
                let entry = stack.iter().position(|&s| s == next).unwrap_or(0);
                let mut cycle: Vec<StepIdx> = stack[entry..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            if !visited[next_usize] {
                if let Some(cycle) = self.cycle_dfs(next_usize, visited, on_stack, stack) {
                    return Some(cycle);
                }
            }
        }

        on_stack[node] = false;
        stack.pop();
        None
    }
}
