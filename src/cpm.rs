//! Critical Path Method passes over the precedence graph.
//!
//! Forward pass computes earliest start/finish, backward pass latest
//! start/finish; total float is their gap and zero float marks a critical
//! step. All arithmetic is in integer minutes relative to project start 0.

use crate::graph::PrecedenceGraph;
use crate::interner::StepIdx;
use crate::models::DependencyKind;

/// Per-step timing from the forward and backward passes, in minutes from
/// project start.
#[derive(Clone, Debug, Default)]
pub struct StepTiming {
    pub earliest_start: i64,
    pub earliest_finish: i64,
    pub latest_start: i64,
    pub latest_finish: i64,
}

impl StepTiming {
    /// Total float (slack). Clamped at zero: the conservative backward
    /// bounds can dip below the clamped earliest start in start-to-finish
    /// graphs, and negative slack has no meaning on the output.
    pub fn total_float(&self) -> i64 {
        (self.latest_start - self.earliest_start).max(0)
    }

    pub fn is_critical(&self) -> bool {
        self.total_float() == 0
    }
}

/// Result of both CPM passes.
pub struct CpmSolution {
    /// Indexed by interned step index.
    pub timings: Vec<StepTiming>,
    /// Project makespan: max earliest finish over all steps.
    pub makespan: i64,
}

impl CpmSolution {
    /// Critical step indexes in the given topological order.
    pub fn critical_steps(&self, topo_order: &[StepIdx]) -> Vec<StepIdx> {
        topo_order
            .iter()
            .copied()
            .filter(|&s| self.timings[s as usize].is_critical())
            .collect()
    }
}

/// Earliest-start lower bound one incoming edge imposes on its successor.
pub fn earliest_start_bound(
    kind: DependencyKind,
    pred_start: i64,
    pred_finish: i64,
    succ_duration: i64,
) -> i64 {
    match kind {
        DependencyKind::FinishToStart => pred_finish,
        DependencyKind::StartToStart => pred_start,
        DependencyKind::FinishToFinish => pred_finish - succ_duration,
        DependencyKind::StartToFinish => pred_start - succ_duration,
    }
}

/// Latest-finish upper bound one outgoing edge imposes on its predecessor.
fn latest_finish_bound(
    kind: DependencyKind,
    succ: &StepTiming,
    pred_duration: i64,
    succ_duration: i64,
) -> i64 {
    match kind {
        DependencyKind::FinishToStart => succ.latest_start,
        DependencyKind::StartToStart => succ.latest_start + pred_duration,
        DependencyKind::FinishToFinish => succ.latest_finish,
        DependencyKind::StartToFinish => succ.latest_finish - succ_duration + pred_duration,
    }
}

/// Run both CPM passes. `durations` is indexed by interned step index and
/// `topo_order` must come from [`PrecedenceGraph::topo_sort`], so every
/// predecessor is final when its successor is visited (and vice versa on the
/// reverse sweep). Cannot fail on an acyclic graph.
pub fn run(graph: &PrecedenceGraph, durations: &[i64], topo_order: &[StepIdx]) -> CpmSolution {
    let n = durations.len();
    let mut timings = vec![StepTiming::default(); n];

    // Forward pass: sources pin to zero, everything else to the strongest
    // incoming bound. Duplicate edges fold into the max naturally.
    for &s in topo_order {
        let s = s as usize;
        let mut es: i64 = 0;
        for &(p, kind) in graph.preds(s) {
            let pred = &timings[p as usize];
            es = es.max(earliest_start_bound(
                kind,
                pred.earliest_start,
                pred.earliest_finish,
                durations[s],
            ));
        }
        timings[s].earliest_start = es;
        timings[s].earliest_finish = es + durations[s];
    }

    let makespan = timings
        .iter()
        .map(|t| t.earliest_finish)
        .max()
        .unwrap_or(0);

    // Backward pass: sinks pin to the makespan, everything else to the
    // tightest outgoing bound.
    for &s in topo_order.iter().rev() {
        let s = s as usize;
        let mut lf = makespan;
        for &(t, kind) in graph.succs(s) {
            lf = lf.min(latest_finish_bound(
                kind,
                &timings[t as usize],
                durations[s],
                durations[t as usize],
            ));
        }
        timings[s].latest_finish = lf;
        timings[s].latest_start = lf - durations[s];
    }

    CpmSolution { timings, makespan }
}
