//! Serial schedule generation with resource feasibility.
//!
//! Post-processes CPM timings so no renewable capacity is exceeded at any
//! instant and consumable totals are accounted for. Steps are placed one at
//! a time: a step becomes eligible once all its predecessors are placed, and
//! among eligible steps the event key (earliest start, critical first, Asap
//! before Alap, step id) picks the next one. Resource pressure never fails
//! the solve; it delays steps and surfaces warnings.

use rustc_hash::FxHashMap;

use crate::config::EngineConfig;
use crate::cpm::{earliest_start_bound, CpmSolution};
use crate::graph::PrecedenceGraph;
use crate::interner::StepIdx;
use crate::models::{DependencyKind, ScheduleTemplate, TimingPolicy};
use crate::{log_checks, log_decisions};

use super::profile::ResourceProfile;

/// Final placement for every step plus the warnings gathered on the way.
pub struct Placement {
    /// Start offsets in minutes, indexed by interned step index.
    pub starts: Vec<i64>,
    pub ends: Vec<i64>,
    /// Resolved makespan (max end offset), which resource delays may have
    /// pushed past the CPM makespan.
    pub makespan: i64,
    pub warnings: Vec<String>,
}

/// One renewable requirement resolved to a resource slot.
#[derive(Clone, Copy)]
struct RenewableNeed {
    resource: usize,
    quantity: i64,
}

/// Run the resource-feasibility sweep.
///
/// `capacities` are the effective capacities (template values with any
/// inventory overrides applied), indexed like `template.resources`.
pub fn resolve_resources(
    template: &ScheduleTemplate,
    graph: &PrecedenceGraph,
    cpm: &CpmSolution,
    topo_order: &[StepIdx],
    capacities: &[i64],
    config: &EngineConfig,
) -> Placement {
    let steps = &template.steps;
    let n = steps.len();
    let durations: Vec<i64> = steps.iter().map(|s| s.duration_mins as i64).collect();

    let resource_index: FxHashMap<&str, usize> = template
        .resources
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.as_str(), i))
        .collect();

    let mut warnings: Vec<String> = Vec::new();

    // Consumables are a time-independent budget: compare total declared
    // demand against effective capacity once, up front.
    let mut consumable_demand: Vec<i64> = vec![0; template.resources.len()];
    for step in steps {
        for need in &step.resource_needs {
            if let Some(&ridx) = resource_index.get(need.resource_id.as_str()) {
                if !template.resources[ridx].kind.is_renewable() {
                    consumable_demand[ridx] += need.quantity as i64;
                }
            }
        }
    }
    for (ridx, resource) in template.resources.iter().enumerate() {
        if resource.kind.is_renewable() {
            continue;
        }
        let needed = consumable_demand[ridx];
        let available = capacities[ridx];
        if needed > available {
            warnings.push(format!(
                "Consumable '{}' is oversubscribed: needed={}, available={}, shortfall={}",
                resource.name,
                needed,
                available,
                needed - available
            ));
        }
    }

    // One usage profile per renewable resource.
    let mut profiles: Vec<Option<ResourceProfile>> = template
        .resources
        .iter()
        .enumerate()
        .map(|(ridx, r)| {
            r.kind
                .is_renewable()
                .then(|| ResourceProfile::new(r.name.clone(), capacities[ridx]))
        })
        .collect();

    let renewable_needs: Vec<Vec<RenewableNeed>> = steps
        .iter()
        .map(|step| {
            step.resource_needs
                .iter()
                .filter_map(|need| {
                    resource_index
                        .get(need.resource_id.as_str())
                        .filter(|&&ridx| template.resources[ridx].kind.is_renewable())
                        .map(|&ridx| RenewableNeed {
                            resource: ridx,
                            quantity: need.quantity as i64,
                        })
                })
                .collect()
        })
        .collect();

    // Tentative schedule starts from the CPM earliest placements.
    let mut starts: Vec<i64> = cpm.timings.iter().map(|t| t.earliest_start).collect();
    let mut ends: Vec<i64> = cpm.timings.iter().map(|t| t.earliest_finish).collect();

    // Serial placement over the eligible set.
    let mut pending: Vec<usize> = (0..n).map(|s| graph.preds(s).len()).collect();
    let mut eligible: Vec<usize> = (0..n).filter(|&s| pending[s] == 0).collect();

    let event_key = |s: usize| {
        let timing = &cpm.timings[s];
        (
            timing.earliest_start,
            u8::from(!timing.is_critical()),
            u8::from(steps[s].timing_policy() == TimingPolicy::Alap),
            steps[s].id.as_str(),
        )
    };

    for _ in 0..n {
        let s = *eligible
            .iter()
            .min_by_key(|&&s| event_key(s))
            .expect("eligible set drained early; graph must be acyclic");
        eligible.retain(|&x| x != s);

        // Predecessor bound recomputed from placed times; equals the CPM
        // earliest start while no predecessor has been delayed.
        let mut lower = 0;
        for &(p, kind) in graph.preds(s) {
            let p = p as usize;
            lower = lower.max(earliest_start_bound(
                kind,
                starts[p],
                ends[p],
                durations[s],
            ));
        }

        let needs = &renewable_needs[s];
        let (start, blockers) = if needs.is_empty() {
            (lower, Vec::new())
        } else {
            earliest_feasible(lower, durations[s], needs, &profiles, config.verbosity)
        };

        starts[s] = start;
        ends[s] = start + durations[s];
        for need in needs {
            if let Some(profile) = profiles[need.resource].as_mut() {
                profile.reserve(starts[s], ends[s], need.quantity);
            }
        }
        log_decisions!(
            config.verbosity,
            "placed '{}' at [{}, {})",
            steps[s].id,
            starts[s],
            ends[s]
        );

        if start > cpm.timings[s].latest_start && !blockers.is_empty() {
            warnings.push(format!(
                "Step '{}' was delayed beyond its available slack by resource conflict on '{}'",
                steps[s].title,
                blockers.join("', '")
            ));
        }

        for &(t, _) in graph.succs(s) {
            let t = t as usize;
            pending[t] -= 1;
            if pending[t] == 0 {
                eligible.push(t);
            }
        }
    }

    let mut makespan = ends.iter().copied().max().unwrap_or(0);

    // Second pass: slide Alap steps as late as their placed successors and
    // the resource profiles allow, without extending the makespan. Reverse
    // topological order guarantees successors are in final position.
    for &s in topo_order.iter().rev() {
        let s = s as usize;
        if steps[s].timing_policy() != TimingPolicy::Alap {
            continue;
        }

        let mut upper = makespan - durations[s];
        for &(t, kind) in graph.succs(s) {
            let t = t as usize;
            let bound = match kind {
                DependencyKind::FinishToStart => starts[t] - durations[s],
                DependencyKind::StartToStart => starts[t],
                DependencyKind::FinishToFinish => ends[t] - durations[s],
                DependencyKind::StartToFinish => ends[t],
            };
            upper = upper.min(bound);
        }
        if upper <= starts[s] {
            continue;
        }

        let needs = &renewable_needs[s];
        let new_start = if needs.is_empty() {
            upper
        } else {
            for need in needs {
                if let Some(profile) = profiles[need.resource].as_mut() {
                    profile.release(starts[s], ends[s], need.quantity);
                }
            }
            let found =
                latest_feasible(starts[s], upper, durations[s], needs, &profiles).unwrap_or(starts[s]);
            for need in needs {
                if let Some(profile) = profiles[need.resource].as_mut() {
                    profile.reserve(found, found + durations[s], need.quantity);
                }
            }
            found
        };

        if new_start != starts[s] {
            log_decisions!(
                config.verbosity,
                "shifted Alap step '{}' from {} to {}",
                steps[s].id,
                starts[s],
                new_start
            );
            starts[s] = new_start;
            ends[s] = new_start + durations[s];
        }
    }

    makespan = makespan.max(ends.iter().copied().max().unwrap_or(0));

    Placement {
        starts,
        ends,
        makespan,
        warnings,
    }
}

/// Smallest `t >= from` where every need fits over `[t, t + duration)`.
///
/// Usage only drops at reservation ends, so the candidates are `from` plus
/// every later reservation end across the needed profiles. Also returns the
/// names of the resources that blocked the first candidate, for warning
/// attribution. If a need exceeds capacity outright no instant ever fits;
/// the step is placed at `from` and the capacity stays formally exceeded.
fn earliest_feasible(
    from: i64,
    duration: i64,
    needs: &[RenewableNeed],
    profiles: &[Option<ResourceProfile>],
    verbosity: u8,
) -> (i64, Vec<String>) {
    let mut candidates: Vec<i64> = vec![from];
    for need in needs {
        if let Some(profile) = profiles[need.resource].as_ref() {
            for r in profile.reservations() {
                if r.end > from {
                    candidates.push(r.end);
                }
            }
        }
    }
    candidates.sort_unstable();
    candidates.dedup();

    let mut first_blockers: Vec<String> = Vec::new();
    for (i, &t) in candidates.iter().enumerate() {
        let failing: Vec<&ResourceProfile> = needs
            .iter()
            .filter_map(|need| {
                profiles[need.resource]
                    .as_ref()
                    .filter(|p| !p.fits(t, duration, need.quantity))
            })
            .collect();
        if failing.is_empty() {
            return (t, first_blockers);
        }
        log_checks!(verbosity, "slot {} rejected by {} resource(s)", t, failing.len());
        if i == 0 {
            first_blockers = failing.iter().map(|p| p.name.clone()).collect();
        }
    }

    (from, first_blockers)
}

/// Largest `t` in `[lo, hi]` where every need fits over `[t, t + duration)`,
/// or `None` when no candidate in the window fits.
///
/// Mirrors the earliest search: going backward, feasibility changes where a
/// window would first touch a reservation (`start - duration`) or clear one
/// (`end`).
fn latest_feasible(
    lo: i64,
    hi: i64,
    duration: i64,
    needs: &[RenewableNeed],
    profiles: &[Option<ResourceProfile>],
) -> Option<i64> {
    let mut candidates: Vec<i64> = vec![hi];
    for need in needs {
        if let Some(profile) = profiles[need.resource].as_ref() {
            for r in profile.reservations() {
                let before = r.start - duration;
                if before >= lo && before <= hi {
                    candidates.push(before);
                }
                if r.end >= lo && r.end <= hi {
                    candidates.push(r.end);
                }
            }
        }
    }
    candidates.sort_unstable();
    candidates.dedup();

    candidates.iter().rev().copied().find(|&t| {
        needs.iter().all(|need| {
            profiles[need.resource]
                .as_ref()
                .map_or(true, |p| p.fits(t, duration, need.quantity))
        })
    })
}
