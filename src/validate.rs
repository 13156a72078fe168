//! Template validation: structural errors and pre-solve advisories.
//!
//! `check_template` is the gate the solver runs before anything else: schema
//! bounds and referential integrity, reported with JSON-pointer style paths
//! where a concrete field is at fault. `validate` is the dry-run entry point:
//! it re-runs the same checks, adds cycle detection, and -- when the template
//! is structurally sound -- derives advisory warnings from the CPM timings
//! without running the resource sweep.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::anchor;
use crate::cpm;
use crate::graph::PrecedenceGraph;
use crate::interner::StepInterner;
use crate::models::ScheduleTemplate;
use crate::solver::profile::ResourceProfile;

/// Structured diagnostics: errors block solving, warnings are advisory.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Schema bounds and referential integrity. Returns every violation found;
/// an empty result means the template is safe to solve.
pub(crate) fn check_template(template: &ScheduleTemplate) -> Vec<String> {
    let mut errors: Vec<String> = Vec::new();

    if template.id.trim().is_empty() {
        errors.push("/id: must be a non-empty string".to_string());
    }

    let step_ids: FxHashSet<&str> = template.steps.iter().map(|s| s.id.as_str()).collect();
    let resource_ids: FxHashSet<&str> =
        template.resources.iter().map(|r| r.id.as_str()).collect();
    let track_ids: FxHashSet<&str> = template.tracks.iter().map(|t| t.id.as_str()).collect();

    let mut seen_steps: FxHashSet<&str> = FxHashSet::default();
    for (i, step) in template.steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            errors.push(format!("/steps/{i}/id: must be a non-empty string"));
        } else if !seen_steps.insert(step.id.as_str()) {
            errors.push(format!(
                "Duplicate step ID '{}' -- each step must have a unique ID",
                step.id
            ));
        }
        if step.title.trim().is_empty() {
            errors.push(format!("/steps/{i}/title: must be a non-empty string"));
        }
        if step.duration_mins == 0 {
            errors.push(format!("/steps/{i}/durationMins: must be at least 1"));
        }

        for dep in &step.dependencies {
            if dep.step_id == step.id {
                errors.push(format!("Step '{}' may not depend on itself", step.id));
            } else if !step_ids.contains(dep.step_id.as_str()) {
                errors.push(format!(
                    "Step '{}' depends on '{}' which doesn't exist",
                    step.title, dep.step_id
                ));
            }
        }

        for (j, need) in step.resource_needs.iter().enumerate() {
            if !resource_ids.contains(need.resource_id.as_str()) {
                errors.push(format!(
                    "Step '{}' requires resource '{}' which isn't defined",
                    step.title, need.resource_id
                ));
            }
            if need.quantity == 0 {
                errors.push(format!(
                    "/steps/{i}/resourceNeeds/{j}/quantity: must be at least 1"
                ));
            }
            if need.min_people == Some(0) {
                errors.push(format!(
                    "/steps/{i}/resourceNeeds/{j}/minPeople: must be at least 1"
                ));
            }
            if need.max_people == Some(0) {
                errors.push(format!(
                    "/steps/{i}/resourceNeeds/{j}/maxPeople: must be at least 1"
                ));
            }
            if let (Some(min), Some(max)) = (need.min_people, need.max_people) {
                if min > max {
                    errors.push(format!(
                        "/steps/{i}/resourceNeeds/{j}/minPeople: must not exceed maxPeople"
                    ));
                }
            }
        }

        if let Some(track_id) = &step.track_id {
            if !track_ids.contains(track_id.as_str()) {
                errors.push(format!(
                    "Step '{}' references track '{}' which isn't defined",
                    step.title, track_id
                ));
            }
        }
    }

    let mut seen_resources: FxHashSet<&str> = FxHashSet::default();
    for (i, resource) in template.resources.iter().enumerate() {
        if resource.id.trim().is_empty() {
            errors.push(format!("/resources/{i}/id: must be a non-empty string"));
        } else if !seen_resources.insert(resource.id.as_str()) {
            errors.push(format!(
                "Duplicate resource ID '{}' -- each resource must have a unique ID",
                resource.id
            ));
        }
        if resource.name.trim().is_empty() {
            errors.push(format!("/resources/{i}/name: must be a non-empty string"));
        }
        if resource.capacity == 0 {
            errors.push(format!("/resources/{i}/capacity: must be at least 1"));
        }
    }

    let mut seen_tracks: FxHashSet<&str> = FxHashSet::default();
    for (i, track) in template.tracks.iter().enumerate() {
        if track.id.trim().is_empty() {
            errors.push(format!("/tracks/{i}/id: must be a non-empty string"));
        } else if !seen_tracks.insert(track.id.as_str()) {
            errors.push(format!(
                "Duplicate track ID '{}' -- each track must have a unique ID",
                track.id
            ));
        }
    }

    if let Some(constraint) = &template.time_constraint {
        if constraint.start_time.is_some() && constraint.end_time.is_some() {
            errors.push(
                "Time constraint supplies both startTime and endTime -- set at most one"
                    .to_string(),
            );
        }
        if let Some(start) = &constraint.start_time {
            if anchor::parse_local(start).is_none() {
                errors.push(format!(
                    "/timeConstraint/startTime: '{start}' is not a recognized local datetime"
                ));
            }
        }
        if let Some(end) = &constraint.end_time {
            if anchor::parse_local(end).is_none() {
                errors.push(format!(
                    "/timeConstraint/endTime: '{end}' is not a recognized local datetime"
                ));
            }
        }
    }

    if template.default_num_people == Some(0) {
        errors.push("/defaultNumPeople: must be at least 1".to_string());
    }

    errors
}

/// Format a cycle (interned indexes, entry repeated at the end) as an error.
pub(crate) fn cycle_error(cycle: &[u32], interner: &StepInterner) -> String {
    let path: Vec<&str> = cycle
        .iter()
        .filter_map(|&idx| interner.resolve(idx))
        .collect();
    format!(
        "Circular dependency detected involving steps: {}",
        path.join(" -> ")
    )
}

/// Dry-run diagnostics pass. Never fails: structural problems come back as
/// errors, everything else as advisory warnings.
pub fn validate(template: &ScheduleTemplate) -> ValidationOutcome {
    let mut errors = check_template(template);
    let mut warnings: Vec<String> = Vec::new();

    if !errors.is_empty() {
        return ValidationOutcome { errors, warnings };
    }

    let mut interner = StepInterner::with_capacity(template.steps.len());
    for step in &template.steps {
        interner.intern(&step.id);
    }
    let graph = PrecedenceGraph::new(&template.steps, &interner);
    let topo = match graph.topo_sort() {
        Ok(order) => order,
        Err(cycle) => {
            errors.push(cycle_error(&cycle, &interner));
            return ValidationOutcome { errors, warnings };
        }
    };

    // Referenced-by-nobody advisories.
    let needed_resources: FxHashSet<&str> = template
        .steps
        .iter()
        .flat_map(|s| s.resource_needs.iter().map(|n| n.resource_id.as_str()))
        .collect();
    for resource in &template.resources {
        if !needed_resources.contains(resource.id.as_str()) {
            warnings.push(format!(
                "Resource '{}' is declared but no step requires it",
                resource.name
            ));
        }
    }
    let used_tracks: FxHashSet<&str> = template
        .steps
        .iter()
        .filter_map(|s| s.track_id.as_deref())
        .collect();
    for track in &template.tracks {
        if !used_tracks.contains(track.id.as_str()) {
            warnings.push(format!(
                "Track '{}' is declared but no step uses it",
                track.name
            ));
        }
    }

    // CPM-derived advisories: utilization and slack pressure, computed from
    // earliest placements, contention ignored.
    let durations: Vec<i64> = template
        .steps
        .iter()
        .map(|s| s.duration_mins as i64)
        .collect();
    let solution = cpm::run(&graph, &durations, &topo);

    for resource in template.resources.iter().filter(|r| r.kind.is_renewable()) {
        let capacity = resource.capacity as i64;

        let mut demand: Vec<(usize, i64)> = Vec::new();
        for (idx, step) in template.steps.iter().enumerate() {
            for need in &step.resource_needs {
                if need.resource_id == resource.id {
                    demand.push((idx, need.quantity as i64));
                }
            }
        }

        let mut profile = ResourceProfile::new(resource.name.clone(), capacity);
        for &(idx, quantity) in &demand {
            let timing = &solution.timings[idx];
            profile.reserve(timing.earliest_start, timing.earliest_finish, quantity);
        }
        if profile.peak() == capacity {
            warnings.push(format!(
                "Resource '{}' peaks at its full capacity of {} -- the schedule has no headroom on it",
                resource.name, capacity
            ));
        }

        // Pairs that cannot be staggered inside either step's float will
        // force the solver to extend the makespan.
        for (i, &(a, qty_a)) in demand.iter().enumerate() {
            for &(b, qty_b) in demand.iter().skip(i + 1) {
                if a == b || qty_a + qty_b <= capacity {
                    continue;
                }
                let ta = &solution.timings[a];
                let tb = &solution.timings[b];
                let overlap = ta.earliest_start < tb.earliest_finish
                    && tb.earliest_start < ta.earliest_finish;
                if !overlap {
                    continue;
                }
                let a_after_b = tb.earliest_finish - ta.earliest_start > ta.total_float();
                let b_after_a = ta.earliest_finish - tb.earliest_start > tb.total_float();
                if a_after_b && b_after_a {
                    warnings.push(format!(
                        "Steps '{}' and '{}' both need '{}' but cannot be staggered within their slack -- the schedule will extend",
                        template.steps[a].title, template.steps[b].title, resource.name
                    ));
                }
            }
        }
    }

    ValidationOutcome { errors, warnings }
}
