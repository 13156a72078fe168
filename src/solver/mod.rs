//! The solve operation: template in, concrete timed plan out.
//!
//! Pipeline: structural validation, precedence graph + topological order,
//! CPM passes, resource-feasibility resolution, wall-clock anchoring, output
//! assembly. A solve is a pure function of the template and the optional
//! inventory override map; identical inputs produce identical output.

use std::collections::HashMap;

use thiserror::Error;

use crate::anchor;
use crate::config::EngineConfig;
use crate::cpm;
use crate::graph::PrecedenceGraph;
use crate::interner::{StepIdx, StepInterner};
use crate::log_decisions;
use crate::models::{
    AssignedResource, ScheduleSummary, ScheduleTemplate, SolvedSchedule, SolvedStep,
};
use crate::validate;

pub(crate) mod core;
pub(crate) mod profile;

/// Errors that abort a solve. Resource pressure is never one of them: it
/// surfaces as warnings on the successful result instead.
#[derive(Debug, Error)]
pub enum SolveError {
    /// Schema or referential-integrity violations, joined from the
    /// validator's error list.
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
    /// The precedence relation has a cycle; the payload is one concrete
    /// cycle path.
    #[error("Circular dependency detected involving steps: {0}")]
    Cycle(String),
    /// Inventory override naming an unknown resource or a non-positive
    /// quantity.
    #[error("Invalid inventory: {0}")]
    InvalidInventory(String),
}

/// Apply inventory overrides to the declared capacities.
///
/// Overrides are keyed by resource *name* (exact, case-preserving) and must
/// be positive; unknown names are rejected so a typo cannot silently leave a
/// capacity untouched. Every applied override is echoed as a warning.
fn effective_capacities(
    template: &ScheduleTemplate,
    inventory: Option<&HashMap<String, u32>>,
) -> Result<(Vec<i64>, Vec<String>), SolveError> {
    let mut capacities: Vec<i64> = template
        .resources
        .iter()
        .map(|r| r.capacity as i64)
        .collect();
    let mut warnings: Vec<String> = Vec::new();

    let Some(inventory) = inventory else {
        return Ok((capacities, warnings));
    };

    let mut zero: Vec<&str> = inventory
        .iter()
        .filter(|&(_, &qty)| qty == 0)
        .map(|(name, _)| name.as_str())
        .collect();
    if !zero.is_empty() {
        zero.sort_unstable();
        return Err(SolveError::InvalidInventory(format!(
            "quantity for '{}' must be at least 1",
            zero.join("', '")
        )));
    }

    let mut unknown: Vec<&str> = inventory
        .keys()
        .filter(|name| !template.resources.iter().any(|r| r.name == **name))
        .map(|name| name.as_str())
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(SolveError::InvalidInventory(format!(
            "no resource named '{}'",
            unknown.join("', '")
        )));
    }

    for (ridx, resource) in template.resources.iter().enumerate() {
        if let Some(&quantity) = inventory.get(&resource.name) {
            warnings.push(format!(
                "Inventory override: '{}' limited to {} (template defines {})",
                resource.name, quantity, resource.capacity
            ));
            capacities[ridx] = quantity as i64;
        }
    }

    Ok((capacities, warnings))
}

/// One concrete cycle rendered as `a -> b -> a`.
fn cycle_path(cycle: &[StepIdx], interner: &StepInterner) -> String {
    cycle
        .iter()
        .filter_map(|&idx| interner.resolve(idx))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Solve a schedule template into a concrete timed plan.
///
/// `inventory` optionally substitutes per-name capacities for this solve
/// without mutating the template. On success the result carries every step's
/// offsets, float, criticality, resource assignments, optional wall-clock
/// times, a summary, and advisory warnings.
pub fn solve(
    template: &ScheduleTemplate,
    inventory: Option<&HashMap<String, u32>>,
    config: &EngineConfig,
) -> Result<SolvedSchedule, SolveError> {
    let errors = validate::check_template(template);
    if !errors.is_empty() {
        return Err(SolveError::InvalidTemplate(errors.join("; ")));
    }

    let mut interner = StepInterner::with_capacity(template.steps.len());
    for step in &template.steps {
        interner.intern(&step.id);
    }
    let graph = PrecedenceGraph::new(&template.steps, &interner);
    let topo = graph
        .topo_sort()
        .map_err(|cycle| SolveError::Cycle(cycle_path(&cycle, &interner)))?;

    let (capacities, mut warnings) = effective_capacities(template, inventory)?;

    let durations: Vec<i64> = template
        .steps
        .iter()
        .map(|s| s.duration_mins as i64)
        .collect();
    let solution = cpm::run(&graph, &durations, &topo);
    log_decisions!(
        config.verbosity,
        "cpm makespan for '{}': {} mins",
        template.id,
        solution.makespan
    );

    let placement =
        core::resolve_resources(template, &graph, &solution, &topo, &capacities, config);
    warnings.extend(placement.warnings);

    let base = anchor::project_start(template.time_constraint.as_ref(), placement.makespan);

    let mut solved_steps: Vec<SolvedStep> = Vec::with_capacity(template.steps.len());
    for (idx, step) in template.steps.iter().enumerate() {
        let timing = &solution.timings[idx];
        let start_offset = placement.starts[idx].max(0);
        let end_offset = placement.ends[idx].max(0);

        let (start_time, end_time) = match base {
            Some(base) => {
                let (start, end) = anchor::anchor_step(base, start_offset, end_offset);
                (Some(start), Some(end))
            }
            None => (None, None),
        };

        let assigned_resources: Vec<AssignedResource> = step
            .resource_needs
            .iter()
            .map(|need| AssignedResource {
                resource_id: need.resource_id.clone(),
                quantity_used: need.quantity,
            })
            .collect();

        solved_steps.push(SolvedStep {
            step_id: step.id.clone(),
            start_offset_mins: start_offset as u32,
            end_offset_mins: end_offset as u32,
            start_time,
            end_time,
            total_float_mins: timing.total_float() as u32,
            is_critical: timing.is_critical(),
            assigned_resources,
        });
    }
    solved_steps.sort_by(|a, b| {
        a.start_offset_mins
            .cmp(&b.start_offset_mins)
            .then_with(|| a.step_id.cmp(&b.step_id))
    });

    let critical_path_step_ids: Vec<String> = solution
        .critical_steps(&topo)
        .iter()
        .map(|&idx| template.steps[idx as usize].id.clone())
        .collect();

    Ok(SolvedSchedule {
        template_id: template.id.clone(),
        solved_steps,
        summary: ScheduleSummary {
            total_duration_mins: placement.makespan.max(0) as u32,
            critical_path_step_ids,
        },
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DependencyKind, Resource, ResourceKind, ResourceNeed, Step, StepDependency,
        TimeConstraint, TimingPolicy,
    };

    fn make_step(id: &str, duration: u32, deps: Vec<&str>) -> Step {
        Step {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            duration_mins: duration,
            dependencies: deps
                .into_iter()
                .map(|dep_id| StepDependency {
                    step_id: dep_id.to_string(),
                    dependency_type: DependencyKind::FinishToStart,
                })
                .collect(),
            track_id: None,
            timing_policy: None,
            resource_needs: vec![],
        }
    }

    fn needing(mut step: Step, resource_id: &str, quantity: u32) -> Step {
        step.resource_needs.push(ResourceNeed {
            resource_id: resource_id.to_string(),
            quantity,
            min_people: None,
            max_people: None,
        });
        step
    }

    fn make_resource(id: &str, kind: ResourceKind, capacity: u32) -> Resource {
        Resource {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            capacity,
            roles: vec![],
        }
    }

    fn make_template(steps: Vec<Step>, resources: Vec<Resource>) -> ScheduleTemplate {
        ScheduleTemplate {
            id: "t".to_string(),
            name: "T".to_string(),
            description: None,
            steps,
            tracks: vec![],
            resources,
            time_constraint: None,
            default_num_people: None,
        }
    }

    fn run(template: &ScheduleTemplate) -> SolvedSchedule {
        solve(template, None, &EngineConfig::default()).unwrap()
    }

    fn find<'a>(result: &'a SolvedSchedule, id: &str) -> &'a SolvedStep {
        result
            .solved_steps
            .iter()
            .find(|s| s.step_id == id)
            .unwrap()
    }

    #[test]
    fn test_linear_chain() {
        // Four-step chain: starts 0, 15, 105, 115; makespan 120; all critical.
        let template = make_template(
            vec![
                make_step("a", 15, vec![]),
                make_step("b", 90, vec!["a"]),
                make_step("c", 10, vec!["b"]),
                make_step("d", 5, vec!["c"]),
            ],
            vec![],
        );
        let result = run(&template);

        assert_eq!(result.summary.total_duration_mins, 120);
        assert_eq!(
            result.summary.critical_path_step_ids,
            vec!["a", "b", "c", "d"]
        );
        for (id, start) in [("a", 0), ("b", 15), ("c", 105), ("d", 115)] {
            let step = find(&result, id);
            assert_eq!(step.start_offset_mins, start);
            assert!(step.is_critical);
            assert_eq!(step.total_float_mins, 0);
        }
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_duration_preserved_on_every_step() {
        let template = make_template(
            vec![
                make_step("a", 15, vec![]),
                make_step("b", 90, vec!["a"]),
                needing(make_step("q", 40, vec![]), "oven", 1),
            ],
            vec![make_resource("oven", ResourceKind::Equipment, 1)],
        );
        let result = run(&template);
        for step in &result.solved_steps {
            let declared = template
                .steps
                .iter()
                .find(|s| s.id == step.step_id)
                .unwrap()
                .duration_mins;
            assert_eq!(step.end_offset_mins - step.start_offset_mins, declared);
        }
    }

    #[test]
    fn test_solved_steps_ordered_by_start_then_id() {
        let template = make_template(
            vec![
                make_step("zeta", 10, vec![]),
                make_step("alpha", 10, vec![]),
                make_step("tail", 10, vec!["zeta"]),
            ],
            vec![],
        );
        let result = run(&template);
        let ids: Vec<&str> = result
            .solved_steps
            .iter()
            .map(|s| s.step_id.as_str())
            .collect();
        assert_eq!(ids, vec!["alpha", "zeta", "tail"]);
    }

    #[test]
    fn test_invalid_template_rejected() {
        let template = make_template(vec![make_step("a", 0, vec![])], vec![]);
        let err = solve(&template, None, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::InvalidTemplate(_)));
        assert!(err.to_string().contains("durationMins"));
    }

    #[test]
    fn test_cycle_rejected_with_path() {
        let template = make_template(
            vec![make_step("a", 10, vec!["b"]), make_step("b", 10, vec!["a"])],
            vec![],
        );
        let err = solve(&template, None, &EngineConfig::default()).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, SolveError::Cycle(_)));
        assert!(message.contains("Circular dependency"));
        assert!(message.contains(" -> "));
    }

    #[test]
    fn test_inventory_unknown_name_rejected() {
        let template = make_template(
            vec![needing(make_step("a", 10, vec![]), "oven", 1)],
            vec![make_resource("oven", ResourceKind::Equipment, 1)],
        );
        let inventory = HashMap::from([("Toaster".to_string(), 1u32)]);
        let err = solve(&template, Some(&inventory), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::InvalidInventory(_)));
        assert!(err.to_string().contains("Toaster"));
    }

    #[test]
    fn test_inventory_zero_rejected() {
        let template = make_template(
            vec![needing(make_step("a", 10, vec![]), "oven", 1)],
            vec![make_resource("oven", ResourceKind::Equipment, 1)],
        );
        let inventory = HashMap::from([("oven".to_string(), 0u32)]);
        let err = solve(&template, Some(&inventory), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::InvalidInventory(_)));
    }

    #[test]
    fn test_inventory_matching_is_case_sensitive() {
        let template = make_template(
            vec![needing(make_step("a", 10, vec![]), "oven", 1)],
            vec![make_resource("oven", ResourceKind::Equipment, 1)],
        );
        let inventory = HashMap::from([("OVEN".to_string(), 2u32)]);
        let err = solve(&template, Some(&inventory), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::InvalidInventory(_)));
    }

    #[test]
    fn test_inventory_override_applies_and_echoes() {
        // Capacity 2 overridden down to 1 forces serialization.
        let template = make_template(
            vec![
                needing(make_step("a", 30, vec![]), "oven", 1),
                needing(make_step("b", 30, vec![]), "oven", 1),
            ],
            vec![make_resource("oven", ResourceKind::Equipment, 2)],
        );
        let inventory = HashMap::from([("oven".to_string(), 1u32)]);
        let result = solve(&template, Some(&inventory), &EngineConfig::default()).unwrap();

        assert_eq!(result.summary.total_duration_mins, 60);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("Inventory override") && w.contains("oven")));
    }

    #[test]
    fn test_consumable_override_shortfall() {
        // Two sequential steps consuming 60 each; capacity 100 overridden to
        // 80: solve succeeds, assignments stay declared, shortfall reported.
        let template = make_template(
            vec![
                needing(make_step("a", 20, vec![]), "flour", 60),
                needing(make_step("b", 20, vec!["a"]), "flour", 60),
            ],
            vec![make_resource("flour", ResourceKind::Consumable, 100)],
        );
        let inventory = HashMap::from([("flour".to_string(), 80u32)]);
        let result = solve(&template, Some(&inventory), &EngineConfig::default()).unwrap();

        assert_eq!(result.summary.total_duration_mins, 40);
        for step in &result.solved_steps {
            assert_eq!(step.assigned_resources[0].quantity_used, 60);
        }
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("needed=120")
                && w.contains("available=80")
                && w.contains("shortfall=40")));
    }

    #[test]
    fn test_forward_anchoring() {
        let mut template = make_template(
            vec![make_step("a", 15, vec![]), make_step("b", 90, vec!["a"])],
            vec![],
        );
        template.time_constraint = Some(TimeConstraint {
            start_time: Some("2026-03-01T08:00".to_string()),
            end_time: None,
        });
        let result = run(&template);

        let a = find(&result, "a");
        let b = find(&result, "b");
        assert_eq!(a.start_time.as_deref(), Some("2026-03-01T08:00:00"));
        assert_eq!(a.end_time.as_deref(), Some("2026-03-01T08:15:00"));
        assert_eq!(b.start_time.as_deref(), Some("2026-03-01T08:15:00"));
        assert_eq!(b.end_time.as_deref(), Some("2026-03-01T09:45:00"));
    }

    #[test]
    fn test_backward_anchoring_hits_deadline() {
        // The linear chain spans 120 minutes; anchored backward to 19:00 the
        // first step starts at 17:00 and the last ends exactly at 19:00.
        let mut template = make_template(
            vec![
                make_step("a", 15, vec![]),
                make_step("b", 90, vec!["a"]),
                make_step("c", 10, vec!["b"]),
                make_step("d", 5, vec!["c"]),
            ],
            vec![],
        );
        template.time_constraint = Some(TimeConstraint {
            start_time: None,
            end_time: Some("2026-03-01T19:00".to_string()),
        });
        let result = run(&template);

        assert_eq!(
            find(&result, "a").start_time.as_deref(),
            Some("2026-03-01T17:00:00")
        );
        assert_eq!(
            find(&result, "d").end_time.as_deref(),
            Some("2026-03-01T19:00:00")
        );
    }

    #[test]
    fn test_backward_anchoring_accounts_for_resource_delay() {
        // Resource contention stretches the schedule to 60 minutes; the
        // deadline anchors against the resolved span, not the CPM one.
        let mut template = make_template(
            vec![
                needing(make_step("a", 30, vec![]), "oven", 1),
                needing(make_step("b", 30, vec![]), "oven", 1),
            ],
            vec![make_resource("oven", ResourceKind::Equipment, 1)],
        );
        template.time_constraint = Some(TimeConstraint {
            start_time: None,
            end_time: Some("2026-03-01T12:00".to_string()),
        });
        let result = run(&template);

        assert_eq!(result.summary.total_duration_mins, 60);
        assert_eq!(
            find(&result, "a").start_time.as_deref(),
            Some("2026-03-01T11:00:00")
        );
        assert_eq!(
            find(&result, "b").end_time.as_deref(),
            Some("2026-03-01T12:00:00")
        );
    }

    #[test]
    fn test_alap_dinner_before_deadline() {
        // A sightseeing chain plus an independent Alap dinner: the dinner
        // slides to the end of the schedule and ends at the deadline.
        let mut template = make_template(
            vec![
                make_step("walk", 60, vec![]),
                make_step("museum", 120, vec!["walk"]),
                {
                    let mut dinner = make_step("dinner", 60, vec![]);
                    dinner.timing_policy = Some(TimingPolicy::Alap);
                    dinner
                },
            ],
            vec![],
        );
        template.time_constraint = Some(TimeConstraint {
            start_time: None,
            end_time: Some("2026-03-01T21:00".to_string()),
        });
        let result = run(&template);

        let dinner = find(&result, "dinner");
        assert_eq!(dinner.start_time.as_deref(), Some("2026-03-01T20:00:00"));
        assert_eq!(dinner.end_time.as_deref(), Some("2026-03-01T21:00:00"));
        // Upstream unchanged from the Asap baseline.
        assert_eq!(find(&result, "walk").start_offset_mins, 0);
        assert_eq!(find(&result, "museum").start_offset_mins, 60);
    }

    #[test]
    fn test_solve_is_deterministic() {
        let template = make_template(
            vec![
                needing(make_step("s1", 30, vec![]), "crew", 2),
                needing(make_step("s2", 30, vec![]), "crew", 2),
                needing(make_step("s3", 30, vec![]), "crew", 2),
                needing(make_step("s4", 30, vec![]), "crew", 2),
            ],
            vec![make_resource("crew", ResourceKind::People, 4)],
        );
        let first = serde_json::to_string(&run(&template)).unwrap();
        let second = serde_json::to_string(&run(&template)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_template_solves_to_nothing() {
        let template = make_template(vec![], vec![]);
        let result = run(&template);
        assert!(result.solved_steps.is_empty());
        assert_eq!(result.summary.total_duration_mins, 0);
        assert!(result.summary.critical_path_step_ids.is_empty());
    }
}
