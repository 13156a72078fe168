//! Core data types for schedule templates and solved schedules.
//!
//! These structs mirror the JSON wire format consumed and produced by the
//! engine: lowerCamelCase field names, enum variants spelled out in full.
//! All times inside a template are integer minutes on a dense grid starting
//! at offset 0; wall-clock times only appear on solved output when the
//! template carries a time constraint.

use serde::{Deserialize, Serialize};

/// Per-step placement policy within the feasible window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingPolicy {
    /// Place as early as feasibility permits (the default).
    Asap,
    /// Place as late as feasibility permits without extending the schedule.
    Alap,
}

/// The four standard precedence relationship kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DependencyKind {
    /// Successor starts after the predecessor finishes (the default).
    #[default]
    FinishToStart,
    /// Successor starts no earlier than the predecessor starts.
    StartToStart,
    /// Successor finishes no earlier than the predecessor finishes.
    FinishToFinish,
    /// Successor finishes no earlier than the predecessor starts.
    StartToFinish,
}

/// Category of a resource; determines how `capacity` is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Maximum concurrent users at any instant.
    Equipment,
    /// Maximum concurrently allocated people at any instant.
    People,
    /// Total units available over the whole schedule.
    Consumable,
}

impl ResourceKind {
    /// Renewable resources impose an instantaneous limit; consumables a total.
    pub fn is_renewable(self) -> bool {
        !matches!(self, ResourceKind::Consumable)
    }
}

/// A precedence edge from a predecessor step to the step declaring it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDependency {
    /// Id of the predecessor step.
    pub step_id: String,
    #[serde(default)]
    pub dependency_type: DependencyKind,
}

/// What a single step requires from one resource.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNeed {
    pub resource_id: String,
    /// Units, slots, or people needed. Must be at least 1.
    pub quantity: u32,
    /// Advisory lower bound; meaningful only for People resources.
    #[serde(default)]
    pub min_people: Option<u32>,
    /// Advisory upper bound; meaningful only for People resources.
    #[serde(default)]
    pub max_people: Option<u32>,
}

/// A single work unit in a template.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Duration in minutes. Must be at least 1.
    pub duration_mins: u32,
    #[serde(default)]
    pub dependencies: Vec<StepDependency>,
    /// Optional membership in a track.
    #[serde(default)]
    pub track_id: Option<String>,
    /// Defaults to `Asap` when absent.
    #[serde(default)]
    pub timing_policy: Option<TimingPolicy>,
    #[serde(default)]
    pub resource_needs: Vec<ResourceNeed>,
}

impl Step {
    pub fn timing_policy(&self) -> TimingPolicy {
        self.timing_policy.unwrap_or(TimingPolicy::Asap)
    }
}

/// Grouping tag for external renderers; does not influence scheduling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
}

/// A finite resource steps can require.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub kind: ResourceKind,
    /// Concurrent limit for Equipment/People, total budget for Consumable.
    pub capacity: u32,
    /// Named roles within a People resource. Empty by default.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Wall-clock anchor for the relative timeline. At most one of the two
/// fields may be set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeConstraint {
    /// ISO local datetime; anchors the schedule forward from this instant.
    #[serde(default)]
    pub start_time: Option<String>,
    /// ISO local datetime; anchors the schedule backward from this deadline.
    #[serde(default)]
    pub end_time: Option<String>,
}

/// The user-defined schedule template. Carries no concrete wall-clock times
/// apart from the optional anchor.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub time_constraint: Option<TimeConstraint>,
    /// Fallback headcount for rendering; does not influence scheduling.
    #[serde(default)]
    pub default_num_people: Option<u32>,
}

/// One resource allocation echoed on a solved step.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedResource {
    pub resource_id: String,
    pub quantity_used: u32,
}

/// A step with concrete timing after solving.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolvedStep {
    pub step_id: String,
    /// Minutes from schedule start.
    pub start_offset_mins: u32,
    pub end_offset_mins: u32,
    /// Wall-clock start (ISO local), present when the template is anchored.
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Total float from the CPM passes; zero marks a critical step.
    pub total_float_mins: u32,
    pub is_critical: bool,
    pub assigned_resources: Vec<AssignedResource>,
}

/// Schedule-level metadata produced alongside the solved steps.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub total_duration_mins: u32,
    /// Zero-float steps in topological order.
    pub critical_path_step_ids: Vec<String>,
}

/// Complete solver output: concrete timing per step, summary metadata, and
/// advisory warnings accumulated while solving.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolvedSchedule {
    pub template_id: String,
    /// Ordered by start offset ascending, ties broken by step id.
    pub solved_steps: Vec<SolvedStep>,
    pub summary: ScheduleSummary,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_deserializes_with_defaults() {
        let json = r#"{"id":"a","title":"A","durationMins":30}"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step.duration_mins, 30);
        assert!(step.dependencies.is_empty());
        assert!(step.resource_needs.is_empty());
        assert_eq!(step.timing_policy(), TimingPolicy::Asap);
    }

    #[test]
    fn test_dependency_type_defaults_to_finish_to_start() {
        let json = r#"{"stepId":"a"}"#;
        let dep: StepDependency = serde_json::from_str(json).unwrap();
        assert_eq!(dep.dependency_type, DependencyKind::FinishToStart);
    }

    #[test]
    fn test_enum_wire_spellings() {
        let json = r#"{"id":"r","name":"Oven","kind":"Equipment","capacity":2}"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.kind, ResourceKind::Equipment);
        assert!(resource.roles.is_empty());

        let policy: TimingPolicy = serde_json::from_str(r#""Alap""#).unwrap();
        assert_eq!(policy, TimingPolicy::Alap);

        let kind: DependencyKind = serde_json::from_str(r#""StartToFinish""#).unwrap();
        assert_eq!(kind, DependencyKind::StartToFinish);
    }

    #[test]
    fn test_solved_step_serializes_camel_case() {
        let step = SolvedStep {
            step_id: "a".to_string(),
            start_offset_mins: 0,
            end_offset_mins: 15,
            start_time: None,
            end_time: None,
            total_float_mins: 0,
            is_critical: true,
            assigned_resources: vec![],
        };
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains(r#""stepId":"a""#));
        assert!(json.contains(r#""startOffsetMins":0"#));
        assert!(json.contains(r#""isCritical":true"#));
        assert!(json.contains(r#""totalFloatMins":0"#));
    }

    #[test]
    fn test_template_defaults_empty_collections() {
        let json = r#"{"id":"t","name":"T"}"#;
        let template: ScheduleTemplate = serde_json::from_str(json).unwrap();
        assert!(template.steps.is_empty());
        assert!(template.tracks.is_empty());
        assert!(template.resources.is_empty());
        assert!(template.time_constraint.is_none());
    }

    #[test]
    fn test_renewable_classification() {
        assert!(ResourceKind::Equipment.is_renewable());
        assert!(ResourceKind::People.is_renewable());
        assert!(!ResourceKind::Consumable.is_renewable());
    }
}
