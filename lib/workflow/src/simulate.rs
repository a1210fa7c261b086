//! Placeholder outputs for simulated runs.
//!
//! A simulated node never leaves the process. Each declared output gets a
//! deterministic string naming the skill, the output, and the inputs that
//! were available, so the data flow through a workflow can be inspected
//! without spending quota.

use crate::execution::PortValues;
use crate::skill::SkillSchema;
use serde_json::Value as JsonValue;

/// Produces one placeholder value per declared output of `skill`.
#[must_use]
pub fn simulate_outputs(skill: &SkillSchema, inputs: &PortValues) -> PortValues {
    let mut input_ids: Vec<&str> = inputs.keys().map(String::as_str).collect();
    input_ids.sort_unstable();
    let from = if input_ids.is_empty() {
        String::new()
    } else {
        format!(" from {}", input_ids.join(", "))
    };

    skill
        .outputs
        .iter()
        .map(|output| {
            let text = format!(
                "[simulated {}] {}: {}{from}",
                output.kind,
                skill.name,
                output.display_name()
            );
            (output.id.clone(), JsonValue::String(text))
        })
        .collect()
}
