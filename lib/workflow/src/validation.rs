//! Workflow validation.
//!
//! `validate` never stops at the first problem: every finding is collected so
//! an editor can show them all at once. Errors block a run. Warnings do not.

use crate::definition::Workflow;
use crate::execution::InitialInputs;
use crate::graph::compute_layers;
use crate::port::{PortKind, is_compatible};
use crate::skill::SkillCatalog;
use serde::{Deserialize, Serialize};
use skillchain_core::{ConnectionId, NodeId};
use std::fmt;

/// A problem that prevents a workflow from running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    NameRequired,
    NoNodes,
    UnknownSkill {
        node_id: NodeId,
        skill_id: String,
    },
    MissingNode {
        connection_id: ConnectionId,
        node_id: NodeId,
    },
    InvalidOutput {
        connection_id: ConnectionId,
        node_id: NodeId,
        output_id: String,
    },
    InvalidInput {
        connection_id: ConnectionId,
        node_id: NodeId,
        input_id: String,
    },
    IncompatibleTypes {
        connection_id: ConnectionId,
        output_kind: PortKind,
        input_kind: PortKind,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameRequired => write!(f, "Workflow name is required"),
            Self::NoNodes => write!(f, "Workflow must have at least one skill"),
            Self::UnknownSkill { node_id, skill_id } => {
                write!(f, "Node {node_id} uses unknown skill '{skill_id}'")
            }
            Self::MissingNode {
                connection_id,
                node_id,
            } => write!(
                f,
                "Connection {connection_id} references non-existent node {node_id}"
            ),
            Self::InvalidOutput {
                connection_id,
                node_id,
                output_id,
            } => write!(
                f,
                "Connection {connection_id} uses invalid output '{output_id}' of node {node_id}"
            ),
            Self::InvalidInput {
                connection_id,
                node_id,
                input_id,
            } => write!(
                f,
                "Connection {connection_id} uses invalid input '{input_id}' of node {node_id}"
            ),
            Self::IncompatibleTypes {
                output_kind,
                input_kind,
                ..
            } => write!(
                f,
                "Incompatible types: {output_kind} cannot connect to {input_kind}"
            ),
        }
    }
}

/// A finding that does not block a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// These nodes sit on or behind a cycle. They run last, in workflow
    /// order, with whatever inputs are available.
    Cycle { node_ids: Vec<NodeId> },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle { node_ids } => {
                let names: Vec<&str> = node_ids.iter().map(NodeId::as_str).collect();
                write!(
                    f,
                    "Nodes on or after a cycle run last with partial inputs: {}",
                    names.join(", ")
                )
            }
        }
    }
}

/// Every finding for one workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// Returns true if nothing blocks a run.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the error messages in report order.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Checks a workflow against the catalog.
///
/// Findings are reported in a fixed order: name, node count, unknown skills,
/// then per connection: endpoints, ports, kinds. Port checks are skipped for
/// a connection with a missing endpoint or an unknown skill.
pub fn validate<C>(workflow: &Workflow, catalog: &C) -> ValidationReport
where
    C: SkillCatalog + ?Sized,
{
    let mut report = ValidationReport::default();

    if workflow.name().trim().is_empty() {
        report.errors.push(ValidationError::NameRequired);
    }
    if workflow.node_count() == 0 {
        report.errors.push(ValidationError::NoNodes);
    }

    for node in workflow.nodes() {
        if catalog.skill(&node.skill_id).is_none() {
            report.errors.push(ValidationError::UnknownSkill {
                node_id: node.id.clone(),
                skill_id: node.skill_id.clone(),
            });
        }
    }

    for connection in workflow.connections() {
        let source = workflow.node(&connection.source_node_id);
        let target = workflow.node(&connection.target_node_id);

        for (node, node_id) in [
            (source, &connection.source_node_id),
            (target, &connection.target_node_id),
        ] {
            if node.is_none() {
                report.errors.push(ValidationError::MissingNode {
                    connection_id: connection.id.clone(),
                    node_id: node_id.clone(),
                });
            }
        }

        let (Some(source), Some(target)) = (source, target) else {
            continue;
        };
        let (Some(source_skill), Some(target_skill)) =
            (catalog.skill(&source.skill_id), catalog.skill(&target.skill_id))
        else {
            continue;
        };

        let output = source_skill.output(&connection.source_output_id);
        if output.is_none() {
            report.errors.push(ValidationError::InvalidOutput {
                connection_id: connection.id.clone(),
                node_id: source.id.clone(),
                output_id: connection.source_output_id.clone(),
            });
        }
        let input = target_skill.input(&connection.target_input_id);
        if input.is_none() {
            report.errors.push(ValidationError::InvalidInput {
                connection_id: connection.id.clone(),
                node_id: target.id.clone(),
                input_id: connection.target_input_id.clone(),
            });
        }

        if let (Some(output), Some(input)) = (output, input)
            && !is_compatible(output.kind, input.kind)
        {
            report.errors.push(ValidationError::IncompatibleTypes {
                connection_id: connection.id.clone(),
                output_kind: output.kind,
                input_kind: input.kind,
            });
        }
    }

    let layering = compute_layers(workflow);
    if layering.has_remainder() {
        report.warnings.push(ValidationWarning::Cycle {
            node_ids: layering.remainder,
        });
    }

    report
}

/// A required input with no incoming connection and no initial value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredInput {
    pub node_id: NodeId,
    pub skill_id: String,
    pub input_id: String,
    pub label: String,
    pub kind: PortKind,
}

/// Lists the required inputs that a run would have to be given up front.
///
/// Nodes with unknown skills are skipped; `validate` reports them.
pub fn required_inputs<C>(
    workflow: &Workflow,
    catalog: &C,
    initial_inputs: &InitialInputs,
) -> Vec<RequiredInput>
where
    C: SkillCatalog + ?Sized,
{
    let mut missing = Vec::new();
    for node in workflow.nodes() {
        let Some(skill) = catalog.skill(&node.skill_id) else {
            continue;
        };
        let supplied = initial_inputs.get(&node.id);
        for input in skill.inputs.iter().filter(|p| p.required) {
            let has_value = supplied.is_some_and(|values| values.contains_key(&input.id));
            if has_value || workflow.incoming_connection(&node.id, &input.id).is_some() {
                continue;
            }
            missing.push(RequiredInput {
                node_id: node.id.clone(),
                skill_id: skill.id.clone(),
                input_id: input.id.clone(),
                label: input.display_name().to_string(),
                kind: input.kind,
            });
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::WorkflowConnection;
    use crate::node::{Position, WorkflowNode};
    use crate::port::PortSpec;
    use crate::skill::{SkillSchema, StaticCatalog};
    use serde_json::json;
    use std::collections::HashMap;

    fn catalog() -> StaticCatalog {
        [
            SkillSchema::new("research", "Research")
                .with_input(PortSpec::required("topic", PortKind::Text))
                .with_output(PortSpec::required("findings", PortKind::Analysis)),
            SkillSchema::new("write", "Write")
                .with_input(PortSpec::required("draft", PortKind::Text))
                .with_input(PortSpec::optional("tone", PortKind::Text))
                .with_output(PortSpec::required("article", PortKind::Document)),
            SkillSchema::new("image", "Image")
                .with_output(PortSpec::required("picture", PortKind::Image)),
        ]
        .into_iter()
        .collect()
    }

    fn add(workflow: &mut Workflow, id: &str, skill: &str) {
        workflow
            .add_node(WorkflowNode::with_id(
                NodeId::from(id),
                skill,
                Position::default(),
            ))
            .unwrap();
    }

    fn link(
        workflow: &mut Workflow,
        from: &str,
        output: &str,
        to: &str,
        input: &str,
    ) -> ConnectionId {
        let connection =
            WorkflowConnection::new(NodeId::from(from), output, NodeId::from(to), input);
        let id = connection.id.clone();
        workflow.connect(connection).unwrap();
        id
    }

    fn chain() -> Workflow {
        let mut workflow = Workflow::new("Article");
        add(&mut workflow, "r", "research");
        add(&mut workflow, "w", "write");
        link(&mut workflow, "r", "findings", "w", "draft");
        workflow
    }

    #[test]
    fn valid_chain() {
        let report = validate(&chain(), &catalog());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn blank_name_and_no_nodes() {
        let report = validate(&Workflow::new("   "), &catalog());
        assert_eq!(
            report.error_messages(),
            vec![
                "Workflow name is required".to_string(),
                "Workflow must have at least one skill".to_string(),
            ]
        );
    }

    #[test]
    fn unknown_skill_is_reported() {
        let mut workflow = Workflow::new("w");
        add(&mut workflow, "x", "teleport");
        let report = validate(&workflow, &catalog());
        assert_eq!(
            report.errors,
            vec![ValidationError::UnknownSkill {
                node_id: NodeId::from("x"),
                skill_id: "teleport".to_string(),
            }]
        );
    }

    #[test]
    fn invalid_ports_are_reported() {
        let mut workflow = chain();
        link(&mut workflow, "r", "nope", "w", "tone");
        link(&mut workflow, "r", "findings", "w", "missing");
        let report = validate(&workflow, &catalog());
        assert_eq!(report.errors.len(), 2);
        assert!(matches!(
            report.errors[0],
            ValidationError::InvalidOutput { .. }
        ));
        assert!(matches!(
            report.errors[1],
            ValidationError::InvalidInput { .. }
        ));
    }

    #[test]
    fn incompatible_kinds_are_reported() {
        let mut workflow = Workflow::new("bad");
        add(&mut workflow, "i", "image");
        add(&mut workflow, "w", "write");
        link(&mut workflow, "i", "picture", "w", "draft");
        let report = validate(&workflow, &catalog());
        assert_eq!(
            report.error_messages(),
            vec!["Incompatible types: image cannot connect to text".to_string()]
        );
    }

    #[test]
    fn dangling_connections_from_a_document() {
        let workflow: Workflow = serde_json::from_value(json!({
            "id": "wf_1",
            "name": "dangling",
            "nodes": [{"id": "w", "skillId": "write"}],
            "connections": [
                {"id": "c1", "sourceNodeId": "ghost", "sourceOutputId": "findings",
                 "targetNodeId": "w", "targetInputId": "draft"},
                {"id": "c2", "sourceNodeId": "ghost", "sourceOutputId": "findings",
                 "targetNodeId": "phantom", "targetInputId": "draft"}
            ]
        }))
        .unwrap();
        let report = validate(&workflow, &catalog());
        assert_eq!(
            report.error_messages(),
            vec![
                "Connection c1 references non-existent node ghost".to_string(),
                "Connection c2 references non-existent node ghost".to_string(),
                "Connection c2 references non-existent node phantom".to_string(),
            ]
        );
    }

    #[test]
    fn cycle_is_a_warning_not_an_error() {
        let mut workflow = Workflow::new("loop");
        add(&mut workflow, "a", "write");
        add(&mut workflow, "b", "write");
        link(&mut workflow, "a", "article", "b", "draft");
        link(&mut workflow, "b", "article", "a", "draft");
        let report = validate(&workflow, &catalog());
        assert!(report.is_valid());
        assert_eq!(
            report.warnings,
            vec![ValidationWarning::Cycle {
                node_ids: vec![NodeId::from("a"), NodeId::from("b")],
            }]
        );
    }

    #[test]
    fn required_inputs_consider_connections_and_initial_values() {
        let workflow = chain();
        let missing = required_inputs(&workflow, &catalog(), &HashMap::new());
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].node_id, NodeId::from("r"));
        assert_eq!(missing[0].input_id, "topic");

        let mut initial = InitialInputs::new();
        initial.insert(
            NodeId::from("r"),
            HashMap::from([("topic".to_string(), json!("rust"))]),
        );
        assert!(required_inputs(&workflow, &catalog(), &initial).is_empty());
    }

    #[test]
    fn optional_inputs_are_never_required() {
        let workflow = chain();
        let missing = required_inputs(&workflow, &catalog(), &HashMap::new());
        assert!(missing.iter().all(|m| m.input_id != "tone"));
    }
}
