//! End-to-end behavior of the workflow engine through its public API.

use serde_json::json;
use skillchain_ai::ScriptedBackend;
use skillchain_core::NodeId;
use skillchain_quota::{MemoryStore, QuotaConfig, UsageGate};
use skillchain_workflow::{
    ExecutionMode, ExecutionState, InitialInputs, LayoutConfig, NoProgress, PortKind, PortSpec,
    PortValues, Position, RunError, RunStatus, SkillCatalog, SkillSchema, StaticCatalog,
    ValidationError, Workflow, WorkflowConnection, WorkflowEditor, WorkflowNode, WorkflowRunner,
    compute_layers, export_workflow, import_workflow, is_compatible, validate,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn catalog() -> Arc<dyn SkillCatalog> {
    Arc::new(
        [
            SkillSchema::new("research", "Research")
                .with_input(PortSpec::required("topic", PortKind::Text))
                .with_output(PortSpec::required("findings", PortKind::Analysis)),
            SkillSchema::new("summarize", "Summarize")
                .with_input(PortSpec::required("source", PortKind::Text))
                .with_output(PortSpec::required("summary", PortKind::Text)),
            SkillSchema::new("write", "Write")
                .with_input(PortSpec::required("draft", PortKind::Text))
                .with_output(PortSpec::required("article", PortKind::Document)),
        ]
        .into_iter()
        .collect::<StaticCatalog>(),
    )
}

fn gate(limit: u32) -> UsageGate {
    UsageGate::open(
        Arc::new(MemoryStore::new()),
        QuotaConfig {
            free_run_limit: limit,
        },
    )
    .unwrap()
}

/// Research -> Write, built through the editor.
fn research_then_write() -> (Workflow, NodeId, NodeId) {
    let mut editor = WorkflowEditor::new(Workflow::new("Article"), catalog());
    let r = editor.add_skill("research", Position::default()).unwrap();
    let w = editor.add_skill("write", Position::default()).unwrap();
    editor.start_connection(&r, "findings").unwrap();
    editor.complete_connection(&w, "draft").unwrap();
    (editor.into_workflow(), r, w)
}

fn topic_for(node: &NodeId) -> InitialInputs {
    HashMap::from([(
        node.clone(),
        PortValues::from([("topic".to_string(), json!("ownership"))]),
    )])
}

#[tokio::test]
async fn simple_chain_runs_research_before_write() {
    let (workflow, r, w) = research_then_write();
    let runner = WorkflowRunner::new(catalog(), Arc::new(ScriptedBackend::new()), gate(5));

    let snapshots: Mutex<Vec<ExecutionState>> = Mutex::new(Vec::new());
    let sink = |state: &ExecutionState| snapshots.lock().unwrap().push(state.clone());

    let state = runner
        .execute(&workflow, &topic_for(&r), ExecutionMode::Simulate, &sink)
        .await
        .unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.completed_node_ids, vec![r.clone(), w.clone()]);

    // W's outputs never appear before R's
    for snapshot in snapshots.into_inner().unwrap() {
        if snapshot.node_outputs.contains_key(&w) {
            assert!(snapshot.node_outputs.contains_key(&r));
        }
    }

    let article = state.output(&w, "article").unwrap().as_str().unwrap();
    assert!(article.contains("from draft"));
}

#[test]
fn displaced_connection_keeps_count_constant() {
    let mut editor = WorkflowEditor::new(Workflow::new("Article"), catalog());
    let r = editor.add_skill("research", Position::default()).unwrap();
    let s = editor.add_skill("summarize", Position::default()).unwrap();
    let w = editor.add_skill("write", Position::default()).unwrap();

    editor.start_connection(&r, "findings").unwrap();
    let first = editor.complete_connection(&w, "draft").unwrap();
    let before = editor.workflow().connection_count();

    editor.start_connection(&s, "summary").unwrap();
    let second = editor.complete_connection(&w, "draft").unwrap();

    assert_eq!(second.displaced.map(|c| c.id), Some(first.connection_id));
    assert_eq!(editor.workflow().connection_count(), before);
    let feeding: Vec<_> = editor
        .workflow()
        .connections()
        .iter()
        .filter(|c| c.feeds(&w, "draft"))
        .collect();
    assert_eq!(feeding.len(), 1);
    assert_eq!(feeding[0].id, second.connection_id);
    assert_eq!(feeding[0].source_node_id, s);
}

#[test]
fn export_import_round_trip() {
    let (mut workflow, ..) = research_then_write();
    workflow.metadata.description = "Research a topic, then write it up".to_string();
    workflow.metadata.tags = vec!["writing".to_string(), "demo".to_string()];
    workflow.metadata.is_public = true;
    skillchain_workflow::auto_arrange(&mut workflow, &LayoutConfig::default());

    let json = export_workflow(&workflow).unwrap();
    let imported = import_workflow(&json).unwrap();

    assert_eq!(imported, workflow);
    assert_eq!(imported.nodes(), workflow.nodes());
    assert_eq!(imported.connections(), workflow.connections());
    assert_eq!(imported.metadata, workflow.metadata);
}

#[tokio::test]
async fn quota_monotonicity() {
    const LIMIT: u32 = 3;
    let backend = Arc::new(ScriptedBackend::new());
    let runner = WorkflowRunner::new(catalog(), backend.clone(), gate(LIMIT));

    let mut workflow = Workflow::new("single");
    let node = workflow
        .add_node(WorkflowNode::new("summarize", Position::default()))
        .unwrap();
    let inputs = HashMap::from([(
        node.clone(),
        PortValues::from([("source".to_string(), json!("text"))]),
    )]);

    for n in 1..=LIMIT {
        runner
            .execute(&workflow, &inputs, ExecutionMode::Ai, &NoProgress)
            .await
            .unwrap();
        assert_eq!(runner.gate().remaining_free_runs().unwrap(), LIMIT - n);
    }
    assert!(!runner.gate().can_run().unwrap().is_allowed());

    let calls = backend.call_count();
    let err = runner
        .execute(&workflow, &inputs, ExecutionMode::Ai, &NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::QuotaExceeded { .. }));
    assert_eq!(backend.call_count(), calls);
    assert_eq!(runner.gate().remaining_free_runs().unwrap(), 0);
}

#[test]
fn validator_reports_missing_node_and_empty_workflow_together() {
    let workflow = import_workflow(
        r#"{
            "id": "wf_orphan",
            "name": "Orphaned",
            "nodes": [],
            "connections": [
                {"id": "c1", "sourceNodeId": "node_deleted", "sourceOutputId": "findings",
                 "targetNodeId": "node_gone", "targetInputId": "draft"}
            ]
        }"#,
    )
    .unwrap();

    let report = validate(&workflow, catalog().as_ref());
    assert!(!report.is_valid());
    assert!(report.errors.contains(&ValidationError::NoNodes));
    let messages = report.error_messages();
    assert!(messages.iter().any(|m| m.contains("node_deleted")));
    assert!(messages.iter().any(|m| m.contains("node_gone")));
}

#[test]
fn cycle_lands_in_remainder_while_the_rest_layers() {
    let mut workflow = Workflow::new("loop");
    let ids: Vec<NodeId> = ["start", "a", "b", "end"]
        .iter()
        .map(|id| NodeId::from(*id))
        .collect();
    for id in &ids {
        workflow
            .add_node(WorkflowNode::with_id(
                id.clone(),
                "summarize",
                Position::default(),
            ))
            .unwrap();
    }
    let link = |workflow: &mut Workflow, from: &NodeId, to: &NodeId, input: &str| {
        workflow
            .connect(WorkflowConnection::new(
                from.clone(),
                "summary",
                to.clone(),
                input,
            ))
            .unwrap();
    };
    // start -> end is acyclic; a <-> b is a cycle
    link(&mut workflow, &ids[0], &ids[3], "source");
    link(&mut workflow, &ids[1], &ids[2], "source");
    link(&mut workflow, &ids[2], &ids[1], "source");

    let layering = compute_layers(&workflow);
    assert_eq!(
        layering.layers,
        vec![vec![ids[0].clone()], vec![ids[3].clone()]]
    );
    assert_eq!(layering.remainder, vec![ids[1].clone(), ids[2].clone()]);

    let report = validate(&workflow, catalog().as_ref());
    assert!(report.is_valid());
    assert_eq!(report.warnings.len(), 1);
}

#[tokio::test]
async fn cyclic_nodes_run_last_with_available_inputs() {
    let mut workflow = Workflow::new("loop");
    let a = workflow
        .add_node(WorkflowNode::new("summarize", Position::default()))
        .unwrap();
    let b = workflow
        .add_node(WorkflowNode::new("summarize", Position::default()))
        .unwrap();
    workflow
        .connect(WorkflowConnection::new(
            a.clone(),
            "summary",
            b.clone(),
            "source",
        ))
        .unwrap();
    workflow
        .connect(WorkflowConnection::new(
            b.clone(),
            "summary",
            a.clone(),
            "source",
        ))
        .unwrap();

    let runner = WorkflowRunner::new(catalog(), Arc::new(ScriptedBackend::new()), gate(5));
    let state = runner
        .execute(
            &workflow,
            &InitialInputs::new(),
            ExecutionMode::Simulate,
            &NoProgress,
        )
        .await
        .unwrap();

    assert_eq!(state.completed_node_ids, vec![a.clone(), b.clone()]);
    // a ran before b existed, so it had nothing; b saw a's summary
    let a_summary = state.output(&a, "summary").unwrap().as_str().unwrap();
    let b_summary = state.output(&b, "summary").unwrap().as_str().unwrap();
    assert!(!a_summary.contains("from"));
    assert!(b_summary.contains("from source"));
}

#[test]
fn port_kinds_are_reflexive_and_wildcard_is_universal() {
    for kind in PortKind::ALL {
        assert!(is_compatible(kind, kind));
        assert!(is_compatible(PortKind::Any, kind));
        assert!(is_compatible(kind, PortKind::Any));
    }
}
