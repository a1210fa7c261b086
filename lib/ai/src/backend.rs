//! Skill backend abstraction.
//!
//! The engine treats the AI call as an opaque function: it sends the skill
//! identity and the node's resolved inputs, and gets back either a result
//! payload or a typed failure.

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use skillchain_core::{ClientFingerprint, NodeId};
use std::collections::HashMap;

/// A request to execute one skill for one workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRequest {
    /// The catalog id of the skill to run.
    pub skill_id: String,
    /// The node this invocation belongs to.
    pub node_id: NodeId,
    /// Resolved inputs keyed by input port id.
    pub inputs: HashMap<String, JsonValue>,
    /// User-supplied credential, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    /// Pseudo-identifier of the calling client.
    pub client_fingerprint: ClientFingerprint,
}

impl SkillRequest {
    /// Creates a request without a credential.
    #[must_use]
    pub fn new(
        skill_id: impl Into<String>,
        node_id: NodeId,
        client_fingerprint: ClientFingerprint,
    ) -> Self {
        Self {
            skill_id: skill_id.into(),
            node_id,
            inputs: HashMap::new(),
            credential: None,
            client_fingerprint,
        }
    }

    /// Sets the resolved inputs.
    #[must_use]
    pub fn with_inputs(mut self, inputs: HashMap<String, JsonValue>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Attaches a user credential.
    #[must_use]
    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential;
        self
    }
}

/// A successful backend response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillResponse {
    /// The result payload: a string, or an object keyed by output port id.
    pub result: JsonValue,
    /// Free runs the server still grants this client, when it reports them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_free_runs: Option<u32>,
}

impl SkillResponse {
    /// Creates a response with no quota information.
    #[must_use]
    pub fn new(result: JsonValue) -> Self {
        Self {
            result,
            remaining_free_runs: None,
        }
    }
}

/// Trait for skill execution backends.
#[async_trait]
pub trait SkillBackend: Send + Sync {
    /// Executes a skill.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` when the shared quota is exhausted,
    /// `InvalidCredential` when the credential was rejected, and a generic
    /// backend or transport error otherwise.
    async fn invoke(&self, request: &SkillRequest) -> Result<SkillResponse, BackendError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder() {
        let node_id = NodeId::from("n1");
        let mut inputs = HashMap::new();
        inputs.insert("topic".to_string(), JsonValue::from("rust"));

        let request = SkillRequest::new("research", node_id.clone(), ClientFingerprint::new())
            .with_inputs(inputs)
            .with_credential(Some("sk-test".to_string()));

        assert_eq!(request.skill_id, "research");
        assert_eq!(request.node_id, node_id);
        assert_eq!(request.inputs["topic"], "rust");
        assert_eq!(request.credential.as_deref(), Some("sk-test"));
    }

    #[test]
    fn request_omits_missing_credential_on_the_wire() {
        let request = SkillRequest::new("write", NodeId::from("n2"), ClientFingerprint::from("c"));
        let json = serde_json::to_value(&request).expect("serialize");
        assert!(json.get("credential").is_none());
        assert_eq!(json["skillId"], "write");
        assert_eq!(json["clientFingerprint"], "c");
    }

    #[test]
    fn response_defaults_remaining_runs() {
        let parsed: SkillResponse =
            serde_json::from_str(r#"{"result":"done"}"#).expect("deserialize");
        assert_eq!(parsed, SkillResponse::new(JsonValue::from("done")));
    }
}
