//! An in-memory backend with scripted outcomes.
//!
//! Answers each skill with a configured result or error and records every
//! request it receives. Skills without a script echo their inputs back.

use crate::backend::{SkillBackend, SkillRequest, SkillResponse};
use crate::error::BackendError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// A backend that replays configured outcomes.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    outcomes: HashMap<String, Result<SkillResponse, BackendError>>,
    requests: Mutex<Vec<SkillRequest>>,
}

impl ScriptedBackend {
    /// Creates a backend that echoes inputs for every skill.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `skill_id` with `result`.
    #[must_use]
    pub fn succeeding(mut self, skill_id: impl Into<String>, result: JsonValue) -> Self {
        self.outcomes
            .insert(skill_id.into(), Ok(SkillResponse::new(result)));
        self
    }

    /// Answers `skill_id` with a full response.
    #[must_use]
    pub fn responding(mut self, skill_id: impl Into<String>, response: SkillResponse) -> Self {
        self.outcomes.insert(skill_id.into(), Ok(response));
        self
    }

    /// Fails every call to `skill_id` with `error`.
    #[must_use]
    pub fn failing(mut self, skill_id: impl Into<String>, error: BackendError) -> Self {
        self.outcomes.insert(skill_id.into(), Err(error));
        self
    }

    /// Returns a copy of every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<SkillRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of requests received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl SkillBackend for ScriptedBackend {
    async fn invoke(&self, request: &SkillRequest) -> Result<SkillResponse, BackendError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match self.outcomes.get(&request.skill_id) {
            Some(outcome) => outcome.clone(),
            None => Ok(SkillResponse::new(JsonValue::Object(
                request
                    .inputs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ))),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
