//! Skill I/O schemas and the catalog they come from.
//!
//! Schemas are immutable reference data owned by the external catalog.
//! Workflows only hold a skill id and look the schema up when they need
//! port information.

use crate::port::PortSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The ordered inputs and outputs of one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSchema {
    /// Catalog id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Inputs, in display order.
    #[serde(default)]
    pub inputs: Vec<PortSpec>,
    /// Outputs, in display order.
    #[serde(default)]
    pub outputs: Vec<PortSpec>,
}

impl SkillSchema {
    /// Creates a schema without ports.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Appends an input port.
    #[must_use]
    pub fn with_input(mut self, port: PortSpec) -> Self {
        self.inputs.push(port);
        self
    }

    /// Appends an output port.
    #[must_use]
    pub fn with_output(mut self, port: PortSpec) -> Self {
        self.outputs.push(port);
        self
    }

    /// Returns the input port with the given id, if any.
    #[must_use]
    pub fn input(&self, id: &str) -> Option<&PortSpec> {
        self.inputs.iter().find(|p| p.id == id)
    }

    /// Returns the output port with the given id, if any.
    #[must_use]
    pub fn output(&self, id: &str) -> Option<&PortSpec> {
        self.outputs.iter().find(|p| p.id == id)
    }
}

/// Read-only lookup of skill schemas by id.
pub trait SkillCatalog: Send + Sync {
    /// Returns the schema for `skill_id`, if the catalog knows it.
    fn skill(&self, skill_id: &str) -> Option<&SkillSchema>;
}

/// A catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    skills: HashMap<String, SkillSchema>,
}

impl StaticCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a schema.
    pub fn insert(&mut self, schema: SkillSchema) {
        self.skills.insert(schema.id.clone(), schema);
    }

    /// Builds a catalog from a JSON array of schemas.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not an array of skill schemas.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let schemas: Vec<SkillSchema> = serde_json::from_str(json)?;
        Ok(schemas.into_iter().collect())
    }

    /// Returns the number of skills.
    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl FromIterator<SkillSchema> for StaticCatalog {
    fn from_iter<I: IntoIterator<Item = SkillSchema>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for schema in iter {
            catalog.insert(schema);
        }
        catalog
    }
}

impl SkillCatalog for StaticCatalog {
    fn skill(&self, skill_id: &str) -> Option<&SkillSchema> {
        self.skills.get(skill_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortKind;

    #[test]
    fn schema_port_lookup() {
        let schema = SkillSchema::new("research", "Research")
            .with_input(PortSpec::required("topic", PortKind::Text))
            .with_output(PortSpec::required("findings", PortKind::Analysis));

        assert_eq!(schema.input("topic").unwrap().kind, PortKind::Text);
        assert!(schema.input("findings").is_none());
        assert_eq!(schema.output("findings").unwrap().kind, PortKind::Analysis);
    }

    #[test]
    fn catalog_from_json() {
        let catalog = StaticCatalog::from_json(
            r#"[
                {"id": "research", "name": "Research",
                 "inputs": [{"id": "topic", "kind": "text", "required": true}],
                 "outputs": [{"id": "findings", "kind": "analysis"}]},
                {"id": "summarize", "name": "Summarize"}
            ]"#,
        )
        .expect("parse catalog");

        assert_eq!(catalog.len(), 2);
        assert!(catalog.skill("research").unwrap().inputs[0].required);
        assert!(catalog.skill("summarize").unwrap().outputs.is_empty());
        assert!(catalog.skill("missing").is_none());
    }

    #[test]
    fn catalog_rejects_non_array() {
        assert!(StaticCatalog::from_json(r#"{"id": "x"}"#).is_err());
    }
}
