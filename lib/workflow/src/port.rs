//! Port kinds and connection legality.
//!
//! Every skill input and output is tagged with a coarse `PortKind`. A
//! connection from an output to an input is legal when the kinds match, when
//! either side is `Any`, or when the producer's kind is listed as a
//! generalization of the consumer's kind. The table is directional and is not
//! closed transitively.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The data kind carried by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// Free-form prose.
    Text,
    /// Source code.
    Code,
    /// A structured document.
    Document,
    /// Tabular or structured data.
    Data,
    /// An image.
    Image,
    /// Slides or another presentation format.
    Presentation,
    /// Findings, assessments, reports.
    Analysis,
    /// Wildcard; accepts and feeds everything.
    Any,
}

/// Producer kind → consumer kinds it may feed besides itself.
const GENERALIZATIONS: &[(PortKind, &[PortKind])] = &[
    (PortKind::Analysis, &[PortKind::Text, PortKind::Document]),
    (PortKind::Presentation, &[PortKind::Document]),
    (PortKind::Code, &[PortKind::Text]),
    (PortKind::Document, &[PortKind::Text]),
    (PortKind::Data, &[PortKind::Text]),
];

impl PortKind {
    /// Every kind, wildcard last.
    pub const ALL: [PortKind; 8] = [
        PortKind::Text,
        PortKind::Code,
        PortKind::Document,
        PortKind::Data,
        PortKind::Image,
        PortKind::Presentation,
        PortKind::Analysis,
        PortKind::Any,
    ];

    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Document => "document",
            Self::Data => "data",
            Self::Image => "image",
            Self::Presentation => "presentation",
            Self::Analysis => "analysis",
            Self::Any => "any",
        }
    }

    /// Returns true if an output of this kind may feed an input of `input`.
    #[must_use]
    pub fn can_feed(self, input: PortKind) -> bool {
        is_compatible(self, input)
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides whether an output of kind `output` may connect to an input of
/// kind `input`.
#[must_use]
pub fn is_compatible(output: PortKind, input: PortKind) -> bool {
    if output == PortKind::Any || input == PortKind::Any || output == input {
        return true;
    }
    GENERALIZATIONS
        .iter()
        .any(|(from, into)| *from == output && into.contains(&input))
}

/// A named input or output slot in a skill's I/O schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    /// Port id, unique among the skill's inputs (or outputs).
    pub id: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Data kind.
    pub kind: PortKind,
    /// Whether a value must be available before the skill runs.
    #[serde(default)]
    pub required: bool,
}

impl PortSpec {
    /// Creates a required port.
    #[must_use]
    pub fn required(id: impl Into<String>, kind: PortKind) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            kind,
            required: true,
        }
    }

    /// Creates an optional port.
    #[must_use]
    pub fn optional(id: impl Into<String>, kind: PortKind) -> Self {
        Self {
            required: false,
            ..Self::required(id, kind)
        }
    }

    /// Sets the display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Returns the label, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_kinds_are_compatible() {
        for kind in PortKind::ALL {
            assert!(is_compatible(kind, kind), "{kind} -> {kind}");
        }
    }

    #[test]
    fn wildcard_is_compatible_both_ways() {
        for kind in PortKind::ALL {
            assert!(is_compatible(PortKind::Any, kind));
            assert!(is_compatible(kind, PortKind::Any));
        }
    }

    #[test]
    fn generalizations_are_directional() {
        assert!(is_compatible(PortKind::Analysis, PortKind::Text));
        assert!(is_compatible(PortKind::Analysis, PortKind::Document));
        assert!(is_compatible(PortKind::Presentation, PortKind::Document));
        assert!(is_compatible(PortKind::Code, PortKind::Text));

        assert!(!is_compatible(PortKind::Text, PortKind::Analysis));
        assert!(!is_compatible(PortKind::Document, PortKind::Presentation));
        assert!(!is_compatible(PortKind::Text, PortKind::Code));
    }

    #[test]
    fn table_is_not_transitive() {
        // presentation -> document and document -> text do not give presentation -> text
        assert!(!is_compatible(PortKind::Presentation, PortKind::Text));
    }

    #[test]
    fn unrelated_kinds_are_rejected() {
        assert!(!is_compatible(PortKind::Image, PortKind::Text));
        assert!(!PortKind::Code.can_feed(PortKind::Image));
    }

    #[test]
    fn kind_wire_names() {
        let kind: PortKind = serde_json::from_str("\"presentation\"").expect("deserialize");
        assert_eq!(kind, PortKind::Presentation);
        assert_eq!(serde_json::to_string(&PortKind::Any).unwrap(), "\"any\"");
    }

    #[test]
    fn port_spec_defaults() {
        let port: PortSpec =
            serde_json::from_str(r#"{"id":"draft","kind":"text"}"#).expect("deserialize");
        assert!(!port.required);
        assert_eq!(port.display_name(), "draft");

        let port = PortSpec::required("topic", PortKind::Text).with_label("Topic");
        assert!(port.required);
        assert_eq!(port.display_name(), "Topic");
    }
}
