//! Artifact kinds
//!
//! Each generation session declares what it is producing. The kind selects
//! the structural rules a candidate snapshot has to satisfy before it is
//! shown to anyone.

use crate::rules::{ArtifactRules, StructuralAnchor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of artifact a session produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A single React component file (TSX/JSX)
    #[default]
    ReactComponent,
    /// A plain JavaScript / TypeScript module
    JavaScriptModule,
    /// An HTML document or fragment
    Html,
    /// A JSON document
    Json,
    /// Free text; only marker hygiene is checked
    PlainText,
}

impl ArtifactKind {
    /// All kinds, in declaration order
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::ReactComponent,
        ArtifactKind::JavaScriptModule,
        ArtifactKind::Html,
        ArtifactKind::Json,
        ArtifactKind::PlainText,
    ];

    /// Stable identifier used in config files and logs
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::ReactComponent => "react_component",
            ArtifactKind::JavaScriptModule => "java_script_module",
            ArtifactKind::Html => "html",
            ArtifactKind::Json => "json",
            ArtifactKind::PlainText => "plain_text",
        }
    }

    /// Structural rules for this kind
    #[must_use]
    pub fn rules(&self) -> ArtifactRules {
        match self {
            ArtifactKind::ReactComponent => ArtifactRules::new()
                .with_anchor(StructuralAnchor::new("export default function", &['}']))
                .with_anchor(StructuralAnchor::new("export default class", &['}']))
                .with_anchor(StructuralAnchor::new("export function", &['}']))
                .with_anchor(StructuralAnchor::new("export const", &['}', ')']))
                .with_control_return("return")
                .with_comment_pair("/*", "*/")
                .with_trailing_terminator(';'),
            ArtifactKind::JavaScriptModule => ArtifactRules::new()
                .with_anchor(StructuralAnchor::new("export default", &['}', ')', ']']))
                .with_anchor(StructuralAnchor::new("export function", &['}']))
                .with_anchor(StructuralAnchor::new("export const", &['}', ')', ']']))
                .with_anchor(StructuralAnchor::new("module.exports", &['}', ')', ']']))
                .with_control_return("return")
                .with_comment_pair("/*", "*/")
                .with_trailing_terminator(';'),
            ArtifactKind::Html => ArtifactRules::new()
                .with_anchor(StructuralAnchor::new("<!DOCTYPE", &['>']))
                .with_anchor(StructuralAnchor::new("<html", &['>']))
                .with_anchor(StructuralAnchor::new("<body", &['>']))
                .with_anchor(StructuralAnchor::new("<div", &['>']))
                .with_comment_pair("<!--", "-->"),
            ArtifactKind::Json => ArtifactRules::new()
                .with_anchor(StructuralAnchor::new("{", &['}']))
                .with_anchor(StructuralAnchor::new("[", &[']'])),
            ArtifactKind::PlainText => ArtifactRules::new().without_group_balance(),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown artifact kind name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown artifact kind: '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for ArtifactKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "react_component" | "react" | "tsx" | "jsx" => Ok(ArtifactKind::ReactComponent),
            "java_script_module" | "javascript" | "js" | "ts" => Ok(ArtifactKind::JavaScriptModule),
            "html" => Ok(ArtifactKind::Html),
            "json" => Ok(ArtifactKind::Json),
            "plain_text" | "text" => Ok(ArtifactKind::PlainText),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in ArtifactKind::ALL {
            assert_eq!(kind.name().parse::<ArtifactKind>().unwrap(), kind);
        }
    }

    #[test]
    fn aliases_parse() {
        assert_eq!("tsx".parse::<ArtifactKind>().unwrap(), ArtifactKind::ReactComponent);
        assert_eq!("Plain-Text".parse::<ArtifactKind>().unwrap(), ArtifactKind::PlainText);
        assert!("cobol".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn serde_name_matches_name() {
        for kind in ArtifactKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }

    #[test]
    fn plain_text_rules_skip_grouping_balance() {
        let rules = ArtifactKind::PlainText.rules();
        assert!(!rules.balance_groups);
        assert!(rules.anchors.is_empty());
    }

    #[test]
    fn react_rules_require_return() {
        let rules = ArtifactKind::ReactComponent.rules();
        assert_eq!(rules.control_returns, vec!["return".to_string()]);
        assert!(rules.balance_groups);
    }
}
