//! Structural rules for candidate artifacts
//!
//! Rules are data, not code: the validator in `tastegen-stream` reads an
//! [`ArtifactRules`] value and decides which checks apply. Empty lists make
//! the corresponding check vacuous.

use serde::{Deserialize, Serialize};

/// Grouping symbol pairs whose counts must balance
pub const GROUP_PAIRS: [(char, char); 3] = [('{', '}'), ('(', ')'), ('[', ']')];

/// A top-level declaration token and the symbols an artifact opened by it
/// may end with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralAnchor {
    /// Literal token, e.g. `export default function`
    pub token: String,
    /// Acceptable final characters once the artifact is trimmed
    pub closers: Vec<char>,
}

impl StructuralAnchor {
    /// Create anchor
    #[must_use]
    pub fn new(token: impl Into<String>, closers: &[char]) -> Self {
        Self {
            token: token.into(),
            closers: closers.to_vec(),
        }
    }
}

/// Per-kind structural rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRules {
    /// Require balanced `{}`, `()` and `[]` counts
    pub balance_groups: bool,
    /// At least one must be present (if any are configured)
    pub anchors: Vec<StructuralAnchor>,
    /// At least one must be present (if any are configured)
    pub control_returns: Vec<String>,
    /// Open/close annotation pairs whose counts must balance
    pub comment_pairs: Vec<(String, String)>,
    /// Characters stripped from the end before the closing-symbol check
    pub trailing_terminators: Vec<char>,
}

impl ArtifactRules {
    /// Empty rule set with grouping balance enabled
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            balance_groups: true,
            anchors: Vec::new(),
            control_returns: Vec::new(),
            comment_pairs: Vec::new(),
            trailing_terminators: Vec::new(),
        }
    }

    /// With structural anchor
    #[must_use]
    pub fn with_anchor(mut self, anchor: StructuralAnchor) -> Self {
        self.anchors.push(anchor);
        self
    }

    /// With control-return construct
    #[must_use]
    pub fn with_control_return(mut self, token: impl Into<String>) -> Self {
        self.control_returns.push(token.into());
        self
    }

    /// With annotation pair
    #[must_use]
    pub fn with_comment_pair(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.comment_pairs.push((open.into(), close.into()));
        self
    }

    /// With trailing terminator
    #[must_use]
    pub fn with_trailing_terminator(mut self, terminator: char) -> Self {
        self.trailing_terminators.push(terminator);
        self
    }

    /// Disable grouping balance
    #[must_use]
    pub fn without_group_balance(mut self) -> Self {
        self.balance_groups = false;
        self
    }

    /// The anchor that opens `text`: the one whose token occurs earliest,
    /// longest token winning ties
    #[must_use]
    pub fn opening_anchor(&self, text: &str) -> Option<&StructuralAnchor> {
        self.anchors
            .iter()
            .filter_map(|a| text.find(&a.token).map(|pos| (pos, a)))
            .min_by(|(pa, a), (pb, b)| pa.cmp(pb).then(b.token.len().cmp(&a.token.len())))
            .map(|(_, a)| a)
    }
}

impl Default for ArtifactRules {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ArtifactRules {
        ArtifactRules::new()
            .with_anchor(StructuralAnchor::new("export function", &['}']))
            .with_anchor(StructuralAnchor::new("export default function", &['}']))
            .with_anchor(StructuralAnchor::new("export const", &['}', ')']))
    }

    #[test]
    fn opening_anchor_is_earliest() {
        let text = "export const A = () => (<b/>);\nexport default function App() {}";
        assert_eq!(rules().opening_anchor(text).unwrap().token, "export const");
    }

    #[test]
    fn opening_anchor_absent() {
        assert!(rules().opening_anchor("function App() {}").is_none());
    }

    #[test]
    fn longest_token_wins_tie() {
        let rules = ArtifactRules::new()
            .with_anchor(StructuralAnchor::new("export", &[')']))
            .with_anchor(StructuralAnchor::new("export default function", &['}']));
        let anchor = rules.opening_anchor("export default function App() {}").unwrap();
        assert_eq!(anchor.token, "export default function");
    }

    #[test]
    fn rules_serialize() {
        let json = serde_json::to_string(&rules()).unwrap();
        let back: ArtifactRules = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rules());
    }
}
