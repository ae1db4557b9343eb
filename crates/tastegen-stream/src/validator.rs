//! Structural validation of candidate artifacts
//!
//! Validation is a pure function of the candidate text and the artifact
//! rules. It never fails as an operation: a rejected candidate is a report
//! listing every check that did not pass.

use serde::Serialize;
use std::fmt;
use tastegen_artifact::{ArtifactKind, ArtifactRules, GROUP_PAIRS};

/// Individually reportable checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    NonEmpty,
    BracketBalance,
    CommentBalance,
    StructuralAnchor,
    ControlReturn,
    ClosingSymbol,
    ResidualMarkers,
}

impl Check {
    /// Every check, in evaluation order
    pub const ALL: [Check; 7] = [
        Check::NonEmpty,
        Check::BracketBalance,
        Check::CommentBalance,
        Check::StructuralAnchor,
        Check::ControlReturn,
        Check::ClosingSymbol,
        Check::ResidualMarkers,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Check::NonEmpty => "non_empty",
            Check::BracketBalance => "bracket_balance",
            Check::CommentBalance => "comment_balance",
            Check::StructuralAnchor => "structural_anchor",
            Check::ControlReturn => "control_return",
            Check::ClosingSymbol => "closing_symbol",
            Check::ResidualMarkers => "residual_markers",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a candidate was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("candidate is empty")]
    Empty,

    #[error("unbalanced '{open}'/'{close}': {opened} opened, {closed} closed")]
    UnbalancedGroup {
        open: char,
        close: char,
        opened: usize,
        closed: usize,
    },

    #[error("unbalanced '{open}'/'{close}' annotations: {opened} opened, {closed} closed")]
    UnbalancedComment {
        open: String,
        close: String,
        opened: usize,
        closed: usize,
    },

    #[error("no structural anchor found")]
    MissingAnchor,

    #[error("no control-return construct found")]
    MissingControlReturn,

    #[error("artifact opened by '{anchor}' must end with one of {expected:?}, found {found:?}")]
    WrongClosingSymbol {
        anchor: String,
        expected: Vec<char>,
        found: Option<char>,
    },

    #[error("residual marker '{token}' at byte {offset}")]
    ResidualMarker { token: String, offset: usize },
}

impl ValidationFailure {
    /// The check that produced this failure
    #[must_use]
    pub fn check(&self) -> Check {
        match self {
            ValidationFailure::Empty => Check::NonEmpty,
            ValidationFailure::UnbalancedGroup { .. } => Check::BracketBalance,
            ValidationFailure::UnbalancedComment { .. } => Check::CommentBalance,
            ValidationFailure::MissingAnchor => Check::StructuralAnchor,
            ValidationFailure::MissingControlReturn => Check::ControlReturn,
            ValidationFailure::WrongClosingSymbol { .. } => Check::ClosingSymbol,
            ValidationFailure::ResidualMarker { .. } => Check::ResidualMarkers,
        }
    }
}

/// Verdict for one candidate
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    #[must_use]
    pub fn failed_checks(&self) -> Vec<Check> {
        self.failures.iter().map(ValidationFailure::check).collect()
    }

    /// Human-readable failure messages
    #[must_use]
    pub fn issues(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }
}

/// Applies [`ArtifactRules`] plus the residual-marker check
#[derive(Debug, Clone)]
pub struct ArtifactValidator {
    rules: ArtifactRules,
    residual_tokens: Vec<String>,
}

impl ArtifactValidator {
    #[must_use]
    pub fn new(rules: ArtifactRules, residual_tokens: Vec<String>) -> Self {
        Self {
            rules,
            residual_tokens: residual_tokens.into_iter().filter(|t| !t.is_empty()).collect(),
        }
    }

    /// Validator for a kind with no residual tokens configured
    #[must_use]
    pub fn for_kind(kind: ArtifactKind) -> Self {
        Self::new(kind.rules(), Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn rules(&self) -> &ArtifactRules {
        &self.rules
    }

    /// Run every check
    #[must_use]
    pub fn validate(&self, text: &str) -> ValidationReport {
        ValidationReport {
            failures: Check::ALL
                .iter()
                .filter_map(|check| self.check(*check, text).err())
                .collect(),
        }
    }

    /// Run a single check
    ///
    /// # Errors
    /// The failure, if `text` does not pass `check`
    pub fn check(&self, check: Check, text: &str) -> Result<(), ValidationFailure> {
        match check {
            Check::NonEmpty => {
                if text.trim().is_empty() {
                    return Err(ValidationFailure::Empty);
                }
            }
            Check::BracketBalance => {
                if !self.rules.balance_groups {
                    return Ok(());
                }
                for (open, close) in GROUP_PAIRS {
                    let opened = text.matches(open).count();
                    let closed = text.matches(close).count();
                    if opened != closed {
                        return Err(ValidationFailure::UnbalancedGroup {
                            open,
                            close,
                            opened,
                            closed,
                        });
                    }
                }
            }
            Check::CommentBalance => {
                for (open, close) in &self.rules.comment_pairs {
                    let opened = text.matches(open.as_str()).count();
                    let closed = text.matches(close.as_str()).count();
                    if opened != closed {
                        return Err(ValidationFailure::UnbalancedComment {
                            open: open.clone(),
                            close: close.clone(),
                            opened,
                            closed,
                        });
                    }
                }
            }
            Check::StructuralAnchor => {
                if !self.rules.anchors.is_empty() && self.rules.opening_anchor(text).is_none() {
                    return Err(ValidationFailure::MissingAnchor);
                }
            }
            Check::ControlReturn => {
                let returns = &self.rules.control_returns;
                if !returns.is_empty() && !returns.iter().any(|r| contains_word(text, r)) {
                    return Err(ValidationFailure::MissingControlReturn);
                }
            }
            Check::ClosingSymbol => {
                // Without an anchor there is nothing to close; StructuralAnchor reports that.
                if let Some(anchor) = self.rules.opening_anchor(text) {
                    let terminators = self.rules.trailing_terminators.as_slice();
                    let found = text
                        .trim_end()
                        .trim_end_matches(|c: char| terminators.contains(&c) || c.is_whitespace())
                        .chars()
                        .last();
                    if !found.is_some_and(|c| anchor.closers.contains(&c)) {
                        return Err(ValidationFailure::WrongClosingSymbol {
                            anchor: anchor.token.clone(),
                            expected: anchor.closers.clone(),
                            found,
                        });
                    }
                }
            }
            Check::ResidualMarkers => {
                let residual = self
                    .residual_tokens
                    .iter()
                    .filter_map(|t| text.find(t.as_str()).map(|offset| (offset, t)))
                    .min_by_key(|(offset, _)| *offset);
                if let Some((offset, token)) = residual {
                    return Err(ValidationFailure::ResidualMarker {
                        token: token.clone(),
                        offset,
                    });
                }
            }
        }
        Ok(())
    }
}

/// `needle` occurs in `text` not embedded in a longer identifier
fn contains_word(text: &str, needle: &str) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    text.match_indices(needle).any(|(pos, _)| {
        let before = text[..pos].chars().next_back();
        let after = text[pos + needle.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "export default function App() {\n  return (<div>Hi</div>);\n}";

    fn validator() -> ArtifactValidator {
        ArtifactValidator::new(
            ArtifactKind::ReactComponent.rules(),
            vec!["// $CHECKPOINT".into(), "/*$COMPLETION".into(), "$END_COMPLETION*/".into()],
        )
    }

    #[test]
    fn accepts_well_formed_component() {
        let report = validator().validate(VALID);
        assert!(report.is_valid(), "{:?}", report.issues());
    }

    #[test]
    fn accepts_trailing_semicolon_after_closer() {
        let text = "export const App = () => {\n  return null;\n};";
        assert!(validator().validate(text).is_valid());
    }

    #[test]
    fn rejects_empty() {
        let report = validator().validate("   \n");
        assert!(report.failed_checks().contains(&Check::NonEmpty));
    }

    #[test]
    fn reports_unbalanced_braces() {
        let text = "export default function App() {\n  return (<p>{count</p>);\n}";
        let report = validator().validate(text);
        assert_eq!(report.failed_checks(), vec![Check::BracketBalance]);
        assert_eq!(
            report.failures()[0],
            ValidationFailure::UnbalancedGroup {
                open: '{',
                close: '}',
                opened: 2,
                closed: 1
            }
        );
    }

    #[test]
    fn reports_unbalanced_comment() {
        let text = "export default function App() {\n  /* note\n  return null;\n}";
        let report = validator().validate(text);
        assert_eq!(report.failed_checks(), vec![Check::CommentBalance]);
    }

    #[test]
    fn reports_missing_anchor_only_once() {
        let text = "function App() {\n  return null;\n}";
        assert_eq!(validator().validate(text).failed_checks(), vec![Check::StructuralAnchor]);
    }

    #[test]
    fn control_return_must_be_a_word() {
        let text = "export default function App() {\n  returned();\n}";
        let v = validator();
        assert_eq!(
            v.check(Check::ControlReturn, text),
            Err(ValidationFailure::MissingControlReturn)
        );
        assert!(v.check(Check::ControlReturn, VALID).is_ok());
    }

    #[test]
    fn closing_symbol_must_match_anchor() {
        let text = "export default function App() {\n  return null;\n}\nconst x = 1";
        let err = validator().check(Check::ClosingSymbol, text).unwrap_err();
        assert!(matches!(
            err,
            ValidationFailure::WrongClosingSymbol { found: Some('1'), .. }
        ));
    }

    #[test]
    fn residual_marker_is_reported_with_offset() {
        let text = format!("{VALID}\n// $CHECKPOINT");
        let err = validator().check(Check::ResidualMarkers, &text).unwrap_err();
        assert_eq!(
            err,
            ValidationFailure::ResidualMarker {
                token: "// $CHECKPOINT".into(),
                offset: VALID.len() + 1
            }
        );
        assert_eq!(err.to_string(), format!("residual marker '// $CHECKPOINT' at byte {}", VALID.len() + 1));
    }

    #[test]
    fn plain_text_only_checks_hygiene() {
        let v = ArtifactValidator::new(ArtifactKind::PlainText.rules(), vec!["$X".into()]);
        assert!(v.validate("unbalanced ( text {").is_valid());
        assert!(!v.validate("leaked $X").is_valid());
    }

    #[test]
    fn html_rules_apply() {
        let v = ArtifactValidator::for_kind(ArtifactKind::Html);
        assert!(v.validate("<div class=\"a\">\n  <!-- x -->\n</div>").is_valid());
        assert_eq!(
            v.validate("<div>\n  <!-- x\n</div>").failed_checks(),
            vec![Check::CommentBalance]
        );
    }
}
