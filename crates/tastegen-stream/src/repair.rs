//! Best-effort repair of the final artifact
//!
//! Generators occasionally wrap the whole answer in a Markdown fence or a
//! JSON string. Repair rules only propose an unwrapped text; the session
//! keeps it only if it validates where the original did not.

use serde_json::Value;

/// One unwrapping strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairRule {
    /// ```` ```tsx ... ``` ````
    StripCodeFence,
    /// `"..."` literal, or an object with exactly one string field
    UnwrapJsonString,
}

impl RepairRule {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RepairRule::StripCodeFence => "strip_code_fence",
            RepairRule::UnwrapJsonString => "unwrap_json_string",
        }
    }

    /// Unwrapped text, or `None` if the rule does not apply
    #[must_use]
    pub fn apply(&self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        match self {
            RepairRule::StripCodeFence => strip_code_fence(trimmed),
            RepairRule::UnwrapJsonString => unwrap_json_string(trimmed),
        }
    }
}

fn strip_code_fence(text: &str) -> Option<String> {
    let rest = text.strip_prefix("```")?;
    // Drop the info string (language tag) line.
    let (_, body) = rest.split_once('\n')?;
    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    let body = body.trim_matches(['\r', '\n']).trim_end();
    (!body.is_empty()).then(|| body.to_string())
}

fn unwrap_json_string(text: &str) -> Option<String> {
    let inner = match serde_json::from_str::<Value>(text).ok()? {
        Value::String(s) => s,
        Value::Object(map) => {
            let mut strings = map.into_iter().filter_map(|(_, v)| match v {
                Value::String(s) => Some(s),
                _ => None,
            });
            let only = strings.next()?;
            if strings.next().is_some() {
                return None;
            }
            only
        }
        _ => return None,
    };
    let inner = inner.trim();
    (!inner.is_empty() && inner != text).then(|| inner.to_string())
}

/// Ordered repair rules
#[derive(Debug, Clone)]
pub struct RepairPipeline {
    rules: Vec<RepairRule>,
}

impl RepairPipeline {
    /// Code fence first, then JSON unwrapping
    #[must_use]
    pub fn standard() -> Self {
        Self {
            rules: vec![RepairRule::StripCodeFence, RepairRule::UnwrapJsonString],
        }
    }

    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[RepairRule] {
        &self.rules
    }

    /// Some rule would change the text
    #[must_use]
    pub fn looks_wrapped(&self, text: &str) -> bool {
        self.rules.iter().any(|r| r.apply(text).is_some())
    }

    /// Proposed repairs, in rule order
    pub fn candidates<'a>(&'a self, text: &'a str) -> impl Iterator<Item = (RepairRule, String)> + 'a {
        self.rules
            .iter()
            .filter_map(move |rule| rule.apply(text).map(|repaired| (*rule, repaired)))
    }
}

impl Default for RepairPipeline {
    fn default() -> Self {
        Self::standard()
    }
}
