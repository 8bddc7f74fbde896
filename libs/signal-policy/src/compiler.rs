//! Rule Compiler - rule document blocks to an evaluable, signal-indexed rule set
//!
//! A rule document is an ordered YAML sequence:
//!
//! ```yaml
//! - condition: wipers.front.on == true
//!   emit:
//!     signal: lights.external.headlights
//!     value: true
//!     delay: 2000
//! ```
//!
//! Compilation parses each condition, builds its action, and appends the
//! rule to the dependency index entry of every signal its condition reads.

use std::collections::BTreeMap;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Result, RuleError};
use crate::expression::Expression;
use crate::value::Value;

// ============================================================================
// Document schema
// ============================================================================

/// One block of the rule document, as written
///
/// Fields are optional here so that missing keys surface as
/// [`RuleError::Syntax`] naming the rule rather than a bare YAML error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleDefinition {
    #[serde(default)]
    pub condition: Option<serde_yaml::Value>,

    #[serde(default)]
    pub emit: Option<EmitDefinition>,

    /// Unrecognized keys, warned about and ignored
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// The `emit` block of a rule definition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmitDefinition {
    #[serde(default)]
    pub signal: Option<String>,

    #[serde(default)]
    pub value: Option<serde_yaml::Value>,

    /// Milliseconds, non-negative integer
    #[serde(default)]
    pub delay: Option<serde_yaml::Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Parse a rule document into its raw blocks
pub fn parse_rule_document(yaml: &str) -> Result<Vec<RuleDefinition>> {
    if yaml.trim().is_empty() {
        return Ok(Vec::new());
    }
    let blocks: Option<Vec<RuleDefinition>> = serde_yaml::from_str(yaml)?;
    Ok(blocks.unwrap_or_default())
}

// ============================================================================
// Compiled form
// ============================================================================

/// Output signal produced when a rule fires
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub signal: String,
    pub value: Value,
    /// `None` emits synchronously during evaluation
    pub delay_ms: Option<u64>,
}

impl Action {
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(Duration::from_millis)
    }

    pub fn is_delayed(&self) -> bool {
        self.delay_ms.is_some()
    }
}

/// Compiled rule; `id` is its position in the document
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: usize,
    pub condition: Expression,
    pub action: Action,
}

/// Reverse index: signal name → ids of the rules whose condition reads it
///
/// Each list is in declaration order, which is also evaluation order.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    entries: FxHashMap<String, Vec<usize>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, signal: &str, rule_id: usize) {
        let ids = self.entries.entry(signal.to_string()).or_default();
        if ids.last() != Some(&rule_id) {
            ids.push(rule_id);
        }
    }

    /// Rule ids depending on `signal`, empty when none
    pub fn get(&self, signal: &str) -> &[usize] {
        self.entries.get(signal).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, signal: &str) -> bool {
        self.entries.contains_key(signal)
    }

    /// Indexed signal names, sorted
    pub fn signals(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable set of compiled rules plus their dependency index
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    index: DependencyIndex,
}

impl RuleSet {
    /// Compile a rule document from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::compile(parse_rule_document(yaml)?)
    }

    /// Compile rule definitions, failing on the first malformed one
    pub fn compile(definitions: Vec<RuleDefinition>) -> Result<Self> {
        let mut rules = Vec::with_capacity(definitions.len());
        let mut index = DependencyIndex::new();

        for (id, definition) in definitions.into_iter().enumerate() {
            let rule = compile_rule(id, definition)?;

            let names = rule.condition.identifiers();
            if names.is_empty() {
                warn!(
                    "Rule #{} ({}) references no signals and will never fire",
                    id, rule.condition
                );
            }
            for name in names {
                index.insert(name, id);
            }

            debug!(
                "Compiled rule #{}: {} -> {}={}{}",
                id,
                rule.condition,
                rule.action.signal,
                rule.action.value.to_literal(),
                rule.action
                    .delay_ms
                    .map(|ms| format!(" after {}ms", ms))
                    .unwrap_or_default()
            );
            rules.push(rule);
        }

        info!(
            "Compiled {} rules watching {} signals",
            rules.len(),
            index.len()
        );
        Ok(Self { rules, index })
    }

    /// Rules depending on `signal`, in declaration order
    pub fn dependents<'a>(&'a self, signal: &str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.index
            .get(signal)
            .iter()
            .filter_map(move |id| self.rules.get(*id))
    }

    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    /// Signal names at least one rule depends on, sorted
    pub fn watched_signals(&self) -> Vec<&str> {
        self.index.signals()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: usize) -> Option<&Rule> {
        self.rules.get(id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_rule(id: usize, definition: RuleDefinition) -> Result<Rule> {
    for key in definition.extra.keys() {
        warn!("Rule #{}: unrecognized key '{}' ignored", id, key);
    }

    let condition_text = match &definition.condition {
        Some(raw) => scalar_text(raw)
            .ok_or_else(|| RuleError::syntax(id, "'condition' must be a scalar expression"))?,
        None => return Err(RuleError::syntax(id, "missing 'condition'")),
    };
    let condition = Expression::parse(&condition_text).map_err(|e| {
        RuleError::syntax(id, format!("invalid condition '{}': {}", condition_text, e))
    })?;

    let emit = definition
        .emit
        .ok_or_else(|| RuleError::syntax(id, "missing 'emit' block"))?;
    let action = compile_action(id, emit)?;

    Ok(Rule {
        id,
        condition,
        action,
    })
}

fn compile_action(id: usize, emit: EmitDefinition) -> Result<Action> {
    for key in emit.extra.keys() {
        warn!("Rule #{}: unrecognized emit key '{}' ignored", id, key);
    }

    let signal = emit
        .signal
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RuleError::syntax(id, "missing 'emit.signal'"))?;

    let value = match &emit.value {
        Some(raw) => scalar_text(raw)
            .map(|text| Value::coerce(&text))
            .ok_or_else(|| RuleError::syntax(id, "'emit.value' must be a scalar"))?,
        None => return Err(RuleError::syntax(id, "missing 'emit.value'")),
    };

    let delay_ms = match &emit.delay {
        None => None,
        Some(raw) => Some(raw.as_u64().ok_or_else(|| {
            RuleError::syntax(
                id,
                format!(
                    "'emit.delay' must be a non-negative integer of milliseconds, got {}",
                    describe(raw)
                ),
            )
        })?),
    };

    Ok(Action {
        signal,
        value,
        delay_ms,
    })
}

/// Scalar YAML value serialized as text; `None` for null and collections
fn scalar_text(raw: &serde_yaml::Value) -> Option<String> {
    match raw {
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Tagged(tagged) => scalar_text(&tagged.value),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
    }
}

fn describe(raw: &serde_yaml::Value) -> String {
    scalar_text(raw).unwrap_or_else(|| "a non-scalar value".to_string())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const HEADLIGHTS: &str = r#"
- condition: wipers.front.on == true
  emit:
    signal: lights.external.headlights
    value: true
    delay: 2000
- condition: a == 1 and b.c > 2.5
  emit:
    signal: out
    value: "'fired'"
"#;

    #[test]
    fn test_compile_document() {
        let rules = RuleSet::from_yaml_str(HEADLIGHTS).unwrap();
        assert_eq!(rules.len(), 2);

        let first = rules.get(0).unwrap();
        assert_eq!(first.action.signal, "lights.external.headlights");
        assert_eq!(first.action.value, Value::Bool(true));
        assert_eq!(first.action.delay(), Some(Duration::from_millis(2000)));

        let second = rules.get(1).unwrap();
        assert_eq!(second.action.value, Value::String("fired".to_string()));
        assert!(!second.action.is_delayed());
    }

    #[test]
    fn test_dependency_index_lists_exactly_referenced_signals() {
        let rules = RuleSet::from_yaml_str(HEADLIGHTS).unwrap();
        assert_eq!(rules.index().get("a"), &[1]);
        assert_eq!(rules.index().get("b.c"), &[1]);
        assert!(rules.index().get("b").is_empty());
        assert!(rules.index().get("c").is_empty());
        assert_eq!(
            rules.watched_signals(),
            vec!["a", "b.c", "wipers.front.on"]
        );
    }

    #[test]
    fn test_dependents_follow_declaration_order() {
        let yaml = r#"
- condition: speed > 10
  emit: { signal: first, value: 1 }
- condition: gear == 2
  emit: { signal: other, value: 1 }
- condition: speed > 20 or speed < 0
  emit: { signal: second, value: 2 }
"#;
        let rules = RuleSet::from_yaml_str(yaml).unwrap();
        let order: Vec<&str> = rules
            .dependents("speed")
            .map(|r| r.action.signal.as_str())
            .collect();
        assert_eq!(order, vec!["first", "second"]);
        // Repeated references index the rule once
        assert_eq!(rules.index().get("speed"), &[0, 2]);
    }

    #[test]
    fn test_emit_value_serialized_then_coerced() {
        let yaml = r#"
- condition: x == 1
  emit: { signal: int, value: 3 }
- condition: x == 1
  emit: { signal: float, value: 3.5 }
- condition: x == 1
  emit: { signal: text, value: dimmed }
- condition: x == 1
  emit: { signal: quoted_number, value: "'3'" }
"#;
        let rules = RuleSet::from_yaml_str(yaml).unwrap();
        let values: Vec<&Value> = rules.rules().iter().map(|r| &r.action.value).collect();
        assert_eq!(
            values,
            vec![
                &Value::Int(3),
                &Value::Float(3.5),
                &Value::String("dimmed".to_string()),
                &Value::String("3".to_string()),
            ]
        );
    }

    #[test]
    #[traced_test]
    fn test_unrecognized_keys_warn_but_compile() {
        let yaml = r#"
- condition: door.open == true
  priority: 5
  emit:
    signal: chime
    value: true
    repeat: 3
"#;
        let rules = RuleSet::from_yaml_str(yaml).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(logs_contain("unrecognized key 'priority'"));
        assert!(logs_contain("unrecognized emit key 'repeat'"));
    }

    #[test]
    #[traced_test]
    fn test_rule_without_signals_is_dead_but_legal() {
        let yaml = r#"
- condition: 1 == 1
  emit: { signal: never, value: 1 }
"#;
        let rules = RuleSet::from_yaml_str(yaml).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules.index().is_empty());
        assert!(logs_contain("will never fire"));
    }

    #[test]
    fn test_syntax_errors_name_the_rule() {
        let cases = [
            ("- emit: { signal: s, value: 1 }", "missing 'condition'"),
            ("- condition: a == 1", "missing 'emit'"),
            ("- condition: a == 1\n  emit: { value: 1 }", "emit.signal"),
            ("- condition: a == 1\n  emit: { signal: s }", "emit.value"),
            (
                "- condition: a == 1\n  emit: { signal: s, value: 1, delay: -5 }",
                "emit.delay",
            ),
            (
                "- condition: a == 1\n  emit: { signal: s, value: 1, delay: 1.5 }",
                "emit.delay",
            ),
            ("- condition: a = = 1\n  emit: { signal: s, value: 1 }", "invalid condition"),
        ];

        for (yaml, expected) in cases {
            match RuleSet::from_yaml_str(yaml) {
                Err(RuleError::Syntax { index, message }) => {
                    assert_eq!(index, 0);
                    assert!(
                        message.contains(expected),
                        "'{}' does not mention '{}'",
                        message,
                        expected
                    );
                },
                other => panic!("Expected syntax error for {:?}, got {:?}", yaml, other),
            }
        }
    }

    #[test]
    fn test_bad_rule_aborts_whole_document() {
        let yaml = r#"
- condition: a == 1
  emit: { signal: ok, value: 1 }
- condition: a ==
  emit: { signal: broken, value: 1 }
"#;
        match RuleSet::from_yaml_str(yaml) {
            Err(RuleError::Syntax { index, .. }) => assert_eq!(index, 1),
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_document_shape_errors() {
        assert!(RuleSet::from_yaml_str("").unwrap().is_empty());
        assert!(matches!(
            RuleSet::from_yaml_str("condition: a == 1"),
            Err(RuleError::InvalidDocument(_))
        ));
    }
}
