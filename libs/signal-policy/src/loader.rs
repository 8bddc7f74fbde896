//! Rule and initial-state document loading

use std::path::Path;

use tracing::info;

use crate::compiler::RuleSet;
use crate::error::{Result, RuleError};
use crate::state::StateStore;

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| RuleError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and compile a rule document
pub fn load_rules(path: impl AsRef<Path>) -> Result<RuleSet> {
    let path = path.as_ref();
    let rules = RuleSet::from_yaml_str(&read_document(path)?)?;
    info!("Loaded {} rules from {}", rules.len(), path.display());
    Ok(rules)
}

/// Parse an initial-state document: a YAML sequence of `"name = value"`
/// strings. An empty document yields an empty store.
pub fn initial_state_from_str(yaml: &str) -> Result<StateStore> {
    if yaml.trim().is_empty() {
        return Ok(StateStore::new());
    }
    let entries: Option<Vec<String>> = serde_yaml::from_str(yaml)?;
    StateStore::from_entries(entries.unwrap_or_default())
}

/// Read an initial-state document
pub fn load_initial_state(path: impl AsRef<Path>) -> Result<StateStore> {
    let path = path.as_ref();
    let state = initial_state_from_str(&read_document(path)?)?;
    info!(
        "Loaded {} initial signals from {}",
        state.len(),
        path.display()
    );
    Ok(state)
}
