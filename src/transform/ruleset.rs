//! Declarative transform rules, loaded from JSON
//!
//! ```json
//! {
//!   "name": "entries-field-to-attribute",
//!   "rules": [
//!     { "element": "entry", "promote_child": "field", "as_attribute": "field" }
//!   ]
//! }
//! ```

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Promote the text of a named child element to an attribute of its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromoteRule {
    /// Element the rule applies to, at any depth
    pub element: String,
    /// Child element whose text becomes the attribute value
    pub promote_child: String,
    /// Attribute name written on `element`
    pub as_attribute: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformRuleSet {
    pub name: String,
    pub rules: Vec<PromoteRule>,
}

impl TransformRuleSet {
    /// `entry/field` element → `entry/@field` attribute
    pub fn entries_field() -> Self {
        Self {
            name: "entries-field-to-attribute".to_string(),
            rules: vec![PromoteRule {
                element: "entry".to_string(),
                promote_child: "field".to_string(),
                as_attribute: "field".to_string(),
            }],
        }
    }

    pub fn from_json(json: &str) -> PipelineResult<Self> {
        let ruleset: Self = serde_json::from_str(json)
            .map_err(|e| PipelineError::Config(format!("invalid rule set: {}", e)))?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    /// Load and validate a rule set file
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read rule set {}: {}", path.display(), e))
        })?;

        let ruleset = Self::from_json(&json)?;
        log::info!(
            "📜 Loaded rule set '{}' ({} rules) from {}",
            ruleset.name,
            ruleset.rules.len(),
            path.display()
        );
        Ok(ruleset)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.rules.is_empty() {
            return Err(PipelineError::Config(format!(
                "rule set '{}' has no rules",
                self.name
            )));
        }

        let mut targets = HashSet::new();
        for rule in &self.rules {
            if rule.element.is_empty() || rule.promote_child.is_empty() || rule.as_attribute.is_empty() {
                return Err(PipelineError::Config(format!(
                    "rule set '{}' has a rule with an empty name: {:?}",
                    self.name, rule
                )));
            }
            if !targets.insert(rule.element.as_str()) {
                return Err(PipelineError::Config(format!(
                    "rule set '{}' targets <{}> more than once",
                    self.name, rule.element
                )));
            }
        }

        Ok(())
    }

    pub fn rule_for(&self, element: &str) -> Option<&PromoteRule> {
        self.rules.iter().find(|rule| rule.element == element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_bundled_ruleset_matches_builtin() {
        let bundled = include_str!("../../config/ruleset.json");
        let ruleset = TransformRuleSet::from_json(bundled).unwrap();
        assert_eq!(ruleset, TransformRuleSet::entries_field());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"name":"custom","rules":[{"element":"row","promote_child":"v","as_attribute":"value"}]}"#,
        )
        .unwrap();

        let ruleset = TransformRuleSet::load(&path).unwrap();
        assert_eq!(ruleset.name, "custom");
        assert_eq!(ruleset.rule_for("row").unwrap().as_attribute, "value");
        assert!(ruleset.rule_for("entry").is_none());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempdir().unwrap();
        let err = TransformRuleSet::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let json = r#"{"name":"x","rules":[{"element":"entry","promote_child":"field","as_attribute":"field","xslt":"..."}]}"#;
        assert!(matches!(TransformRuleSet::from_json(json), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_rejects_empty_and_duplicate_rules() {
        let empty = r#"{"name":"x","rules":[]}"#;
        assert!(matches!(TransformRuleSet::from_json(empty), Err(PipelineError::Config(_))));

        let duplicate = r#"{"name":"x","rules":[
            {"element":"entry","promote_child":"field","as_attribute":"field"},
            {"element":"entry","promote_child":"other","as_attribute":"other"}
        ]}"#;
        assert!(matches!(TransformRuleSet::from_json(duplicate), Err(PipelineError::Config(_))));

        let blank = r#"{"name":"x","rules":[{"element":"entry","promote_child":"","as_attribute":"field"}]}"#;
        assert!(matches!(TransformRuleSet::from_json(blank), Err(PipelineError::Config(_))));
    }
}
