//! Policy file loading (strict parsing).
//!
//! The policy file is a YAML mapping from agent id to policy:
//!
//! ```yaml
//! research-bot:
//!   name: research-bot-policy
//!   budget:
//!     max_per_transaction: 5.0
//!     max_per_hour: 20.0
//!     max_per_day: 100.0
//!   allowed_resources:
//!     - "https://api.weather.com"
//!   on_violation: block
//! ```
//!
//! Unknown fields, missing fields, and malformed limits all fail loudly;
//! the loader never silently defaults. Falling back to the default policy
//! after a load failure is the server's decision, made visibly at startup.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use spendgate_types::{Policy, PolicyTable};

use crate::{PolicyError, Result};

/// Load and validate a YAML policy file.
pub fn load_policies(path: &Path) -> Result<PolicyTable> {
    let content = fs::read_to_string(path).map_err(|source| PolicyError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_policies(&content)
}

/// Parse and validate policy YAML.
pub fn parse_policies(content: &str) -> Result<PolicyTable> {
    let raw: HashMap<String, Policy> = serde_yaml::from_str(content)?;
    for (agent_id, policy) in &raw {
        validate_policy(agent_id, policy)?;
    }
    Ok(raw.into_iter().collect())
}

fn validate_policy(agent_id: &str, policy: &Policy) -> Result<()> {
    let budget = &policy.budget;
    for (field, value) in [
        ("max_per_transaction", budget.max_per_transaction),
        ("max_per_hour", budget.max_per_hour),
        ("max_per_day", budget.max_per_day),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(PolicyError::Validation {
                agent: agent_id.to_string(),
                message: format!("budget.{field} must be a non-negative number, got {value}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendgate_types::OnViolation;

    const VALID: &str = r#"
test-bot:
  name: test-bot-policy
  budget:
    max_per_transaction: 5.0
    max_per_hour: 20.0
    max_per_day: 100.0
  allowed_resources:
    - "https://api.weather.com"
    - "https://api.openai.com"
  on_violation: block
"#;

    #[test]
    fn parses_a_valid_file() {
        let table = parse_policies(VALID).unwrap();
        assert_eq!(table.len(), 1);

        let policy = table.get("test-bot").unwrap();
        assert_eq!(policy.name, "test-bot-policy");
        assert_eq!(policy.budget.max_per_transaction, 5.0);
        assert_eq!(policy.budget.max_per_hour, 20.0);
        assert_eq!(policy.budget.max_per_day, 100.0);
        assert_eq!(policy.allowed_resources.len(), 2);
        assert_eq!(policy.on_violation, OnViolation::Block);
    }

    #[test]
    fn rejects_missing_fields() {
        let yaml = r#"
test-bot:
  name: incomplete
  budget:
    max_per_transaction: 5.0
  allowed_resources: ["*"]
  on_violation: block
"#;
        assert!(matches!(parse_policies(yaml), Err(PolicyError::Parse(_))));
    }

    #[test]
    fn rejects_unknown_fields() {
        let yaml = r#"
test-bot:
  name: typoed
  budget:
    max_per_transaction: 5.0
    max_per_hour: 20.0
    max_per_day: 100.0
  allowed_resource: ["*"]
  on_violation: block
"#;
        assert!(matches!(parse_policies(yaml), Err(PolicyError::Parse(_))));
    }

    #[test]
    fn rejects_unknown_violation_disposition() {
        let yaml = r#"
test-bot:
  name: bad-disposition
  budget:
    max_per_transaction: 5.0
    max_per_hour: 20.0
    max_per_day: 100.0
  allowed_resources: ["*"]
  on_violation: shrug
"#;
        assert!(matches!(parse_policies(yaml), Err(PolicyError::Parse(_))));
    }

    #[test]
    fn rejects_negative_budget_limits() {
        let yaml = r#"
test-bot:
  name: negative
  budget:
    max_per_transaction: -1.0
    max_per_hour: 20.0
    max_per_day: 100.0
  allowed_resources: ["*"]
  on_violation: block
"#;
        let err = parse_policies(yaml).unwrap_err();
        match err {
            PolicyError::Validation { agent, message } => {
                assert_eq!(agent, "test-bot");
                assert!(message.contains("max_per_transaction"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let err = load_policies(Path::new("/nonexistent/policies.yaml")).unwrap_err();
        match err {
            PolicyError::Read { path, .. } => assert!(path.contains("nonexistent")),
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn loads_from_a_file_on_disk() {
        let path = std::env::temp_dir().join("spendgate-loader-test-policies.yaml");
        fs::write(&path, VALID).unwrap();
        let table = load_policies(&path).unwrap();
        fs::remove_file(&path).ok();

        assert!(table.get("test-bot").is_some());
    }
}
