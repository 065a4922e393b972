//! Rule parameters. Loaded from `GameConfig.options` or from a `rules.toml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

pub const MAX_COLUMNS: usize = 32;
pub const MAX_RANKS: usize = 32;
pub const MAX_TURNS_PER_ROUND: u32 = 16;
pub const MAX_HAND_SIZE: usize = 32;

/// What happens when several players share the highest bid on a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    /// Cancel the tied group and keep looking further down.
    #[default]
    Cascade,
    /// Cancel the tied group; the column has no winner this round.
    Void,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub n_columns: usize,
    pub n_ranks: usize,
    pub hand_size: usize,
    pub starting_coins: u32,
    pub income: u32,
    pub turns_per_round: u32,
    pub score_threshold: u32,
    pub max_rounds: u32,
    pub tie_policy: TiePolicy,
    /// Delay before a confirmation continuation is applied.
    pub dismiss_delay_ms: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            n_columns: 4,
            n_ranks: 5,
            hand_size: 4,
            starting_coins: 6,
            income: 2,
            turns_per_round: 2,
            score_threshold: 60,
            max_rounds: 25,
            tie_policy: TiePolicy::Cascade,
            dismiss_delay_ms: 250,
        }
    }
}

impl RulesConfig {
    /// Parse rules from a game options object. Missing fields take defaults.
    pub fn from_options(options: &serde_json::Value) -> Result<Self, String> {
        let rules: RulesConfig = if options.is_null() {
            RulesConfig::default()
        } else {
            serde_json::from_value(options.clone())
                .map_err(|e| format!("invalid rules options: {}", e))?
        };
        rules.validate()?;
        Ok(rules)
    }

    pub fn to_options(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_COLUMNS).contains(&self.n_columns) {
            return Err(format!("n_columns must be between 1 and {}", MAX_COLUMNS));
        }
        if !(1..=MAX_RANKS).contains(&self.n_ranks) {
            return Err(format!("n_ranks must be between 1 and {}", MAX_RANKS));
        }
        if !(1..=MAX_HAND_SIZE).contains(&self.hand_size) {
            return Err(format!("hand_size must be between 1 and {}", MAX_HAND_SIZE));
        }
        if !(1..=MAX_TURNS_PER_ROUND).contains(&self.turns_per_round) {
            return Err(format!("turns_per_round must be between 1 and {}", MAX_TURNS_PER_ROUND));
        }
        if self.max_rounds == 0 {
            return Err("max_rounds must be at least 1".into());
        }
        Ok(())
    }
}

/// Load rules from a TOML file at the given path.
pub fn load_rules(path: &Path) -> Result<RulesConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let rules: RulesConfig =
        toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    rules
        .validate()
        .map_err(|e| format!("Invalid rules in {}: {}", path.display(), e))?;
    Ok(rules)
}

/// Try to load rules from well-known paths, returning defaults if none found.
pub fn load_default_rules() -> RulesConfig {
    let candidates = ["rules.toml", "../rules.toml", "/etc/column-auction/rules.toml"];
    for path in &candidates {
        let p = Path::new(path);
        if p.exists() {
            match load_rules(p) {
                Ok(rules) => {
                    tracing::info!(path = %p.display(), "loaded rules");
                    return rules;
                }
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "failed to load rules");
                }
            }
        }
    }
    tracing::info!("no rules.toml found, using built-in defaults");
    RulesConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_options() {
        let rules = RulesConfig::from_options(&serde_json::json!({})).unwrap();
        assert_eq!(rules, RulesConfig::default());
        let rules = RulesConfig::from_options(&serde_json::Value::Null).unwrap();
        assert_eq!(rules.n_columns, 4);
    }

    #[test]
    fn test_partial_options_override() {
        let rules = RulesConfig::from_options(&serde_json::json!({
            "n_columns": 2,
            "tie_policy": "void",
        }))
        .unwrap();
        assert_eq!(rules.n_columns, 2);
        assert_eq!(rules.tie_policy, TiePolicy::Void);
        assert_eq!(rules.n_ranks, 5);
    }

    #[test]
    fn test_invalid_options_rejected() {
        assert!(RulesConfig::from_options(&serde_json::json!({"n_columns": 0})).is_err());
        assert!(RulesConfig::from_options(&serde_json::json!({"n_columns": "four"})).is_err());
        assert!(RulesConfig::from_options(&serde_json::json!({"n_columns": 33})).is_err());
        assert!(RulesConfig::from_options(&serde_json::json!({"n_ranks": 1000})).is_err());
        let err = RulesConfig::from_options(&serde_json::json!({"turns_per_round": u32::MAX})).unwrap_err();
        assert!(err.contains("turns_per_round"));
        assert!(RulesConfig::from_options(&serde_json::json!({"turns_per_round": 16, "n_ranks": 32})).is_ok());
    }

    #[test]
    fn test_load_rules_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "n_ranks = 3\nincome = 1\ntie_policy = \"void\"").unwrap();
        let rules = load_rules(file.path()).unwrap();
        assert_eq!(rules.n_ranks, 3);
        assert_eq!(rules.income, 1);
        assert_eq!(rules.tie_policy, TiePolicy::Void);
        assert_eq!(rules.hand_size, 4);
    }

    #[test]
    fn test_load_rules_missing_file() {
        let err = load_rules(Path::new("/nonexistent/rules.toml")).unwrap_err();
        assert!(err.contains("Failed to read"));
    }
}
