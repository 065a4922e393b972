//! Named bot profiles: a strategy type plus its tuning knobs.
//! Loaded from TOML at runtime for the arena CLI.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::engine::bot_strategy::{BotStrategy, RandomStrategy};
use crate::games::auction::plugin::AuctionPlugin;
use crate::games::auction::strategy::GreedyStrategy;

#[derive(Debug, Deserialize, Clone)]
pub struct BotProfile {
    pub description: Option<String>,
    #[serde(default = "default_strategy_type")]
    pub strategy_type: String,
    /// Greedy only: coins kept uncommitted while bidding.
    pub reserve: Option<u32>,
}

fn default_strategy_type() -> String {
    "greedy".into()
}

/// Top-level TOML file structure.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BotProfilesFile {
    #[serde(default)]
    pub profiles: HashMap<String, BotProfile>,
}

impl BotProfile {
    pub fn build(&self) -> Result<Box<dyn BotStrategy<AuctionPlugin>>, String> {
        match self.strategy_type.as_str() {
            "random" => Ok(Box::new(RandomStrategy)),
            "greedy" => Ok(Box::new(GreedyStrategy::new(self.reserve.unwrap_or(0)))),
            other => Err(format!("unknown strategy type: {}", other)),
        }
    }
}

/// Built-in strategy for a bare name (`random`, `greedy`) when no profile
/// of that name exists.
pub fn builtin_strategy(name: &str) -> Option<Box<dyn BotStrategy<AuctionPlugin>>> {
    match name {
        "random" => Some(Box::new(RandomStrategy)),
        "greedy" => Some(Box::new(GreedyStrategy::default())),
        _ => None,
    }
}

impl BotProfilesFile {
    /// Resolve a name to a strategy: profiles first, then built-ins.
    pub fn strategy(&self, name: &str) -> Result<Box<dyn BotStrategy<AuctionPlugin>>, String> {
        match self.profiles.get(name) {
            Some(profile) => profile.build(),
            None => builtin_strategy(name).ok_or_else(|| format!("unknown bot profile: {}", name)),
        }
    }
}

/// Load profiles from a TOML file at the given path.
pub fn load_profiles(path: &Path) -> Result<BotProfilesFile, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

/// Try to load profiles from well-known paths, returning an empty set if none found.
pub fn load_default_profiles() -> BotProfilesFile {
    let candidates = [
        "bot_profiles.toml",
        "../bot_profiles.toml",
        "/etc/column-auction/bot_profiles.toml",
    ];
    for path in &candidates {
        let p = Path::new(path);
        if p.exists() {
            match load_profiles(p) {
                Ok(profiles) => {
                    tracing::info!(path = %p.display(), count = profiles.profiles.len(), "loaded bot profiles");
                    return profiles;
                }
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "failed to load bot profiles");
                }
            }
        }
    }
    tracing::info!("no bot_profiles.toml found, using built-in strategies");
    BotProfilesFile::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_profiles_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[profiles.cautious]
description = "keeps two coins back"
reserve = 2

[profiles.chaos]
strategy_type = "random"
"#
        )
        .unwrap();

        let profiles = load_profiles(file.path()).unwrap();
        assert_eq!(profiles.profiles.len(), 2);
        assert_eq!(profiles.profiles["cautious"].strategy_type, "greedy");
        assert_eq!(profiles.profiles["cautious"].reserve, Some(2));
        assert!(profiles.strategy("chaos").is_ok());
        assert!(profiles.strategy("random").is_ok());
        assert!(profiles.strategy("nobody").is_err());
    }

    #[test]
    fn test_unknown_strategy_type() {
        let profile = BotProfile {
            description: None,
            strategy_type: "mcts".into(),
            reserve: None,
        };
        assert!(profile.build().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_profiles(Path::new("/nonexistent/bot_profiles.toml")).is_err());
    }
}
