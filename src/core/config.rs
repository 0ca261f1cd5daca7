//! Engine configuration loaded from `capworks.toml`.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::core::error::CapworksError;

/// Validation bounds and defaults applied at the creation/import boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanningConfig {
    /// Earliest calendar year accepted for any planification field.
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    /// Latest calendar year accepted for any planification field.
    #[serde(default = "default_max_year")]
    pub max_year: i32,
    /// Actor recorded when the caller supplies none (CLI surfaces only).
    #[serde(default = "default_actor")]
    pub default_actor: String,
}

fn default_min_year() -> i32 {
    2000
}

fn default_max_year() -> i32 {
    3000
}

fn default_actor() -> String {
    "system".to_string()
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            max_year: default_max_year(),
            default_actor: default_actor(),
        }
    }
}

impl PlanningConfig {
    pub fn load(path: &Path) -> Result<Self, CapworksError> {
        let content = fs::read_to_string(path).map_err(CapworksError::IoError)?;
        let config: PlanningConfig =
            toml::from_str(&content).map_err(|e| CapworksError::ConfigError(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    /// Loads the config at `path` when present, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, CapworksError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn check(&self) -> Result<(), CapworksError> {
        if self.min_year > self.max_year {
            return Err(CapworksError::ConfigError(format!(
                "min_year {} exceeds max_year {}",
                self.min_year, self.max_year
            )));
        }
        Ok(())
    }

    pub fn year_in_bounds(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_planning_horizon() {
        let config = PlanningConfig::default();
        assert!(config.year_in_bounds(2026));
        assert!(!config.year_in_bounds(1999));
        assert!(!config.year_in_bounds(3001));
    }

    #[test]
    fn parses_partial_toml() {
        let config: PlanningConfig = toml::from_str("min_year = 2020").unwrap();
        assert_eq!(config.min_year, 2020);
        assert_eq!(config.max_year, 3000);
        assert_eq!(config.default_actor, "system");
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config: PlanningConfig =
            toml::from_str("min_year = 2030\nmax_year = 2020").unwrap();
        assert!(config.check().is_err());
    }
}
