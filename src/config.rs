//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::ga::GaConfig;
use crate::solver::SolveBudget;

/// Settings of a [`crate::engine::TimetableEngine`].
///
/// Every field has a default, so a JSON document only needs the keys it
/// changes:
///
/// ```
/// use u_timetable::config::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{"max_concurrent_jobs": 4}"#).unwrap();
/// assert_eq!(config.max_concurrent_jobs, 4);
/// assert_eq!(config.advisor_top_k, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker pool size.
    pub max_concurrent_jobs: usize,
    /// Budget used when a job request names none.
    pub default_budget: SolveBudget,
    /// Settings for `genetic` when the strategy is given by name.
    pub genetic: GaConfig,
    /// Suggestions returned per conflict.
    pub advisor_top_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            default_budget: SolveBudget::default(),
            genetic: GaConfig::default(),
            advisor_top_k: 5,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    /// `InvalidConfig` if the document is malformed or a value is out of
    /// range.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_concurrent_jobs == 0 {
            return Err(EngineError::InvalidConfig("max_concurrent_jobs must be at least 1".into()));
        }
        if self.advisor_top_k == 0 {
            return Err(EngineError::InvalidConfig("advisor_top_k must be at least 1".into()));
        }
        self.genetic.validate()
    }

    /// Sets the worker pool size.
    pub fn with_max_concurrent_jobs(mut self, n: usize) -> Self {
        self.max_concurrent_jobs = n;
        self
    }

    /// Sets the default budget.
    pub fn with_default_budget(mut self, budget: SolveBudget) -> Self {
        self.default_budget = budget;
        self
    }

    /// Sets the GA settings.
    pub fn with_genetic(mut self, genetic: GaConfig) -> Self {
        self.genetic = genetic;
        self
    }

    /// Sets the number of suggestions per conflict.
    pub fn with_advisor_top_k(mut self, k: usize) -> Self {
        self.advisor_top_k = k;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.default_budget.time_limit, Some(Duration::from_secs(30)));
        assert_eq!(config.default_budget.max_iterations, None);
        assert_eq!(config.advisor_top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_nested() {
        let json = r#"{
            "default_budget": {"time_limit": {"secs": 5, "nanos": 0}, "max_iterations": 1000},
            "genetic": {"population_size": 20, "seed": 42}
        }"#;
        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.default_budget.time_limit, Some(Duration::from_secs(5)));
        assert_eq!(config.default_budget.max_iterations, Some(1000));
        assert_eq!(config.genetic.population_size, 20);
        assert_eq!(config.genetic.seed, Some(42));
        assert_eq!(config.max_concurrent_jobs, 2);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"max_concurrent_jobs": 0}"#),
            Err(EngineError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"genetic": {"mutation_rate": 2.0}}"#),
            Err(EngineError::InvalidConfig(_))
        ));
        assert!(matches!(EngineConfig::from_json("not json"), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_round_trip_json() {
        let config = EngineConfig::default().with_max_concurrent_jobs(3).with_advisor_top_k(7);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }
}
