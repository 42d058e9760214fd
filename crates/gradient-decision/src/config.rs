//! Router configuration.

use crate::error::{Error, Result};
use gradient_fields::LocalFieldState;
use serde::{Deserialize, Serialize};

/// Scoring weights and selection temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub health_weight: f64,
    pub capacity_weight: f64,
    pub load_penalty: f64,
    /// 0 selects the best score; larger values explore more
    pub temperature: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            health_weight: 0.5,
            capacity_weight: 0.3,
            load_penalty: 0.2,
            temperature: 0.2,
        }
    }
}

impl RouterConfig {
    /// Score one node's fields.
    pub fn score(&self, fields: &LocalFieldState) -> f64 {
        self.health_weight * fields.health + self.capacity_weight * fields.capacity
            - self.load_penalty * fields.load
    }

    /// Check every value is usable before swapping it in.
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("health_weight", self.health_weight),
            ("capacity_weight", self.capacity_weight),
            ("load_penalty", self.load_penalty),
        ];
        for (name, value) in weights {
            if !value.is_finite() {
                return Err(Error::NonFiniteWeight { name, value });
            }
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(Error::InvalidTemperature(self.temperature));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(health: f64, capacity: f64, load: f64) -> LocalFieldState {
        LocalFieldState {
            node_id: "n".into(),
            health,
            load,
            capacity,
            last_updated: 0,
        }
    }

    #[test]
    fn scores_match_reference_values() {
        let cfg = RouterConfig {
            health_weight: 0.5,
            capacity_weight: 0.3,
            load_penalty: 0.2,
            temperature: 0.0,
        };
        assert!((cfg.score(&state(0.9, 0.8, 0.2)) - 0.65).abs() < 1e-9);
        // 0.1 + 0.06 - 0.16
        assert!(cfg.score(&state(0.2, 0.2, 0.8)).abs() < 1e-9);
        assert!((cfg.score(&state(0.2, 0.2, 0.9)) - (-0.02)).abs() < 1e-9);
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(RouterConfig::default().validate().is_ok());

        let nan_weight = RouterConfig { capacity_weight: f64::NAN, ..Default::default() };
        assert!(matches!(
            nan_weight.validate(),
            Err(Error::NonFiniteWeight { name: "capacity_weight", .. })
        ));

        let negative = RouterConfig { temperature: -0.1, ..Default::default() };
        assert_eq!(negative.validate(), Err(Error::InvalidTemperature(-0.1)));

        let infinite = RouterConfig { temperature: f64::INFINITY, ..Default::default() };
        assert!(infinite.validate().is_err());
    }

    #[test]
    fn wire_names_are_snake_case() {
        let json = serde_json::to_value(RouterConfig::default()).unwrap();
        assert_eq!(json["health_weight"], 0.5);
        assert_eq!(json["capacity_weight"], 0.3);
        assert_eq!(json["load_penalty"], 0.2);
        assert_eq!(json["temperature"], 0.2);
    }
}
