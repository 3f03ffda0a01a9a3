//! Study configuration.
//!
//! Every constant of the infeed standard and of report handling lives in
//! [`StudyConfig`]. Configs are TOML; sections and keys that are left out fall
//! back to the standard's values.
//!
//! ```toml
//! [report]
//! current_unit = "kiloamps"
//!
//! [infeed]
//! min_load_mva = 0.15
//! tier_threshold_kv = 11.0
//!
//! [times]
//! peak_fault_time_s = 0.01
//! ```

use std::path::Path;

use g74_core::{CurrentUnit, G74Error, G74Result, Kilovolts, MegavoltAmperes, Seconds};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub report: ReportConfig,
    pub infeed: InfeedConfig,
    pub times: FaultTimeConfig,
    pub machines: MachineDataConfig,
}

/// Report units and the system base results are expected on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub current_unit: CurrentUnit,
    /// System MVA base Thevenin impedances should be reported on
    pub expected_base_mva: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            current_unit: CurrentUnit::Kiloamps,
            expected_base_mva: 100.0,
        }
    }
}

/// Equivalent machine parameters from the infeed standard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfeedConfig {
    /// Buses need strictly more connected load than this to get a machine
    pub min_load_mva: f64,
    /// Buses above this nominal voltage use the tier A template
    pub tier_threshold_kv: f64,
    /// Highest nominal voltage the standard documents
    pub upper_bound_kv: f64,
    /// Machine decay time constant T''
    pub time_constant_s: f64,
    /// X/R ratio of the tier A subtransient impedance
    pub x_over_r: f64,
    /// Zero sequence R and X; large enough to keep machines out of earth faults
    pub zero_sequence_impedance: f64,
    pub machine_id: String,
    pub tier_a_mva_multiplier: f64,
    pub tier_b_mva_multiplier: f64,
    /// Series transformer between the tiers, per-unit on machine base
    pub transformer_r: f64,
    pub transformer_x: f64,
}

impl Default for InfeedConfig {
    fn default() -> Self {
        Self {
            min_load_mva: 0.15,
            tier_threshold_kv: 11.0,
            upper_bound_kv: 33.0,
            time_constant_s: 0.04,
            x_over_r: 2.76,
            zero_sequence_impedance: 10000.0,
            machine_id: "LD".to_string(),
            tier_a_mva_multiplier: 1.16,
            tier_b_mva_multiplier: 1.16,
            transformer_r: 0.04,
            transformer_x: 0.6,
        }
    }
}

impl InfeedConfig {
    pub fn min_load(&self) -> MegavoltAmperes {
        MegavoltAmperes(self.min_load_mva)
    }

    pub fn tier_threshold(&self) -> Kilovolts {
        Kilovolts(self.tier_threshold_kv)
    }

    pub fn upper_bound(&self) -> Kilovolts {
        Kilovolts(self.upper_bound_kv)
    }

    pub fn time_constant(&self) -> Seconds {
        Seconds(self.time_constant_s)
    }
}

/// Fault times every study must contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultTimeConfig {
    /// Times at or below this are treated as fault inception
    pub minimal_fault_time_s: f64,
    /// Time peak make current is assessed at
    pub peak_fault_time_s: f64,
}

impl Default for FaultTimeConfig {
    fn default() -> Self {
        Self {
            minimal_fault_time_s: 0.0001,
            peak_fault_time_s: 0.01,
        }
    }
}

impl FaultTimeConfig {
    pub fn minimal(&self) -> Seconds {
        Seconds(self.minimal_fault_time_s)
    }

    pub fn peak(&self) -> Seconds {
        Seconds(self.peak_fault_time_s)
    }
}

/// Fixes applied to existing machine data before a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineDataConfig {
    /// Positive sequence R at or below this is treated as missing
    pub min_positive_r: f64,
    /// X/R used to fill a missing R from X''
    pub assumed_x_over_r: f64,
}

impl Default for MachineDataConfig {
    fn default() -> Self {
        Self {
            min_positive_r: 0.0,
            assumed_x_over_r: 40.0,
        }
    }
}

impl StudyConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> G74Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> G74Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| G74Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> G74Result<String> {
        toml::to_string_pretty(self).map_err(|e| G74Error::Config(e.to_string()))
    }

    /// Reject values the infeed formulas cannot work with.
    pub fn validate(&self) -> G74Result<()> {
        let infeed = &self.infeed;
        let times = &self.times;

        if self.report.expected_base_mva <= 0.0 {
            return Err(G74Error::Config(
                "report.expected_base_mva must be positive".into(),
            ));
        }
        if infeed.time_constant_s <= 0.0 {
            return Err(G74Error::Config(
                "infeed.time_constant_s must be positive".into(),
            ));
        }
        if infeed.x_over_r <= 0.0 {
            return Err(G74Error::Config("infeed.x_over_r must be positive".into()));
        }
        if infeed.machine_id.is_empty() {
            return Err(G74Error::Config("infeed.machine_id must not be empty".into()));
        }
        if times.minimal_fault_time_s < 0.0 || times.peak_fault_time_s <= times.minimal_fault_time_s
        {
            return Err(G74Error::Config(format!(
                "times: need 0 <= minimal ({}) < peak ({})",
                times.minimal_fault_time_s, times.peak_fault_time_s
            )));
        }
        if self.machines.assumed_x_over_r <= 0.0 {
            return Err(G74Error::Config(
                "machines.assumed_x_over_r must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_standard() {
        let config = StudyConfig::default();
        assert_eq!(config.report.current_unit, CurrentUnit::Kiloamps);
        assert_eq!(config.infeed.min_load_mva, 0.15);
        assert_eq!(config.infeed.machine_id, "LD");
        assert_eq!(config.times.minimal(), Seconds(0.0001));
        assert_eq!(config.times.peak(), Seconds(0.01));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml = r#"
            [report]
            current_unit = "amps"

            [infeed]
            min_load_mva = 0.5
        "#;
        let config = StudyConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.report.current_unit, CurrentUnit::Amps);
        assert_eq!(config.report.expected_base_mva, 100.0);
        assert_eq!(config.infeed.min_load_mva, 0.5);
        assert_eq!(config.infeed.transformer_x, 0.6);
        assert_eq!(config.times, FaultTimeConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = StudyConfig::from_toml_str("[times]\npeak_fault_time_s = 0.00001\n").unwrap_err();
        assert!(matches!(err, G74Error::Config(_)));

        let err = StudyConfig::from_toml_str("[infeed]\ntime_constant_s = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("time_constant_s"));

        let err = StudyConfig::from_toml_str("[report]\ncurrent_unit = \"milliamps\"\n").unwrap_err();
        assert!(matches!(err, G74Error::Config(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = StudyConfig::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[infeed]"));
        assert_eq!(StudyConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.toml");
        std::fs::write(&path, "[machines]\nassumed_x_over_r = 20.0\n").unwrap();
        let config = StudyConfig::load(&path).unwrap();
        assert_eq!(config.machines.assumed_x_over_r, 20.0);
    }
}
