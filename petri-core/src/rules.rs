//! The automaton rule model.
//!
//! A cell carries a hue and an energy level. The energy selects one of
//! nine bands, and each band has its own transition descriptor: an
//! excitation window over the 8-neighbor energy sum, an energy gain for
//! frames inside the window, and a drain for frames outside it. The
//! descriptors are encoded one RGBA32F texel per band into a 9x1 texture;
//! the channel order is a fixed convention with `step.wgsl` and opaque to
//! everything else.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of energy bands, and therefore rule descriptors.
pub const STATE_BANDS: usize = 9;

/// f32 channels per encoded rule texel.
pub const RULE_CHANNELS: usize = 4;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum RuleSetError {
    #[error("expected exactly {STATE_BANDS} rules, got {found}")]
    WrongCount { found: usize },

    #[error("rule {index}: excitation window is inverted ({lo} > {hi})")]
    InvertedWindow { index: usize, lo: f32, hi: f32 },

    #[error("rule {index}: parameters must be finite")]
    NonFinite { index: usize },
}

/// Transition descriptor for one energy band.
///
/// `excite_lo..=excite_hi` is the neighborhood-sum window (the 8-neighbor
/// energy sum ranges over 0..=8) in which the cell is excited and gains
/// `gain` energy; outside the window it drains by `decay`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub excite_lo: f32,
    pub excite_hi: f32,
    pub gain: f32,
    pub decay: f32,
}

/// Immutable, validated snapshot of all nine band descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: [Rule; STATE_BANDS],
}

impl RuleSet {
    /// Builds a rule set, rejecting wrong counts and malformed descriptors
    /// before anything is allocated GPU-side.
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self, RuleSetError> {
        let rules: [Rule; STATE_BANDS] = rules
            .try_into()
            .map_err(|v: Vec<Rule>| RuleSetError::WrongCount { found: v.len() })?;
        let set = Self { rules };
        set.validate()?;
        Ok(set)
    }

    pub fn rules(&self) -> &[Rule; STATE_BANDS] {
        &self.rules
    }

    /// Checks every descriptor: finite parameters, non-inverted windows.
    pub fn validate(&self) -> Result<(), RuleSetError> {
        for (index, rule) in self.rules.iter().enumerate() {
            let params = [rule.excite_lo, rule.excite_hi, rule.gain, rule.decay];
            if params.iter().any(|p| !p.is_finite()) {
                return Err(RuleSetError::NonFinite { index });
            }
            if rule.excite_lo > rule.excite_hi {
                return Err(RuleSetError::InvertedWindow {
                    index,
                    lo: rule.excite_lo,
                    hi: rule.excite_hi,
                });
            }
        }
        Ok(())
    }

    /// One RGBA texel per band, channel order
    /// (excite_lo, excite_hi, gain, decay).
    pub fn texel_data(&self) -> [f32; STATE_BANDS * RULE_CHANNELS] {
        let mut data = [0.0; STATE_BANDS * RULE_CHANNELS];
        for (i, rule) in self.rules.iter().enumerate() {
            data[i * RULE_CHANNELS] = rule.excite_lo;
            data[i * RULE_CHANNELS + 1] = rule.excite_hi;
            data[i * RULE_CHANNELS + 2] = rule.gain;
            data[i * RULE_CHANNELS + 3] = rule.decay;
        }
        data
    }
}

impl Default for RuleSet {
    /// The built-in excitable-media set.
    ///
    /// Band 0 ignites on modest neighborhood activity, bands 1-3 are
    /// refractory (their windows sit above the reachable sum, so they only
    /// drain), bands 4-7 re-fire when the surroundings are hot, and band 8
    /// burns out quickly unless supported. Painted blobs emit expanding
    /// fronts that leave a refractory tail behind them.
    fn default() -> Self {
        Self {
            rules: [
                Rule { excite_lo: 0.75, excite_hi: 3.60, gain: 1.00, decay: 0.04 },
                Rule { excite_lo: 9.00, excite_hi: 9.00, gain: 0.00, decay: 0.18 },
                Rule { excite_lo: 9.00, excite_hi: 9.00, gain: 0.00, decay: 0.16 },
                Rule { excite_lo: 9.00, excite_hi: 9.00, gain: 0.00, decay: 0.14 },
                Rule { excite_lo: 2.40, excite_hi: 6.40, gain: 0.35, decay: 0.12 },
                Rule { excite_lo: 2.20, excite_hi: 6.60, gain: 0.40, decay: 0.10 },
                Rule { excite_lo: 2.00, excite_hi: 6.80, gain: 0.45, decay: 0.09 },
                Rule { excite_lo: 1.60, excite_hi: 7.20, gain: 0.50, decay: 0.08 },
                Rule { excite_lo: 1.20, excite_hi: 7.50, gain: 0.50, decay: 0.35 },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(lo: f32, hi: f32) -> Rule {
        Rule { excite_lo: lo, excite_hi: hi, gain: 0.5, decay: 0.1 }
    }

    #[test]
    fn test_default_set_is_valid() {
        assert!(RuleSet::default().validate().is_ok());
    }

    #[test]
    fn test_wrong_count_rejected() {
        let err = RuleSet::from_rules(vec![flat(0.0, 1.0); 4]).unwrap_err();
        assert_eq!(err, RuleSetError::WrongCount { found: 4 });

        let err = RuleSet::from_rules(vec![flat(0.0, 1.0); 12]).unwrap_err();
        assert_eq!(err, RuleSetError::WrongCount { found: 12 });
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut rules = vec![flat(0.0, 1.0); STATE_BANDS];
        rules[6] = flat(5.0, 2.0);
        let err = RuleSet::from_rules(rules).unwrap_err();
        assert_eq!(
            err,
            RuleSetError::InvertedWindow { index: 6, lo: 5.0, hi: 2.0 }
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut rules = vec![flat(0.0, 1.0); STATE_BANDS];
        rules[2].decay = f32::NAN;
        let err = RuleSet::from_rules(rules).unwrap_err();
        assert_eq!(err, RuleSetError::NonFinite { index: 2 });
    }

    #[test]
    fn test_texel_channel_layout() {
        let mut rules = vec![flat(0.0, 1.0); STATE_BANDS];
        rules[3] = Rule { excite_lo: 1.5, excite_hi: 4.5, gain: 0.25, decay: 0.05 };
        let set = RuleSet::from_rules(rules).unwrap();

        let data = set.texel_data();
        assert_eq!(data.len(), STATE_BANDS * RULE_CHANNELS);
        assert_eq!(&data[12..16], &[1.5, 4.5, 0.25, 0.05]);
    }

    #[test]
    fn test_serde_round_trip_is_plain_array() {
        let set = RuleSet::default();
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.starts_with('['), "rules file is a bare array");

        let back: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set, back);
    }

    #[test]
    fn test_serde_rejects_short_array() {
        let json = r#"[{"excite_lo":0,"excite_hi":1,"gain":0.5,"decay":0.1}]"#;
        assert!(serde_json::from_str::<RuleSet>(json).is_err());
    }
}
