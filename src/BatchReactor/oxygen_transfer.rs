//! # Oxygen Transfer Module
//!
//! Cofactor regeneration in the aerobic stage is gated by how fast oxygen
//! dissolves. Under-aeration is modeled as a first-order limiter on reaction
//! completeness, not as a hard failure: the transfer coefficient maps to a
//! dimensionless efficiency factor applied to the nominal regeneration rate.
//!
//! The mapping is a piecewise-constant step function over kLa tiers rather
//! than a mass-transfer ODE - a deliberate simplification of the shaking
//! flask data this model was calibrated on, not an approximation error.
//!
//! Forced aeration with compressed air is a different reactor variant, not a
//! large coefficient: `AerationPolicy::OxygenAbundant` bypasses the lookup
//! and regenerates at unity efficiency unconditionally.

use serde::{Deserialize, Serialize};

/// Oxygen transfer coefficient presets (1/hr), calibrated for shaking flask
/// agitation speeds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KlaOption {
    /// kLa = 50 1/hr, low agitation
    Low,
    /// kLa = 75 1/hr, standard agitation
    Medium,
    /// kLa = 100 1/hr, high agitation
    High,
    /// Explicit coefficient (1/hr)
    Custom(f64),
}

impl KlaOption {
    pub fn value(&self) -> f64 {
        match self {
            KlaOption::Low => 50.0,
            KlaOption::Medium => 75.0,
            KlaOption::High => 100.0,
            KlaOption::Custom(kla) => *kla,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KlaOption::Low => "low",
            KlaOption::Medium => "medium",
            KlaOption::High => "high",
            KlaOption::Custom(_) => "custom",
        }
    }
}

/// Aeration strategy of the reactor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AerationPolicy {
    /// Passive diffusion; regeneration efficiency follows the kLa tier
    TransferLimited(KlaOption),
    /// Forced aeration with compressed air; regeneration is never
    /// oxygen-limited
    OxygenAbundant,
}

impl AerationPolicy {
    /// Transfer coefficient, when the variant has one
    pub fn kla(&self) -> Option<f64> {
        match self {
            AerationPolicy::TransferLimited(option) => Some(option.value()),
            AerationPolicy::OxygenAbundant => None,
        }
    }

    /// Dimensionless multiplier on the nominal regeneration efficiency
    pub fn efficiency_factor(&self) -> f64 {
        match self {
            AerationPolicy::TransferLimited(option) => {
                let kla = option.value();
                if kla >= 100.0 {
                    1.0
                } else if kla >= 75.0 {
                    0.85
                } else {
                    0.7
                }
            }
            AerationPolicy::OxygenAbundant => 1.0,
        }
    }

    /// Achievable regeneration rate (1/hr) reported in the design results;
    /// with forced aeration the transfer coefficient drops out
    pub fn regeneration_rate(&self, nominal_efficiency: f64) -> f64 {
        match self.kla() {
            Some(kla) => kla * nominal_efficiency * self.efficiency_factor(),
            None => nominal_efficiency,
        }
    }
}
