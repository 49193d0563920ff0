//! # Batch Reactor Sizing Module
//!
//! ## Aim
//! Translate throughput and batch timing into reactor volume and count, or
//! validate user-supplied values. One reactor of the battery is always in
//! turnaround/loading while the remaining N-1 carry the throughput, which
//! makes the two sizing directions exact inverses of each other:
//!
//! - per-reactor volume `V = v0 * (tau + tau0) / ((N - 1) * V_wf)`
//! - required count     `N = ceil(v0 / V / V_wf * (tau + tau0) + 1)`
//!
//! ## Sizing modes (mutually exclusive)
//! - fixed count: the supplied N is used directly
//! - target volume: N computed from the formula above, floored at Nmin,
//!   a hard error above Nmax (never a silent clamp)
//! - auto-select: discrete hill-climb over N minimizing purchase cost;
//!   assumes the cost curve is unimodal in N
//!
//! All derived quantities are recomputed on every call - throughput, timing
//! and count may change between simulation passes, so nothing is cached.

use crate::Reactions::reaction_step::BioprocessError;
use serde::{Deserialize, Serialize};

/// Sizing parameters of a batch reactor battery.
///
/// Reactor count and target volume are guarded by accessor methods: setting
/// one while the other is set is rejected immediately, setting `None` clears
/// without error. Out-of-range values fail at the point of assignment, not
/// in a later design pass.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingSpec {
    /// Reaction time (hr)
    pub tau: f64,
    /// Turnaround time for cleaning and unloading (hr)
    pub tau_0: f64,
    /// Working volume fraction, in (0, 1]
    pub V_wf: f64,
    /// Minimum reactor count
    pub Nmin: usize,
    /// Maximum reactor count
    pub Nmax: usize,
    /// If true, the design pass selects the count with the lowest purchase
    /// cost instead of using N or V
    pub autoselect_N: bool,
    N: Option<usize>,
    V: Option<f64>,
}

impl SizingSpec {
    #[allow(non_snake_case)]
    pub fn new(
        tau: f64,
        tau_0: f64,
        V_wf: f64,
        Nmin: usize,
        Nmax: usize,
    ) -> Result<Self, BioprocessError> {
        if tau <= 0.0 {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "reaction time must be positive, got {}",
                tau
            )));
        }
        if tau_0 < 0.0 {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "turnaround time must be non-negative, got {}",
                tau_0
            )));
        }
        if !(V_wf > 0.0 && V_wf <= 1.0) {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "working volume fraction must be in (0, 1], got {}",
                V_wf
            )));
        }
        if Nmin < 2 || Nmax < Nmin {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "reactor count bounds must satisfy 2 <= Nmin <= Nmax, got ({}, {})",
                Nmin, Nmax
            )));
        }
        Ok(Self {
            tau,
            tau_0,
            V_wf,
            Nmin,
            Nmax,
            autoselect_N: false,
            N: None,
            V: None,
        })
    }

    /// NREL batch bioreactor defaults: 3 hr turnaround, 90% working volume,
    /// count bounds 2..=36
    pub fn nrel_default(tau: f64) -> Result<Self, BioprocessError> {
        Self::new(tau, 3.0, 0.9, 2, 36)
    }

    pub fn N(&self) -> Option<usize> {
        self.N
    }

    pub fn V(&self) -> Option<f64> {
        self.V
    }

    /// Set the reactor count. Rejected while a target volume is set and for
    /// counts <= 1; `None` clears.
    #[allow(non_snake_case)]
    pub fn set_N(&mut self, N: Option<usize>) -> Result<(), BioprocessError> {
        match N {
            None => {
                self.N = None;
                Ok(())
            }
            Some(n) => {
                if n <= 1 {
                    return Err(BioprocessError::InvalidReactorCount(n));
                }
                if self.V.is_some() {
                    return Err(BioprocessError::ConflictingSizing);
                }
                self.N = Some(n);
                Ok(())
            }
        }
    }

    /// Set the target per-reactor volume (m3). Rejected while a count is set
    /// and for volumes <= 1 m3; `None` clears.
    #[allow(non_snake_case)]
    pub fn set_V(&mut self, V: Option<f64>) -> Result<(), BioprocessError> {
        match V {
            None => {
                self.V = None;
                Ok(())
            }
            Some(v) => {
                if v <= 1.0 {
                    return Err(BioprocessError::InvalidReactorVolume(v));
                }
                if self.N.is_some() {
                    return Err(BioprocessError::ConflictingSizing);
                }
                self.V = Some(v);
                Ok(())
            }
        }
    }

    /// Cycle time = reaction time + turnaround time (hr)
    pub fn cycle_time(&self) -> f64 {
        self.tau + self.tau_0
    }

    /// Resolve the reactor count for a given volumetric throughput (m3/hr).
    ///
    /// Target-volume mode applies the ceil formula, floors the result at
    /// Nmin and fails hard above Nmax. Fixed-count mode returns the stored
    /// count. Auto-select is handled by the caller (it needs a cost
    /// function) and is rejected here.
    pub fn resolve_count(&self, v_0: f64) -> Result<usize, BioprocessError> {
        if self.autoselect_N {
            return Err(BioprocessError::InvalidConfiguration(
                "auto-select mode needs a cost function, use autoselect_count".to_string(),
            ));
        }
        if let Some(v) = self.V {
            let n_raw = v_0 / v / self.V_wf * self.cycle_time() + 1.0;
            let n = if n_raw < self.Nmin as f64 {
                self.Nmin
            } else {
                n_raw.ceil() as usize
            };
            if n > self.Nmax {
                return Err(BioprocessError::SizingInfeasible {
                    required: n,
                    nmax: self.Nmax,
                });
            }
            Ok(n)
        } else if let Some(n) = self.N {
            Ok(n)
        } else {
            Err(BioprocessError::InvalidConfiguration(
                "either reactor count or target volume must be specified".to_string(),
            ))
        }
    }
}

/// Geometry and timing of a sized batch reactor battery
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSizeResults {
    /// Volume of each reactor (m3), including headspace
    pub reactor_volume: f64,
    /// Reaction + turnaround (hr)
    pub cycle_time: f64,
    /// Stagger offset between consecutive batches (hr)
    pub loading_time: f64,
    /// Turnaround + loading (hr)
    pub total_dead_time: f64,
    /// Number of reactors
    pub N: usize,
}

/// Size a battery of N batch reactors for volumetric throughput `v_0`
/// (m3/hr). One reactor is always in turnaround, so N-1 reactors carry the
/// throughput.
#[allow(non_snake_case)]
pub fn size_batch(
    v_0: f64,
    tau: f64,
    tau_0: f64,
    N: usize,
    V_wf: f64,
) -> Result<BatchSizeResults, BioprocessError> {
    if N <= 1 {
        return Err(BioprocessError::InvalidReactorCount(N));
    }
    let cycle_time = tau + tau_0;
    let loading_time = cycle_time / (N - 1) as f64;
    let reactor_volume = v_0 * cycle_time / ((N - 1) as f64 * V_wf);
    Ok(BatchSizeResults {
        reactor_volume,
        cycle_time,
        loading_time,
        total_dead_time: tau_0 + loading_time,
        N,
    })
}

/// Select the reactor count with the lowest purchase cost.
///
/// Starting from `nmin`, the count is incremented while the cost strictly
/// decreases; the count just before the first increase is returned. This is
/// a discrete hill-climb that assumes the cost curve first decreases
/// (economies of scale per vessel) and then increases (parallel-unit
/// overhead); a non-unimodal curve silently yields a local optimum.
pub fn autoselect_count<F>(nmin: usize, nmax: usize, cost_of: F) -> usize
where
    F: Fn(usize) -> f64,
{
    let mut n = nmin;
    let mut cost_old = f64::INFINITY;
    let mut cost_new = cost_of(n);
    while cost_new < cost_old && n < nmax {
        n += 1;
        cost_old = cost_new;
        cost_new = cost_of(n);
    }
    if cost_new < cost_old { n } else { n - 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mutual_exclusivity() {
        let mut spec = SizingSpec::nrel_default(24.0).unwrap();
        spec.set_V(Some(50.0)).unwrap();
        // count after volume must reject
        assert!(matches!(
            spec.set_N(Some(4)),
            Err(BioprocessError::ConflictingSizing)
        ));
        // clearing the volume frees the count
        spec.set_V(None).unwrap();
        spec.set_N(Some(4)).unwrap();
        assert!(matches!(
            spec.set_V(Some(50.0)),
            Err(BioprocessError::ConflictingSizing)
        ));
        spec.set_N(None).unwrap();
        spec.set_V(Some(50.0)).unwrap();
    }

    #[test]
    fn test_fail_fast_on_invalid_values() {
        let mut spec = SizingSpec::nrel_default(24.0).unwrap();
        assert!(matches!(
            spec.set_N(Some(1)),
            Err(BioprocessError::InvalidReactorCount(1))
        ));
        assert!(matches!(
            spec.set_V(Some(0.5)),
            Err(BioprocessError::InvalidReactorVolume(_))
        ));
        assert!(SizingSpec::new(24.0, 3.0, 1.4, 2, 36).is_err());
        assert!(SizingSpec::new(24.0, 3.0, 0.9, 1, 36).is_err());
        assert!(SizingSpec::new(-1.0, 3.0, 0.9, 2, 36).is_err());
    }

    #[test]
    fn test_target_volume_scenario() {
        // 1 m3/hr, 24 hr reaction, 3 hr turnaround, 90% working volume,
        // 50 m3 target -> N = ceil(1/50/0.9 * 27 + 1) = ceil(1.6) = 2
        let mut spec = SizingSpec::nrel_default(24.0).unwrap();
        spec.set_V(Some(50.0)).unwrap();
        assert_eq!(spec.resolve_count(1.0).unwrap(), 2);
    }

    #[test]
    fn test_target_volume_floored_at_nmin() {
        let mut spec = SizingSpec::new(24.0, 3.0, 0.9, 4, 36).unwrap();
        spec.set_V(Some(500.0)).unwrap();
        assert_eq!(spec.resolve_count(1.0).unwrap(), 4);
    }

    #[test]
    fn test_bound_enforcement_is_hard_error() {
        let mut spec = SizingSpec::new(24.0, 3.0, 0.9, 2, 10).unwrap();
        spec.set_V(Some(2.0)).unwrap();
        // 100 m3/hr through 2 m3 vessels needs far more than 10 reactors
        let err = spec.resolve_count(100.0).unwrap_err();
        assert!(matches!(
            err,
            BioprocessError::SizingInfeasible { nmax: 10, .. }
        ));
    }

    #[test]
    fn test_fixed_count_mode() {
        let mut spec = SizingSpec::nrel_default(24.0).unwrap();
        spec.set_N(Some(6)).unwrap();
        assert_eq!(spec.resolve_count(3.0).unwrap(), 6);
    }

    #[test]
    fn test_neither_set_is_configuration_error() {
        let spec = SizingSpec::nrel_default(24.0).unwrap();
        assert!(spec.resolve_count(1.0).is_err());
    }

    #[test]
    fn test_size_batch_inverts_count_formula() {
        // sizing N reactors at the volume the count formula was solved for
        // reproduces that volume
        let v_0 = 1.0;
        let sized = size_batch(v_0, 24.0, 3.0, 2, 0.9).unwrap();
        assert_relative_eq!(sized.reactor_volume, 27.0 / 0.9, epsilon = 1e-12);
        assert_relative_eq!(sized.cycle_time, 27.0);
        assert_relative_eq!(sized.loading_time, 27.0);
        assert_relative_eq!(sized.total_dead_time, 30.0);
        let n_back = (v_0 / sized.reactor_volume / 0.9 * 27.0 + 1.0).ceil() as usize;
        assert_eq!(n_back, 2);
    }

    #[test]
    fn test_size_batch_rejects_single_reactor() {
        assert!(size_batch(1.0, 24.0, 3.0, 1, 0.9).is_err());
    }

    #[test]
    fn test_autoselect_unimodal_termination() {
        // synthetic cost curve: strictly decreasing to N = 7, then strictly
        // increasing -> auto-select must return 7
        let cost = |n: usize| (n as f64 - 7.0).powi(2) + 100.0;
        assert_eq!(autoselect_count(2, 36, cost), 7);
    }

    #[test]
    fn test_autoselect_monotone_curves() {
        // strictly increasing -> stays at the minimum count
        assert_eq!(autoselect_count(2, 36, |n| n as f64), 2);
        // strictly decreasing -> runs into the maximum count
        assert_eq!(autoselect_count(2, 10, |n| 1.0 / n as f64), 10);
    }
}
