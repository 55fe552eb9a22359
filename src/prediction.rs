//! One-tick water-level prediction and pump-count selection.
//!
//! Pure with respect to controller state: given the current water level,
//! the current steam rate, and the plant characteristics, compute for every
//! candidate pump count k the interval the level can occupy after one
//! 5-second tick, then pick the count whose interval midpoint lands closest
//! to the middle of the normal band.
//!
//! Worst cases bound the interval: the level falls furthest when steam
//! holds at the maximal rate W, and rises furthest when steam stays at the
//! observed rate s.

use heapless::Vec;

use crate::config::{BoilerConfig, MAX_PUMPS};

/// Plant time covered by one controller cycle, in seconds.
pub const TICK_SECONDS: f64 = 5.0;

/// Predicted water-level interval after one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub fn midpoint(&self) -> f64 {
        self.min + (self.max - self.min) / 2.0
    }

    /// Whether `level` lies inside the band widened by `slack` on each side.
    pub fn contains(&self, level: f64, slack: f64) -> bool {
        level >= self.min - slack && level <= self.max + slack
    }
}

/// Outcome of one selection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choice {
    /// Number of pumps to run this tick.
    pub pump_count: usize,
    /// Predicted band for that count, recorded for next cycle's diagnosis.
    pub band: Band,
}

/// The prediction engine. Owns a reusable band buffer so selection runs
/// without allocating.
#[derive(Debug, Clone, Default)]
pub struct PredictionEngine {
    bands: Vec<Band, { MAX_PUMPS + 1 }>,
}

impl PredictionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the band for every k in `0..=pump_count`.
    ///
    /// The k-pump inflow uses the capacity of pump k−1 times k, as the
    /// plant books it; with the uniform pump banks this collapses to
    /// `5·p·k`.
    pub fn bands(&mut self, cfg: &BoilerConfig, water: f64, steam: f64) -> &[Band] {
        self.bands.clear();
        for k in 0..=cfg.pump_count {
            let inflow = if k == 0 {
                0.0
            } else {
                cfg.pump_capacity(k - 1) * k as f64
            };
            let band = Band {
                min: water + TICK_SECONDS * inflow - TICK_SECONDS * cfg.maximal_steam_rate,
                max: water + TICK_SECONDS * inflow - TICK_SECONDS * steam,
            };
            // Vec is sized to MAX_PUMPS + 1 and pump_count <= MAX_PUMPS.
            let _ = self.bands.push(band);
        }
        &self.bands
    }

    /// Choose the pump count whose band midpoint is closest to the normal
    /// band midpoint H. Ties break toward fewer pumps.
    pub fn choose(&mut self, cfg: &BoilerConfig, water: f64, steam: f64) -> Choice {
        let target = cfg.normal_band_midpoint();
        let bands = self.bands(cfg, water, steam);

        let mut best = Choice {
            pump_count: 0,
            band: bands[0],
        };
        let mut best_distance = (bands[0].midpoint() - target).abs();
        for (k, band) in bands.iter().enumerate().skip(1) {
            let distance = (band.midpoint() - target).abs();
            if distance < best_distance {
                best_distance = distance;
                best = Choice {
                    pump_count: k,
                    band: *band,
                };
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BoilerConfig {
        BoilerConfig::default()
    }

    #[test]
    fn band_formula_matches_hand_computation() {
        let mut engine = PredictionEngine::new();
        // w=500, s=5, W=10, p=4: k=2 gives min=500+40-50=490, max=500+40-25=515.
        let bands = engine.bands(&cfg(), 500.0, 5.0);
        assert_eq!(bands.len(), 5);
        assert_eq!(bands[2].min, 490.0);
        assert_eq!(bands[2].max, 515.0);
    }

    #[test]
    fn zero_pumps_band_only_falls() {
        let mut engine = PredictionEngine::new();
        let bands = engine.bands(&cfg(), 500.0, 5.0);
        assert_eq!(bands[0].min, 450.0);
        assert_eq!(bands[0].max, 475.0);
    }

    #[test]
    fn chooses_midpoint_closest_to_target() {
        let mut engine = PredictionEngine::new();
        // At w=500 the midpoints per k are 462.5, 482.5, 502.5, 522.5,
        // 542.5; k=2 is the closest to H=500.
        let choice = engine.choose(&cfg(), 500.0, 5.0);
        assert_eq!(choice.pump_count, 2);
        assert_eq!(choice.band.min, 490.0);
    }

    #[test]
    fn chosen_midpoint_is_minimal_over_all_counts() {
        let mut engine = PredictionEngine::new();
        let target = cfg().normal_band_midpoint();
        for water in [120.0, 380.0, 500.0, 640.0, 880.0] {
            let choice = engine.choose(&cfg(), water, 5.0);
            let chosen = (choice.band.midpoint() - target).abs();
            let bands: std::vec::Vec<Band> =
                engine.bands(&cfg(), water, 5.0).to_vec();
            for band in bands {
                assert!(
                    chosen <= (band.midpoint() - target).abs() + 1e-9,
                    "water={water}: chosen midpoint not minimal"
                );
            }
        }
    }

    #[test]
    fn low_water_drives_all_pumps() {
        let mut engine = PredictionEngine::new();
        let choice = engine.choose(&cfg(), 100.0, 5.0);
        assert_eq!(choice.pump_count, 4);
    }

    #[test]
    fn high_water_drives_no_pumps() {
        let mut engine = PredictionEngine::new();
        let choice = engine.choose(&cfg(), 900.0, 5.0);
        assert_eq!(choice.pump_count, 0);
    }

    #[test]
    fn ties_break_toward_fewer_pumps() {
        // With steam held at W each band degenerates to a point and the
        // midpoints step by 5·p = 20: at w=500 they sit at 450, 470, 490,
        // 510, 530. k=2 and k=3 are both 10 away from H=500; the smaller
        // count must win.
        let mut engine = PredictionEngine::new();
        let choice = engine.choose(&cfg(), 500.0, 10.0);
        assert_eq!(choice.pump_count, 2);
    }

    #[test]
    fn band_contains_applies_slack() {
        let band = Band {
            min: 490.0,
            max: 515.0,
        };
        assert!(band.contains(489.6, 0.5));
        assert!(!band.contains(489.4, 0.5));
        assert!(band.contains(515.5, 0.5));
        assert!(!band.contains(515.6, 0.5));
    }
}
