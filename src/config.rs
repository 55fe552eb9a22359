//! Boiler plant characteristics.
//!
//! All physical parameters for one controller run. The configuration is
//! captured at construction and never changes afterwards; online
//! reconfiguration is out of scope.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest pump bank any plant can carry. Per-pump state throughout the
/// crate is sized to this bound so cycles never allocate.
pub const MAX_PUMPS: usize = 6;

/// Physical characteristics of one steam boiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoilerConfig {
    // --- Tank ---
    /// Total tank capacity C (litres).
    pub capacity: f64,
    /// Minimal normal water level N1 (litres).
    pub minimal_normal_level: f64,
    /// Maximal normal water level N2 (litres).
    pub maximal_normal_level: f64,
    /// Minimal limit water level M1 (litres). Water at or below is a hazard.
    pub minimal_limit_level: f64,
    /// Maximal limit water level M2 (litres). Water at or above is a hazard.
    pub maximal_limit_level: f64,

    // --- Steam ---
    /// Maximal steam output rate W (litres/second).
    pub maximal_steam_rate: f64,

    // --- Pumps ---
    /// Number of installed pumps (1..=6).
    pub pump_count: usize,
    /// Per-pump throughput (litres/second). Entries beyond `pump_count`
    /// are unused.
    pub pump_capacities: [f64; MAX_PUMPS],
}

impl Default for BoilerConfig {
    fn default() -> Self {
        Self {
            // Tank
            capacity: 1000.0,
            minimal_normal_level: 400.0,
            maximal_normal_level: 600.0,
            minimal_limit_level: 100.0,
            maximal_limit_level: 900.0,

            // Steam
            maximal_steam_rate: 10.0, // L/s at full boil

            // Pumps
            pump_count: 4,
            pump_capacities: [4.0; MAX_PUMPS],
        }
    }
}

impl BoilerConfig {
    /// Validate every field. Invalid configurations are rejected, not
    /// clamped: a mis-ordered limit band would silently disable the
    /// safety gate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let levels = [
            self.capacity,
            self.minimal_normal_level,
            self.maximal_normal_level,
            self.minimal_limit_level,
            self.maximal_limit_level,
            self.maximal_steam_rate,
        ];
        if levels.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::ValidationFailed("non-finite parameter"));
        }
        if self.pump_count == 0 || self.pump_count > MAX_PUMPS {
            return Err(ConfigError::ValidationFailed("pump count out of 1..=6"));
        }
        if self.pump_capacities[..self.pump_count]
            .iter()
            .any(|c| !c.is_finite() || *c <= 0.0)
        {
            return Err(ConfigError::ValidationFailed("pump capacity not positive"));
        }
        if self.maximal_steam_rate <= 0.0 {
            return Err(ConfigError::ValidationFailed("steam rate not positive"));
        }
        let ordered = self.minimal_limit_level < self.minimal_normal_level
            && self.minimal_normal_level < self.maximal_normal_level
            && self.maximal_normal_level < self.maximal_limit_level
            && self.maximal_limit_level < self.capacity;
        if !ordered || self.minimal_limit_level < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "level bands must satisfy 0 <= M1 < N1 < N2 < M2 < C",
            ));
        }
        Ok(())
    }

    /// Throughput of pump `index` in litres/second.
    pub fn pump_capacity(&self, index: usize) -> f64 {
        self.pump_capacities[index]
    }

    /// Midpoint H of the normal band, the level the pump selection aims for.
    pub fn normal_band_midpoint(&self) -> f64 {
        self.minimal_normal_level
            + (self.maximal_normal_level - self.minimal_normal_level) / 2.0
    }
}
