use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub width: usize,
    pub height: usize,
    pub agent_count: usize,
    pub steps: usize,

    // Pheromone parameters
    pub decay: f32,
    pub diffusion: f32,
    pub density_decay_weight: f32,
    pub deposit_amount: f32,
    pub shelter_seed_amount: f32,
    /// Clamp cells that decay below zero. Off reproduces the raw arithmetic.
    pub clamp_negative: bool,

    // Movement scoring weights
    pub hospital_weight: f32,
    pub shelter_weight: f32,
    pub transport_weight: f32,

    pub seed: Option<u64>,
    pub report_interval: usize,

    // Frame export
    pub record_frames: bool,
    pub frame_scale: u32,
    pub output_dir: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            agent_count: 30,
            steps: 120,

            decay: 0.01,
            diffusion: 0.1,
            density_decay_weight: 0.05,
            deposit_amount: 1.0,
            shelter_seed_amount: 50.0,
            clamp_negative: true,

            hospital_weight: 0.01,
            shelter_weight: 0.01,
            transport_weight: 0.5,

            seed: None,
            report_interval: 20,

            record_frames: false,
            frame_scale: 8,
            output_dir: "evacuation_output".to_string(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SimError::InvalidConfiguration(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > i32::MAX as usize || self.height > i32::MAX as usize {
            return Err(SimError::InvalidConfiguration(
                "grid dimensions exceed the coordinate range".to_string(),
            ));
        }

        let coefficients = [
            ("decay", self.decay),
            ("diffusion", self.diffusion),
            ("density_decay_weight", self.density_decay_weight),
            ("deposit_amount", self.deposit_amount),
            ("shelter_seed_amount", self.shelter_seed_amount),
            ("hospital_weight", self.hospital_weight),
            ("shelter_weight", self.shelter_weight),
            ("transport_weight", self.transport_weight),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::InvalidConfiguration(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        if self.frame_scale == 0 {
            return Err(SimError::InvalidConfiguration(
                "frame_scale must be at least 1".to_string(),
            ));
        }
        if self.record_frames {
            crate::video::frame_size(self.width, self.height, self.frame_scale)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_width_is_rejected() {
        let config = SimConfig { width: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfiguration(_))));
    }

    #[test]
    fn negative_decay_is_rejected() {
        let config = SimConfig { decay: -0.5, ..Default::default() };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfiguration(_))));
    }

    #[test]
    fn nan_diffusion_is_rejected() {
        let config = SimConfig { diffusion: f32::NAN, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_frame_export_is_rejected() {
        let config = SimConfig {
            width: 5000,
            height: 5000,
            frame_scale: 8,
            record_frames: true,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfiguration(_))));

        // the grid alone is fine when no frames are recorded
        let config = SimConfig { record_frames: false, ..config };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{ "width": 10, "seed": 7 }"#).unwrap();
        assert_eq!(config.width, 10);
        assert_eq!(config.height, 50);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.decay, 0.01);
    }
}
