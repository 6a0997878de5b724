//! Potentiometer divider model
//!
//! The pot (`MAX_R` full travel) sits under a fixed top resistor (`TOP_R`),
//! so the ADC sees `TOP_R / (TOP_R + R_pot)` of full scale. Inverting that
//! gives the wiper resistance, normalised to `[0, 1]` of `MAX_R`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Divider resistances in kilo-ohms
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DividerModel {
    /// Fixed top resistor (`TOP_R`)
    pub top_r: f32,
    /// Potentiometer full travel (`MAX_R`)
    pub max_r: f32,
}

impl Default for DividerModel {
    fn default() -> Self {
        Self {
            top_r: 4.7,
            max_r: 10.0,
        }
    }
}

impl DividerModel {
    pub fn is_valid(&self) -> bool {
        self.top_r > 0.0 && self.max_r > 0.0
    }

    /// Lowest ratio the divider can produce (pot at full travel)
    pub fn min_ratio(&self) -> f32 {
        self.top_r / (self.top_r + self.max_r)
    }

    /// Normalised pot position for an ADC ratio
    ///
    /// Ratios below the divider's floor read as full travel, ratios of 1
    /// and above as zero. Never returns NaN for a finite ratio.
    pub fn fraction(&self, ratio: f32) -> f32 {
        if !self.is_valid() || ratio.is_nan() {
            return 0.0;
        }
        if ratio <= self.min_ratio() {
            return 1.0;
        }
        let ratio = ratio.min(1.0);
        let pot_r = self.top_r / ratio - self.top_r;
        (pot_r / self.max_r).clamp(0.0, 1.0)
    }
}
