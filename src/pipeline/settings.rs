//! User-tunable procedural parameters

use std::ops::RangeInclusive;

pub const WIND_STRENGTH_RANGE: RangeInclusive<f32> = 0.0..=2.5;
pub const WIND_DIRECTION_RANGE: RangeInclusive<f32> = 0.0..=360.0;

/// Wind parameters read by the vegetation and insect nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProceduralSettings {
    wind_strength: f32,
    wind_direction_degrees: f32,
}

impl Default for ProceduralSettings {
    fn default() -> Self {
        Self {
            wind_strength: 1.0,
            wind_direction_degrees: 0.0,
        }
    }
}

fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        *range.start()
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

impl ProceduralSettings {
    pub fn new(wind_strength: f32, wind_direction_degrees: f32) -> Self {
        let mut settings = Self::default();
        settings.set_wind_strength(wind_strength);
        settings.set_wind_direction_degrees(wind_direction_degrees);
        settings
    }

    pub fn wind_strength(&self) -> f32 {
        self.wind_strength
    }

    pub fn set_wind_strength(&mut self, strength: f32) {
        self.wind_strength = clamp_to(strength, &WIND_STRENGTH_RANGE);
    }

    pub fn wind_direction_degrees(&self) -> f32 {
        self.wind_direction_degrees
    }

    pub fn set_wind_direction_degrees(&mut self, degrees: f32) {
        self.wind_direction_degrees = clamp_to(degrees, &WIND_DIRECTION_RANGE);
    }

    pub fn wind_direction_radians(&self) -> f32 {
        self.wind_direction_degrees.to_radians()
    }

    /// Draw the "Procedural Generation" section. Returns true if a value changed.
    pub fn ui(&mut self, ui: &mut egui::Ui) -> bool {
        let mut changed = false;

        ui.heading("Procedural Generation");
        changed |= ui
            .add(egui::Slider::new(&mut self.wind_strength, WIND_STRENGTH_RANGE).text("Wind Strength"))
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut self.wind_direction_degrees, WIND_DIRECTION_RANGE)
                    .text("Wind Direction")
                    .fixed_decimals(1),
            )
            .changed();

        changed
    }
}
