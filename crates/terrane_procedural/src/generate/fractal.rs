//! Octave-summed Perlin field generator.
//!
//! Per column:
//!
//! ```text
//!   amplitude = 1, frequency = 1
//!   repeat octaves:
//!       s = ((origin + local) / sample_divisor / scale) * frequency
//!       total += amplitude * perlin(s.x, s.z)
//!       amplitude *= persistence
//!       frequency *= lacunarity
//! ```
//!
//! With normalization on, `total` is mapped from `[-R, R]` into `[0, 1]`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use terrane_core::{CancellationToken, Task, TaskError};

use super::{inverse_lerp, remap, HeightCurve, MIN_SCALE};
use crate::field::NoiseField;
use crate::noise::{NoiseSource, PerlinNoise};

/// Octave parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalSettings {
    /// Number of layers.
    pub octaves: u32,
    /// Amplitude multiplier per octave.
    pub persistence: f64,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
    /// Horizontal stretch.
    pub scale: f64,
    /// Extra divisor on world coordinates before `scale`.
    pub sample_divisor: f64,
    /// Map the sum from `[-R, R]` into `[0, 1]`.
    pub normalize: bool,
    /// `R` above.
    pub normalization_range: f64,
}

impl Default for FractalSettings {
    fn default() -> Self {
        Self {
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            scale: 64.0,
            sample_divisor: 1.0,
            normalize: true,
            normalization_range: 3.0,
        }
    }
}

impl FractalSettings {
    /// Copy with `scale` and `sample_divisor` floored to [`MIN_SCALE`].
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if !(self.scale > MIN_SCALE) {
            self.scale = MIN_SCALE;
        }
        if !(self.sample_divisor > MIN_SCALE) {
            self.sample_divisor = MIN_SCALE;
        }
        self
    }

    /// Raw octave sum of `noise` at world `(x, z)`.
    ///
    /// Accumulation stops at the first octave whose frequency or amplitude no
    /// longer fits in an `f64`.
    #[must_use]
    pub fn accumulate<N: NoiseSource + ?Sized>(&self, noise: &N, x: f64, z: f64) -> f64 {
        let base_x = x / self.sample_divisor / self.scale;
        let base_z = z / self.sample_divisor / self.scale;

        let mut total = 0.0;
        let mut amplitude: f64 = 1.0;
        let mut frequency: f64 = 1.0;
        for _ in 0..self.octaves {
            if !(frequency.is_finite() && amplitude.is_finite()) {
                break;
            }
            total += amplitude * noise.sample(base_x * frequency, base_z * frequency);
            amplitude *= self.persistence;
            frequency *= self.lacunarity;
        }
        total
    }
}

/// Fills a field with fractal Perlin noise.
#[derive(Debug)]
pub struct FractalFieldTask {
    noise: Arc<PerlinNoise>,
    field: NoiseField,
    settings: FractalSettings,
    curve: Option<HeightCurve>,
}

impl FractalFieldTask {
    /// Creates the task. Scale and divisor are floored to [`MIN_SCALE`].
    #[must_use]
    pub fn new(noise: Arc<PerlinNoise>, field: NoiseField, settings: FractalSettings) -> Self {
        Self {
            noise,
            field,
            settings: settings.sanitized(),
            curve: None,
        }
    }

    /// Adds a final remapping curve.
    #[must_use]
    pub fn with_curve(mut self, curve: HeightCurve) -> Self {
        self.curve = Some(curve);
        self
    }

    /// Effective settings after flooring.
    #[must_use]
    pub const fn settings(&self) -> &FractalSettings {
        &self.settings
    }

    /// The field being filled.
    #[must_use]
    pub const fn field(&self) -> &NoiseField {
        &self.field
    }

    /// Hands the field to the next stage.
    #[must_use]
    pub fn into_field(self) -> NoiseField {
        self.field
    }
}

impl Task for FractalFieldTask {
    fn process(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        let [ox, oz] = self.field.origin();
        let sx = self.field.size_x();
        let settings = self.settings;
        let range = settings.normalization_range.abs();
        let curve = self.curve.as_ref();
        let noise: &PerlinNoise = &self.noise;

        for (index, out) in self.field.heights_mut().iter_mut().enumerate() {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let x = f64::from(ox) + (index % sx) as f64;
            let z = f64::from(oz) + (index / sx) as f64;

            let total = settings.accumulate(noise, x, z);
            let value = if settings.normalize {
                inverse_lerp(-range, range, total)
            } else {
                total
            };
            *out = remap(curve, value);
        }

        self.field.mark_ready();
        Ok(())
    }
}
