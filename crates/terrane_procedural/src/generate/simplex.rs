//! Two-pass simplex field generator.
//!
//! Pass 1 samples raw noise and tracks the observed range; pass 2 remaps
//! every value into `[0, 1]` against that range and applies the curve. The
//! range is not known until every column has been sampled.

use std::sync::Arc;

use terrane_core::{CancellationToken, Task, TaskError};

use super::{inverse_lerp, remap, HeightCurve, MIN_SCALE};
use crate::field::NoiseField;
use crate::noise::SimplexNoise;

/// Fills a field with min/max-normalized simplex noise.
#[derive(Debug)]
pub struct SimplexFieldTask {
    noise: Arc<SimplexNoise>,
    field: NoiseField,
    scale: f64,
    curve: Option<HeightCurve>,
    /// Raw pass-1 values; dropped once the field is filled.
    raw: Vec<f64>,
}

impl SimplexFieldTask {
    /// Samples at `(world / scale)`. `scale` is floored to [`MIN_SCALE`].
    #[must_use]
    pub fn new(noise: Arc<SimplexNoise>, field: NoiseField, scale: f64) -> Self {
        Self {
            noise,
            field,
            scale: if scale > MIN_SCALE { scale } else { MIN_SCALE },
            curve: None,
            raw: Vec::new(),
        }
    }

    /// Adds a final remapping curve.
    #[must_use]
    pub fn with_curve(mut self, curve: HeightCurve) -> Self {
        self.curve = Some(curve);
        self
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

impl Task for SimplexFieldTask {
    fn process(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        let [ox, oz] = self.field.origin();
        let (sx, sz) = (self.field.size_x(), self.field.size_z());

        self.raw.clear();
        self.raw.reserve(sx * sz);
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for z in 0..sz {
            for x in 0..sx {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                let wx = f64::from(ox) + x as f64;
                let wz = f64::from(oz) + z as f64;
                let value = self.noise.sample(wx / self.scale, wz / self.scale);
                min = min.min(value);
                max = max.max(value);
                self.raw.push(value);
            }
        }

        let curve = self.curve.as_ref();
        for (out, &value) in self.field.heights_mut().iter_mut().zip(&self.raw) {
            if cancel.is_cancelled() {
                return Ok(());
            }
            *out = remap(curve, inverse_lerp(min, max, value));
        }

        self.field.mark_ready();
        Ok(())
    }

    fn process_finished(&mut self) {
        self.raw = Vec::new();
    }
}
