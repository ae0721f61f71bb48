//! # Field Generators
//!
//! Tasks that fill a [`NoiseField`] with normalized heights.
//!
//! | Generator            | Base noise | Normalization                    |
//! |----------------------|------------|----------------------------------|
//! | [`SimplexFieldTask`] | simplex    | observed `[min, max]`, two passes |
//! | [`FractalFieldTask`] | Perlin     | fixed `[-R, R]`, optional        |
//!
//! Both poll their cancellation token between columns. A cancelled generator
//! returns early and leaves its field not ready.

mod fractal;
mod simplex;

use std::fmt;
use std::sync::Arc;

use terrane_core::{CancellationToken, Task, TaskError};

use crate::field::NoiseField;

pub use fractal::{FractalFieldTask, FractalSettings};
pub use simplex::SimplexFieldTask;

/// Smallest scale or divisor a generator will divide by.
pub const MIN_SCALE: f64 = 1e-4;

/// Maps `value` from `[min, max]` onto `[0, 1]`, clamped.
///
/// A degenerate range maps everything to 0.
#[inline]
#[must_use]
pub fn inverse_lerp(min: f64, max: f64, value: f64) -> f64 {
    let span = max - min;
    if span.abs() <= f64::EPSILON {
        return 0.0;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

/// Remapping curve applied to every normalized height as a final pass.
#[derive(Clone)]
pub struct HeightCurve(Arc<dyn Fn(f32) -> f32 + Send + Sync>);

impl HeightCurve {
    /// Wraps a pure function `[0, 1] -> [0, 1]`.
    pub fn new(curve: impl Fn(f32) -> f32 + Send + Sync + 'static) -> Self {
        Self(Arc::new(curve))
    }

    /// `t^exponent`; exponents above 1 flatten lowlands.
    #[must_use]
    pub fn power(exponent: f32) -> Self {
        Self::new(move |t| t.max(0.0).powf(exponent))
    }

    /// Hermite smoothstep `3t^2 - 2t^3`.
    #[must_use]
    pub fn smoothstep() -> Self {
        Self::new(|t| {
            let t = t.clamp(0.0, 1.0);
            t * t * (3.0 - 2.0 * t)
        })
    }

    /// Evaluates the curve.
    #[inline]
    #[must_use]
    pub fn apply(&self, t: f32) -> f32 {
        (self.0)(t)
    }
}

impl fmt::Debug for HeightCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HeightCurve(..)")
    }
}

/// Applies an optional curve.
#[inline]
pub(crate) fn remap(curve: Option<&HeightCurve>, t: f64) -> f32 {
    let t = t as f32;
    curve.map_or(t, |c| c.apply(t))
}

/// Either generator, for callers that pick the algorithm at runtime.
#[derive(Debug)]
pub enum FieldGenerator {
    /// Two-pass simplex.
    Simplex(SimplexFieldTask),
    /// Octave-summed Perlin.
    Fractal(FractalFieldTask),
}

impl FieldGenerator {
    /// The field being filled.
    #[must_use]
    pub fn field(&self) -> &NoiseField {
        match self {
            Self::Simplex(task) => task.field(),
            Self::Fractal(task) => task.field(),
        }
    }

    /// Hands the field to the next stage.
    #[must_use]
    pub fn into_field(self) -> NoiseField {
        match self {
            Self::Simplex(task) => task.into_field(),
            Self::Fractal(task) => task.into_field(),
        }
    }
}

impl Task for FieldGenerator {
    fn process(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
        match self {
            Self::Simplex(task) => task.process(cancel),
            Self::Fractal(task) => task.process(cancel),
        }
    }

    fn process_finished(&mut self) {
        match self {
            Self::Simplex(task) => task.process_finished(),
            Self::Fractal(task) => task.process_finished(),
        }
    }
}

impl From<SimplexFieldTask> for FieldGenerator {
    fn from(task: SimplexFieldTask) -> Self {
        Self::Simplex(task)
    }
}

impl From<FractalFieldTask> for FieldGenerator {
    fn from(task: FractalFieldTask) -> Self {
        Self::Fractal(task)
    }
}
