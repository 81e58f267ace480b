use serde::Serialize;

use crate::error::{EngineError, Result};

/// Frame rate used for timeline stepping and the end-of-clip safety margin.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Fps(f64);

impl Fps {
    /// Creates a validated frame rate.
    ///
    /// # Example
    /// ```
    /// use engine::Fps;
    ///
    /// let fps = Fps::new(25.0).expect("valid");
    /// assert_eq!(fps.frame_duration(), 0.04);
    /// assert!(Fps::new(0.0).is_err());
    /// ```
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(EngineError::InvalidFrameRate(value));
        }
        Ok(Self(value))
    }

    /// Creates a frame rate from a probed `num/den` pair.
    pub fn from_ratio(num: i32, den: i32) -> Result<Self> {
        if den <= 0 {
            return Err(EngineError::InvalidFrameRate(f64::NAN));
        }
        Self::new(f64::from(num) / f64::from(den))
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration(self) -> f64 {
        1.0 / self.0
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self(30.0)
    }
}

/// Converts seconds to whole microseconds with nearest rounding.
pub(crate) fn seconds_to_micros(seconds: f64) -> i64 {
    (seconds * 1_000_000.0).round() as i64
}
