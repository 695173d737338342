//! Fibonacci retracement and projection math.
//!
//! All price relationships in the wave rules are expressed as percentages of
//! a reference leg. The calculator works on a linear or logarithmic price
//! scale, chosen at construction; log mode maps prices into ln-space,
//! applies the linear formula there, and exponentiates the result back.

use crate::{Result, WaveError};

/// Price scale used for retracement/projection math.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PriceScale {
    #[default]
    Linear,
    Logarithmic,
}

/// Retracement / projection calculator with a fixed price scale.
#[derive(Debug, Clone, Copy)]
pub struct FibCalc {
    scale: PriceScale,
}

impl FibCalc {
    pub fn new(scale: PriceScale) -> Self {
        Self { scale }
    }

    #[inline]
    pub fn scale(&self) -> PriceScale {
        self.scale
    }

    /// How far `p3` retraces the leg `p1 -> p2`, as a percentage of that
    /// leg's range. `p3 == p2` maps to 0%, `p3 == p1` maps to 100%.
    pub fn retracement_pct(&self, p1: f64, p2: f64, p3: f64) -> Result<f64> {
        let (p1, p2, p3) = self.to_scale3(p1, p2, p3)?;
        let leg = leg_range(p1, p2)?;
        Ok((p2 - p3) / leg * 100.0)
    }

    /// How far the move `p3 -> p4` extends the leg `p1 -> p2`, as a
    /// percentage of that leg's range.
    pub fn projection_pct(&self, p1: f64, p2: f64, p3: f64, p4: f64) -> Result<f64> {
        let (p1, p2, p3) = self.to_scale3(p1, p2, p3)?;
        let p4 = self.to_scale(p4)?;
        let leg = leg_range(p1, p2)?;
        Ok((p4 - p3) / leg * 100.0)
    }

    /// Price reached when the leg `p1 -> p2` is projected from anchor `p3`
    /// by `pct` percent of the leg's range.
    pub fn projection_price(&self, p1: f64, p2: f64, p3: f64, pct: f64) -> Result<f64> {
        let (p1, p2, p3) = self.to_scale3(p1, p2, p3)?;
        leg_range(p1, p2)?;
        self.from_scale(p3 + (p2 - p1) * pct / 100.0)
    }

    /// Price reached when the leg `p1 -> p2` retraces by `pct` percent.
    pub fn retracement_price(&self, p1: f64, p2: f64, pct: f64) -> Result<f64> {
        let p1s = self.to_scale(p1)?;
        let p2s = self.to_scale(p2)?;
        leg_range(p1s, p2s)?;
        self.from_scale(p2s - (p2s - p1s) * pct / 100.0)
    }

    #[inline]
    fn to_scale(&self, p: f64) -> Result<f64> {
        match self.scale {
            PriceScale::Linear => Ok(p),
            PriceScale::Logarithmic => {
                if p <= 0.0 {
                    return Err(WaveError::NonPositivePrice { price: p });
                }
                Ok(p.ln())
            }
        }
    }

    #[inline]
    fn from_scale(&self, p: f64) -> Result<f64> {
        match self.scale {
            PriceScale::Linear => Ok(p),
            PriceScale::Logarithmic => Ok(p.exp()),
        }
    }

    #[inline]
    fn to_scale3(&self, p1: f64, p2: f64, p3: f64) -> Result<(f64, f64, f64)> {
        Ok((self.to_scale(p1)?, self.to_scale(p2)?, self.to_scale(p3)?))
    }
}

/// Signed range of the reference leg; a degenerate leg (`p1 == p2`) is a
/// precondition error, never a silent division by zero.
#[inline]
fn leg_range(p1: f64, p2: f64) -> Result<f64> {
    let leg = p2 - p1;
    if leg.abs() < f64::EPSILON {
        return Err(WaveError::DegenerateLeg);
    }
    Ok(leg)
}

/// Project a duration: the span `t1 -> t2` applied from anchor `t3` at
/// `pct` percent. Time is always linear, regardless of the price scale.
#[inline]
pub fn projection_time(t1: i64, t2: i64, t3: i64, pct: f64) -> i64 {
    t3 + ((t2 - t1) as f64 * pct / 100.0).round() as i64
}
