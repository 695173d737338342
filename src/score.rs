//! Multi-axis scoring of wave sequences.
//!
//! A fixed 4- or 5-wave sequence is evaluated against every catalog
//! variant, not only the one that produced it: each ratio axis and each
//! time-proportion axis gets an ordinal score, and the results are ranked
//! by structural validity, then wave validity, then time validity, then
//! numeric score, with catalog declaration order breaking exact ties.

use crate::fib::FibCalc;
use crate::rules::{RuleScore, VariantRules, CATALOG};
use crate::{ClusterPivot, PivotKind, Result, WaveError, WaveType};

/// Slack allowed past the channel line, as a fraction of wave 3's range.
pub const CHANNEL_TOLERANCE: f64 = 0.1;

/// Scores for one sequence evaluated under one variant.
#[derive(Debug, Clone, Copy)]
pub struct VariantScore {
    pub wave_type: WaveType,
    /// Ratio axes in wave order: wave-2 retracement, wave-3 projection,
    /// wave-4 retracement, wave-5 projection. The wave-5 slot is not
    /// measured for 4-wave sequences and does not count toward validity
    /// or points.
    pub ratio: [RuleScore; 4],
    pub time: [RuleScore; 4],
    /// All measured ratio axes are non-invalid.
    pub wave_valid: bool,
    /// All measured time axes are non-invalid.
    pub time_valid: bool,
    /// Overlap consistency and channel containment; only evaluated for
    /// complete 5-wave sequences.
    pub structure_valid: Option<bool>,
    /// Total points across all measured axes.
    pub points: u32,
}

/// Scores a pivot chain against the whole catalog.
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine<'a> {
    pub fib: &'a FibCalc,
    /// Dominant bar interval, seconds; time axes are measured in bars.
    pub bar_interval_secs: i64,
}

impl<'a> ScoringEngine<'a> {
    /// Evaluate every variant and return the results ranked best-first.
    ///
    /// `pivots` must hold 5 endpoints (a 4-wave sequence) or 6 (a complete
    /// 5-wave sequence).
    pub fn score_all(&self, pivots: &[ClusterPivot]) -> Result<Vec<VariantScore>> {
        if pivots.len() < 5 || pivots.len() > 6 {
            return Err(WaveError::InsufficientData { need: 5, got: pivots.len() });
        }

        let mut scores = Vec::with_capacity(CATALOG.len());
        for rules in CATALOG {
            scores.push(self.score_variant(rules, pivots)?);
        }
        rank(&mut scores);
        Ok(scores)
    }

    /// The top-ranked variant for the sequence.
    pub fn best(&self, pivots: &[ClusterPivot]) -> Result<VariantScore> {
        let mut scores = self.score_all(pivots)?;
        Ok(scores.remove(0))
    }

    fn score_variant(
        &self,
        rules: &'static VariantRules,
        pivots: &[ClusterPivot],
    ) -> Result<VariantScore> {
        let p = |i: usize| pivots[i].pivot.price;
        let complete = pivots.len() == 6;

        let retr2 = self.fib.retracement_pct(p(0), p(1), p(2))?;
        let proj3 = self.fib.projection_pct(p(0), p(1), p(2), p(3))?;
        let retr4 = self.fib.retracement_pct(p(2), p(3), p(4))?;

        let mut ratio = [
            rules.wave2.score(retr2),
            rules.wave3.score(proj3),
            rules.wave4.score(retr4),
            RuleScore::Perfect,
        ];
        let mut time = [
            rules.wave2_time.score(self.time_pct(pivots, 1, 2, 0, 1)),
            rules.wave3_time.score(self.time_pct(pivots, 2, 3, 0, 1)),
            rules.wave4_time.score(self.time_pct(pivots, 3, 4, 2, 3)),
            RuleScore::Perfect,
        ];

        if complete {
            let base = if rules.wave5_from_wave3_base { 3 } else { 1 };
            let proj5 = self.fib.projection_pct(p(0), p(base), p(4), p(5))?;
            ratio[3] = rules.wave5.score(proj5);
            time[3] = rules.wave5_time.score(self.time_pct(pivots, 4, 5, 0, base));
        }

        let axes = if complete { 4 } else { 3 };
        let wave_valid = ratio[..axes].iter().all(|s| s.is_valid());
        let time_valid = time[..axes].iter().all(|s| s.is_valid());

        let structure_valid = complete.then(|| {
            overlap_consistent(rules, pivots) && channel_contained(pivots)
        });

        let points = ratio[..axes]
            .iter()
            .chain(time[..axes].iter())
            .map(|s| s.points())
            .sum();

        Ok(VariantScore {
            wave_type: rules.wave_type,
            ratio,
            time,
            wave_valid,
            time_valid,
            structure_valid,
            points,
        })
    }

    /// Duration of one wave as a percentage of a reference wave, both
    /// measured in whole bars of the dominant interval.
    fn time_pct(&self, pivots: &[ClusterPivot], a: usize, b: usize, ra: usize, rb: usize) -> f64 {
        let interval = self.bar_interval_secs.max(1);
        let bars = |i: usize, j: usize| {
            let dur = pivots[j].pivot.time - pivots[i].pivot.time;
            ((dur as f64 / interval as f64).round() as i64).max(1)
        };
        bars(a, b) as f64 / bars(ra, rb) as f64 * 100.0
    }
}

/// Sort best-first: structural validity, wave validity, time validity,
/// then points; the sort is stable, so exact ties keep catalog order.
fn rank(scores: &mut [VariantScore]) {
    scores.sort_by(|a, b| {
        let sa = a.structure_valid.unwrap_or(false);
        let sb = b.structure_valid.unwrap_or(false);
        sb.cmp(&sa)
            .then(b.wave_valid.cmp(&a.wave_valid))
            .then(b.time_valid.cmp(&a.time_valid))
            .then(b.points.cmp(&a.points))
    });
}

/// Wave 4 stays out of wave 1's territory unless the variant tolerates
/// the overlap.
fn overlap_consistent(rules: &VariantRules, pivots: &[ClusterPivot]) -> bool {
    if rules.allow_wave4_overlap {
        return true;
    }
    let up = pivots[0].pivot.kind == PivotKind::Low;
    let (p1, p4) = (pivots[1].pivot.price, pivots[4].pivot.price);
    if up {
        p4 >= p1
    } else {
        p4 <= p1
    }
}

/// The wave-5 end must stay inside the channel drawn through the wave-2
/// and wave-4 ends, shifted to pass through the wave-3 end, within
/// [`CHANNEL_TOLERANCE`] of wave 3's range.
fn channel_contained(pivots: &[ClusterPivot]) -> bool {
    let up = pivots[0].pivot.kind == PivotKind::Low;
    let (p2, p3, p4, p5) =
        (pivots[2].pivot, pivots[3].pivot, pivots[4].pivot, pivots[5].pivot);

    let dx = p4.candle_index as f64 - p2.candle_index as f64;
    if dx.abs() < f64::EPSILON {
        return true;
    }
    let slope = (p4.price - p2.price) / dx;
    let boundary = p3.price + slope * (p5.candle_index as f64 - p3.candle_index as f64);
    let slack = (p3.price - p2.price).abs() * CHANNEL_TOLERANCE;

    if up {
        p5.price <= boundary + slack
    } else {
        p5.price >= boundary - slack
    }
}
