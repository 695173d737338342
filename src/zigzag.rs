//! Pivot extraction and reduction.
//!
//! The zigzag pass converts a candle series into a strictly alternating
//! high/low pivot sequence: every bar starts eligible as both a pivot high
//! and a pivot low, and pairwise comparison rules against the previous bar
//! cancel eligibility until only the local extremes remain. The sampler
//! then thins that sequence down to the "material" turns above a relaxing
//! retracement threshold.

use crate::fib::FibCalc;
use crate::{BarColor, OHLCVExt, Pivot, PivotId, PivotKind, Result, WaveError, OHLCV};

// ============================================================
// PIVOT EXTRACTION (zigzag)
// ============================================================

/// Per-bar pivot eligibility, trimmed down by the comparison rules.
#[derive(Debug, Clone, Copy)]
struct Eligibility {
    high: bool,
    low: bool,
}

/// Extract the alternating pivot sequence from a candle series.
///
/// Requires at least two bars. The first pivot's kind is forced opposite
/// the overall trend direction (first vs. last bar low), so an up-trending
/// series always starts from a low.
pub fn extract<T: OHLCV>(bars: &[T]) -> Result<Vec<Pivot>> {
    if bars.len() < 2 {
        return Err(WaveError::InsufficientData { need: 2, got: bars.len() });
    }

    let mut flags = vec![Eligibility { high: true, low: true }; bars.len()];

    for i in 1..bars.len() {
        let (ph, pl) = (bars[i - 1].high(), bars[i - 1].low());
        let (h, l) = (bars[i].high(), bars[i].low());

        if h > ph && l < pl {
            // Outside bar: engulfs the neighbour, superseding both of its
            // extremes. The engulfing bar keeps dual eligibility.
            flags[i - 1].high = false;
            flags[i - 1].low = false;
        } else if h <= ph && l >= pl {
            // Inside bar (equal extremes included): contributes nothing.
            flags[i].high = false;
            flags[i].low = false;
        } else if h > ph {
            // Consecutive up bars: the earlier high is superseded and the
            // later, higher low cannot be a trough.
            flags[i - 1].high = false;
            flags[i].low = false;
        } else {
            // Consecutive down bars, mirrored.
            flags[i - 1].low = false;
            flags[i].high = false;
        }
    }

    // Overall trend decides the forced kind of the opening pivot.
    let trend_up = bars[bars.len() - 1].low() > bars[0].low();
    let first_kind = if trend_up { PivotKind::Low } else { PivotKind::High };

    let mut raw: Vec<Pivot> = Vec::with_capacity(bars.len());
    raw.push(pivot_at(bars, 0, first_kind));

    for (i, flag) in flags.iter().enumerate() {
        match (flag.high, flag.low) {
            (true, true) => {
                // Doji / spike surviving as both: emission order follows the
                // bar's body color. A green bar swept its low first; a red
                // bar topped out first; a neutral bar alternates off the
                // previously emitted pivot.
                let low_first = match bars[i].color() {
                    BarColor::Green => true,
                    BarColor::Red => false,
                    BarColor::Neutral => {
                        raw.last().map(|p| p.kind) == Some(PivotKind::High)
                    }
                };
                if low_first {
                    raw.push(pivot_at(bars, i, PivotKind::Low));
                    raw.push(pivot_at(bars, i, PivotKind::High));
                } else {
                    raw.push(pivot_at(bars, i, PivotKind::High));
                    raw.push(pivot_at(bars, i, PivotKind::Low));
                }
            }
            (true, false) => raw.push(pivot_at(bars, i, PivotKind::High)),
            (false, true) => raw.push(pivot_at(bars, i, PivotKind::Low)),
            (false, false) => {}
        }
    }

    Ok(collapse_alternating(raw))
}

#[inline]
fn pivot_at<T: OHLCV>(bars: &[T], index: usize, kind: PivotKind) -> Pivot {
    let price = match kind {
        PivotKind::High => bars[index].high(),
        PivotKind::Low => bars[index].low(),
    };
    Pivot {
        id: PivotId::new(index, kind),
        candle_index: index,
        kind,
        price,
        time: bars[index].time(),
    }
}

/// Collapse same-kind runs to the single most extreme pivot, preserving
/// strict high/low alternation. Ties keep the earlier pivot.
fn collapse_alternating(raw: Vec<Pivot>) -> Vec<Pivot> {
    let mut out: Vec<Pivot> = Vec::with_capacity(raw.len());
    for p in raw {
        let same_kind = out.last().map(|last| last.kind == p.kind).unwrap_or(false);
        if !same_kind {
            out.push(p);
        } else if let Some(last) = out.last_mut() {
            if p.is_more_extreme_than(last) {
                *last = p;
            }
        }
    }
    out
}

// ============================================================
// BEFORE-BREAK SEARCH
// ============================================================

/// Outcome of a [`before_break`] scan.
///
/// "Found" means at least one pivot of the accumulated kind was seen;
/// "broke" means a pivot breached the reference price. A break confirms the
/// reversal the accumulated extreme represents; a scan that runs out of
/// data leaves the branch open rather than invalid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BreakScan {
    /// Extreme found, reference breached: the turn is settled.
    FoundBroke { pivot: Pivot, break_at: usize },
    /// Extreme found, no breach before the data ran out: still open.
    FoundOpen { pivot: Pivot },
    /// Reference breached before any accumulating pivot appeared.
    EmptyBroke { break_at: usize },
    /// Nothing found and nothing breached: insufficient data.
    EmptyOpen,
}

impl BreakScan {
    #[inline]
    pub fn pivot(&self) -> Option<Pivot> {
        match self {
            BreakScan::FoundBroke { pivot, .. } | BreakScan::FoundOpen { pivot } => Some(*pivot),
            _ => None,
        }
    }

    #[inline]
    pub fn broke(&self) -> bool {
        matches!(self, BreakScan::FoundBroke { .. } | BreakScan::EmptyBroke { .. })
    }
}

/// Accumulate the most extreme opposite-kind pivot ahead of `reference`
/// until the reference price is breached.
///
/// With a high reference this walks a pullback: it tracks the lowest low
/// until some high exceeds the reference high. With a low reference it
/// tracks the highest high of a rally until some low undercuts the
/// reference low. `break_at` indexes into `forward`.
pub fn before_break(reference: &Pivot, forward: &[Pivot]) -> BreakScan {
    let mut extreme: Option<Pivot> = None;

    for (i, p) in forward.iter().enumerate() {
        if p.kind == reference.kind {
            let breached = match reference.kind {
                PivotKind::High => p.price > reference.price,
                PivotKind::Low => p.price < reference.price,
            };
            if breached {
                return match extreme {
                    Some(pivot) => BreakScan::FoundBroke { pivot, break_at: i },
                    None => BreakScan::EmptyBroke { break_at: i },
                };
            }
        } else {
            match &mut extreme {
                Some(e) => {
                    if p.is_more_extreme_than(e) {
                        *e = *p;
                    }
                }
                None => extreme = Some(*p),
            }
        }
    }

    match extreme {
        Some(pivot) => BreakScan::FoundOpen { pivot },
        None => BreakScan::EmptyOpen,
    }
}

// ============================================================
// RETRACEMENT SAMPLER
// ============================================================

/// Starting detail threshold, percent.
pub const SAMPLER_START_THRESHOLD: f64 = 90.0;
/// Threshold decrement per relaxation pass, percent.
pub const SAMPLER_THRESHOLD_STEP: f64 = 3.0;
/// Relaxation floor, percent.
pub const SAMPLER_MIN_THRESHOLD: f64 = 1.0;

/// Reduce a pivot sequence to its material turns.
///
/// Runs the depth filter with a threshold that starts at 90% and relaxes
/// by 3 per pass until at least `min_waves` legs survive or the floor is
/// reached. The first pivot and a trailing pivot of the prevailing trend
/// kind are always included.
pub fn sample(pivots: &[Pivot], min_waves: usize, fib: &FibCalc) -> Vec<Pivot> {
    if pivots.len() <= 2 {
        return pivots.to_vec();
    }

    let min_pivots = min_waves + 1;
    let mut threshold = SAMPLER_START_THRESHOLD;
    loop {
        let kept = filter_pass(pivots, threshold, fib);
        if kept.len() >= min_pivots || threshold <= SAMPLER_MIN_THRESHOLD {
            return force_trailing(kept, pivots);
        }
        threshold -= SAMPLER_THRESHOLD_STEP;
    }
}

/// One depth-filter pass: walk pivot triples `(a, b, c)` where `a` is the
/// last kept pivot and `b` the running opposite extreme; a turn `c` is
/// material when it retraces the leg `a -> b` by at least `threshold`
/// percent. Shallow turns are absorbed, extending `b` when the following
/// same-kind pivot is more extreme.
fn filter_pass(pivots: &[Pivot], threshold: f64, fib: &FibCalc) -> Vec<Pivot> {
    let mut kept = vec![pivots[0]];
    let mut b = pivots[1];
    let mut idx = 2;

    while idx < pivots.len() {
        let c = pivots[idx];
        if c.kind == b.kind {
            if c.is_more_extreme_than(&b) {
                b = c;
            }
            idx += 1;
            continue;
        }

        let a = kept[kept.len() - 1];
        let retr = fib
            .retracement_pct(a.price, b.price, c.price)
            .unwrap_or(0.0);
        if retr >= threshold {
            kept.push(b);
            b = c;
            idx += 1;
        } else {
            // Shallow turn: drop it, and let the next same-kind pivot
            // extend the running extreme if it goes further.
            if let Some(d) = pivots.get(idx + 1) {
                if d.kind == b.kind && d.is_more_extreme_than(&b) {
                    b = *d;
                }
                idx += 2;
            } else {
                idx += 1;
            }
        }
    }

    kept.push(b);
    kept
}

/// Ensure the reduced sequence ends on a pivot of the prevailing trend
/// kind: rising series end on a high, falling series on a low.
fn force_trailing(mut kept: Vec<Pivot>, pivots: &[Pivot]) -> Vec<Pivot> {
    let first = pivots[0];
    let last = pivots[pivots.len() - 1];
    let trend_up = last.price > first.price;
    let want = if trend_up { PivotKind::High } else { PivotKind::Low };

    if kept.last().map(|p| p.kind) == Some(want) {
        return kept;
    }
    if let Some(trail) = pivots.iter().rev().find(|p| p.kind == want) {
        let after_last = kept
            .last()
            .map(|p| trail.candle_index >= p.candle_index)
            .unwrap_or(true);
        if after_last {
            kept.push(*trail);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fib::PriceScale;

    #[derive(Debug, Clone, Copy)]
    struct Bar {
        o: f64,
        h: f64,
        l: f64,
        c: f64,
        t: i64,
    }

    impl Bar {
        fn new(o: f64, h: f64, l: f64, c: f64, t: i64) -> Self {
            Self { o, h, l, c, t }
        }
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.o
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            self.c
        }

        fn volume(&self) -> f64 {
            1.0
        }

        fn time(&self) -> i64 {
            self.t
        }
    }

    fn rising(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                Bar::new(base, base + 0.6, base - 0.4, base + 0.5, i as i64 * 60)
            })
            .collect()
    }

    /// Alternating down/up bars with a gentle upward drift; every bar is a
    /// local extreme of one kind, starting from a trough so the forced
    /// first pivot coincides with the first bar's low.
    fn sawtooth(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.1;
                if i % 2 == 0 {
                    Bar::new(base, base + 0.5, base - 2.0, base - 1.8, i as i64 * 60)
                } else {
                    Bar::new(base, base + 2.0, base - 0.5, base + 1.8, i as i64 * 60)
                }
            })
            .collect()
    }

    fn low(idx: usize, price: f64) -> Pivot {
        Pivot {
            id: PivotId::new(idx, PivotKind::Low),
            candle_index: idx,
            kind: PivotKind::Low,
            price,
            time: idx as i64 * 60,
        }
    }

    fn high(idx: usize, price: f64) -> Pivot {
        Pivot {
            id: PivotId::new(idx, PivotKind::High),
            candle_index: idx,
            kind: PivotKind::High,
            price,
            time: idx as i64 * 60,
        }
    }

    #[test]
    fn test_rising_series_two_pivots() {
        let bars = rising(50);
        let pivots = extract(&bars).unwrap();
        assert_eq!(pivots.len(), 2);
        assert_eq!(pivots[0].kind, PivotKind::Low);
        assert_eq!(pivots[0].candle_index, 0);
        assert_eq!(pivots[1].kind, PivotKind::High);
        assert_eq!(pivots[1].candle_index, 49);
    }

    #[test]
    fn test_sawtooth_n_pivots() {
        let n = 20;
        let bars = sawtooth(n);
        let pivots = extract(&bars).unwrap();
        assert_eq!(pivots.len(), n);
        for pair in pivots.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind, "pivots must alternate");
        }
    }

    #[test]
    fn test_single_bar_rejected() {
        let bars = rising(1);
        assert!(matches!(
            extract(&bars),
            Err(WaveError::InsufficientData { need: 2, got: 1 })
        ));
    }

    #[test]
    fn test_inside_bar_contributes_nothing() {
        let bars = vec![
            Bar::new(100.0, 105.0, 95.0, 104.0, 0),
            Bar::new(101.0, 103.0, 97.0, 98.0, 60), // inside
            Bar::new(98.0, 110.0, 96.0, 109.0, 120),
        ];
        let pivots = extract(&bars).unwrap();
        assert!(pivots.iter().all(|p| p.candle_index != 1));
    }

    #[test]
    fn test_outside_bar_supersedes_neighbour() {
        let bars = vec![
            Bar::new(100.0, 105.0, 95.0, 104.0, 0),
            Bar::new(104.0, 110.0, 90.0, 92.0, 60), // engulfs bar 0
            Bar::new(92.0, 95.0, 85.0, 86.0, 120),
        ];
        let pivots = extract(&bars).unwrap();
        assert!(pivots.iter().all(|p| p.candle_index != 0 || p.kind == PivotKind::High));
        // The red outside bar tops first: its high precedes its low.
        let hi = pivots.iter().position(|p| p.kind == PivotKind::High && p.candle_index == 1);
        assert!(hi.is_some());
    }

    #[test]
    fn test_first_pivot_opposite_trend() {
        // Falling series: trend down, first pivot forced to a high.
        let bars: Vec<Bar> = (0..30)
            .map(|i| {
                let base = 200.0 - i as f64;
                Bar::new(base, base + 0.4, base - 0.6, base - 0.5, i as i64 * 60)
            })
            .collect();
        let pivots = extract(&bars).unwrap();
        assert_eq!(pivots[0].kind, PivotKind::High);
    }

    // ---- before_break ----

    #[test]
    fn test_before_break_found_broke() {
        let reference = high(0, 110.0);
        let forward = [low(1, 100.0), high(2, 108.0), low(3, 98.0), high(4, 112.0)];
        match before_break(&reference, &forward) {
            BreakScan::FoundBroke { pivot, break_at } => {
                assert_eq!(pivot.price, 98.0);
                assert_eq!(break_at, 3);
            }
            other => panic!("expected FoundBroke, got {other:?}"),
        }
    }

    #[test]
    fn test_before_break_found_open() {
        let reference = high(0, 110.0);
        let forward = [low(1, 100.0), high(2, 108.0), low(3, 98.0)];
        match before_break(&reference, &forward) {
            BreakScan::FoundOpen { pivot } => assert_eq!(pivot.price, 98.0),
            other => panic!("expected FoundOpen, got {other:?}"),
        }
    }

    #[test]
    fn test_before_break_empty_broke() {
        let reference = high(0, 110.0);
        let forward = [high(1, 115.0), low(2, 100.0)];
        match before_break(&reference, &forward) {
            BreakScan::EmptyBroke { break_at } => assert_eq!(break_at, 0),
            other => panic!("expected EmptyBroke, got {other:?}"),
        }
    }

    #[test]
    fn test_before_break_empty_open() {
        let reference = high(0, 110.0);
        let forward: [Pivot; 0] = [];
        assert_eq!(before_break(&reference, &forward), BreakScan::EmptyOpen);
    }

    #[test]
    fn test_before_break_low_reference_rally() {
        let reference = low(0, 50.0);
        let forward = [high(1, 60.0), low(2, 55.0), high(3, 65.0), low(4, 45.0)];
        match before_break(&reference, &forward) {
            BreakScan::FoundBroke { pivot, break_at } => {
                assert_eq!(pivot.price, 65.0);
                assert_eq!(break_at, 3);
            }
            other => panic!("expected FoundBroke, got {other:?}"),
        }
    }

    // ---- sampler ----

    #[test]
    fn test_sample_keeps_deep_turns() {
        let fib = FibCalc::new(PriceScale::Linear);
        // Deep zigzag: every turn retraces well over 90%.
        let pivots = vec![
            low(0, 100.0),
            high(1, 110.0),
            low(2, 100.5),
            high(3, 111.0),
            low(4, 101.0),
            high(5, 112.0),
        ];
        let kept = sample(&pivots, 4, &fib);
        assert!(kept.len() >= 5);
        assert_eq!(kept[0].candle_index, 0);
    }

    #[test]
    fn test_sample_drops_shallow_turns() {
        let fib = FibCalc::new(PriceScale::Linear);
        // One shallow dip (20% retracement) inside a larger up leg.
        let pivots = vec![
            low(0, 100.0),
            high(1, 110.0),
            low(2, 108.0), // shallow
            high(3, 120.0),
            low(4, 100.5),
            high(5, 121.0),
        ];
        let kept = sample(&pivots, 2, &fib);
        assert!(kept.iter().all(|p| p.candle_index != 2));
        assert_eq!(kept.last().map(|p| p.kind), Some(PivotKind::High));
    }

    #[test]
    fn test_sample_trailing_trend_pivot() {
        let fib = FibCalc::new(PriceScale::Linear);
        let pivots = vec![low(0, 100.0), high(1, 120.0), low(2, 101.0), high(3, 125.0)];
        let kept = sample(&pivots, 3, &fib);
        // Rising sequence: must end on a high.
        assert_eq!(kept.last().map(|p| p.kind), Some(PivotKind::High));
    }
}
