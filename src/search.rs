//! Branching search for 5-wave sequences.
//!
//! Given a pivot sequence, a start pivot and one catalog variant, the
//! search enumerates admissible wave-1 candidates, then branches through
//! waves 2..5 with the variant's ratio gates and structural predicates
//! pruning as it goes. A wave step with no concrete pivot is synthesized
//! at the variant's ideal ratio and tagged projected, so incomplete
//! structures still surface as forecasts.

use crate::fib::{projection_time, FibCalc};
use crate::rules::VariantRules;
use crate::trace::WaveTracer;
use crate::zigzag::{before_break, BreakScan};
use crate::{
    ClusterPivot, Degree, Pivot, PivotId, PivotKind, PivotStatus, Wave, WaveName, WaveType,
};

// ============================================================
// TUNING
// ============================================================

/// Search heuristics. The defaults are empirically tuned; they are
/// configuration for behavioral parity, not theory-derived values.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Pivots per sliding window in the assembler. Applied uniformly at
    /// every degree; finer degrees may warrant proportionally smaller
    /// windows, but the reference behavior is uniform.
    pub window_len: usize,
    /// Wave-2 branches retracing less than this fraction of the running
    /// best retracement are dropped, bounding the branching factor.
    pub wave2_prune_factor: f64,
    /// Wave-5 lookahead: a pullback at least this percent of wave 1's
    /// range (together with the wave-4 threshold) finalizes the count and
    /// reads the continuation as the next structure's wave 1.
    pub wave5_pullback_vs_wave1: f64,
    /// Wave-5 lookahead: companion threshold against wave 4's range.
    pub wave5_pullback_vs_wave4: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            window_len: 24,
            wave2_prune_factor: 0.5,
            wave5_pullback_vs_wave1: 10.0,
            wave5_pullback_vs_wave4: 30.0,
        }
    }
}

// ============================================================
// SEQUENCES
// ============================================================

/// One candidate 5-wave count: six chained pivot endpoints.
#[derive(Debug, Clone)]
pub struct WaveSequence {
    pub wave_type: WaveType,
    pub degree: Degree,
    /// `p0..p5`; endpoints are shared between adjacent waves.
    pub pivots: Vec<ClusterPivot>,
}

impl WaveSequence {
    /// True when every endpoint is a real pivot (confirmed or waiting).
    pub fn is_complete(&self) -> bool {
        self.pivots.iter().all(|p| p.status != PivotStatus::Projected)
    }

    pub fn start_index(&self) -> usize {
        self.pivots.first().map(|p| p.pivot.candle_index).unwrap_or(0)
    }

    pub fn end_index(&self) -> usize {
        self.pivots.last().map(|p| p.pivot.candle_index).unwrap_or(0)
    }

    /// Chain the endpoints into waves 1..5.
    pub fn to_waves(&self) -> Vec<Wave> {
        const NAMES: [WaveName; 5] =
            [WaveName::N1, WaveName::N2, WaveName::N3, WaveName::N4, WaveName::N5];
        self.pivots
            .windows(2)
            .zip(NAMES)
            .map(|(pair, name)| Wave::new(name, self.degree, pair[0], pair[1]))
            .collect()
    }
}

// ============================================================
// SEARCH
// ============================================================

/// The per-variant branching search over one pivot slice.
pub struct WaveSearch<'a> {
    pub pivots: &'a [Pivot],
    pub fib: &'a FibCalc,
    pub params: &'a SearchParams,
    /// Dominant bar interval, seconds; used to place projected pivots on
    /// the candle axis.
    pub bar_interval_secs: i64,
    pub tracer: &'a dyn WaveTracer,
}

/// Running branch state shared across a single `find` call.
struct BranchState {
    /// Best wave-2 retracement seen so far, for the 0.5x prune.
    best_wave2_retr: f64,
}

impl<'a> WaveSearch<'a> {
    /// Enumerate admissible sequences for `rules`, starting at the pivot
    /// at `start`. Bull or bear direction follows the start pivot's kind.
    pub fn find(&self, rules: &'static VariantRules, start: usize, degree: Degree) -> Vec<WaveSequence> {
        let Some(p0) = self.pivots.get(start).copied() else {
            return Vec::new();
        };
        let up = p0.kind == PivotKind::Low;

        let mut state = BranchState { best_wave2_retr: 0.0 };
        let mut out = Vec::new();
        let mut best_w1: Option<f64> = None;

        for j in start + 1..self.pivots.len() {
            let p1 = self.pivots[j];
            if p1.kind == p0.kind {
                if beyond(!up, p1.price, p0.price) {
                    // Start support broken: no wave 1 can begin past here.
                    break;
                }
                continue;
            }
            if (p1.price - p0.price).abs() < f64::EPSILON {
                continue;
            }
            // Monotonic dominance: only a new extreme can improve on an
            // already-branched wave 1.
            if let Some(best) = best_w1 {
                if !beyond(up, p1.price, best) {
                    self.tracer.branch_pruned(rules.wave_type, WaveName::N1, "dominated");
                    continue;
                }
            }
            best_w1 = Some(p1.price);
            self.tracer.wave_pinned(rules.wave_type, WaveName::N1, &p1);
            self.wave2_stage(rules, degree, up, p0, p1, j, &mut state, &mut out);
        }

        for seq in &out {
            self.tracer.sequence_found(
                seq.wave_type,
                seq.degree,
                seq.start_index(),
                seq.end_index(),
            );
        }
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn wave2_stage(
        &self,
        rules: &'static VariantRules,
        degree: Degree,
        up: bool,
        p0: Pivot,
        p1: Pivot,
        j: usize,
        state: &mut BranchState,
        out: &mut Vec<WaveSequence>,
    ) {
        let scan = before_break(&p1, &self.pivots[j + 1..]);
        let (p2, status2) = match scan {
            BreakScan::FoundBroke { pivot, .. } => (pivot, PivotStatus::Confirmed),
            BreakScan::FoundOpen { pivot } => (pivot, PivotStatus::Waiting),
            BreakScan::EmptyBroke { .. } => {
                self.tracer.branch_pruned(rules.wave_type, WaveName::N2, "broke without pullback");
                return;
            }
            BreakScan::EmptyOpen => {
                // No pullback data at all: the whole tail is a forecast.
                let prefix = vec![confirmed(p0), confirmed(p1)];
                if let Some(seq) = self.project_tail(rules, degree, prefix) {
                    out.push(seq);
                }
                return;
            }
        };

        let Ok(retr) = self.fib.retracement_pct(p0.price, p1.price, p2.price) else {
            return;
        };
        if !rules.wave2.admits(retr) {
            self.tracer.branch_pruned(rules.wave_type, WaveName::N2, "retracement out of range");
            return;
        }
        if retr < self.params.wave2_prune_factor * state.best_wave2_retr {
            self.tracer.branch_pruned(rules.wave_type, WaveName::N2, "below running best");
            return;
        }
        state.best_wave2_retr = state.best_wave2_retr.max(retr);
        self.tracer.wave_pinned(rules.wave_type, WaveName::N2, &p2);

        if status2 == PivotStatus::Waiting {
            // Unconfirmed pullback: nothing past it can host a wave 3.
            let prefix =
                vec![confirmed(p0), confirmed(p1), ClusterPivot::new(p2, PivotStatus::Waiting)];
            if let Some(seq) = self.project_tail(rules, degree, prefix) {
                out.push(seq);
            }
            return;
        }

        let Some(k) = self.position_of(j + 1, p2.id) else {
            return;
        };
        self.wave3_stage(rules, degree, up, p0, p1, p2, k, out);
    }

    #[allow(clippy::too_many_arguments)]
    fn wave3_stage(
        &self,
        rules: &'static VariantRules,
        degree: Degree,
        up: bool,
        p0: Pivot,
        p1: Pivot,
        p2: Pivot,
        k: usize,
        out: &mut Vec<WaveSequence>,
    ) {
        let Ok(max_price) = self.fib.projection_price(p0.price, p1.price, p2.price, rules.wave3.max)
        else {
            return;
        };
        let w1_range = (p1.price - p0.price).abs();

        let mut best3: Option<f64> = None;
        let mut any_candidate = false;
        let mut broke = false;

        for m in k + 1..self.pivots.len() {
            let p3 = self.pivots[m];
            if p3.kind == p0.kind {
                if beyond(!up, p3.price, p2.price) {
                    broke = true;
                    break;
                }
                continue;
            }
            if beyond(up, p3.price, max_price) {
                // Past the variant's maximum projection: stop scanning.
                break;
            }
            if let Some(best) = best3 {
                if !beyond(up, p3.price, best) {
                    continue;
                }
            }
            best3 = Some(p3.price);

            let Ok(proj) = self.fib.projection_pct(p0.price, p1.price, p2.price, p3.price) else {
                continue;
            };
            if !rules.wave3.admits(proj) {
                continue;
            }
            let w3_range = (p3.price - p2.price).abs();
            if !rules.wave3_structure_ok(w1_range, w3_range) {
                self.tracer.branch_pruned(rules.wave_type, WaveName::N3, "structure");
                continue;
            }
            any_candidate = true;
            self.tracer.wave_pinned(rules.wave_type, WaveName::N3, &p3);
            self.wave4_stage(rules, degree, up, p0, p1, p2, p3, m, out);
        }

        if !any_candidate {
            if broke {
                self.tracer.branch_pruned(rules.wave_type, WaveName::N3, "support broken");
            } else {
                // Wave 3 pending: surface the branch as a forecast.
                let prefix = vec![confirmed(p0), confirmed(p1), confirmed(p2)];
                if let Some(seq) = self.project_tail(rules, degree, prefix) {
                    out.push(seq);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn wave4_stage(
        &self,
        rules: &'static VariantRules,
        degree: Degree,
        up: bool,
        p0: Pivot,
        p1: Pivot,
        p2: Pivot,
        p3: Pivot,
        m: usize,
        out: &mut Vec<WaveSequence>,
    ) {
        let scan = before_break(&p3, &self.pivots[m + 1..]);
        let (p4, status4) = match scan {
            BreakScan::FoundBroke { pivot, .. } => (pivot, PivotStatus::Confirmed),
            BreakScan::FoundOpen { pivot } => (pivot, PivotStatus::Waiting),
            BreakScan::EmptyBroke { .. } => {
                self.tracer.branch_pruned(rules.wave_type, WaveName::N4, "broke without pullback");
                return;
            }
            BreakScan::EmptyOpen => {
                let prefix = vec![confirmed(p0), confirmed(p1), confirmed(p2), confirmed(p3)];
                if let Some(seq) = self.project_tail(rules, degree, prefix) {
                    out.push(seq);
                }
                return;
            }
        };

        let Ok(retr) = self.fib.retracement_pct(p2.price, p3.price, p4.price) else {
            return;
        };
        if !rules.wave4.admits(retr) {
            self.tracer.branch_pruned(rules.wave_type, WaveName::N4, "retracement out of range");
            return;
        }
        if !rules.allow_wave4_overlap && overlaps_wave1(up, p1, p4) {
            self.tracer.branch_pruned(rules.wave_type, WaveName::N4, "overlaps wave 1");
            return;
        }
        self.tracer.wave_pinned(rules.wave_type, WaveName::N4, &p4);

        if status4 == PivotStatus::Waiting {
            let prefix = vec![
                confirmed(p0),
                confirmed(p1),
                confirmed(p2),
                confirmed(p3),
                ClusterPivot::new(p4, PivotStatus::Waiting),
            ];
            if let Some(seq) = self.project_tail(rules, degree, prefix) {
                out.push(seq);
            }
            return;
        }

        let Some(q) = self.position_of(m + 1, p4.id) else {
            return;
        };
        self.wave5_stage(rules, degree, up, p0, p1, p2, p3, p4, q, out);
    }

    #[allow(clippy::too_many_arguments)]
    fn wave5_stage(
        &self,
        rules: &'static VariantRules,
        degree: Degree,
        up: bool,
        p0: Pivot,
        p1: Pivot,
        p2: Pivot,
        p3: Pivot,
        p4: Pivot,
        q: usize,
        out: &mut Vec<WaveSequence>,
    ) {
        let base_end = if rules.wave5_from_wave3_base { p3 } else { p1 };
        let Ok(max_price) =
            self.fib.projection_price(p0.price, base_end.price, p4.price, rules.wave5.max)
        else {
            return;
        };
        let w1_range = (p1.price - p0.price).abs();
        let w3_range = (p3.price - p2.price).abs();
        let w4_range = (p4.price - p3.price).abs();

        let mut current: Option<Pivot> = None;
        let mut confirmed_by_pullback = false;
        let mut broke = false;

        for r in q + 1..self.pivots.len() {
            let p = self.pivots[r];
            if p.kind == p0.kind {
                match current {
                    None => {
                        if beyond(!up, p.price, p4.price) {
                            broke = true;
                            break;
                        }
                    }
                    Some(c) => {
                        // Lookahead: a deep enough pullback after the
                        // candidate top finalizes the count; the
                        // continuation is the next structure's wave 1.
                        let depth = (c.price - p.price).abs();
                        let vs_w1 = if w1_range > 0.0 { depth / w1_range * 100.0 } else { 0.0 };
                        let vs_w4 = if w4_range > 0.0 { depth / w4_range * 100.0 } else { 0.0 };
                        if vs_w1 > self.params.wave5_pullback_vs_wave1
                            && vs_w4 > self.params.wave5_pullback_vs_wave4
                        {
                            confirmed_by_pullback = true;
                            break;
                        }
                    }
                }
                continue;
            }

            if beyond(up, p.price, max_price) {
                break;
            }
            if let Some(c) = current {
                if !beyond(up, p.price, c.price) {
                    continue;
                }
            }
            let Ok(proj) =
                self.fib.projection_pct(p0.price, base_end.price, p4.price, p.price)
            else {
                continue;
            };
            if !rules.wave5.admits(proj) {
                continue;
            }
            let w5_range = (p.price - p4.price).abs();
            if !rules.wave5_structure_ok(w1_range, w3_range, w5_range) {
                self.tracer.branch_pruned(rules.wave_type, WaveName::N5, "structure");
                continue;
            }
            current = Some(p);
        }

        match current {
            Some(p5) => {
                let w5_range = (p5.price - p4.price).abs();
                // Wave 3 is never the shortest of the three motive legs.
                if w3_range < w1_range && w3_range < w5_range {
                    self.tracer.branch_pruned(rules.wave_type, WaveName::N3, "shortest wave 3");
                    return;
                }
                let status5 = if confirmed_by_pullback {
                    PivotStatus::Confirmed
                } else {
                    PivotStatus::Waiting
                };
                self.tracer.wave_pinned(rules.wave_type, WaveName::N5, &p5);
                out.push(WaveSequence {
                    wave_type: rules.wave_type,
                    degree,
                    pivots: vec![
                        confirmed(p0),
                        confirmed(p1),
                        confirmed(p2),
                        confirmed(p3),
                        confirmed(p4),
                        ClusterPivot::new(p5, status5),
                    ],
                });
            }
            None if broke => {
                self.tracer.branch_pruned(rules.wave_type, WaveName::N5, "support broken");
            }
            None => {
                let prefix = vec![
                    confirmed(p0),
                    confirmed(p1),
                    confirmed(p2),
                    confirmed(p3),
                    confirmed(p4),
                ];
                if let Some(seq) = self.project_tail(rules, degree, prefix) {
                    out.push(seq);
                }
            }
        }
    }

    /// Extend a concrete prefix to the full six endpoints, synthesizing
    /// each missing pivot at the variant's ideal ratio.
    fn project_tail(
        &self,
        rules: &'static VariantRules,
        degree: Degree,
        mut prefix: Vec<ClusterPivot>,
    ) -> Option<WaveSequence> {
        debug_assert!(prefix.len() >= 2);

        while prefix.len() < 6 {
            let n = prefix.len();
            let last = prefix[n - 1].pivot;
            let (price, ref_a, ref_b) = match n {
                // Wave 2 end: retrace wave 1.
                2 => {
                    let (a, b) = (prefix[0].pivot, prefix[1].pivot);
                    (self.fib.retracement_price(a.price, b.price, rules.wave2.ideal).ok()?, a, b)
                }
                // Wave 3 end: project wave 1 from the wave-2 end.
                3 => {
                    let (a, b) = (prefix[0].pivot, prefix[1].pivot);
                    (
                        self.fib
                            .projection_price(a.price, b.price, last.price, rules.wave3.ideal)
                            .ok()?,
                        a,
                        b,
                    )
                }
                // Wave 4 end: retrace wave 3.
                4 => {
                    let (a, b) = (prefix[2].pivot, prefix[3].pivot);
                    (self.fib.retracement_price(a.price, b.price, rules.wave4.ideal).ok()?, a, b)
                }
                // Wave 5 end: project the variant's base leg from wave 4.
                _ => {
                    let a = prefix[0].pivot;
                    let b = if rules.wave5_from_wave3_base { prefix[3].pivot } else { prefix[1].pivot };
                    (
                        self.fib
                            .projection_price(a.price, b.price, last.price, rules.wave5.ideal)
                            .ok()?,
                        a,
                        b,
                    )
                }
            };

            let time_gate = match n {
                2 => &rules.wave2_time,
                3 => &rules.wave3_time,
                4 => &rules.wave4_time,
                _ => &rules.wave5_time,
            };
            let time = projection_time(ref_a.time, ref_b.time, last.time, time_gate.ideal);
            let kind = last.kind.opposite();
            let steps = ((time - last.time) / self.bar_interval_secs).max(1) as usize;
            let candle_index = last.candle_index + steps;

            prefix.push(ClusterPivot::new(
                Pivot {
                    id: PivotId::new(candle_index, kind),
                    candle_index,
                    kind,
                    price,
                    time,
                },
                PivotStatus::Projected,
            ));
        }

        // Direction sanity: a projected tail must still alternate.
        debug_assert!(prefix.windows(2).all(|w| w[0].pivot.kind != w[1].pivot.kind));

        Some(WaveSequence { wave_type: rules.wave_type, degree, pivots: prefix })
    }

    fn position_of(&self, from: usize, id: PivotId) -> Option<usize> {
        self.pivots[from..].iter().position(|p| p.id == id).map(|i| i + from)
    }
}

#[inline]
fn confirmed(p: Pivot) -> ClusterPivot {
    ClusterPivot::new(p, PivotStatus::Confirmed)
}

/// Directional strict comparison: is `a` further along the trend than `b`?
#[inline]
fn beyond(up: bool, a: f64, b: f64) -> bool {
    if up {
        a > b
    } else {
        a < b
    }
}

/// Does the wave-4 end close inside wave 1's price territory?
#[inline]
fn overlaps_wave1(up: bool, p1: Pivot, p4: Pivot) -> bool {
    if up {
        p4.price < p1.price
    } else {
        p4.price > p1.price
    }
}
