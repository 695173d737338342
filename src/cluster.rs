//! Window-driven assembly of candidate clusters.
//!
//! The assembler slides a fixed-size window across the reduced pivot
//! series, runs the branching search for every catalog variant inside each
//! window, recurses into found waves for nested sub-degree structure,
//! then merges overlapping interpretations, deduplicates them and
//! re-ranks the survivors. Windows are independent and scanned in
//! parallel; everything after collection is single-threaded.

use rayon::prelude::*;

use crate::fib::FibCalc;
use crate::rules::CATALOG;
use crate::score::{ScoringEngine, VariantScore};
use crate::search::{SearchParams, WaveSearch, WaveSequence};
use crate::trace::WaveTracer;
use crate::zigzag::before_break;
use crate::{ClusterPivot, ClusterWaves, Degree, Pivot, PivotStatus, Result, Wave, WaveName};

/// Windows advance by half their length, so every pivot is seen by at
/// least two windows except at the edges.
const WINDOW_STEP_DIV: usize = 2;

/// Label order for merged chains: the motive count first, then corrective
/// continuation letters.
const NAME_ORDER: [WaveName; 13] = [
    WaveName::N1,
    WaveName::N2,
    WaveName::N3,
    WaveName::N4,
    WaveName::N5,
    WaveName::A,
    WaveName::B,
    WaveName::C,
    WaveName::D,
    WaveName::E,
    WaveName::X,
    WaveName::Y,
    WaveName::Z,
];

/// Drives the search across windows and owns merge/dedup/re-rank.
pub struct ClusterAssembler<'a> {
    pub fib: &'a FibCalc,
    pub params: &'a SearchParams,
    /// Dominant bar interval, seconds.
    pub bar_interval_secs: i64,
    pub tracer: &'a dyn WaveTracer,
}

impl ClusterAssembler<'_> {
    /// Assemble clusters at `degree` from the reduced pivot sequence.
    ///
    /// `all_pivots` is the unreduced sequence; nested sub-degree searches
    /// draw their finer detail from it. `sub_counts` bounds the recursion
    /// depth. "No candidate found" is an empty result, not an error.
    pub fn assemble(
        &self,
        sampled: &[Pivot],
        all_pivots: &[Pivot],
        degree: Degree,
        sub_counts: usize,
    ) -> Result<Vec<ClusterWaves>> {
        if sampled.len() < 2 {
            return Ok(Vec::new());
        }

        let window_len = self.params.window_len.max(4);
        let step = (window_len / WINDOW_STEP_DIV).max(1);
        let starts: Vec<usize> = (0..sampled.len()).step_by(step).collect();

        let sequences: Vec<WaveSequence> = starts
            .par_iter()
            .map(|&s| self.scan_window(sampled, s, window_len, degree))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();

        let mut clusters: Vec<ClusterWaves> =
            sequences.iter().map(|seq| cluster_from(seq)).collect();

        if sub_counts > 0 {
            // The finest degree simply has nothing below it.
            if let Ok(child_degree) = degree.checked_sub() {
                for cluster in &mut clusters {
                    for wave in &mut cluster.waves {
                        self.attach_children(wave, all_pivots, child_degree, sub_counts - 1)?;
                    }
                }
            }
        }

        let merged = self.merge_all(clusters)?;
        let mut out = self.rerank(merged)?;
        self.confirm_trailing(&mut out, sampled);
        Ok(out)
    }

    fn scan_window(
        &self,
        sampled: &[Pivot],
        start: usize,
        window_len: usize,
        degree: Degree,
    ) -> Vec<WaveSequence> {
        let end = (start + window_len).min(sampled.len());
        let window = &sampled[start..end];
        if window.len() < 2 {
            return Vec::new();
        }

        let search = WaveSearch {
            pivots: window,
            fib: self.fib,
            params: self.params,
            bar_interval_secs: self.bar_interval_secs,
            tracer: self.tracer,
        };

        let mut found = Vec::new();
        for rules in CATALOG {
            for pos in 0..window.len() - 1 {
                found.extend(search.find(rules, pos, degree));
            }
        }
        self.tracer.window_scanned(start, end, found.len());
        found
    }

    /// Search one wave's interior for a nested structure one degree finer
    /// and attach the best find as children.
    fn attach_children(
        &self,
        wave: &mut Wave,
        all_pivots: &[Pivot],
        child_degree: Degree,
        sub_counts: usize,
    ) -> Result<()> {
        let lo = wave.p_start.pivot.candle_index;
        let hi = wave.p_end.pivot.candle_index;
        if hi <= lo + 2 {
            return Ok(());
        }

        let inner: Vec<Pivot> = all_pivots
            .iter()
            .copied()
            .filter(|p| p.candle_index >= lo && p.candle_index <= hi)
            .collect();
        if inner.len() < 4 {
            return Ok(());
        }

        let sub = self.assemble(&inner, &inner, child_degree, sub_counts)?;
        if let Some(best) = sub.into_iter().next() {
            wave.children = best.waves;
        }
        Ok(())
    }

    /// Merge clusters whose index ranges overlap and that share at least
    /// one identical wave, to a fixpoint. Clusters that merely overlap
    /// without shared structure stay separate: they are alternative
    /// interpretations, not fragments of one.
    fn merge_all(&self, mut clusters: Vec<ClusterWaves>) -> Result<Vec<ClusterWaves>> {
        clusters.sort_by(|a, b| {
            (a.start_index(), a.end_index(), a.id).cmp(&(b.start_index(), b.end_index(), b.id))
        });
        clusters.dedup_by_key(|c| c.id);

        loop {
            let Some((i, j)) = find_mergeable(&clusters) else {
                break;
            };
            let b = clusters.remove(j);
            let a = clusters.remove(i);
            let merged = self.merge_pair(a, b)?;
            clusters.insert(i, merged);
        }
        Ok(clusters)
    }

    /// Merge one pair: pool the waves, drop duplicate `[start, end]`
    /// pairs, keep the subsequence with strictly ascending indices, then
    /// re-label and re-score the result.
    fn merge_pair(&self, a: ClusterWaves, b: ClusterWaves) -> Result<ClusterWaves> {
        let degree = a.degree;
        let mut pool: Vec<Wave> = a.waves;
        pool.extend(b.waves);
        pool.sort_by_key(|w| (w.start_index(), w.end_index()));
        pool.dedup_by_key(|w| (w.start_index(), w.end_index()));

        // Keep whichever side's waves continue the ascending chain.
        let mut chain: Vec<Wave> = Vec::with_capacity(pool.len());
        for w in pool {
            match chain.last() {
                Some(last) if w.start_index() < last.end_index() => {}
                _ => chain.push(w),
            }
        }
        chain.truncate(NAME_ORDER.len());

        for (wave, name) in chain.iter_mut().zip(NAME_ORDER) {
            wave.name = name;
        }

        let wave_type = match self.score_endpoints(&chain)? {
            Some(score) => score.wave_type,
            None => a.wave_type,
        };

        Ok(ClusterWaves::new(degree, wave_type, chain))
    }

    /// Re-rank the final cluster list: scored clusters first, ordered by
    /// the scoring tiers, then by position for determinism.
    fn rerank(&self, clusters: Vec<ClusterWaves>) -> Result<Vec<ClusterWaves>> {
        let mut keyed: Vec<(ClusterWaves, Option<VariantScore>)> = Vec::with_capacity(clusters.len());
        for c in clusters {
            let score = self.score_endpoints(&c.waves)?;
            keyed.push((c, score));
        }

        keyed.sort_by(|(ca, sa), (cb, sb)| {
            rank_key(sb).cmp(&rank_key(sa)).then_with(|| {
                (ca.start_index(), ca.end_index(), ca.id)
                    .cmp(&(cb.start_index(), cb.end_index(), cb.id))
            })
        });
        Ok(keyed.into_iter().map(|(c, _)| c).collect())
    }

    /// Score a wave chain's endpoints when it has 4 or 5 waves; longer
    /// chains score their opening five.
    fn score_endpoints(&self, waves: &[Wave]) -> Result<Option<VariantScore>> {
        if waves.len() < 4 {
            return Ok(None);
        }
        let endpoints = endpoints_of(waves, 5);
        let engine = ScoringEngine { fib: self.fib, bar_interval_secs: self.bar_interval_secs };
        engine.best(&endpoints).map(Some)
    }

    /// Upgrade a waiting trailing pivot to confirmed once later pivots
    /// break past it.
    fn confirm_trailing(&self, clusters: &mut [ClusterWaves], sampled: &[Pivot]) {
        for cluster in clusters {
            let Some(wave) = cluster.waves.last_mut() else {
                continue;
            };
            if wave.p_end.status != PivotStatus::Waiting {
                continue;
            }
            let from = sampled
                .partition_point(|p| p.candle_index <= wave.p_end.pivot.candle_index);
            if before_break(&wave.p_end.pivot, &sampled[from..]).broke() {
                wave.p_end.status = PivotStatus::Confirmed;
            }
        }
    }
}

/// First `max_waves + 1` chained endpoints of a wave list.
fn endpoints_of(waves: &[Wave], max_waves: usize) -> Vec<ClusterPivot> {
    let take = waves.len().min(max_waves);
    let mut out = Vec::with_capacity(take + 1);
    out.push(waves[0].p_start);
    for w in &waves[..take] {
        out.push(w.p_end);
    }
    out
}

fn cluster_from(seq: &WaveSequence) -> ClusterWaves {
    ClusterWaves::new(seq.degree, seq.wave_type, seq.to_waves())
}

fn rank_key(score: &Option<VariantScore>) -> (bool, bool, bool, bool, u32) {
    match score {
        Some(s) => (
            true,
            s.structure_valid.unwrap_or(false),
            s.wave_valid,
            s.time_valid,
            s.points,
        ),
        None => (false, false, false, false, 0),
    }
}

fn find_mergeable(clusters: &[ClusterWaves]) -> Option<(usize, usize)> {
    for i in 0..clusters.len() {
        for j in i + 1..clusters.len() {
            if mergeable(&clusters[i], &clusters[j]) {
                return Some((i, j));
            }
        }
    }
    None
}

/// Overlapping index ranges at the same degree, sharing at least one
/// identical wave.
fn mergeable(a: &ClusterWaves, b: &ClusterWaves) -> bool {
    if a.degree != b.degree {
        return false;
    }
    if a.start_index() > b.end_index() || b.start_index() > a.end_index() {
        return false;
    }
    a.waves.iter().any(|wa| {
        b.waves
            .iter()
            .any(|wb| wa.start_index() == wb.start_index() && wa.end_index() == wb.end_index())
    })
}
