//! Injectable search diagnostics.
//!
//! The branching search can emit a lot of diagnostic detail; rather than
//! logging through global state, the engine takes a [`WaveTracer`] at
//! construction. The default is a no-op. [`EventTracer`] forwards to the
//! `tracing` facade for callers that run a subscriber; the library itself
//! never installs one.

use crate::{Degree, Pivot, WaveName, WaveType};

/// Structured hook into the branching search. All methods default to
/// no-ops so implementors pick only the events they care about.
pub trait WaveTracer: Send + Sync {
    /// A branch committed a concrete pivot for the given wave.
    fn wave_pinned(&self, _variant: WaveType, _wave: WaveName, _pivot: &Pivot) {}

    /// A branch was discarded; `reason` is a short static label.
    fn branch_pruned(&self, _variant: WaveType, _wave: WaveName, _reason: &'static str) {}

    /// A complete or projected 5-wave sequence left the search.
    fn sequence_found(&self, _variant: WaveType, _degree: Degree, _start_index: usize, _end_index: usize) {}

    /// A sliding window finished scanning.
    fn window_scanned(&self, _window_start: usize, _window_end: usize, _candidates: usize) {}
}

/// The default tracer: does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl WaveTracer for NoopTracer {}

/// Tracer that forwards to the `tracing` facade at debug/trace level.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventTracer;

impl WaveTracer for EventTracer {
    fn wave_pinned(&self, variant: WaveType, wave: WaveName, pivot: &Pivot) {
        tracing::trace!(
            variant = variant.title(),
            wave = wave.title(),
            candle_index = pivot.candle_index,
            price = pivot.price,
            "wave pinned"
        );
    }

    fn branch_pruned(&self, variant: WaveType, wave: WaveName, reason: &'static str) {
        tracing::trace!(
            variant = variant.title(),
            wave = wave.title(),
            reason,
            "branch pruned"
        );
    }

    fn sequence_found(&self, variant: WaveType, degree: Degree, start_index: usize, end_index: usize) {
        tracing::debug!(
            variant = variant.title(),
            degree = degree.title(),
            start_index,
            end_index,
            "sequence found"
        );
    }

    fn window_scanned(&self, window_start: usize, window_end: usize, candidates: usize) {
        tracing::debug!(window_start, window_end, candidates, "window scanned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PivotKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTracer {
        pruned: AtomicUsize,
    }

    impl WaveTracer for CountingTracer {
        fn branch_pruned(&self, _v: WaveType, _w: WaveName, _r: &'static str) {
            self.pruned.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_custom_tracer_receives_events() {
        let tracer = CountingTracer::default();
        let hook: &dyn WaveTracer = &tracer;
        hook.branch_pruned(WaveType::ExtendedWave3, WaveName::N2, "out of range");
        hook.branch_pruned(WaveType::ExtendedWave3, WaveName::N4, "overlap");
        assert_eq!(tracer.pruned.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_noop_tracer_is_silent() {
        let tracer = NoopTracer;
        let pivot = Pivot {
            id: crate::PivotId::new(0, PivotKind::Low),
            candle_index: 0,
            kind: PivotKind::Low,
            price: 1.0,
            time: 0,
        };
        tracer.wave_pinned(WaveType::Unknown, WaveName::N1, &pivot);
    }
}
