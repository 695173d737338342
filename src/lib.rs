//! # ELWAVE - Elliott Wave candidate discovery engine
//!
//! Pure, synchronous search for Elliott Wave interpretations over OHLC bar
//! series: pivot extraction, Fibonacci math, a fixed 5-variant pattern
//! catalog, branching candidate search, multi-axis scoring and cluster
//! assembly across sliding windows.
//!
//! ## Quick Start
//!
//! ```rust
//! use elwave::prelude::*;
//!
//! // Define your OHLCV data
//! struct Bar { t: i64, o: f64, h: f64, l: f64, c: f64, v: f64 }
//!
//! impl OHLCV for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//!     fn volume(&self) -> f64 { self.v }
//!     fn time(&self) -> i64 { self.t }
//! }
//!
//! // Build an engine and analyze
//! let engine = EngineBuilder::new()
//!     .log_scale(false)
//!     .definition(Definition::Standard)
//!     .build()
//!     .unwrap();
//!
//! let bars: Vec<Bar> = vec![];
//! let clusters = engine.analyze(&bars);
//! assert!(clusters.is_err()); // fewer than 2 bars is a precondition error
//! ```
//!
//! The engine is a pure function of (bars, parameters): no I/O, no global
//! state, deterministic output. "No candidate found" is `Ok(vec![])`,
//! never an error.

pub mod cluster;
pub mod degree;
pub mod fib;
pub mod rules;
pub mod score;
pub mod search;
pub mod trace;
pub mod zigzag;

pub use degree::{classify, modal_interval_secs, ClassifyMode, Degree, ALL_DEGREES};
pub use fib::{FibCalc, PriceScale};

pub mod prelude {
    pub use crate::{
        // Cluster assembly
        cluster::ClusterAssembler,
        // Degrees
        degree::{classify, ClassifyMode, Degree},
        // Fibonacci
        fib::{FibCalc, PriceScale},
        // Catalog
        rules::{RuleScore, VariantRules, CATALOG},
        // Scoring
        score::{ScoringEngine, VariantScore},
        // Search
        search::{SearchParams, WaveSearch, WaveSequence},
        // Tracing
        trace::{EventTracer, NoopTracer, WaveTracer},
        // Zigzag
        zigzag::{before_break, BreakScan},
        analyze_parallel,
        AnalyzeError,
        AnalyzeResult,
        BarColor,
        ClusterPivot,
        ClusterWaves,
        Definition,
        EngineBuilder,
        OHLCVExt,
        Pivot,
        PivotId,
        PivotKind,
        PivotStatus,
        Result,
        Wave,
        WaveEngine,
        WaveError,
        WaveName,
        WaveType,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, WaveError>;

/// Errors the engine can raise. All of these are preconditions: they abort
/// the whole call and are never retried. Branch-local failures inside the
/// search are silently pruned instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WaveError {
    #[error("Insufficient data: need {need}, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Bars not strictly time-ascending at index {index}")]
    UnorderedBars { index: usize },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },

    #[error("Degenerate reference leg: equal prices")]
    DegenerateLeg,

    #[error("Non-positive price {price} on logarithmic scale")]
    NonPositivePrice { price: f64 },

    #[error("No dominant bar interval")]
    NoDominantInterval,

    #[error("No degree range matches a span of {days} days")]
    NoDegreeMatch { days: f64 },

    #[error("Cannot decrement degree below Miniscule")]
    DegreeUnderflow,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV bar trait. `time` is unix seconds; bars passed to the engine
/// must be strictly time-ascending.
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
    fn time(&self) -> i64;
}

/// Bar body color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BarColor {
    Green,
    Red,
    Neutral,
}

/// Extension trait with computed properties for OHLCV data.
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn color(&self) -> BarColor {
        if self.close() > self.open() {
            BarColor::Green
        } else if self.close() < self.open() {
            BarColor::Red
        } else {
            BarColor::Neutral
        }
    }

    /// Validate OHLCV data consistency.
    fn validate(&self) -> Result<()> {
        if self.high() < self.low() {
            return Err(WaveError::InvalidOHLCV { index: 0, reason: "high < low" });
        }
        let fields = [self.open(), self.high(), self.low(), self.close()];
        if fields.iter().any(|v| v.is_nan()) {
            return Err(WaveError::InvalidOHLCV { index: 0, reason: "NaN in OHLCV" });
        }
        if fields.iter().any(|v| v.is_infinite()) {
            return Err(WaveError::InvalidOHLCV { index: 0, reason: "Infinite value in OHLCV" });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// LABELED ENUM SERIALIZATION
// ============================================================

/// Wire form of every enum field: a `{title, value}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Labeled {
    pub title: &'static str,
    pub value: u16,
}

// ============================================================
// PIVOTS
// ============================================================

/// Pivot kind: a local price maximum or minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PivotKind {
    High,
    Low,
}

impl PivotKind {
    #[inline]
    pub fn opposite(self) -> PivotKind {
        match self {
            PivotKind::High => PivotKind::Low,
            PivotKind::Low => PivotKind::High,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PivotKind::High => "High",
            PivotKind::Low => "Low",
        }
    }

    pub fn value(self) -> u16 {
        match self {
            PivotKind::High => 1,
            PivotKind::Low => 2,
        }
    }
}

impl serde::Serialize for PivotKind {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        Labeled { title: self.title(), value: self.value() }.serialize(s)
    }
}

/// Lifecycle of a pivot inside a cluster. `Waiting` pivots may still be
/// invalidated by later price action; `Projected` pivots are synthesized
/// from Fibonacci ratios and never correspond to a real bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotStatus {
    Confirmed,
    Waiting,
    Projected,
}

impl PivotStatus {
    pub fn title(self) -> &'static str {
        match self {
            PivotStatus::Confirmed => "Confirmed",
            PivotStatus::Waiting => "Waiting",
            PivotStatus::Projected => "Projected",
        }
    }

    pub fn value(self) -> u16 {
        match self {
            PivotStatus::Confirmed => 1,
            PivotStatus::Waiting => 2,
            PivotStatus::Projected => 3,
        }
    }
}

impl serde::Serialize for PivotStatus {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        Labeled { title: self.title(), value: self.value() }.serialize(s)
    }
}

/// Deterministic pivot identifier, derived from the candle index and
/// kind: identical inputs always produce identical ids and copies
/// preserve identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PivotId(u64);

impl PivotId {
    #[inline]
    pub fn new(candle_index: usize, kind: PivotKind) -> Self {
        let bit = match kind {
            PivotKind::High => 1,
            PivotKind::Low => 0,
        };
        Self((candle_index as u64) << 1 | bit)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl serde::Serialize for PivotId {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

/// An immutable point extremum in the bar series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    pub id: PivotId,
    pub candle_index: usize,
    pub kind: PivotKind,
    pub price: f64,
    /// Unix seconds.
    pub time: i64,
}

impl Pivot {
    /// Is this pivot a stronger extreme than `other` of the same kind?
    /// Ties keep `other` (the earlier pivot).
    #[inline]
    pub fn is_more_extreme_than(&self, other: &Pivot) -> bool {
        match self.kind {
            PivotKind::High => self.price > other.price,
            PivotKind::Low => self.price < other.price,
        }
    }
}

/// A pivot playing a role in a cluster, with its lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterPivot {
    pub pivot: Pivot,
    pub status: PivotStatus,
}

impl ClusterPivot {
    #[inline]
    pub fn new(pivot: Pivot, status: PivotStatus) -> Self {
        Self { pivot, status }
    }
}

// ============================================================
// WAVES
// ============================================================

/// Wave labels: the motive count 1..5 and the corrective letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveName {
    N1,
    N2,
    N3,
    N4,
    N5,
    A,
    B,
    C,
    D,
    E,
    X,
    Y,
    Z,
}

impl WaveName {
    pub fn title(self) -> &'static str {
        match self {
            WaveName::N1 => "1",
            WaveName::N2 => "2",
            WaveName::N3 => "3",
            WaveName::N4 => "4",
            WaveName::N5 => "5",
            WaveName::A => "A",
            WaveName::B => "B",
            WaveName::C => "C",
            WaveName::D => "D",
            WaveName::E => "E",
            WaveName::X => "X",
            WaveName::Y => "Y",
            WaveName::Z => "Z",
        }
    }

    pub fn value(self) -> u16 {
        match self {
            WaveName::N1 => 1,
            WaveName::N2 => 2,
            WaveName::N3 => 3,
            WaveName::N4 => 4,
            WaveName::N5 => 5,
            WaveName::A => 6,
            WaveName::B => 7,
            WaveName::C => 8,
            WaveName::D => 9,
            WaveName::E => 10,
            WaveName::X => 11,
            WaveName::Y => 12,
            WaveName::Z => 13,
        }
    }
}

impl serde::Serialize for WaveName {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        Labeled { title: self.title(), value: self.value() }.serialize(s)
    }
}

/// The five catalog variants plus the unknown bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveType {
    ContractingDiagonal,
    ExpandingDiagonal,
    ExtendedWave1,
    ExtendedWave3,
    ExtendedWave5,
    Unknown,
}

impl WaveType {
    pub fn title(self) -> &'static str {
        match self {
            WaveType::ContractingDiagonal => "Contracting Diagonal",
            WaveType::ExpandingDiagonal => "Expanding Diagonal",
            WaveType::ExtendedWave1 => "Extended Wave 1",
            WaveType::ExtendedWave3 => "Extended Wave 3",
            WaveType::ExtendedWave5 => "Extended Wave 5",
            WaveType::Unknown => "Unknown",
        }
    }

    pub fn value(self) -> u16 {
        match self {
            WaveType::ContractingDiagonal => 1,
            WaveType::ExpandingDiagonal => 2,
            WaveType::ExtendedWave1 => 3,
            WaveType::ExtendedWave3 => 4,
            WaveType::ExtendedWave5 => 5,
            WaveType::Unknown => 0,
        }
    }
}

impl serde::Serialize for WaveType {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        Labeled { title: self.title(), value: self.value() }.serialize(s)
    }
}

/// A directed price move at one fractal scale. Waves chain: the start
/// pivot of wave N+1 equals the end pivot of wave N. `children` holds a
/// lower-degree decomposition whose combined span reconstructs this
/// wave's span; the tree owns its children and holds no back-references.
#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    pub id: u64,
    pub name: WaveName,
    pub degree: Degree,
    pub p_start: ClusterPivot,
    pub p_end: ClusterPivot,
    pub children: Vec<Wave>,
}

impl Wave {
    pub fn new(name: WaveName, degree: Degree, p_start: ClusterPivot, p_end: ClusterPivot) -> Self {
        let id = (p_start.pivot.id.raw() << 32) | (p_end.pivot.id.raw() & 0xFFFF_FFFF);
        Self { id, name, degree, p_start, p_end, children: Vec::new() }
    }

    #[inline]
    pub fn start_index(&self) -> usize {
        self.p_start.pivot.candle_index
    }

    #[inline]
    pub fn end_index(&self) -> usize {
        self.p_end.pivot.candle_index
    }

    /// Absolute price span of the move.
    #[inline]
    pub fn price_range(&self) -> f64 {
        (self.p_end.pivot.price - self.p_start.pivot.price).abs()
    }

    /// Elapsed seconds.
    #[inline]
    pub fn duration_secs(&self) -> i64 {
        self.p_end.pivot.time - self.p_start.pivot.time
    }

    #[inline]
    pub fn is_projected(&self) -> bool {
        self.p_start.status == PivotStatus::Projected || self.p_end.status == PivotStatus::Projected
    }
}

/// Serialized pivot shape; the owning wave's degree is folded in.
struct PivotRepr<'a> {
    pivot: &'a ClusterPivot,
    degree: Degree,
}

impl serde::Serialize for PivotRepr<'_> {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut st = s.serialize_struct("Pivot", 6)?;
        st.serialize_field("id", &self.pivot.pivot.id)?;
        st.serialize_field("type", &self.pivot.pivot.kind)?;
        st.serialize_field("price", &self.pivot.pivot.price)?;
        st.serialize_field("degree", &self.degree)?;
        st.serialize_field("time", &self.pivot.pivot.time)?;
        st.serialize_field("status", &self.pivot.status)?;
        st.end()
    }
}

impl serde::Serialize for Wave {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut st = s.serialize_struct("Wave", 6)?;
        st.serialize_field("id", &self.id)?;
        st.serialize_field("wave", &self.name)?;
        st.serialize_field("degree", &self.degree)?;
        st.serialize_field("pStart", &PivotRepr { pivot: &self.p_start, degree: self.degree })?;
        st.serialize_field("pEnd", &PivotRepr { pivot: &self.p_end, degree: self.degree })?;
        st.serialize_field("children", &self.children)?;
        st.end()
    }
}

/// One candidate interpretation: chained waves sharing a pattern variant
/// and degree.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterWaves {
    pub id: u64,
    pub degree: Degree,
    pub wave_type: WaveType,
    pub waves: Vec<Wave>,
}

impl ClusterWaves {
    pub fn new(degree: Degree, wave_type: WaveType, waves: Vec<Wave>) -> Self {
        // FNV-style fold keeps ids deterministic across runs.
        let mut id = 0xcbf2_9ce4_8422_2325u64 ^ degree.value() as u64;
        for w in &waves {
            id = id.wrapping_mul(0x0000_0100_0000_01b3) ^ w.id;
        }
        Self { id, degree, wave_type, waves }
    }

    pub fn start_index(&self) -> usize {
        self.waves.first().map(|w| w.start_index()).unwrap_or(0)
    }

    pub fn end_index(&self) -> usize {
        self.waves.last().map(|w| w.end_index()).unwrap_or(0)
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Search density: how many material waves the sampler must preserve
/// before the search runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Definition {
    Shallow,
    #[default]
    Standard,
    Deep,
}

impl Definition {
    /// Minimum wave count the retracement sampler aims for.
    #[inline]
    pub fn min_waves(self) -> usize {
        match self {
            Definition::Shallow => 6,
            Definition::Standard => 10,
            Definition::Deep => 16,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    /// Fixed degree, or `None` for auto-classification from the series.
    pub degree: Option<Degree>,
    pub log_scale: bool,
    pub definition: Definition,
    /// Nested sub-wave recursion depth bound.
    pub sub_counts: usize,
    pub validate_data: bool,
}

/// The wave analysis engine: a pure function of (bars, parameters).
pub struct WaveEngine {
    config: EngineConfig,
    params: search::SearchParams,
    tracer: Box<dyn trace::WaveTracer>,
}

impl WaveEngine {
    /// Analyze a bar series into ranked candidate clusters.
    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<ClusterWaves>> {
        if bars.len() < 2 {
            return Err(WaveError::InsufficientData { need: 2, got: bars.len() });
        }
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }

        let interval = degree::modal_interval_secs(bars)?;
        let deg = match self.config.degree {
            Some(d) => d,
            None => degree::classify(bars, ClassifyMode::Full)?,
        };
        let scale = if self.config.log_scale {
            PriceScale::Logarithmic
        } else {
            PriceScale::Linear
        };
        let fib = FibCalc::new(scale);

        let pivots = zigzag::extract(bars)?;
        let sampled = zigzag::sample(&pivots, self.config.definition.min_waves(), &fib);

        let assembler = cluster::ClusterAssembler {
            fib: &fib,
            params: &self.params,
            bar_interval_secs: interval,
            tracer: self.tracer.as_ref(),
        };
        assembler.assemble(&sampled, &pivots, deg, self.config.sub_counts)
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                WaveError::InvalidOHLCV { reason, .. } => WaveError::InvalidOHLCV { index: i, reason },
                other => other,
            })?;
            if i > 0 && bars[i].time() <= bars[i - 1].time() {
                return Err(WaveError::UnorderedBars { index: i });
            }
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`WaveEngine`] instances.
pub struct EngineBuilder {
    config: EngineConfig,
    params: search::SearchParams,
    tracer: Box<dyn trace::WaveTracer>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            params: search::SearchParams::default(),
            tracer: Box::new(trace::NoopTracer),
        }
    }

    /// Fix the analysis degree instead of auto-classifying.
    pub fn degree(mut self, degree: Degree) -> Self {
        self.config.degree = Some(degree);
        self
    }

    /// Use a logarithmic price scale for all ratio math.
    pub fn log_scale(mut self, enable: bool) -> Self {
        self.config.log_scale = enable;
        self
    }

    /// Set the sampler's search density.
    pub fn definition(mut self, definition: Definition) -> Self {
        self.config.definition = definition;
        self
    }

    /// Bound nested sub-wave recursion depth.
    pub fn sub_counts(mut self, depth: usize) -> Self {
        self.config.sub_counts = depth;
        self
    }

    /// Enable/disable bar validation (OHLC sanity, ascending timestamps).
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Override the tuned search heuristics.
    pub fn search(mut self, params: search::SearchParams) -> Self {
        self.params = params;
        self
    }

    /// Inject a search tracer.
    pub fn tracer<T: trace::WaveTracer + 'static>(mut self, tracer: T) -> Self {
        self.tracer = Box::new(tracer);
        self
    }

    /// Build the engine, validating the configuration.
    pub fn build(self) -> Result<WaveEngine> {
        if self.params.window_len < 4 {
            return Err(WaveError::InvalidConfig(format!(
                "window_len must be at least 4, got {}",
                self.params.window_len
            )));
        }
        if !(0.0..=1.0).contains(&self.params.wave2_prune_factor) {
            return Err(WaveError::InvalidConfig(format!(
                "wave2_prune_factor must be in [0, 1], got {}",
                self.params.wave2_prune_factor
            )));
        }
        if self.config.sub_counts > 8 {
            return Err(WaveError::InvalidConfig(format!(
                "sub_counts must be at most 8, got {}",
                self.config.sub_counts
            )));
        }
        Ok(WaveEngine { config: self.config, params: self.params, tracer: self.tracer })
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Result of analyzing a single instrument.
#[derive(Debug)]
pub struct AnalyzeResult {
    pub symbol: String,
    pub clusters: Vec<ClusterWaves>,
}

/// Error from analyzing a single instrument.
#[derive(Debug)]
pub struct AnalyzeError {
    pub symbol: String,
    pub error: WaveError,
}

/// Analyze multiple instruments in parallel. Per-symbol failures do not
/// abort the batch.
pub fn analyze_parallel<'a, T, I>(
    engine: &WaveEngine,
    instruments: I,
) -> (Vec<AnalyzeResult>, Vec<AnalyzeError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .analyze(bars)
                .map(|clusters| AnalyzeResult { symbol: symbol.to_string(), clusters })
                .map_err(|error| AnalyzeError { symbol: symbol.to_string(), error })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }
    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Test OHLCV bar
    #[derive(Debug, Clone, Copy)]
    struct Bar {
        t: i64,
        o: f64,
        h: f64,
        l: f64,
        c: f64,
    }

    impl Bar {
        fn new(t: i64, o: f64, h: f64, l: f64, c: f64) -> Self {
            Self { t, o, h, l, c }
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
            1000.0
        }

        fn time(&self) -> i64 {
            self.t
        }
    }

    /// Walk a price path into bars, one bar per step, hourly.
    fn bars_from_path(path: &[f64]) -> Vec<Bar> {
        path.windows(2)
            .enumerate()
            .map(|(i, w)| {
                let (a, b) = (w[0], w[1]);
                Bar::new(i as i64 * 3_600, a, a.max(b) + 0.05, a.min(b) - 0.05, b)
            })
            .collect()
    }

    /// An impulse-shaped path: up, pullback, strong up, pullback, up.
    fn impulse_path() -> Vec<f64> {
        fn push_leg(from: f64, to: f64, steps: usize, path: &mut Vec<f64>) {
            for s in 0..steps {
                path.push(from + (to - from) * s as f64 / steps as f64);
            }
        }
        let mut path = Vec::new();
        push_leg(100.0, 110.0, 10, &mut path);
        push_leg(110.0, 104.5, 6, &mut path);
        push_leg(104.5, 120.7, 14, &mut path);
        push_leg(120.7, 114.5, 6, &mut path);
        push_leg(114.5, 122.5, 10, &mut path);
        push_leg(122.5, 117.0, 6, &mut path);
        path.push(117.0);
        path
    }

    #[test]
    fn test_builder_defaults() {
        let engine = EngineBuilder::new().build().unwrap();
        assert_eq!(engine.config().degree, None);
        assert!(!engine.config().log_scale);
        assert_eq!(engine.config().definition, Definition::Standard);
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let params = search::SearchParams { window_len: 2, ..Default::default() };
        assert!(matches!(
            EngineBuilder::new().search(params).build(),
            Err(WaveError::InvalidConfig(_))
        ));

        let params = search::SearchParams { wave2_prune_factor: 1.5, ..Default::default() };
        assert!(matches!(
            EngineBuilder::new().search(params).build(),
            Err(WaveError::InvalidConfig(_))
        ));

        assert!(matches!(
            EngineBuilder::new().sub_counts(20).build(),
            Err(WaveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_analyze_too_few_bars() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars = vec![Bar::new(0, 100.0, 101.0, 99.0, 100.5)];
        assert!(matches!(
            engine.analyze(&bars),
            Err(WaveError::InsufficientData { need: 2, got: 1 })
        ));
    }

    #[test]
    fn test_analyze_impulse_finds_clusters() {
        let engine = EngineBuilder::new()
            .degree(Degree::Minor)
            .definition(Definition::Shallow)
            .build()
            .unwrap();
        let bars = bars_from_path(&impulse_path());
        let clusters = engine.analyze(&bars).unwrap();
        assert!(!clusters.is_empty());
    }

    #[test]
    fn test_analyze_deterministic() {
        let engine = EngineBuilder::new()
            .degree(Degree::Minor)
            .definition(Definition::Shallow)
            .build()
            .unwrap();
        let bars = bars_from_path(&impulse_path());
        let a = engine.analyze(&bars).unwrap();
        let b = engine.analyze(&bars).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_rejects_unordered() {
        let engine = EngineBuilder::new().validate_data(true).build().unwrap();
        let bars = vec![
            Bar::new(3_600, 100.0, 101.0, 99.0, 100.5),
            Bar::new(0, 100.5, 101.5, 99.5, 101.0),
        ];
        assert!(matches!(
            engine.analyze(&bars),
            Err(WaveError::UnorderedBars { index: 1 })
        ));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let engine = EngineBuilder::new().validate_data(true).build().unwrap();
        let bars = vec![
            Bar::new(0, 100.0, 101.0, 99.0, 100.5),
            Bar::new(3_600, f64::NAN, 101.5, 99.5, 101.0),
        ];
        assert!(matches!(
            engine.analyze(&bars),
            Err(WaveError::InvalidOHLCV { index: 1, .. })
        ));
    }

    #[test]
    fn test_parallel_analysis() {
        let engine = EngineBuilder::new()
            .degree(Degree::Minor)
            .definition(Definition::Shallow)
            .build()
            .unwrap();
        let bars1 = bars_from_path(&impulse_path());
        let bars2 = vec![Bar::new(0, 1.0, 1.1, 0.9, 1.0)]; // too short: errors

        let instruments: Vec<(&str, &[Bar])> = vec![("AAA", &bars1), ("BBB", &bars2)];
        let (results, errors) = analyze_parallel(&engine, instruments);
        assert_eq!(results.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "BBB");
    }

    #[test]
    fn test_pivot_id_deterministic() {
        let a = PivotId::new(42, PivotKind::High);
        let b = PivotId::new(42, PivotKind::High);
        let c = PivotId::new(42, PivotKind::Low);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_wave_chaining_invariant() {
        let engine = EngineBuilder::new()
            .degree(Degree::Minor)
            .definition(Definition::Shallow)
            .build()
            .unwrap();
        let bars = bars_from_path(&impulse_path());
        for cluster in engine.analyze(&bars).unwrap() {
            for pair in cluster.waves.windows(2) {
                assert!(pair[0].end_index() <= pair[1].start_index());
            }
        }
    }

    #[test]
    fn test_labeled_serialization() {
        let json = serde_json::to_value(Degree::Minuette).unwrap();
        assert_eq!(json["title"], "Minuette");
        assert_eq!(json["value"], 5);

        let json = serde_json::to_value(WaveType::ExtendedWave3).unwrap();
        assert_eq!(json["title"], "Extended Wave 3");
        assert_eq!(json["value"], 4);

        let json = serde_json::to_value(WaveName::A).unwrap();
        assert_eq!(json["title"], "A");
        assert_eq!(json["value"], 6);
    }
}
