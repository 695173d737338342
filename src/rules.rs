//! The pattern catalog: five fixed motive-wave variants.
//!
//! Each variant is a static record of acceptable ratio and time-proportion
//! ranges plus two structural flags. The set is closed; there is no plugin
//! surface. Band values follow the classical Elliott guidelines
//! (0.382/0.5/0.618/0.786 retracements, 1.236/1.618/2.618 projections) and
//! are tuning data: change them only against historical validation.

use crate::WaveType;

// ============================================================
// ORDINAL SCORES
// ============================================================

/// Ordinal quality of a single measured ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleScore {
    Invalid,
    WorstCase,
    Work,
    Good,
    Perfect,
}

impl RuleScore {
    #[inline]
    pub fn points(self) -> u32 {
        match self {
            RuleScore::Invalid => 0,
            RuleScore::WorstCase => 1,
            RuleScore::Work => 2,
            RuleScore::Good => 3,
            RuleScore::Perfect => 4,
        }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != RuleScore::Invalid
    }
}

/// Half-open scoring band: `lo <= pct < hi`.
#[derive(Debug, Clone, Copy)]
pub struct Band {
    pub lo: f64,
    pub hi: f64,
    pub score: RuleScore,
}

const fn band(lo: f64, hi: f64, score: RuleScore) -> Band {
    Band { lo, hi, score }
}

/// Acceptable range for one ratio axis: the `[min, ideal, max]` summary
/// plus the scoring bands. Bands are checked in declaration order; the
/// first match wins and no match scores `Invalid`.
#[derive(Debug, Clone, Copy)]
pub struct RatioGate {
    pub min: f64,
    pub ideal: f64,
    pub max: f64,
    pub bands: &'static [Band],
}

impl RatioGate {
    pub fn score(&self, pct: f64) -> RuleScore {
        for b in self.bands {
            if pct >= b.lo && pct < b.hi {
                return b.score;
            }
        }
        RuleScore::Invalid
    }

    #[inline]
    pub fn admits(&self, pct: f64) -> bool {
        self.score(pct).is_valid()
    }
}

// ============================================================
// VARIANT RULES
// ============================================================

/// The full rule record for one motive-wave variant.
#[derive(Debug, Clone, Copy)]
pub struct VariantRules {
    pub wave_type: WaveType,
    /// Wave-2 retracement of wave 1, percent.
    pub wave2: RatioGate,
    /// Wave-3 projection of wave 1 from the wave-2 end, percent.
    pub wave3: RatioGate,
    /// Wave-4 retracement of wave 3, percent.
    pub wave4: RatioGate,
    /// Wave-5 projection from the wave-4 end, percent. The base leg is
    /// wave 1, or wave-1-start to wave-3-end when
    /// `wave5_from_wave3_base` is set.
    pub wave5: RatioGate,
    pub wave2_time: RatioGate,
    pub wave3_time: RatioGate,
    pub wave4_time: RatioGate,
    pub wave5_time: RatioGate,
    /// Wave 4 may close inside wave 1's territory. True only for the
    /// diagonals, the classical exception to the no-overlap rule.
    pub allow_wave4_overlap: bool,
    /// Wave-5 projection base spans wave-1-start to wave-3-end instead of
    /// wave 1 alone. Used by the extended-3/5 variants, where the
    /// extended leg shifts the projection base.
    pub wave5_from_wave3_base: bool,
}

impl VariantRules {
    /// Structural admissibility of a wave-3 candidate, given the price
    /// ranges of waves 1 and 3.
    pub fn wave3_structure_ok(&self, w1: f64, w3: f64) -> bool {
        match self.wave_type {
            WaveType::ContractingDiagonal => w3 < w1,
            WaveType::ExpandingDiagonal => w3 > w1,
            WaveType::ExtendedWave1 => w3 < w1,
            WaveType::ExtendedWave3 => w3 > w1,
            WaveType::ExtendedWave5 => true,
            WaveType::Unknown => false,
        }
    }

    /// Structural admissibility of a completed sequence's wave-5 range.
    pub fn wave5_structure_ok(&self, w1: f64, w3: f64, w5: f64) -> bool {
        match self.wave_type {
            WaveType::ContractingDiagonal => w5 < w3,
            WaveType::ExpandingDiagonal => w5 > w3,
            WaveType::ExtendedWave1 => w5 < w1,
            WaveType::ExtendedWave3 => w5 < w3,
            WaveType::ExtendedWave5 => w5 > w3 && w5 > w1,
            WaveType::Unknown => false,
        }
    }
}

// Time-proportion bands are deliberately broad: durations discriminate far
// less than price ratios, and all five variants tolerate wave durations
// between roughly a quarter of and 4x the reference wave.
const TIME_COMMON: &[Band] = &[
    band(38.2, 161.8, RuleScore::Perfect),
    band(23.6, 38.2, RuleScore::Good),
    band(161.8, 261.8, RuleScore::Work),
    band(10.0, 23.6, RuleScore::WorstCase),
    band(261.8, 423.6, RuleScore::WorstCase),
];

const TIME_GATE: RatioGate = RatioGate { min: 10.0, ideal: 100.0, max: 423.6, bands: TIME_COMMON };

/// Contracting diagonal: deep, overlapping retracements with every leg
/// shorter than the one before it.
pub static CONTRACTING_DIAGONAL: VariantRules = VariantRules {
    wave_type: WaveType::ContractingDiagonal,
    wave2: RatioGate {
        min: 61.8,
        ideal: 78.6,
        max: 99.9,
        bands: &[
            band(66.0, 88.2, RuleScore::Perfect),
            band(61.8, 66.0, RuleScore::Good),
            band(88.2, 95.0, RuleScore::Work),
            band(95.0, 99.9, RuleScore::WorstCase),
        ],
    },
    wave3: RatioGate {
        min: 61.8,
        ideal: 78.6,
        max: 99.9,
        bands: &[
            band(70.0, 88.2, RuleScore::Perfect),
            band(61.8, 70.0, RuleScore::Good),
            band(88.2, 99.9, RuleScore::Work),
        ],
    },
    wave4: RatioGate {
        min: 50.0,
        ideal: 66.0,
        max: 99.9,
        bands: &[
            band(61.8, 78.6, RuleScore::Perfect),
            band(50.0, 61.8, RuleScore::Good),
            band(78.6, 90.0, RuleScore::Work),
            band(90.0, 99.9, RuleScore::WorstCase),
        ],
    },
    wave5: RatioGate {
        min: 38.2,
        ideal: 61.8,
        max: 78.6,
        bands: &[
            band(50.0, 70.0, RuleScore::Perfect),
            band(38.2, 50.0, RuleScore::Good),
            band(70.0, 78.6, RuleScore::Work),
        ],
    },
    wave2_time: TIME_GATE,
    wave3_time: TIME_GATE,
    wave4_time: TIME_GATE,
    wave5_time: TIME_GATE,
    allow_wave4_overlap: true,
    wave5_from_wave3_base: false,
};

/// Expanding diagonal: each leg longer than the one before, still
/// overlap-tolerant.
pub static EXPANDING_DIAGONAL: VariantRules = VariantRules {
    wave_type: WaveType::ExpandingDiagonal,
    wave2: RatioGate {
        min: 38.2,
        ideal: 61.8,
        max: 99.9,
        bands: &[
            band(50.0, 78.6, RuleScore::Perfect),
            band(38.2, 50.0, RuleScore::Good),
            band(78.6, 90.0, RuleScore::Work),
            band(90.0, 99.9, RuleScore::WorstCase),
        ],
    },
    wave3: RatioGate {
        min: 100.0,
        ideal: 123.6,
        max: 261.8,
        bands: &[
            band(105.0, 138.2, RuleScore::Perfect),
            band(100.0, 105.0, RuleScore::Good),
            band(138.2, 200.0, RuleScore::Work),
            band(200.0, 261.8, RuleScore::WorstCase),
        ],
    },
    wave4: RatioGate {
        min: 38.2,
        ideal: 61.8,
        max: 99.9,
        bands: &[
            band(50.0, 78.6, RuleScore::Perfect),
            band(38.2, 50.0, RuleScore::Good),
            band(78.6, 99.9, RuleScore::Work),
        ],
    },
    wave5: RatioGate {
        min: 100.0,
        ideal: 123.6,
        max: 200.0,
        bands: &[
            band(105.0, 138.2, RuleScore::Perfect),
            band(100.0, 105.0, RuleScore::Good),
            band(138.2, 200.0, RuleScore::Work),
        ],
    },
    wave2_time: TIME_GATE,
    wave3_time: TIME_GATE,
    wave4_time: TIME_GATE,
    wave5_time: TIME_GATE,
    allow_wave4_overlap: true,
    wave5_from_wave3_base: false,
};

/// Extended wave 1: the opening leg dominates; later waves retrace and
/// project shallowly against it.
pub static EXTENDED_WAVE1: VariantRules = VariantRules {
    wave_type: WaveType::ExtendedWave1,
    wave2: RatioGate {
        min: 38.2,
        ideal: 61.8,
        max: 78.6,
        bands: &[
            band(50.0, 66.0, RuleScore::Perfect),
            band(38.2, 50.0, RuleScore::Good),
            band(66.0, 78.6, RuleScore::Work),
        ],
    },
    wave3: RatioGate {
        min: 38.2,
        ideal: 61.8,
        max: 99.9,
        bands: &[
            band(50.0, 78.6, RuleScore::Perfect),
            band(38.2, 50.0, RuleScore::Good),
            band(78.6, 99.9, RuleScore::Work),
        ],
    },
    wave4: RatioGate {
        min: 23.6,
        ideal: 38.2,
        max: 61.8,
        bands: &[
            band(30.0, 50.0, RuleScore::Perfect),
            band(23.6, 30.0, RuleScore::Good),
            band(50.0, 61.8, RuleScore::Work),
        ],
    },
    wave5: RatioGate {
        min: 23.6,
        ideal: 38.2,
        max: 61.8,
        bands: &[
            band(30.0, 50.0, RuleScore::Perfect),
            band(23.6, 30.0, RuleScore::Good),
            band(50.0, 61.8, RuleScore::Work),
        ],
    },
    wave2_time: TIME_GATE,
    wave3_time: TIME_GATE,
    wave4_time: TIME_GATE,
    wave5_time: TIME_GATE,
    allow_wave4_overlap: false,
    wave5_from_wave3_base: false,
};

/// Extended wave 3: the classic impulse with a dominant third leg.
pub static EXTENDED_WAVE3: VariantRules = VariantRules {
    wave_type: WaveType::ExtendedWave3,
    wave2: RatioGate {
        min: 38.2,
        ideal: 55.0,
        max: 78.6,
        bands: &[
            band(50.0, 66.0, RuleScore::Perfect),
            band(38.2, 50.0, RuleScore::Good),
            band(66.0, 78.6, RuleScore::Work),
        ],
    },
    wave3: RatioGate {
        min: 138.2,
        ideal: 161.8,
        max: 423.6,
        bands: &[
            band(150.0, 200.0, RuleScore::Perfect),
            band(138.2, 150.0, RuleScore::Good),
            band(200.0, 280.0, RuleScore::Work),
            band(280.0, 423.6, RuleScore::WorstCase),
        ],
    },
    wave4: RatioGate {
        min: 23.6,
        ideal: 38.2,
        max: 50.0,
        bands: &[
            band(30.0, 44.0, RuleScore::Perfect),
            band(23.6, 30.0, RuleScore::Good),
            band(44.0, 50.0, RuleScore::Work),
        ],
    },
    wave5: RatioGate {
        min: 23.6,
        ideal: 38.2,
        max: 61.8,
        bands: &[
            band(30.0, 50.0, RuleScore::Perfect),
            band(23.6, 30.0, RuleScore::Good),
            band(50.0, 61.8, RuleScore::Work),
        ],
    },
    wave2_time: TIME_GATE,
    wave3_time: TIME_GATE,
    wave4_time: TIME_GATE,
    wave5_time: TIME_GATE,
    allow_wave4_overlap: false,
    wave5_from_wave3_base: true,
};

/// Extended wave 5: the closing leg dominates, projecting past the whole
/// wave-1-to-3 span.
pub static EXTENDED_WAVE5: VariantRules = VariantRules {
    wave_type: WaveType::ExtendedWave5,
    wave2: RatioGate {
        min: 38.2,
        ideal: 50.0,
        max: 78.6,
        bands: &[
            band(44.0, 66.0, RuleScore::Perfect),
            band(38.2, 44.0, RuleScore::Good),
            band(66.0, 78.6, RuleScore::Work),
        ],
    },
    wave3: RatioGate {
        min: 100.0,
        ideal: 123.6,
        max: 161.8,
        bands: &[
            band(105.0, 138.2, RuleScore::Perfect),
            band(100.0, 105.0, RuleScore::Good),
            band(138.2, 161.8, RuleScore::Work),
        ],
    },
    wave4: RatioGate {
        min: 23.6,
        ideal: 38.2,
        max: 61.8,
        bands: &[
            band(30.0, 50.0, RuleScore::Perfect),
            band(23.6, 30.0, RuleScore::Good),
            band(50.0, 61.8, RuleScore::Work),
        ],
    },
    wave5: RatioGate {
        min: 61.8,
        ideal: 100.0,
        max: 161.8,
        bands: &[
            band(78.6, 123.6, RuleScore::Perfect),
            band(61.8, 78.6, RuleScore::Good),
            band(123.6, 161.8, RuleScore::Work),
        ],
    },
    wave2_time: TIME_GATE,
    wave3_time: TIME_GATE,
    wave4_time: TIME_GATE,
    wave5_time: TIME_GATE,
    allow_wave4_overlap: false,
    wave5_from_wave3_base: true,
};

/// The catalog in declaration order. This order is the final tie-break
/// everywhere results are ranked.
pub static CATALOG: [&VariantRules; 5] = [
    &CONTRACTING_DIAGONAL,
    &EXPANDING_DIAGONAL,
    &EXTENDED_WAVE1,
    &EXTENDED_WAVE3,
    &EXTENDED_WAVE5,
];

/// Rules for a concrete variant; `Unknown` has none.
pub fn rules_for(wave_type: WaveType) -> Option<&'static VariantRules> {
    CATALOG.iter().copied().find(|r| r.wave_type == wave_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_order() {
        assert!(RuleScore::Perfect > RuleScore::Good);
        assert!(RuleScore::Good > RuleScore::Work);
        assert!(RuleScore::Work > RuleScore::WorstCase);
        assert!(RuleScore::WorstCase > RuleScore::Invalid);
        assert_eq!(RuleScore::Perfect.points(), 4);
        assert_eq!(RuleScore::Invalid.points(), 0);
    }

    #[test]
    fn test_first_matching_band_wins() {
        static BANDS: [Band; 2] = [
            band(40.0, 60.0, RuleScore::Perfect),
            band(0.0, 100.0, RuleScore::Work),
        ];
        let gate = RatioGate {
            min: 0.0,
            ideal: 50.0,
            max: 100.0,
            bands: &BANDS,
        };
        assert_eq!(gate.score(50.0), RuleScore::Perfect);
        assert_eq!(gate.score(30.0), RuleScore::Work);
        assert_eq!(gate.score(120.0), RuleScore::Invalid);
    }

    #[test]
    fn test_bands_are_half_open() {
        let gate = EXTENDED_WAVE3.wave2;
        assert_eq!(gate.score(50.0), RuleScore::Perfect);
        assert_eq!(gate.score(66.0), RuleScore::Work);
        assert_eq!(gate.score(78.6), RuleScore::Invalid);
        assert_eq!(gate.score(38.2), RuleScore::Good);
    }

    #[test]
    fn test_out_of_range_is_invalid() {
        assert_eq!(EXTENDED_WAVE3.wave2.score(10.0), RuleScore::Invalid);
        assert_eq!(EXTENDED_WAVE3.wave2.score(110.0), RuleScore::Invalid);
        assert_eq!(EXTENDED_WAVE3.wave3.score(90.0), RuleScore::Invalid);
    }

    #[test]
    fn test_overlap_flag_only_on_diagonals() {
        for rules in CATALOG {
            let diagonal = matches!(
                rules.wave_type,
                WaveType::ContractingDiagonal | WaveType::ExpandingDiagonal
            );
            assert_eq!(rules.allow_wave4_overlap, diagonal);
        }
    }

    #[test]
    fn test_wave5_base_flag_only_on_extended_3_and_5() {
        for rules in CATALOG {
            let extended_late = matches!(
                rules.wave_type,
                WaveType::ExtendedWave3 | WaveType::ExtendedWave5
            );
            assert_eq!(rules.wave5_from_wave3_base, extended_late);
        }
    }

    #[test]
    fn test_structure_predicates() {
        assert!(CONTRACTING_DIAGONAL.wave3_structure_ok(10.0, 8.0));
        assert!(!CONTRACTING_DIAGONAL.wave3_structure_ok(10.0, 12.0));
        assert!(CONTRACTING_DIAGONAL.wave5_structure_ok(10.0, 8.0, 6.0));
        assert!(!CONTRACTING_DIAGONAL.wave5_structure_ok(10.0, 8.0, 9.0));

        assert!(EXPANDING_DIAGONAL.wave3_structure_ok(10.0, 12.0));
        assert!(EXPANDING_DIAGONAL.wave5_structure_ok(10.0, 12.0, 14.0));

        assert!(EXTENDED_WAVE1.wave5_structure_ok(20.0, 12.0, 8.0));
        assert!(!EXTENDED_WAVE1.wave5_structure_ok(20.0, 12.0, 25.0));

        assert!(EXTENDED_WAVE3.wave3_structure_ok(10.0, 16.0));
        assert!(!EXTENDED_WAVE3.wave3_structure_ok(10.0, 9.0));

        assert!(EXTENDED_WAVE5.wave5_structure_ok(10.0, 12.0, 16.0));
        assert!(!EXTENDED_WAVE5.wave5_structure_ok(10.0, 12.0, 11.0));
    }

    #[test]
    fn test_rules_for() {
        assert!(rules_for(WaveType::ExtendedWave3).is_some());
        assert!(rules_for(WaveType::Unknown).is_none());
    }

    #[test]
    fn test_catalog_order_matches_declaration() {
        let order: Vec<WaveType> = CATALOG.iter().map(|r| r.wave_type).collect();
        assert_eq!(
            order,
            vec![
                WaveType::ContractingDiagonal,
                WaveType::ExpandingDiagonal,
                WaveType::ExtendedWave1,
                WaveType::ExtendedWave3,
                WaveType::ExtendedWave5,
            ]
        );
    }
}
