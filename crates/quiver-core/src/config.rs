//! Calibration table for every numeric default the engine relies on.
//!
//! `EngineConfig::default()` reproduces the reference calibration. Each
//! section deserializes with `#[serde(default)]`, so a JSON file only needs
//! the keys it wants to override:
//!
//! ```json
//! { "matching": { "high_confidence": 85.0 }, "session": { "analysed_matches": 5 } }
//! ```
//!
//! The spine constants are empirical fits to manufacturer charts, not
//! derived values.

use serde::{Deserialize, Serialize};

use crate::error::TuningError;
use crate::model::{ArrowType, BowType};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub spine: SpineConfig,
    pub ballistics: BallisticsConfig,
    pub tuning: TuningConfig,
    pub matching: MatchingConfig,
    pub compatibility: CompatibilityConfig,
    pub session: SessionConfig,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject calibrations that would make the formulas meaningless.
    pub fn validate(&self) -> Result<(), TuningError> {
        let s = &self.spine;
        positive("spine.reference_arrow_length", s.reference_arrow_length)?;
        positive("spine.reference_point_weight", s.reference_point_weight)?;
        positive("spine.max_draw_weight", s.max_draw_weight)?;
        positive("spine.max_arrow_length", s.max_arrow_length)?;
        positive("spine.max_point_weight", s.max_point_weight)?;
        for bow in BowType::ALL {
            let cal = s.formula.get(*bow);
            positive("spine.formula.slope", cal.slope)?;
            positive("spine.formula.multiplier", cal.multiplier)?;
            if *s.tolerance.get(*bow) <= 0 {
                return Err(invalid("spine.tolerance", "tolerance must be positive"));
            }
        }

        let b = &self.ballistics;
        positive("ballistics.grains_per_pound", b.grains_per_pound)?;
        positive("ballistics.gravity", b.gravity)?;
        positive("ballistics.speed_reference_weight", b.speed_reference_weight)?;
        positive("ballistics.ibo_reference_draw_weight", b.ibo_reference_draw_weight)?;
        ordered("ballistics.speed_range", (b.min_speed, b.max_speed))?;

        let t = &self.tuning;
        positive("tuning.optimal_foc", t.optimal_foc)?;
        positive("tuning.reference_diameter", t.reference_diameter)?;
        positive("tuning.weight_reference", t.weight_reference)?;
        positive("tuning.wind_diameter_reference", t.wind_diameter_reference)?;
        positive("tuning.default_arrow_diameter", t.default_arrow_diameter)?;
        ordered("tuning.accuracy_foc_ideal", t.accuracy_foc_ideal)?;
        ordered("tuning.accuracy_foc_acceptable", t.accuracy_foc_acceptable)?;
        ordered("tuning.accuracy_weight_band", t.accuracy_weight_band)?;
        ordered("tuning.accuracy_length_band", t.accuracy_length_band)?;
        for arrow_type in ArrowType::ALL {
            ordered("tuning.ideal_foc", t.ideal_foc.get(*arrow_type))?;
        }

        let m = &self.matching;
        positive("matching.window_multiplier", m.window_multiplier)?;
        if m.expanded_window_multiplier < m.window_multiplier {
            return Err(invalid(
                "matching.expanded_window_multiplier",
                "expanded window must not be narrower than the normal window",
            ));
        }
        positive("matching.availability_saturation", m.availability_saturation)?;
        positive("matching.diameter_penalty_scale", m.diameter_penalty_scale)?;
        positive("matching.gpi_penalty_scale", m.gpi_penalty_scale)?;
        positive("matching.foc_penalty_scale", m.foc_penalty_scale)?;
        if (m.weights.sum() - 1.0).abs() > 1e-6 {
            return Err(invalid("matching.weights", "scoring weights must sum to 1"));
        }
        if !(0.0..=100.0).contains(&m.medium_confidence)
            || !(0.0..=100.0).contains(&m.high_confidence)
            || m.medium_confidence > m.high_confidence
        {
            return Err(invalid(
                "matching.confidence",
                "thresholds must satisfy 0 <= medium <= high <= 100",
            ));
        }

        let c = &self.compatibility;
        ordered("compatibility.point_weight_fraction", c.point_weight_fraction)?;
        ordered("compatibility.fallback_point_weight", c.fallback_point_weight)?;
        positive("compatibility.estimate_length", c.estimate_length)?;
        if !(0.0..=1.0).contains(&c.adhesive_fallback_score) {
            return Err(invalid(
                "compatibility.adhesive_fallback_score",
                "score must be within 0..=1",
            ));
        }

        if self.session.point_weights.is_empty() {
            return Err(invalid(
                "session.point_weights",
                "at least one candidate point weight is required",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> TuningError {
    TuningError::configuration(field, reason)
}

fn positive(field: &str, value: f64) -> Result<(), TuningError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive finite number"))
    }
}

fn ordered(field: &str, (lo, hi): (f64, f64)) -> Result<(), TuningError> {
    if lo.is_finite() && hi.is_finite() && lo <= hi {
        Ok(())
    } else {
        Err(invalid(field, "range minimum must not exceed maximum"))
    }
}

/// One value per bow type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerBowType<T> {
    pub compound: T,
    pub recurve: T,
    pub traditional: T,
    pub longbow: T,
}

impl<T> PerBowType<T> {
    pub fn get(&self, bow_type: BowType) -> &T {
        match bow_type {
            BowType::Compound => &self.compound,
            BowType::Recurve => &self.recurve,
            BowType::Traditional => &self.traditional,
            BowType::Longbow => &self.longbow,
        }
    }
}

// ── Spine ──

/// Linear draw-weight fit: `(intercept - slope * draw_weight) * multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BowCalibration {
    pub intercept: f64,
    pub slope: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpineConfig {
    pub formula: PerBowType<BowCalibration>,
    pub reference_arrow_length: f64,
    /// Spine units added per inch over the reference length.
    pub length_slope: f64,
    pub reference_point_weight: f64,
    /// Spine units added per grain over the reference point weight.
    pub point_slope: f64,
    pub minimum_spine: f64,
    pub tolerance: PerBowType<i32>,
    /// Inputs above these are rejected as implausible.
    pub max_draw_weight: f64,
    pub max_arrow_length: f64,
    pub max_point_weight: f64,
    pub chart: ChartAdjustments,
}

impl Default for SpineConfig {
    fn default() -> Self {
        Self {
            formula: PerBowType {
                compound: BowCalibration {
                    intercept: 650.0,
                    slope: 5.0,
                    multiplier: 1.0,
                },
                recurve: BowCalibration {
                    intercept: 1200.0,
                    slope: 15.0,
                    multiplier: 0.95,
                },
                traditional: BowCalibration {
                    intercept: 927.0,
                    slope: 9.0,
                    multiplier: 1.0,
                },
                longbow: BowCalibration {
                    intercept: 927.0,
                    slope: 9.0,
                    multiplier: 1.05,
                },
            },
            reference_arrow_length: 28.0,
            length_slope: 25.0,
            reference_point_weight: 125.0,
            point_slope: 0.5,
            minimum_spine: 150.0,
            tolerance: PerBowType {
                compound: 25,
                recurve: 30,
                traditional: 40,
                longbow: 40,
            },
            max_draw_weight: 200.0,
            max_arrow_length: 40.0,
            max_point_weight: 500.0,
            chart: ChartAdjustments::default(),
        }
    }
}

/// Adjustments applied on top of chart lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartAdjustments {
    /// Draw-weight distance from the nearest chart row that triggers interpolation.
    pub weight_interpolation_threshold: f64,
    /// Arrow-length distance from the nearest chart column that triggers interpolation.
    pub length_interpolation_threshold: f64,
    pub point_reference: f64,
    pub point_step: f64,
    pub compound_spine_per_step: f64,
    pub recurve_spine_per_step: f64,
    pub cam_soft: f64,
    pub cam_medium: f64,
    pub cam_hard: f64,
    pub rest_drop_away: f64,
    pub rest_blade: f64,
    pub rest_whisker_biscuit: f64,
    pub rest_full_containment: f64,
    /// Center-shot the chart assumes, inches (13/16").
    pub center_shot_reference: f64,
    /// Spine units per inch of center-shot offset from the reference.
    pub center_shot_spine_per_inch: f64,
    /// Traditional point table: point weight (grains) to chart step.
    pub traditional_point_steps: Vec<(f64, f64)>,
    pub traditional_baseline_step: f64,
    pub traditional_spine_per_step: f64,
    pub wood_pounds_per_step: f64,
    pub wood_tolerance: i32,
    pub wood_to_carbon_intercept: f64,
    pub wood_to_carbon_slope: f64,
    pub wood_to_carbon_floor: f64,
}

impl Default for ChartAdjustments {
    fn default() -> Self {
        Self {
            weight_interpolation_threshold: 2.5,
            length_interpolation_threshold: 0.5,
            point_reference: 100.0,
            point_step: 25.0,
            compound_spine_per_step: 15.0,
            recurve_spine_per_step: 20.0,
            cam_soft: -10.0,
            cam_medium: 0.0,
            cam_hard: 10.0,
            rest_drop_away: 0.0,
            rest_blade: 10.0,
            rest_whisker_biscuit: 20.0,
            rest_full_containment: 15.0,
            center_shot_reference: 13.0 / 16.0,
            center_shot_spine_per_inch: 100.0,
            traditional_point_steps: vec![(30.0, 1.0), (70.0, 2.0), (100.0, 3.0), (125.0, 4.0)],
            traditional_baseline_step: 3.0,
            traditional_spine_per_step: 5.0,
            wood_pounds_per_step: 2.5,
            wood_tolerance: 5,
            wood_to_carbon_intercept: 950.0,
            wood_to_carbon_slope: 9.0,
            wood_to_carbon_floor: 300.0,
        }
    }
}

// ── Ballistics ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallisticsConfig {
    pub grains_per_pound: f64,
    /// ft/s².
    pub gravity: f64,
    /// Arrow weight (grains) at which the base speed applies.
    pub speed_reference_weight: f64,
    pub speed_per_pound: f64,
    pub speed_base: f64,
    /// Draw weight an IBO rating is measured at.
    pub ibo_reference_draw_weight: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    /// Distance of the fletching from the nock, inches.
    pub fletching_offset: f64,
    /// Distance of the insert behind the point, inches.
    pub insert_offset: f64,
    /// Wrap position as a fraction of arrow length from the nock.
    pub wrap_fraction: f64,
}

impl Default for BallisticsConfig {
    fn default() -> Self {
        Self {
            grains_per_pound: 7000.0,
            gravity: 32.174,
            speed_reference_weight: 350.0,
            speed_per_pound: 3.5,
            speed_base: 180.0,
            ibo_reference_draw_weight: 70.0,
            min_speed: 150.0,
            max_speed: 400.0,
            fletching_offset: 1.0,
            insert_offset: 0.5,
            wrap_fraction: 0.75,
        }
    }
}

// ── Tuning ──

/// Ideal FOC band (percent) per arrow application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdealFocTable {
    pub target_indoor: (f64, f64),
    pub target_outdoor: (f64, f64),
    pub field_archery: (f64, f64),
    pub hunting_small_game: (f64, f64),
    pub hunting_big_game: (f64, f64),
    pub traditional_archery: (f64, f64),
    /// Added to (min, max) for traditional and longbow bows.
    pub traditional_bow_shift: (f64, f64),
    /// Added to (min, max) for recurve bows.
    pub recurve_bow_shift: (f64, f64),
}

impl IdealFocTable {
    pub fn get(&self, arrow_type: ArrowType) -> (f64, f64) {
        match arrow_type {
            ArrowType::TargetIndoor => self.target_indoor,
            ArrowType::TargetOutdoor => self.target_outdoor,
            ArrowType::FieldArchery => self.field_archery,
            ArrowType::HuntingSmallGame => self.hunting_small_game,
            ArrowType::HuntingBigGame => self.hunting_big_game,
            ArrowType::TraditionalArchery => self.traditional_archery,
        }
    }
}

impl Default for IdealFocTable {
    fn default() -> Self {
        Self {
            target_indoor: (7.0, 9.0),
            target_outdoor: (8.0, 10.0),
            field_archery: (9.0, 11.0),
            hunting_small_game: (10.0, 12.0),
            hunting_big_game: (11.0, 15.0),
            traditional_archery: (12.0, 18.0),
            traditional_bow_shift: (2.0, 3.0),
            recurve_bow_shift: (1.0, 2.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub default_arrow_diameter: f64,
    pub ideal_foc: IdealFocTable,

    // penetration
    pub optimal_foc: f64,
    pub foc_factor_cap: f64,
    pub reference_diameter: f64,
    pub weight_reference: f64,
    pub weight_factor_cap: f64,
    pub momentum_multiplier: f64,

    // accuracy
    pub accuracy_base: f64,
    pub accuracy_foc_ideal: (f64, f64),
    pub accuracy_foc_ideal_bonus: f64,
    pub accuracy_foc_acceptable: (f64, f64),
    pub accuracy_foc_acceptable_bonus: f64,
    pub accuracy_foc_center: f64,
    pub accuracy_weight_band: (f64, f64),
    pub accuracy_weight_bonus: f64,
    pub accuracy_weight_center: f64,
    pub accuracy_weight_falloff: f64,
    pub accuracy_length_band: (f64, f64),
    pub accuracy_length_bonus: f64,
    pub accuracy_length_center: f64,
    pub accuracy_goal_bonus: f64,

    // wind drift, relative to a reference arrow
    pub wind_weight_reference: f64,
    pub wind_diameter_reference: f64,
    pub wind_speed_reference: f64,

    // trajectory rating
    pub trajectory_very_fast: f64,
    pub trajectory_fast: f64,
    pub trajectory_moderate: f64,
    pub trajectory_light_weight: f64,

    // recommendation bounds
    pub hunting_min_weight: f64,
    pub hunting_max_weight: f64,
    pub light_point_weight: f64,
    pub heavy_point_weight: f64,
    pub fast_speed: f64,
    pub slow_speed: f64,

    // broadhead switch
    pub broadhead_foc_per_100gr: f64,
    pub broadhead_adjustment_threshold: f64,
    pub broadhead_large_difference: f64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            default_arrow_diameter: 0.246,
            ideal_foc: IdealFocTable::default(),
            optimal_foc: 12.0,
            foc_factor_cap: 1.5,
            reference_diameter: 0.25,
            weight_reference: 400.0,
            weight_factor_cap: 1.2,
            momentum_multiplier: 10.0,
            accuracy_base: 50.0,
            accuracy_foc_ideal: (8.0, 12.0),
            accuracy_foc_ideal_bonus: 20.0,
            accuracy_foc_acceptable: (6.0, 15.0),
            accuracy_foc_acceptable_bonus: 15.0,
            accuracy_foc_center: 10.0,
            accuracy_weight_band: (350.0, 500.0),
            accuracy_weight_bonus: 15.0,
            accuracy_weight_center: 425.0,
            accuracy_weight_falloff: 50.0,
            accuracy_length_band: (28.0, 31.0),
            accuracy_length_bonus: 10.0,
            accuracy_length_center: 29.5,
            accuracy_goal_bonus: 5.0,
            wind_weight_reference: 400.0,
            wind_diameter_reference: 0.244,
            wind_speed_reference: 300.0,
            trajectory_very_fast: 320.0,
            trajectory_fast: 280.0,
            trajectory_moderate: 250.0,
            trajectory_light_weight: 350.0,
            hunting_min_weight: 350.0,
            hunting_max_weight: 550.0,
            light_point_weight: 75.0,
            heavy_point_weight: 150.0,
            fast_speed: 350.0,
            slow_speed: 250.0,
            broadhead_foc_per_100gr: 1.5,
            broadhead_adjustment_threshold: 5.0,
            broadhead_large_difference: 15.0,
        }
    }
}

// ── Matching ──

/// Relative weight of each match criterion. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub spine: f64,
    pub availability: f64,
    pub manufacturer: f64,
    pub diameter: f64,
    pub weight: f64,
    pub foc: f64,
    pub arrow_type: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.spine
            + self.availability
            + self.manufacturer
            + self.diameter
            + self.weight
            + self.foc
            + self.arrow_type
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            spine: 0.35,
            availability: 0.15,
            manufacturer: 0.10,
            diameter: 0.10,
            weight: 0.10,
            foc: 0.10,
            arrow_type: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Deviation window as a multiple of the spine tolerance.
    pub window_multiplier: f64,
    /// Wider window tried when neither the strict nor the relaxed pass
    /// finds anything.
    pub expanded_window_multiplier: f64,
    pub weights: ScoringWeights,
    /// Spine option count that earns a full availability score.
    pub availability_saturation: f64,
    pub non_preferred_manufacturer_score: f64,
    /// Inches outside the target diameter range that cost 100 points.
    pub diameter_penalty_scale: f64,
    /// GPI outside the target weight range that costs 100 points.
    pub gpi_penalty_scale: f64,
    /// FOC percent outside the target range that costs 100 points.
    pub foc_penalty_scale: f64,
    pub arrow_type_unknown_score: f64,
    pub arrow_type_mismatch_score: f64,
    pub high_confidence: f64,
    pub medium_confidence: f64,
    pub min_spine_options: usize,
    /// Spine options a wood shaft needs in the strict pass when the archer
    /// asks for wood.
    pub wood_min_spine_options: usize,
    pub default_max_results: usize,

    // reason and issue thresholds
    pub excellent_deviation: f64,
    pub good_deviation: f64,
    pub compensation_deviation: f64,
    pub large_deviation: f64,
    pub excellent_availability: usize,
    pub good_availability: usize,
    pub heavy_gpi: f64,
    pub light_gpi: f64,
    pub small_diameter: f64,
    pub large_diameter: f64,
    pub fragile_diameter: f64,
    pub drift_diameter: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            window_multiplier: 3.0,
            expanded_window_multiplier: 5.0,
            weights: ScoringWeights::default(),
            availability_saturation: 8.0,
            non_preferred_manufacturer_score: 50.0,
            diameter_penalty_scale: 0.05,
            gpi_penalty_scale: 2.0,
            foc_penalty_scale: 2.0,
            arrow_type_unknown_score: 60.0,
            arrow_type_mismatch_score: 25.0,
            high_confidence: 80.0,
            medium_confidence: 60.0,
            min_spine_options: 3,
            wood_min_spine_options: 2,
            default_max_results: 50,
            excellent_deviation: 10.0,
            good_deviation: 25.0,
            compensation_deviation: 20.0,
            large_deviation: 40.0,
            excellent_availability: 6,
            good_availability: 3,
            heavy_gpi: 12.0,
            light_gpi: 5.0,
            small_diameter: 0.24,
            large_diameter: 0.30,
            fragile_diameter: 0.20,
            drift_diameter: 0.35,
        }
    }
}

// ── Compatibility ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibilityConfig {
    pub standard_threads: Vec<String>,
    pub universal_thread: String,
    /// Arrow length assumed when estimating total weight from GPI.
    pub estimate_length: f64,
    /// Point weight as a fraction of estimated total arrow weight.
    pub point_weight_fraction: (f64, f64),
    /// Flat plausibility band (grains) used when the fraction test fails.
    pub fallback_point_weight: (f64, f64),
    pub fallback_score_factor: f64,
    pub nock_diameter_tolerance: f64,
    pub insert_press_fit_tolerance: f64,
    pub fletching_diameter_boundary: f64,
    pub large_shaft_max_fletching: f64,
    pub small_shaft_max_fletching: f64,
    /// Outer diameter assumed when the arrow has none on record.
    pub default_outer_diameter: f64,
    pub adhesive_fallback_score: f64,
    pub strong_match_threshold: f64,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            standard_threads: vec!["8-32".to_string(), "5/16-24".to_string()],
            universal_thread: "8-32".to_string(),
            estimate_length: 28.0,
            point_weight_fraction: (0.08, 0.20),
            fallback_point_weight: (75.0, 200.0),
            fallback_score_factor: 0.8,
            nock_diameter_tolerance: 0.005,
            insert_press_fit_tolerance: 0.002,
            fletching_diameter_boundary: 0.3,
            large_shaft_max_fletching: 4.0,
            small_shaft_max_fletching: 3.0,
            default_outer_diameter: 0.3,
            adhesive_fallback_score: 0.80,
            strong_match_threshold: 0.75,
        }
    }
}

// ── Session ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How many top matches get a full tuning analysis.
    pub analysed_matches: usize,
    /// Candidate point weights for optimization, grains.
    pub point_weights: Vec<f64>,
    pub standard_nock_weight: f64,
    pub standard_fletching_weight: f64,
    pub standard_insert_weight: f64,
    pub max_results: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            analysed_matches: 3,
            point_weights: vec![75.0, 100.0, 125.0, 150.0, 175.0, 200.0],
            standard_nock_weight: 10.0,
            standard_fletching_weight: 15.0,
            standard_insert_weight: 15.0,
            max_results: 10,
        }
    }
}
