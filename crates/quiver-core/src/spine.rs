//! Required-spine resolution.
//!
//! [`SpineCalculator`] validates the bow and arrow geometry and hands the
//! actual lookup to a [`SpineResolver`]. Two resolvers ship:
//!
//! - [`FormulaSpine`]: per-bow-type linear fit. Monotone in draw weight and
//!   point weight; the default.
//! - [`ChartSpine`]: manufacturer chart lookup with cam, rest and point
//!   adjustments. Supports wood arrows, reported in pounds.
//!
//! The calculator also exposes the derived ballistics (FOC, speed, kinetic
//! energy, momentum) under the same calibration.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::ballistics::{self, FocMeasurement};
use crate::charts;
use crate::config::{BallisticsConfig, SpineConfig};
use crate::error::{TuningError, require_at_most, require_non_negative, require_positive};
use crate::model::{ArrowComponents, BowConfiguration, BowType, CamType, RestType};

/// Arrow-side inputs to a spine calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct SpineInput {
    /// Inches.
    pub arrow_length: f64,
    /// Grains.
    pub point_weight: f64,
    /// Shaft material; only `wood` changes the result.
    pub material_preference: Option<String>,
}

impl SpineInput {
    pub fn new(arrow_length: f64, point_weight: f64) -> Self {
        Self {
            arrow_length,
            point_weight,
            material_preference: None,
        }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material_preference = Some(material.into());
        self
    }

    fn wants_wood(&self) -> bool {
        self.material_preference
            .as_deref()
            .is_some_and(|m| m.trim().eq_ignore_ascii_case("wood"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpineUnits {
    /// Deflection-based rating used by carbon and aluminum shafts.
    Carbon,
    /// Static spine in pounds, the wood arrow convention.
    Pounds,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpineRequirement {
    pub bow_type: BowType,
    pub spine: i32,
    pub tolerance: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub units: SpineUnits,
    /// Unadjusted value the resolver started from.
    pub base_spine: f64,
    /// Named corrections applied to `base_spine`.
    pub adjustments: Vec<(String, f64)>,
    pub notes: Vec<String>,
    pub strategy: String,
}

impl SpineRequirement {
    fn build(
        bow: &BowConfiguration,
        raw: f64,
        tolerance: i32,
        units: SpineUnits,
        base_spine: f64,
        adjustments: Vec<(String, f64)>,
        strategy: &str,
    ) -> Self {
        let spine = raw.round() as i32;
        let mut notes = match units {
            SpineUnits::Carbon => spine_notes(bow, spine),
            SpineUnits::Pounds => Vec::new(),
        };
        if units == SpineUnits::Pounds {
            notes.push("Spine values in pounds (wood arrow standard)".to_string());
        }
        Self {
            bow_type: bow.bow_type,
            spine,
            tolerance,
            minimum: spine.saturating_sub(tolerance),
            maximum: spine.saturating_add(tolerance),
            units,
            base_spine,
            adjustments,
            notes,
            strategy: strategy.to_string(),
        }
    }

    /// Sum of every adjustment, signed as applied.
    pub fn total_adjustment(&self) -> f64 {
        self.adjustments.iter().map(|(_, v)| v).sum()
    }

    pub fn contains(&self, spine: i32) -> bool {
        (self.minimum..=self.maximum).contains(&spine)
    }
}

fn spine_notes(bow: &BowConfiguration, spine: i32) -> Vec<String> {
    let mut notes = Vec::new();
    if spine < 250 {
        notes.push("Very stiff arrow required - consider high draw weight setup".to_string());
    } else if spine > 600 {
        notes.push("Weak spine required - double-check calculations".to_string());
    }
    if bow.bow_type == BowType::Compound {
        notes.push("Fine-tune with paper tuning or bare shaft testing".to_string());
        if bow.arrow_rest_type == Some(RestType::WhiskerBiscuit) {
            notes.push("Whisker biscuit may require slightly stiffer arrow".to_string());
        }
    }
    notes
}

/// Strategy that turns validated inputs into a spine requirement.
pub trait SpineResolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        bow: &BowConfiguration,
        input: &SpineInput,
        config: &SpineConfig,
    ) -> SpineRequirement;
}

/// Linear per-bow-type fit plus length and point corrections.
///
/// At equal draw weight the recurve fit lands on a weaker (higher) spine
/// than the compound one, as the manufacturer charts do.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaSpine;

impl SpineResolver for FormulaSpine {
    fn name(&self) -> &'static str {
        "formula"
    }

    fn resolve(
        &self,
        bow: &BowConfiguration,
        input: &SpineInput,
        config: &SpineConfig,
    ) -> SpineRequirement {
        let cal = config.formula.get(bow.bow_type);
        let base = (cal.intercept - cal.slope * bow.draw_weight) * cal.multiplier;
        let length_adj = (input.arrow_length - config.reference_arrow_length) * config.length_slope;
        let point_adj = (input.point_weight - config.reference_point_weight) * config.point_slope;
        let raw = (base + length_adj + point_adj).max(config.minimum_spine);

        SpineRequirement::build(
            bow,
            raw,
            *config.tolerance.get(bow.bow_type),
            SpineUnits::Carbon,
            base,
            vec![
                ("arrow_length".to_string(), length_adj),
                ("point_weight".to_string(), point_adj),
            ],
            self.name(),
        )
    }
}

/// Chart lookup with the adjustments published alongside the charts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartSpine;

impl ChartSpine {
    fn compound(
        &self,
        bow: &BowConfiguration,
        input: &SpineInput,
        cfg: &SpineConfig,
    ) -> SpineRequirement {
        let chart = &cfg.chart;
        let base = charts::COMPOUND.lookup(
            bow.draw_weight,
            input.arrow_length,
            chart.weight_interpolation_threshold,
            None,
        );

        let point = (input.point_weight - chart.point_reference) / chart.point_step
            * chart.compound_spine_per_step;
        let cam = match bow.cam_type {
            Some(CamType::Soft) => chart.cam_soft,
            Some(CamType::Medium) | None => chart.cam_medium,
            Some(CamType::Hard) => chart.cam_hard,
        };
        let rest = match bow.arrow_rest_type {
            Some(RestType::DropAway) | None => chart.rest_drop_away,
            Some(RestType::Blade) => chart.rest_blade,
            Some(RestType::WhiskerBiscuit) => chart.rest_whisker_biscuit,
            Some(RestType::FullContainment) => chart.rest_full_containment,
        };
        let center_shot = bow.center_shot.map_or(0.0, |cs| {
            (cs - chart.center_shot_reference) * chart.center_shot_spine_per_inch
        });
        let adjustments = vec![
            ("point_weight".to_string(), point),
            ("cam_type".to_string(), cam),
            ("arrow_rest".to_string(), rest),
            ("center_shot".to_string(), center_shot),
        ];

        SpineRequirement::build(
            bow,
            base - (point + cam + rest + center_shot),
            *cfg.tolerance.get(bow.bow_type),
            SpineUnits::Carbon,
            base,
            adjustments,
            self.name(),
        )
    }

    fn recurve(
        &self,
        bow: &BowConfiguration,
        input: &SpineInput,
        cfg: &SpineConfig,
    ) -> SpineRequirement {
        let chart = &cfg.chart;
        let base = charts::RECURVE.lookup(
            bow.draw_weight,
            input.arrow_length,
            chart.weight_interpolation_threshold,
            Some(chart.length_interpolation_threshold),
        );
        let point = (input.point_weight - chart.point_reference) / chart.point_step
            * chart.recurve_spine_per_step;

        SpineRequirement::build(
            bow,
            base - point,
            *cfg.tolerance.get(bow.bow_type),
            SpineUnits::Carbon,
            base,
            vec![("point_weight".to_string(), point)],
            self.name(),
        )
    }

    fn traditional(
        &self,
        bow: &BowConfiguration,
        input: &SpineInput,
        cfg: &SpineConfig,
    ) -> SpineRequirement {
        let chart = &cfg.chart;
        let wood = charts::WOOD.lookup(
            bow.draw_weight,
            input.arrow_length,
            chart.weight_interpolation_threshold,
            None,
        );
        let step = traditional_point_step(&chart.traditional_point_steps, input.point_weight)
            .unwrap_or(chart.traditional_baseline_step);
        let step_diff = step - chart.traditional_baseline_step;

        let mut requirement = if input.wants_wood() {
            let point = step_diff * chart.wood_pounds_per_step;
            SpineRequirement::build(
                bow,
                wood + point,
                chart.wood_tolerance,
                SpineUnits::Pounds,
                wood,
                vec![("point_weight".to_string(), point)],
                self.name(),
            )
        } else {
            let carbon = (chart.wood_to_carbon_intercept - wood * chart.wood_to_carbon_slope)
                .max(chart.wood_to_carbon_floor);
            let point = step_diff * chart.traditional_spine_per_step;
            SpineRequirement::build(
                bow,
                carbon - point,
                *cfg.tolerance.get(bow.bow_type),
                SpineUnits::Carbon,
                carbon,
                vec![("point_weight".to_string(), point)],
                self.name(),
            )
        };
        requirement
            .notes
            .push("Consider testing with bare shaft tuning".to_string());
        requirement
    }
}

/// Step of the table entry whose point weight is nearest `point_weight`.
fn traditional_point_step(table: &[(f64, f64)], point_weight: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for &(grains, step) in table {
        let closer = match best {
            Some((g, _)) => (grains - point_weight).abs() < (g - point_weight).abs(),
            None => true,
        };
        if closer {
            best = Some((grains, step));
        }
    }
    best.map(|(_, step)| step)
}

impl SpineResolver for ChartSpine {
    fn name(&self) -> &'static str {
        "chart"
    }

    fn resolve(
        &self,
        bow: &BowConfiguration,
        input: &SpineInput,
        config: &SpineConfig,
    ) -> SpineRequirement {
        match bow.bow_type {
            BowType::Compound => self.compound(bow, input, config),
            BowType::Recurve => self.recurve(bow, input, config),
            BowType::Traditional | BowType::Longbow => self.traditional(bow, input, config),
        }
    }
}

/// Spine and ballistics calculator bound to one calibration.
#[derive(Clone)]
pub struct SpineCalculator {
    spine: SpineConfig,
    ballistics: BallisticsConfig,
    resolver: Arc<dyn SpineResolver>,
}

impl fmt::Debug for SpineCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpineCalculator")
            .field("resolver", &self.resolver.name())
            .finish_non_exhaustive()
    }
}

impl Default for SpineCalculator {
    fn default() -> Self {
        Self::new(SpineConfig::default(), BallisticsConfig::default())
    }
}

impl SpineCalculator {
    /// Calculator using [`FormulaSpine`].
    pub fn new(spine: SpineConfig, ballistics: BallisticsConfig) -> Self {
        Self {
            spine,
            ballistics,
            resolver: Arc::new(FormulaSpine),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn SpineResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn resolver_name(&self) -> &'static str {
        self.resolver.name()
    }

    pub fn calculate_required_spine(
        &self,
        bow: &BowConfiguration,
        input: &SpineInput,
    ) -> Result<SpineRequirement, TuningError> {
        bow.validate()?;
        require_at_most("draw_weight", bow.draw_weight, self.spine.max_draw_weight)?;
        require_positive("arrow_length", input.arrow_length)?;
        require_at_most("arrow_length", input.arrow_length, self.spine.max_arrow_length)?;
        require_non_negative("point_weight", input.point_weight)?;
        require_at_most("point_weight", input.point_weight, self.spine.max_point_weight)?;

        let requirement = self.resolver.resolve(bow, input, &self.spine);
        debug!(
            bow_type = %bow.bow_type,
            draw_weight = bow.draw_weight,
            arrow_length = input.arrow_length,
            point_weight = input.point_weight,
            spine = requirement.spine,
            tolerance = requirement.tolerance,
            strategy = self.resolver.name(),
            "spine resolved"
        );
        Ok(requirement)
    }

    /// `(min, max)` acceptable spine around `target` for `bow_type`.
    pub fn tolerance_range(&self, target: i32, bow_type: BowType) -> (i32, i32) {
        let tolerance = *self.spine.tolerance.get(bow_type);
        (target.saturating_sub(tolerance), target.saturating_add(tolerance))
    }

    pub fn calculate_foc(
        &self,
        components: &ArrowComponents,
        arrow_length: f64,
    ) -> Result<FocMeasurement, TuningError> {
        ballistics::foc(&self.ballistics, components, arrow_length)
    }

    pub fn estimate_speed(
        &self,
        total_weight: f64,
        bow: &BowConfiguration,
    ) -> Result<f64, TuningError> {
        ballistics::estimate_speed(
            &self.ballistics,
            total_weight,
            bow.draw_weight,
            bow.compound_ibo(),
        )
    }

    pub fn kinetic_energy(&self, total_weight: f64, speed: f64) -> f64 {
        ballistics::kinetic_energy(&self.ballistics, total_weight, speed)
    }

    pub fn momentum(&self, total_weight: f64, speed: f64) -> f64 {
        ballistics::momentum(&self.ballistics, total_weight, speed)
    }
}
