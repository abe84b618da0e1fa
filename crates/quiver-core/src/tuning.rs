//! Multi-metric analysis of an assembled arrow and goal-directed point
//! weight optimization.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ballistics;
use crate::config::{BallisticsConfig, TuningConfig};
use crate::error::{TuningError, require_positive};
use crate::model::{ArrowComponents, ArrowType, BowConfiguration, BowType, TuningGoal};

/// Bow and shaft context shared by every analysis of one arrow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotSetup {
    /// Inches.
    pub arrow_length: f64,
    /// Draw weight, pounds.
    pub bow_weight: f64,
    /// Shaft outer diameter, inches.
    pub arrow_diameter: f64,
    /// Selects the ideal FOC adjustment; compound when absent.
    #[serde(default)]
    pub bow_type: Option<BowType>,
    /// Compound IBO rating, replaces the draw-weight speed model.
    #[serde(default)]
    pub ibo_speed: Option<f64>,
}

impl ShotSetup {
    pub fn new(arrow_length: f64, bow_weight: f64, arrow_diameter: f64) -> Self {
        Self {
            arrow_length,
            bow_weight,
            arrow_diameter,
            bow_type: None,
            ibo_speed: None,
        }
    }

    pub fn for_bow(bow: &BowConfiguration, arrow_length: f64, arrow_diameter: f64) -> Self {
        Self {
            arrow_length,
            bow_weight: bow.draw_weight,
            arrow_diameter,
            bow_type: Some(bow.bow_type),
            ibo_speed: bow.compound_ibo(),
        }
    }
}

/// Share of total weight per component, percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentBreakdown {
    pub shaft: f64,
    pub point: f64,
    pub nock: f64,
    pub fletching: f64,
    pub insert: f64,
    pub wrap: f64,
    pub outsert: f64,
}

impl ComponentBreakdown {
    fn of(c: &ArrowComponents, total: f64) -> Self {
        let pct = |w: f64| w / total * 100.0;
        Self {
            shaft: pct(c.shaft_weight),
            point: pct(c.point_weight),
            nock: pct(c.nock_weight),
            fletching: pct(c.fletching_weight),
            insert: pct(c.insert_weight),
            wrap: pct(c.wrap_weight),
            outsert: pct(c.outsert_weight),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningResult {
    pub total_weight: f64,
    pub foc_percentage: f64,
    pub balance_point: f64,
    /// Foot-pounds.
    pub kinetic_energy: f64,
    pub momentum: f64,
    /// fps.
    pub speed_estimate: f64,
    pub penetration_score: f64,
    pub accuracy_score: f64,
    /// 1.0 is the reference arrow; higher drifts more.
    pub wind_drift_factor: f64,
    pub trajectory_rating: String,
    pub ideal_foc_range: (f64, f64),
    pub recommendations: Vec<String>,
    pub component_breakdown: ComponentBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredConfiguration {
    pub point_weight: f64,
    pub components: ArrowComponents,
    pub score: f64,
    pub analysis: TuningResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    pub goal: TuningGoal,
    pub best: ScoredConfiguration,
    /// Every candidate, best first. Equal scores keep candidate order.
    pub all_results: Vec<ScoredConfiguration>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadheadAdjustment {
    /// Broadhead minus field point, grains.
    pub weight_difference: f64,
    pub foc_change: f64,
    pub new_foc_estimate: f64,
    pub adjustments_needed: bool,
    pub recommendations: Vec<String>,
}

/// NaN becomes 0; everything else is clamped to 0..=100.
fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn within((lo, hi): (f64, f64), value: f64) -> bool {
    lo <= value && value <= hi
}

#[derive(Debug, Clone, Default)]
pub struct TuningCalculator {
    ballistics: BallisticsConfig,
    tuning: TuningConfig,
}

impl TuningCalculator {
    pub fn new(ballistics: BallisticsConfig, tuning: TuningConfig) -> Self {
        Self { ballistics, tuning }
    }

    pub fn config(&self) -> &TuningConfig {
        &self.tuning
    }

    pub fn comprehensive_tuning_analysis(
        &self,
        components: &ArrowComponents,
        setup: &ShotSetup,
        goal: TuningGoal,
        arrow_type: ArrowType,
    ) -> Result<TuningResult, TuningError> {
        let foc = ballistics::foc(&self.ballistics, components, setup.arrow_length)?;
        let total_weight = foc.total_weight;
        let speed = ballistics::estimate_speed(
            &self.ballistics,
            total_weight,
            setup.bow_weight,
            setup.ibo_speed,
        )?;
        let kinetic_energy = ballistics::kinetic_energy(&self.ballistics, total_weight, speed);
        let momentum = ballistics::momentum(&self.ballistics, total_weight, speed);
        let ideal_foc_range =
            self.calculate_ideal_foc_range(arrow_type, setup.bow_type.unwrap_or(BowType::Compound));

        debug!(
            total_weight,
            foc = foc.foc_percentage,
            speed,
            kinetic_energy,
            goal = %goal,
            "tuning analysis"
        );

        Ok(TuningResult {
            total_weight,
            foc_percentage: foc.foc_percentage,
            balance_point: foc.balance_point,
            kinetic_energy,
            momentum,
            speed_estimate: speed,
            penetration_score: self.penetration_score(
                total_weight,
                speed,
                foc.foc_percentage,
                setup.arrow_diameter,
            ),
            accuracy_score: self.accuracy_score(
                total_weight,
                foc.foc_percentage,
                setup.arrow_length,
                goal,
            ),
            wind_drift_factor: self.wind_drift_factor(total_weight, setup.arrow_diameter, speed),
            trajectory_rating: self.rate_trajectory(speed, total_weight).to_string(),
            ideal_foc_range,
            recommendations: self.tuning_recommendations(
                components,
                foc.foc_percentage,
                total_weight,
                speed,
                goal,
                arrow_type,
                ideal_foc_range,
            ),
            component_breakdown: ComponentBreakdown::of(components, total_weight),
        })
    }

    /// Momentum-driven, boosted by FOC toward the optimum, a thin shaft and a
    /// heavy arrow. Always within 0..=100.
    pub fn penetration_score(&self, weight: f64, speed: f64, foc: f64, diameter: f64) -> f64 {
        let t = &self.tuning;
        let momentum = ballistics::momentum(&self.ballistics, weight, speed);
        let foc_factor = (foc / t.optimal_foc).min(t.foc_factor_cap);
        let diameter_factor = if diameter > 0.0 {
            t.reference_diameter / diameter
        } else {
            1.0
        };
        let weight_factor = (weight / t.weight_reference).min(t.weight_factor_cap);
        clamp_score(momentum * t.momentum_multiplier * foc_factor * diameter_factor * weight_factor)
    }

    /// Base score plus FOC, weight and length bands. Always within 0..=100.
    pub fn accuracy_score(
        &self,
        weight: f64,
        foc: f64,
        arrow_length: f64,
        goal: TuningGoal,
    ) -> f64 {
        let t = &self.tuning;
        let foc_bonus = if within(t.accuracy_foc_ideal, foc) {
            t.accuracy_foc_ideal_bonus
        } else if within(t.accuracy_foc_acceptable, foc) {
            t.accuracy_foc_acceptable_bonus
        } else {
            (t.accuracy_foc_acceptable_bonus - (foc - t.accuracy_foc_center).abs()).max(0.0)
        };
        let weight_bonus = if within(t.accuracy_weight_band, weight) {
            t.accuracy_weight_bonus
        } else {
            (t.accuracy_weight_bonus
                - (weight - t.accuracy_weight_center).abs() / t.accuracy_weight_falloff)
                .max(0.0)
        };
        let length_bonus = if within(t.accuracy_length_band, arrow_length) {
            t.accuracy_length_bonus
        } else {
            (t.accuracy_length_bonus - (arrow_length - t.accuracy_length_center).abs()).max(0.0)
        };
        let goal_bonus = if goal == TuningGoal::MaximumAccuracy {
            t.accuracy_goal_bonus
        } else {
            0.0
        };
        clamp_score(t.accuracy_base + foc_bonus + weight_bonus + length_bonus + goal_bonus)
    }

    /// Drift relative to the reference arrow, rounded to two decimals.
    pub fn wind_drift_factor(&self, weight: f64, diameter: f64, speed: f64) -> f64 {
        let t = &self.tuning;
        let weight_factor = if weight > 0.0 {
            t.wind_weight_reference / weight
        } else {
            1.0
        };
        let diameter_factor = diameter.max(0.0) / t.wind_diameter_reference;
        let speed_factor = if speed > 0.0 {
            t.wind_speed_reference / speed
        } else {
            1.0
        };
        let drift = weight_factor * diameter_factor * speed_factor;
        if drift.is_finite() {
            (drift * 100.0).round() / 100.0
        } else {
            0.0
        }
    }

    pub fn rate_trajectory(&self, speed: f64, weight: f64) -> &'static str {
        let t = &self.tuning;
        if speed > t.trajectory_very_fast {
            if weight < t.trajectory_light_weight {
                "Very flat, but may lack downrange energy"
            } else {
                "Flat trajectory with good energy retention"
            }
        } else if speed > t.trajectory_fast {
            "Good trajectory with balanced performance"
        } else if speed > t.trajectory_moderate {
            "Moderate arc, good for close-medium range"
        } else {
            "High arc, requires careful range estimation"
        }
    }

    /// Ideal FOC band for an application, widened for recurve and
    /// traditional bows.
    pub fn calculate_ideal_foc_range(
        &self,
        arrow_type: ArrowType,
        bow_type: BowType,
    ) -> (f64, f64) {
        let table = &self.tuning.ideal_foc;
        let (lo, hi) = table.get(arrow_type);
        let (dlo, dhi) = match bow_type {
            BowType::Traditional | BowType::Longbow => table.traditional_bow_shift,
            BowType::Recurve => table.recurve_bow_shift,
            BowType::Compound => (0.0, 0.0),
        };
        (lo + dlo, hi + dhi)
    }

    /// Goal score of one analysed configuration.
    pub fn score_configuration(&self, result: &TuningResult, goal: TuningGoal) -> f64 {
        match goal {
            TuningGoal::MaximumSpeed => result.speed_estimate,
            TuningGoal::OptimalPenetration => result.penetration_score,
            TuningGoal::MaximumAccuracy => result.accuracy_score,
            TuningGoal::HuntingEffectiveness => {
                0.4 * result.penetration_score
                    + 0.3 * result.kinetic_energy
                    + 0.3 * result.accuracy_score
            }
            TuningGoal::BalancedPerformance => {
                result.speed_estimate / 4.0
                    + 0.3 * result.penetration_score
                    + 0.3 * result.accuracy_score
                    + 0.4 * result.kinetic_energy
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn tuning_recommendations(
        &self,
        components: &ArrowComponents,
        foc: f64,
        total_weight: f64,
        speed: f64,
        goal: TuningGoal,
        arrow_type: ArrowType,
        (foc_min, foc_max): (f64, f64),
    ) -> Vec<String> {
        let t = &self.tuning;
        let mut recs = Vec::new();

        if foc < foc_min {
            recs.push(format!(
                "FOC is low ({foc:.1}%) - consider heavier points or lighter nock/fletching"
            ));
        } else if foc > foc_max {
            recs.push(format!(
                "FOC is high ({foc:.1}%) - consider lighter points or heavier nock/fletching"
            ));
        } else {
            recs.push(format!("FOC is optimal ({foc:.1}%) for {arrow_type}"));
        }

        if arrow_type.is_hunting() {
            if total_weight < t.hunting_min_weight {
                recs.push(
                    "Arrow may be too light for hunting - consider heavier components".to_string(),
                );
            } else if total_weight > t.hunting_max_weight {
                recs.push("Arrow may be very heavy - check if speed is acceptable".to_string());
            }
        }

        if speed < t.slow_speed && goal == TuningGoal::MaximumSpeed {
            recs.push("Consider lighter arrow components to increase speed".to_string());
        } else if speed > t.fast_speed {
            recs.push("Very fast setup - ensure arrow spine is adequate".to_string());
        }

        if components.point_weight < t.light_point_weight {
            recs.push("Point weight is very light - may affect FOC and penetration".to_string());
        } else if components.point_weight > t.heavy_point_weight {
            recs.push("Point weight is heavy - verify spine selection".to_string());
        }
        recs
    }

    /// Analyse `base` once per candidate point weight and rank the results
    /// by goal score.
    pub fn optimize_for_goal(
        &self,
        base: &ArrowComponents,
        setup: &ShotSetup,
        goal: TuningGoal,
        arrow_type: ArrowType,
        point_weights: &[f64],
    ) -> Result<OptimizationOutcome, TuningError> {
        if point_weights.is_empty() {
            return Err(TuningError::Validation {
                field: "available_point_weights",
                value: 0.0,
                reason: "at least one candidate point weight is required",
            });
        }

        let mut results = Vec::with_capacity(point_weights.len());
        for &point_weight in point_weights {
            let components = base.with_point_weight(point_weight);
            let analysis =
                self.comprehensive_tuning_analysis(&components, setup, goal, arrow_type)?;
            results.push(ScoredConfiguration {
                point_weight,
                components,
                score: self.score_configuration(&analysis, goal),
                analysis,
            });
        }
        // Stable, so equal scores keep candidate order.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        let best = results[0].clone();
        debug!(
            goal = %goal,
            candidates = results.len(),
            best_point_weight = best.point_weight,
            best_score = best.score,
            "optimization complete"
        );
        let recommendations = optimization_recommendations(&results, goal);
        Ok(OptimizationOutcome {
            goal,
            best,
            all_results: results,
            recommendations,
        })
    }

    pub fn calculate_broadhead_tuning_adjustments(
        &self,
        field_point_weight: f64,
        broadhead_weight: f64,
        current_foc: f64,
    ) -> Result<BroadheadAdjustment, TuningError> {
        require_positive("field_point_weight", field_point_weight)?;
        require_positive("broadhead_weight", broadhead_weight)?;

        let t = &self.tuning;
        let diff = broadhead_weight - field_point_weight;
        let foc_change = diff / 100.0 * t.broadhead_foc_per_100gr;
        let new_foc = current_foc + foc_change;

        let mut recs = Vec::new();
        if diff > 0.0 {
            recs.push(format!("Broadheads are {diff:.0} grains heavier"));
            recs.push(format!("FOC will increase to approximately {new_foc:.1}%"));
            if diff > t.broadhead_large_difference {
                recs.push("Consider reducing shaft weight or using lighter broadheads".to_string());
            }
        } else if diff < 0.0 {
            recs.push(format!("Broadheads are {:.0} grains lighter", diff.abs()));
            recs.push(format!("FOC will decrease to approximately {new_foc:.1}%"));
            if diff.abs() > t.broadhead_large_difference {
                recs.push(
                    "Consider increasing shaft weight or using heavier broadheads".to_string(),
                );
            }
        } else {
            recs.push("Field point and broadhead weights match".to_string());
        }

        Ok(BroadheadAdjustment {
            weight_difference: diff,
            foc_change,
            new_foc_estimate: new_foc,
            adjustments_needed: diff.abs() > t.broadhead_adjustment_threshold,
            recommendations: recs,
        })
    }
}

fn optimization_recommendations(results: &[ScoredConfiguration], goal: TuningGoal) -> Vec<String> {
    let (Some(best), Some(worst)) = (results.first(), results.last()) else {
        return Vec::new();
    };
    let mut recs = vec![
        format!(
            "Best configuration scores {:.1} vs worst at {:.1}",
            best.score, worst.score
        ),
        format!(
            "Point weight choice spans {:.1} score points",
            best.score - worst.score
        ),
    ];
    match goal {
        TuningGoal::MaximumSpeed => {
            if let Some(fastest) = results
                .iter()
                .max_by(|a, b| a.analysis.speed_estimate.total_cmp(&b.analysis.speed_estimate))
            {
                recs.push(format!(
                    "Fastest setup: {:.0}gr point = {:.0} fps",
                    fastest.point_weight, fastest.analysis.speed_estimate
                ));
            }
        }
        TuningGoal::OptimalPenetration => {
            if let Some(deepest) = results.iter().max_by(|a, b| {
                a.analysis
                    .penetration_score
                    .total_cmp(&b.analysis.penetration_score)
            }) {
                recs.push(format!("Best penetration: {:.0}gr point", deepest.point_weight));
            }
        }
        _ => {}
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference_arrow() -> ArrowComponents {
        ArrowComponents::new(300.0, 100.0, 10.0, 15.0, 15.0)
    }

    fn setup() -> ShotSetup {
        ShotSetup::new(29.0, 60.0, 0.246)
    }

    #[test]
    fn reference_analysis() {
        let calc = TuningCalculator::default();
        let r = calc
            .comprehensive_tuning_analysis(
                &reference_arrow(),
                &setup(),
                TuningGoal::BalancedPerformance,
                ArrowType::HuntingBigGame,
            )
            .unwrap();
        assert_eq!(r.total_weight, 440.0);
        assert!((r.foc_percentage - 10.286).abs() < 1e-2);
        // 390 * sqrt(350 / 440)
        assert!((r.speed_estimate - 390.0 * (350.0f64 / 440.0).sqrt()).abs() < 1e-9);
        assert!(r.speed_estimate > 320.0);
        assert_eq!(r.trajectory_rating, "Flat trajectory with good energy retention");
        // 50 + 20 + 15 + 10
        assert_eq!(r.accuracy_score, 95.0);
        assert!(r.penetration_score > 0.0 && r.penetration_score <= 100.0);
        assert_eq!(r.ideal_foc_range, (11.0, 15.0));
        assert!(r.recommendations[0].starts_with("FOC is low (10.3%)"));
    }

    #[test]
    fn breakdown_sums_to_hundred() {
        let calc = TuningCalculator::default();
        let mut arrow = reference_arrow();
        arrow.wrap_weight = 6.0;
        arrow.outsert_weight = 14.0;
        let r = calc
            .comprehensive_tuning_analysis(
                &arrow,
                &setup(),
                TuningGoal::MaximumSpeed,
                ArrowType::TargetOutdoor,
            )
            .unwrap();
        let b = r.component_breakdown;
        let sum = b.shaft + b.point + b.nock + b.fletching + b.insert + b.wrap + b.outsert;
        assert!((sum - 100.0).abs() < 1e-9);
        assert!(b.wrap > 0.0 && b.outsert > 0.0);
    }

    #[test]
    fn accuracy_goal_bonus_is_capped() {
        let calc = TuningCalculator::default();
        assert_eq!(calc.accuracy_score(440.0, 10.0, 29.0, TuningGoal::MaximumAccuracy), 100.0);
        assert_eq!(calc.accuracy_score(440.0, 10.0, 29.0, TuningGoal::MaximumSpeed), 95.0);
        // Outside every band: foc 20 -> 5, weight 625 -> 11, length 35 -> 4.5.
        assert_eq!(calc.accuracy_score(625.0, 20.0, 35.0, TuningGoal::MaximumSpeed), 70.5);
    }

    #[test]
    fn degenerate_penetration_inputs_clamp() {
        let calc = TuningCalculator::default();
        assert_eq!(calc.penetration_score(440.0, 0.0, 10.0, 0.0), 0.0);
        assert_eq!(calc.penetration_score(440.0, 300.0, -5.0, 0.246), 0.0);
        assert_eq!(calc.penetration_score(f64::NAN, 300.0, 10.0, 0.246), 0.0);
        assert_eq!(calc.penetration_score(2000.0, 400.0, 30.0, 0.001), 100.0);
    }

    #[test]
    fn wind_drift_reference_arrow_is_one() {
        let calc = TuningCalculator::default();
        assert_eq!(calc.wind_drift_factor(400.0, 0.244, 300.0), 1.0);
        assert_eq!(calc.wind_drift_factor(800.0, 0.244, 300.0), 0.5);
        assert_eq!(calc.wind_drift_factor(0.0, 0.244, 0.0), 1.0);
    }

    #[test]
    fn trajectory_bands() {
        let calc = TuningCalculator::default();
        assert_eq!(calc.rate_trajectory(330.0, 300.0), "Very flat, but may lack downrange energy");
        assert_eq!(calc.rate_trajectory(300.0, 400.0), "Good trajectory with balanced performance");
        assert_eq!(calc.rate_trajectory(260.0, 400.0), "Moderate arc, good for close-medium range");
        assert_eq!(
            calc.rate_trajectory(250.0, 400.0),
            "High arc, requires careful range estimation"
        );
    }

    #[test]
    fn ideal_foc_shifts_by_bow_type() {
        let calc = TuningCalculator::default();
        assert_eq!(
            calc.calculate_ideal_foc_range(ArrowType::TargetIndoor, BowType::Compound),
            (7.0, 9.0)
        );
        assert_eq!(
            calc.calculate_ideal_foc_range(ArrowType::TargetIndoor, BowType::Recurve),
            (8.0, 11.0)
        );
        assert_eq!(
            calc.calculate_ideal_foc_range(ArrowType::HuntingBigGame, BowType::Longbow),
            (13.0, 18.0)
        );
    }

    #[test]
    fn hunting_weight_recommendations() {
        let calc = TuningCalculator::default();
        let light = ArrowComponents::new(180.0, 100.0, 10.0, 15.0, 15.0);
        let r = calc
            .comprehensive_tuning_analysis(
                &light,
                &setup(),
                TuningGoal::OptimalPenetration,
                ArrowType::HuntingSmallGame,
            )
            .unwrap();
        assert!(r.recommendations.iter().any(|s| s.contains("too light for hunting")));

        let r = calc
            .comprehensive_tuning_analysis(
                &light,
                &setup(),
                TuningGoal::OptimalPenetration,
                ArrowType::TargetIndoor,
            )
            .unwrap();
        assert!(!r.recommendations.iter().any(|s| s.contains("hunting")));
    }

    #[test]
    fn optimize_ranks_every_candidate() {
        let calc = TuningCalculator::default();
        let points = [75.0, 100.0, 125.0, 150.0, 175.0, 200.0];
        let out = calc
            .optimize_for_goal(
                &reference_arrow(),
                &setup(),
                TuningGoal::MaximumSpeed,
                ArrowType::TargetOutdoor,
                &points,
            )
            .unwrap();
        assert_eq!(out.all_results.len(), 6);
        // Lightest point is fastest.
        assert_eq!(out.best.point_weight, 75.0);
        assert!(out.recommendations.iter().any(|r| r.starts_with("Fastest setup: 75gr point")));
        for pair in out.all_results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn optimize_ties_keep_candidate_order() {
        let calc = TuningCalculator::default();
        let out = calc
            .optimize_for_goal(
                &reference_arrow(),
                &setup(),
                TuningGoal::MaximumAccuracy,
                ArrowType::TargetOutdoor,
                &[100.0, 100.0],
            )
            .unwrap();
        assert_eq!(out.all_results[0].score, out.all_results[1].score);
        assert_eq!(out.best, out.all_results[0]);
    }

    #[test]
    fn optimize_without_candidates_is_an_error() {
        let calc = TuningCalculator::default();
        let err = calc
            .optimize_for_goal(
                &reference_arrow(),
                &setup(),
                TuningGoal::MaximumSpeed,
                ArrowType::TargetOutdoor,
                &[],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TuningError::Validation { field: "available_point_weights", .. }
        ));
    }

    #[test]
    fn analysis_rejects_non_positive_bow_weight() {
        let calc = TuningCalculator::default();
        let err = calc
            .comprehensive_tuning_analysis(
                &reference_arrow(),
                &ShotSetup::new(29.0, 0.0, 0.246),
                TuningGoal::MaximumSpeed,
                ArrowType::TargetOutdoor,
            )
            .unwrap_err();
        assert!(matches!(err, TuningError::Validation { field: "bow_weight", .. }));
    }

    #[test]
    fn broadhead_switch() {
        let calc = TuningCalculator::default();
        let adj = calc.calculate_broadhead_tuning_adjustments(100.0, 125.0, 10.0).unwrap();
        assert_eq!(adj.weight_difference, 25.0);
        assert!((adj.foc_change - 0.375).abs() < 1e-12);
        assert!(adj.adjustments_needed);
        assert!(adj.recommendations.iter().any(|r| r.contains("reducing shaft weight")));

        let adj = calc.calculate_broadhead_tuning_adjustments(100.0, 97.0, 10.0).unwrap();
        assert!(!adj.adjustments_needed);
        assert_eq!(adj.recommendations[0], "Broadheads are 3 grains lighter");

        let adj = calc.calculate_broadhead_tuning_adjustments(100.0, 100.0, 10.0).unwrap();
        assert_eq!(adj.foc_change, 0.0);
        assert_eq!(adj.recommendations.len(), 1);
    }

    fn goal() -> impl Strategy<Value = TuningGoal> {
        prop::sample::select(TuningGoal::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn scores_stay_in_bounds(
            weight in prop_oneof![Just(0.0), Just(f64::NAN), -100.0f64..3000.0],
            speed in prop_oneof![Just(0.0), -50.0f64..600.0],
            foc in -60.0f64..60.0,
            diameter in prop_oneof![Just(0.0), Just(-0.1), 0.0f64..1.0],
            length in 0.0f64..40.0,
            goal in goal(),
        ) {
            let calc = TuningCalculator::default();
            let p = calc.penetration_score(weight, speed, foc, diameter);
            let a = calc.accuracy_score(weight, foc, length, goal);
            prop_assert!((0.0..=100.0).contains(&p));
            prop_assert!((0.0..=100.0).contains(&a));
        }

        #[test]
        fn optimization_is_exhaustive(
            points in prop::collection::vec(20.0f64..300.0, 1..12),
            goal in goal(),
        ) {
            let calc = TuningCalculator::default();
            let out = calc
                .optimize_for_goal(
                    &reference_arrow(),
                    &setup(),
                    goal,
                    ArrowType::HuntingBigGame,
                    &points,
                )
                .unwrap();
            prop_assert_eq!(out.all_results.len(), points.len());
            let max = out.all_results.iter().map(|r| r.score).fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(out.best.score, max);
        }
    }
}
