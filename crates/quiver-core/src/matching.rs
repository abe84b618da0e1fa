//! Catalog search: resolve the required spine for a bow, then score and rank
//! every candidate arrow's closest spine option.
//!
//! Scoring is a weighted sum of per-criterion scores (0..=100). Reasons and
//! issues are derived separately from the same inputs, so a score can be
//! checked without parsing strings and vice versa.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use crate::config::MatchingConfig;
use crate::error::TuningError;
use crate::model::{
    Arrow, ArrowComponents, BowConfiguration, BowType, Confidence, SpineSpecification,
};
use crate::spine::{SpineCalculator, SpineInput, SpineRequirement};

fn default_point_weight() -> f64 {
    100.0
}

fn default_nock_weight() -> f64 {
    10.0
}

fn default_vane_weight() -> f64 {
    15.0
}

/// What the archer is shooting and what they would like in a shaft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub bow: BowConfiguration,
    /// Inches.
    pub arrow_length: f64,
    /// Grains.
    #[serde(default = "default_point_weight")]
    pub point_weight: f64,
    #[serde(default = "default_nock_weight")]
    pub nock_weight: f64,
    #[serde(default = "default_vane_weight")]
    pub fletching_weight: f64,
    #[serde(default = "default_vane_weight")]
    pub insert_weight: f64,
    /// Matched as case-insensitive substrings of the arrow manufacturer.
    /// Earlier entries win ties.
    #[serde(default)]
    pub preferred_manufacturers: Vec<String>,
    /// FOC percent, (min, max).
    #[serde(default)]
    pub target_foc_range: Option<(f64, f64)>,
    /// Inches, (min, max).
    #[serde(default)]
    pub target_diameter_range: Option<(f64, f64)>,
    /// GPI, (min, max).
    #[serde(default)]
    pub target_weight_range: Option<(f64, f64)>,
    #[serde(default)]
    pub arrow_type_preference: Option<String>,
    /// Hard filter on shaft material.
    #[serde(default)]
    pub material_preference: Option<String>,
    /// Falls back to the configured default.
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Falls back to the configured default.
    #[serde(default)]
    pub min_spine_options: Option<usize>,
}

impl MatchRequest {
    pub fn new(bow: BowConfiguration, arrow_length: f64) -> Self {
        Self {
            bow,
            arrow_length,
            point_weight: default_point_weight(),
            nock_weight: default_nock_weight(),
            fletching_weight: default_vane_weight(),
            insert_weight: default_vane_weight(),
            preferred_manufacturers: Vec::new(),
            target_foc_range: None,
            target_diameter_range: None,
            target_weight_range: None,
            arrow_type_preference: None,
            material_preference: None,
            max_results: None,
            min_spine_options: None,
        }
    }

    fn spine_input(&self) -> SpineInput {
        let input = SpineInput::new(self.arrow_length, self.point_weight);
        match &self.material_preference {
            Some(material) => input.with_material(material.clone()),
            None => input,
        }
    }

    fn wants_wood(&self) -> bool {
        self.material_preference
            .as_deref()
            .is_some_and(|m| material_key(m) == "wood")
    }

    /// Position of the first preferred manufacturer found in `manufacturer`.
    fn preference_rank(&self, manufacturer: &str) -> Option<usize> {
        let manufacturer = manufacturer.to_lowercase();
        self.preferred_manufacturers
            .iter()
            .position(|p| {
                let p = p.trim();
                !p.is_empty() && manufacturer.contains(&p.to_lowercase())
            })
    }

    fn estimated_components(&self, spec: &SpineSpecification) -> ArrowComponents {
        ArrowComponents::new(
            spec.gpi_weight * self.arrow_length,
            self.point_weight,
            self.nock_weight,
            self.fletching_weight,
            self.insert_weight,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrowMatch {
    pub arrow_id: u64,
    pub manufacturer: String,
    pub model_name: String,
    pub material: String,
    pub arrow_type: String,
    pub matched_spine: i32,
    /// Absolute distance from the required spine.
    pub spine_deviation: f64,
    pub gpi_weight: f64,
    pub outer_diameter: f64,
    pub inner_diameter: Option<f64>,
    /// 0..=100, one decimal.
    pub match_score: f64,
    pub confidence: Confidence,
    pub spine_specifications: Vec<SpineSpecification>,
    pub match_reasons: Vec<String>,
    pub potential_issues: Vec<String>,
}

/// Ranked matches plus the spine requirement they were ranked against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub requirement: SpineRequirement,
    pub matches: Vec<ArrowMatch>,
}

/// Per-criterion scores, each 0..=100.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CriterionScores {
    spine: f64,
    availability: f64,
    manufacturer: f64,
    diameter: f64,
    weight: f64,
    foc: f64,
    arrow_type: f64,
}

struct Candidate<'a> {
    arrow: &'a Arrow,
    spec: &'a SpineSpecification,
    deviation: f64,
    estimated_foc: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ArrowMatchingEngine {
    spine: SpineCalculator,
    config: MatchingConfig,
}

impl ArrowMatchingEngine {
    pub fn new(spine: SpineCalculator, config: MatchingConfig) -> Self {
        Self { spine, config }
    }

    pub fn spine_calculator(&self) -> &SpineCalculator {
        &self.spine
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Ranked matches for `request` from `arrows`. An empty catalog, or one
    /// where nothing survives filtering, yields an empty list.
    pub fn find_matching_arrows(
        &self,
        request: &MatchRequest,
        arrows: &[Arrow],
    ) -> Result<Vec<ArrowMatch>, TuningError> {
        Ok(self.find_matches(request, arrows)?.matches)
    }

    /// Like [`find_matching_arrows`](Self::find_matching_arrows), also
    /// returning the spine requirement used.
    pub fn find_matches(
        &self,
        request: &MatchRequest,
        arrows: &[Arrow],
    ) -> Result<MatchOutcome, TuningError> {
        let requirement = self
            .spine
            .calculate_required_spine(&request.bow, &request.spine_input())?;

        let cfg = &self.config;
        let tolerance = f64::from(requirement.tolerance);
        let window = tolerance * cfg.window_multiplier;
        let min_options = if request.wants_wood() {
            cfg.wood_min_spine_options
        } else {
            request.min_spine_options.unwrap_or(cfg.min_spine_options)
        };
        let eligible: Vec<&Arrow> = arrows
            .iter()
            .filter(|a| material_allowed(request.material_preference.as_deref(), &a.material))
            .collect();

        let mut candidates = self.candidates(&eligible, request, &requirement, window, min_options);
        if candidates.is_empty() && min_options > 1 {
            candidates = self.candidates(&eligible, request, &requirement, window, 1);
        }
        if candidates.is_empty() {
            let expanded = tolerance * cfg.expanded_window_multiplier;
            candidates = self.candidates(&eligible, request, &requirement, expanded, 1);
        }

        let mut matches: Vec<(Option<usize>, ArrowMatch)> = candidates
            .iter()
            .map(|c| {
                let m = self.build_match(c, request, &requirement);
                trace!(
                    manufacturer = %m.manufacturer,
                    model = %m.model_name,
                    spine = m.matched_spine,
                    deviation = m.spine_deviation,
                    score = m.match_score,
                    "match scored"
                );
                (request.preference_rank(&m.manufacturer), m)
            })
            .collect();

        matches.sort_by(|(rank_a, a), (rank_b, b)| rank_matches(a, *rank_a, b, *rank_b));
        let max_results = request.max_results.unwrap_or(self.config.default_max_results);
        let matches: Vec<ArrowMatch> = matches
            .into_iter()
            .map(|(_, m)| m)
            .take(max_results)
            .collect();

        info!(
            candidates = arrows.len(),
            matches = matches.len(),
            ideal_spine = requirement.spine,
            "matching complete"
        );
        Ok(MatchOutcome {
            requirement,
            matches,
        })
    }

    fn candidates<'a>(
        &self,
        arrows: &[&'a Arrow],
        request: &MatchRequest,
        requirement: &SpineRequirement,
        window: f64,
        min_options: usize,
    ) -> Vec<Candidate<'a>> {
        arrows
            .iter()
            .filter(|a| a.spine_specifications.len() >= min_options)
            .filter_map(|&arrow| {
                let wood = request.wants_wood() || material_key(&arrow.material) == "wood";
                let (spec, deviation) = if wood {
                    wood_spec(arrow, requirement.spine)?
                } else {
                    closest_spec(arrow, requirement.spine)?
                };
                if deviation > window {
                    return None;
                }
                let estimated_foc = self
                    .spine
                    .calculate_foc(&request.estimated_components(spec), request.arrow_length)
                    .ok()
                    .map(|m| m.foc_percentage);
                Some(Candidate {
                    arrow,
                    spec,
                    deviation,
                    estimated_foc,
                })
            })
            .collect()
    }

    fn build_match(
        &self,
        c: &Candidate<'_>,
        request: &MatchRequest,
        requirement: &SpineRequirement,
    ) -> ArrowMatch {
        let scores = self.criterion_scores(c, request, requirement);
        let match_score = self.weighted_score(&scores);
        ArrowMatch {
            arrow_id: c.arrow.id,
            manufacturer: c.arrow.manufacturer.clone(),
            model_name: c.arrow.model_name.clone(),
            material: c.arrow.material.clone(),
            arrow_type: c.arrow.arrow_type.clone(),
            matched_spine: c.spec.spine,
            spine_deviation: c.deviation,
            gpi_weight: c.spec.gpi_weight,
            outer_diameter: c.spec.outer_diameter,
            inner_diameter: c.spec.inner_diameter,
            match_score,
            confidence: self.confidence(match_score),
            spine_specifications: c.arrow.spine_specifications.clone(),
            match_reasons: self.match_reasons(c, request),
            potential_issues: self.potential_issues(c, request),
        }
    }

    // ── Scoring ──

    fn criterion_scores(
        &self,
        c: &Candidate<'_>,
        request: &MatchRequest,
        requirement: &SpineRequirement,
    ) -> CriterionScores {
        let cfg = &self.config;
        let tolerance = f64::from(requirement.tolerance.max(1));
        let spec_count = c.arrow.spine_specifications.len() as f64;

        let manufacturer = if request.preferred_manufacturers.is_empty()
            || request.preference_rank(&c.arrow.manufacturer).is_some()
        {
            100.0
        } else {
            cfg.non_preferred_manufacturer_score
        };

        let diameter = if c.spec.outer_diameter > 0.0 {
            range_score(
                c.spec.outer_diameter,
                request.target_diameter_range,
                cfg.diameter_penalty_scale,
            )
        } else {
            100.0
        };

        let foc = match (request.target_foc_range, c.estimated_foc) {
            (None, _) => 100.0,
            (Some(range), Some(foc)) => range_score(foc, Some(range), cfg.foc_penalty_scale),
            (Some(_), None) => 0.0,
        };

        let arrow_type = match request.arrow_type_preference.as_deref().map(str::trim) {
            None | Some("") => 100.0,
            Some(wanted) => match c.arrow.arrow_type.trim() {
                "" => cfg.arrow_type_unknown_score,
                actual if actual.eq_ignore_ascii_case(wanted) => 100.0,
                _ => cfg.arrow_type_mismatch_score,
            },
        };

        CriterionScores {
            spine: (100.0 - c.deviation / tolerance * 100.0).max(0.0),
            availability: (spec_count / cfg.availability_saturation * 100.0).min(100.0),
            manufacturer,
            diameter,
            weight: range_score(
                c.spec.gpi_weight,
                request.target_weight_range,
                cfg.gpi_penalty_scale,
            ),
            foc,
            arrow_type,
        }
    }

    fn weighted_score(&self, s: &CriterionScores) -> f64 {
        let w = &self.config.weights;
        let total = s.spine * w.spine
            + s.availability * w.availability
            + s.manufacturer * w.manufacturer
            + s.diameter * w.diameter
            + s.weight * w.weight
            + s.foc * w.foc
            + s.arrow_type * w.arrow_type;
        (total.clamp(0.0, 100.0) * 10.0).round() / 10.0
    }

    pub fn confidence(&self, match_score: f64) -> Confidence {
        if match_score >= self.config.high_confidence {
            Confidence::High
        } else if match_score >= self.config.medium_confidence {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    // ── Reporting ──

    fn match_reasons(&self, c: &Candidate<'_>, request: &MatchRequest) -> Vec<String> {
        let cfg = &self.config;
        let mut reasons = Vec::new();

        reasons.push(
            if c.deviation <= cfg.excellent_deviation {
                "Excellent spine match"
            } else if c.deviation <= cfg.good_deviation {
                "Good spine match"
            } else {
                "Acceptable spine match"
            }
            .to_string(),
        );

        let count = c.arrow.spine_specifications.len();
        if count >= cfg.excellent_availability {
            reasons.push(format!("Excellent availability ({count} spine options)"));
        } else if count >= cfg.good_availability {
            reasons.push(format!("Good availability ({count} spine options)"));
        }

        if request.preference_rank(&c.arrow.manufacturer).is_some() {
            reasons.push(format!("Preferred manufacturer ({})", c.arrow.manufacturer));
        }

        let diameter = c.spec.outer_diameter;
        if diameter > 0.0 {
            if diameter <= cfg.small_diameter {
                reasons.push("Small diameter for excellent penetration".to_string());
            } else if diameter >= cfg.large_diameter {
                reasons.push("Large diameter for maximum cutting surface".to_string());
            }
        }

        if let (Some((lo, hi)), Some(foc)) = (request.target_foc_range, c.estimated_foc)
            && (lo..=hi).contains(&foc)
        {
            reasons.push(format!("Estimated FOC {foc:.1}% within target range"));
        }

        reasons
    }

    fn potential_issues(&self, c: &Candidate<'_>, request: &MatchRequest) -> Vec<String> {
        let cfg = &self.config;
        let mut issues = Vec::new();

        if c.deviation > cfg.large_deviation {
            issues.push("Large spine deviation - may require tuning".to_string());
        } else if c.deviation > cfg.compensation_deviation {
            issues.push(
                "Moderate spine deviation - may require point weight compensation".to_string(),
            );
        }

        let gpi = c.spec.gpi_weight;
        if gpi > cfg.heavy_gpi && request.bow.bow_type == BowType::Compound {
            issues.push("Heavy arrow - may reduce arrow speed significantly".to_string());
        } else if gpi > 0.0 && gpi < cfg.light_gpi {
            issues.push("Very light arrow - may cause noise and vibration".to_string());
        }

        let diameter = c.spec.outer_diameter;
        if diameter > 0.0 && diameter < cfg.fragile_diameter {
            issues.push("Very small diameter - may be fragile".to_string());
        } else if diameter > cfg.drift_diameter {
            issues.push("Large diameter - may cause wind drift".to_string());
        }

        if c.arrow.spine_specifications.len() < cfg.good_availability {
            issues.push("Limited spine options available".to_string());
        }

        if request.target_foc_range.is_some() && c.estimated_foc.is_none() {
            issues.push("FOC could not be estimated".to_string());
        }

        issues
    }
}

/// Whether a catalog spine row has usable measurements. Rows with negative
/// or non-finite weight or diameter are skipped.
fn usable_spec(spec: &SpineSpecification) -> bool {
    let sane = |v: f64| v.is_finite() && v >= 0.0;
    sane(spec.gpi_weight)
        && sane(spec.outer_diameter)
        && spec.inner_diameter.is_none_or(sane)
}

/// Usable spine option nearest to `target`; the first listed wins a tie.
fn closest_spec(arrow: &Arrow, target: i32) -> Option<(&SpineSpecification, f64)> {
    let mut best: Option<(&SpineSpecification, f64)> = None;
    for spec in &arrow.spine_specifications {
        if !usable_spec(spec) {
            warn!(
                arrow_id = arrow.id,
                spine = spec.spine,
                gpi = spec.gpi_weight,
                outer_diameter = spec.outer_diameter,
                "spine specification skipped"
            );
            continue;
        }
        let deviation = f64::from(spec.spine.abs_diff(target));
        if best.is_none_or(|(_, d)| deviation < d) {
            best = Some((spec, deviation));
        }
    }
    best
}

/// Wood shafts come in a spine band rather than discrete sizes: a target
/// inside the band is a perfect match on the nearest listed spine.
fn wood_spec(arrow: &Arrow, target: i32) -> Option<(&SpineSpecification, f64)> {
    let (spec, deviation) = closest_spec(arrow, target)?;
    let spines = arrow
        .spine_specifications
        .iter()
        .filter(|s| usable_spec(s))
        .map(|s| s.spine);
    let (lo, hi, count) = spines.fold((i32::MAX, i32::MIN, 0usize), |(lo, hi, n), s| {
        (lo.min(s), hi.max(s), n + 1)
    });
    if count >= 2 && (lo..=hi).contains(&target) {
        Some((spec, 0.0))
    } else {
        Some((spec, deviation))
    }
}

/// 100 inside `range`, falling linearly to 0 at `scale` outside it.
fn range_score(actual: f64, range: Option<(f64, f64)>, scale: f64) -> f64 {
    let Some((lo, hi)) = range else {
        return 100.0;
    };
    let outside = if actual < lo {
        lo - actual
    } else if actual > hi {
        actual - hi
    } else {
        return 100.0;
    };
    (100.0 - outside / scale * 100.0).max(0.0)
}

/// Lowercase words joined by `-`, so "Carbon / Aluminum" equals
/// "carbon-aluminum".
fn material_key(material: &str) -> String {
    material
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn material_allowed(preference: Option<&str>, material: &str) -> bool {
    match preference.map(material_key) {
        None => true,
        Some(wanted) if wanted.is_empty() => true,
        Some(wanted) => material_key(material) == wanted,
    }
}

fn rank_matches(
    a: &ArrowMatch,
    rank_a: Option<usize>,
    b: &ArrowMatch,
    rank_b: Option<usize>,
) -> Ordering {
    b.match_score
        .total_cmp(&a.match_score)
        .then_with(|| a.spine_deviation.total_cmp(&b.spine_deviation))
        .then_with(|| rank_a.unwrap_or(usize::MAX).cmp(&rank_b.unwrap_or(usize::MAX)))
        .then_with(|| a.manufacturer.cmp(&b.manufacturer))
        .then_with(|| a.model_name.cmp(&b.model_name))
        .then_with(|| a.arrow_id.cmp(&b.arrow_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BowType;
    use proptest::prelude::*;

    fn bow() -> BowConfiguration {
        BowConfiguration::new(BowType::Compound, 60.0, 29.0)
    }

    fn request() -> MatchRequest {
        MatchRequest::new(bow(), 29.0)
    }

    fn ideal(engine: &ArrowMatchingEngine, req: &MatchRequest) -> i32 {
        engine
            .spine_calculator()
            .calculate_required_spine(&req.bow, &req.spine_input())
            .unwrap()
            .spine
    }

    fn spec(spine: i32) -> SpineSpecification {
        SpineSpecification {
            spine,
            outer_diameter: 0.246,
            inner_diameter: Some(0.204),
            gpi_weight: 8.0,
            length_options: vec![29.0, 30.0],
        }
    }

    fn arrow(id: u64, manufacturer: &str, spines: &[i32]) -> Arrow {
        Arrow {
            id,
            manufacturer: manufacturer.to_string(),
            model_name: format!("Model {id}"),
            material: "Carbon".to_string(),
            arrow_type: String::new(),
            spine_specifications: spines.iter().copied().map(spec).collect(),
        }
    }

    /// Eight options, the first exactly on `center`.
    fn full_range(center: i32) -> Vec<i32> {
        let mut spines = vec![center];
        spines.extend((1..8).map(|i| center + 100 * i));
        spines
    }

    #[test]
    fn empty_catalog_is_empty_not_error() {
        let engine = ArrowMatchingEngine::default();
        assert!(engine.find_matching_arrows(&request(), &[]).unwrap().is_empty());
    }

    #[test]
    fn invalid_bow_is_a_validation_error() {
        let engine = ArrowMatchingEngine::default();
        let mut req = request();
        req.bow.draw_weight = 0.0;
        let err = engine.find_matching_arrows(&req, &[]).unwrap_err();
        assert!(matches!(err, TuningError::Validation { field: "draw_weight", .. }));
    }

    #[test]
    fn perfect_candidate_scores_full_marks() {
        let engine = ArrowMatchingEngine::default();
        let req = request();
        let target = ideal(&engine, &req);
        let matches = engine
            .find_matching_arrows(&req, &[arrow(1, "Easton", &full_range(target))])
            .unwrap();

        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.matched_spine, target);
        assert_eq!(m.spine_deviation, 0.0);
        assert!((m.match_score - 100.0).abs() < 1e-9);
        assert_eq!(m.confidence, Confidence::High);
        assert_eq!(m.match_reasons[0], "Excellent spine match");
        assert_eq!(m.match_reasons[1], "Excellent availability (8 spine options)");
        assert!(m.potential_issues.is_empty());
    }

    #[test]
    fn window_excludes_far_spines() {
        let engine = ArrowMatchingEngine::default();
        let req = request();
        let target = ideal(&engine, &req);
        // Compound tolerance 25, window 75.
        let arrows = [
            arrow(1, "Easton", &[target + 75, target + 200, target + 300]),
            arrow(2, "Victory", &[target - 76, target + 200, target + 300]),
        ];
        let matches = engine.find_matching_arrows(&req, &arrows).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].arrow_id, 1);
        assert_eq!(matches[0].spine_deviation, 75.0);
        assert_eq!(
            matches[0].potential_issues[0],
            "Large spine deviation - may require tuning"
        );
    }

    #[test]
    fn spine_options_requirement_relaxes_only_when_nothing_passes() {
        let engine = ArrowMatchingEngine::default();
        let req = request();
        let target = ideal(&engine, &req);

        let single = arrow(1, "Easton", &[target]);
        let matches = engine.find_matching_arrows(&req, &[single.clone()]).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0]
            .potential_issues
            .contains(&"Limited spine options available".to_string()));

        let several = arrow(2, "Victory", &[target + 10, target + 120, target + 240]);
        let matches = engine.find_matching_arrows(&req, &[single, several]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].arrow_id, 2);
    }

    #[test]
    fn material_preference_is_a_hard_filter() {
        let engine = ArrowMatchingEngine::default();
        let mut req = request();
        req.material_preference = Some("carbon-aluminum".to_string());
        let target = ideal(&engine, &req);

        let mut hybrid = arrow(1, "Easton", &full_range(target));
        hybrid.material = "Carbon / Aluminum".to_string();
        let carbon = arrow(2, "Easton", &full_range(target));

        let matches = engine.find_matching_arrows(&req, &[hybrid, carbon]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].arrow_id, 1);
    }

    #[test]
    fn arrow_type_and_manufacturer_preferences_score() {
        let engine = ArrowMatchingEngine::default();
        let mut req = request();
        req.arrow_type_preference = Some("hunting".to_string());
        req.preferred_manufacturers = vec!["gold tip".to_string()];
        let target = ideal(&engine, &req);

        let mut target_arrow = arrow(1, "Gold Tip", &full_range(target));
        target_arrow.arrow_type = "target".to_string();
        let mut hunting = arrow(2, "Easton Archery", &full_range(target));
        hunting.arrow_type = "Hunting".to_string();

        let matches = engine
            .find_matching_arrows(&req, &[target_arrow, hunting])
            .unwrap();
        let by_id = |id| matches.iter().find(|m| m.arrow_id == id).unwrap();

        // Arrow type mismatch: 10% weight at 25 instead of 100.
        assert!((by_id(1).match_score - 92.5).abs() < 1e-9);
        // Non-preferred manufacturer: 10% weight at 50.
        assert!((by_id(2).match_score - 95.0).abs() < 1e-9);
        assert_eq!(matches[0].arrow_id, 2);
        assert!(by_id(1)
            .match_reasons
            .contains(&"Preferred manufacturer (Gold Tip)".to_string()));
    }

    #[test]
    fn ties_follow_preference_order() {
        let engine = ArrowMatchingEngine::default();
        let mut req = request();
        req.preferred_manufacturers = vec!["Victory".to_string(), "Easton".to_string()];
        let target = ideal(&engine, &req);

        let arrows = [
            arrow(1, "Easton", &full_range(target)),
            arrow(2, "Victory", &full_range(target)),
        ];
        let matches = engine.find_matching_arrows(&req, &arrows).unwrap();
        assert_eq!(matches[0].match_score, matches[1].match_score);
        assert_eq!(matches[0].manufacturer, "Victory");
    }

    #[test]
    fn target_ranges_penalise_outliers() {
        let engine = ArrowMatchingEngine::default();
        let mut req = request();
        req.target_diameter_range = Some((0.20, 0.25));
        req.target_weight_range = Some((6.0, 9.0));
        let target = ideal(&engine, &req);

        let fits = arrow(1, "Easton", &full_range(target));
        let mut fat = arrow(2, "Easton", &full_range(target));
        for s in &mut fat.spine_specifications {
            s.outer_diameter = 0.275;
            s.gpi_weight = 10.0;
        }

        let matches = engine.find_matching_arrows(&req, &[fits, fat]).unwrap();
        assert_eq!(matches[0].arrow_id, 1);
        // 0.025" out of 0.05" scale and 1 GPI out of 2: half marks on both.
        assert!((matches[1].match_score - 90.0).abs() < 1e-9);
    }

    #[test]
    fn foc_target_uses_estimated_assembly() {
        let engine = ArrowMatchingEngine::default();
        let mut req = request();
        req.target_foc_range = Some((40.0, 45.0));
        let target = ideal(&engine, &req);

        let matches = engine
            .find_matching_arrows(&req, &[arrow(1, "Easton", &full_range(target))])
            .unwrap();
        // Nowhere near 40% FOC: the FOC criterion bottoms out.
        assert!((matches[0].match_score - 90.0).abs() < 1e-9);
        assert!(!matches[0].match_reasons.iter().any(|r| r.contains("FOC")));
    }

    #[test]
    fn truncates_after_sorting() {
        let engine = ArrowMatchingEngine::default();
        let mut req = request();
        req.max_results = Some(2);
        let target = ideal(&engine, &req);

        let arrows = [
            arrow(1, "Easton", &[target + 30, target + 200, target + 300]),
            arrow(2, "Easton", &[target + 20, target + 200, target + 300]),
            arrow(3, "Easton", &[target, target + 200, target + 300]),
        ];
        let ids: Vec<u64> = engine
            .find_matching_arrows(&req, &arrows)
            .unwrap()
            .iter()
            .map(|m| m.arrow_id)
            .collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn expanded_window_is_the_last_resort() {
        let engine = ArrowMatchingEngine::default();
        let req = request();
        let target = ideal(&engine, &req);

        // Outside 3x tolerance (75), inside 5x (125).
        let far = arrow(1, "Easton", &[target + 100, target + 250, target + 400]);
        let matches = engine.find_matching_arrows(&req, &[far.clone()]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].spine_deviation, 100.0);

        let near = arrow(2, "Victory", &[target + 50]);
        let matches = engine.find_matching_arrows(&req, &[far.clone(), near]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].arrow_id, 2);

        let hopeless = arrow(3, "Victory", &[target + 126]);
        assert!(engine.find_matching_arrows(&req, &[hopeless]).unwrap().is_empty());
    }

    #[test]
    fn wood_band_containing_target_is_exact() {
        let engine = ArrowMatchingEngine::default();
        let req = request();
        let target = ideal(&engine, &req);

        let mut wood = arrow(1, "Rose City", &[target - 20, target + 30]);
        wood.material = "Wood".to_string();
        let matches = engine.find_matching_arrows(&req, &[wood]).unwrap();
        assert_eq!(matches[0].spine_deviation, 0.0);
        assert_eq!(matches[0].matched_spine, target - 20);
        assert_eq!(matches[0].match_reasons[0], "Excellent spine match");

        let mut outside = arrow(2, "Rose City", &[target + 10, target + 30]);
        outside.material = "Wood".to_string();
        let matches = engine.find_matching_arrows(&req, &[outside]).unwrap();
        assert_eq!(matches[0].spine_deviation, 10.0);
    }

    #[test]
    fn wood_requests_need_two_spine_options() {
        let engine = ArrowMatchingEngine::default();
        let mut req = request();
        req.material_preference = Some("wood".to_string());
        req.min_spine_options = Some(1);
        let target = ideal(&engine, &req);

        let mut single = arrow(1, "Rose City", &[target]);
        single.material = "wood".to_string();
        let mut pair = arrow(2, "Rose City", &[target - 5, target + 5]);
        pair.material = "wood".to_string();

        let matches = engine.find_matching_arrows(&req, &[single.clone(), pair]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].arrow_id, 2);
        assert_eq!(matches[0].spine_deviation, 0.0);

        // Alone, the single-spine shaft still comes back through the relaxed pass.
        assert_eq!(engine.find_matching_arrows(&req, &[single]).unwrap().len(), 1);
    }

    #[test]
    fn unusable_spine_rows_are_skipped() {
        let engine = ArrowMatchingEngine::default();
        let req = request();
        let target = ideal(&engine, &req);

        let mut broken = arrow(1, "Easton", &[target, target + 10, target + 200]);
        broken.spine_specifications[0].gpi_weight = -3.0;
        let good = arrow(2, "Victory", &full_range(target));

        let matches = engine.find_matching_arrows(&req, &[broken, good]).unwrap();
        let by_id = |id| matches.iter().find(|m| m.arrow_id == id).unwrap();
        assert_eq!(by_id(2).matched_spine, target);
        assert_eq!(by_id(1).matched_spine, target + 10);
        assert!(by_id(1).gpi_weight >= 0.0);
    }

    #[test]
    fn material_keys_normalise_separators() {
        assert_eq!(material_key("Carbon / Aluminum"), "carbon-aluminum");
        assert!(material_allowed(Some("WOOD"), "wood"));
        assert!(!material_allowed(Some("wood"), "carbon"));
        assert!(material_allowed(None, "anything"));
    }

    #[test]
    fn range_score_is_linear_outside() {
        assert_eq!(range_score(5.0, None, 1.0), 100.0);
        assert_eq!(range_score(5.0, Some((4.0, 6.0)), 1.0), 100.0);
        assert!((range_score(6.5, Some((4.0, 6.0)), 1.0) - 50.0).abs() < 1e-9);
        assert_eq!(range_score(0.0, Some((4.0, 6.0)), 1.0), 0.0);
    }

    fn catalog() -> impl Strategy<Value = Vec<Arrow>> {
        let manufacturers =
            prop::sample::select(vec!["Easton", "Gold Tip", "Victory", "Black Eagle"]);
        let spec = (250i32..500, 0.18f64..0.40, 4.0f64..14.0).prop_map(|(spine, od, gpi)| {
            SpineSpecification {
                spine,
                outer_diameter: od,
                inner_diameter: None,
                gpi_weight: gpi,
                length_options: Vec::new(),
            }
        });
        prop::collection::vec(
            (manufacturers, prop::collection::vec(spec, 1..6)),
            0..12,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (manufacturer, specs))| Arrow {
                    id: i as u64,
                    manufacturer: manufacturer.to_string(),
                    model_name: format!("M{}", i % 3),
                    material: "carbon".to_string(),
                    arrow_type: String::new(),
                    spine_specifications: specs,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn ranking_is_sorted_and_deterministic(
            arrows in catalog(),
            draw_weight in 30.0f64..80.0,
            foc_target in proptest::bool::ANY,
        ) {
            let engine = ArrowMatchingEngine::default();
            let bow = BowConfiguration::new(BowType::Compound, draw_weight, 29.0);
            let mut req = MatchRequest::new(bow, 29.0);
            req.preferred_manufacturers = vec!["Victory".to_string()];
            if foc_target {
                req.target_foc_range = Some((8.0, 14.0));
            }

            let first = engine.find_matching_arrows(&req, &arrows).unwrap();
            let second = engine.find_matching_arrows(&req, &arrows).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert!(first.windows(2).all(|w| w[0].match_score >= w[1].match_score));
            prop_assert!(first.iter().all(|m| (0.0..=100.0).contains(&m.match_score)));
        }
    }
}
