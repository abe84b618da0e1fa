//! End-to-end tuning session: match arrows for an archer, analyse the best
//! few, optimise point weight for each goal, and write up advice.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::compatibility::{CompatibilityEngine, StoredRule};
use crate::config::EngineConfig;
use crate::error::TuningError;
use crate::matching::{ArrowMatch, ArrowMatchingEngine, MatchRequest};
use crate::model::{ArcherProfile, Arrow, ArrowComponents, ExperienceLevel, TuningGoal};
use crate::spine::{SpineCalculator, SpineRequirement, SpineResolver};
use crate::tuning::{OptimizationOutcome, ShotSetup, TuningCalculator, TuningResult};

/// Extra constraints layered onto the archer profile for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomRequirements {
    /// Outer diameter, inches.
    #[serde(default)]
    pub diameter_range: Option<(f64, f64)>,
    /// GPI.
    #[serde(default)]
    pub weight_range: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Matched,
    NoArrowsFound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningSession {
    pub archer: String,
    pub outcome: SessionOutcome,
    pub goals: Vec<TuningGoal>,
    pub spine_requirement: SpineRequirement,
    pub recommended_arrows: Vec<ArrowMatch>,
    /// Keyed by `"{manufacturer}_{model_name}"`.
    pub tuning_analysis: BTreeMap<String, TuningResult>,
    /// Keyed by goal name.
    pub optimization_results: BTreeMap<String, OptimizationOutcome>,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Every engine wired to one configuration.
#[derive(Debug, Clone)]
pub struct ArrowTuningSystem {
    config: EngineConfig,
    spine: SpineCalculator,
    tuning: TuningCalculator,
    matching: ArrowMatchingEngine,
    compatibility: CompatibilityEngine,
}

impl Default for ArrowTuningSystem {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ArrowTuningSystem {
    pub fn new(config: EngineConfig) -> Self {
        let spine = SpineCalculator::new(config.spine.clone(), config.ballistics.clone());
        let tuning = TuningCalculator::new(config.ballistics.clone(), config.tuning.clone());
        let matching = ArrowMatchingEngine::new(spine.clone(), config.matching.clone());
        let compatibility = CompatibilityEngine::new(config.compatibility.clone());
        Self {
            config,
            spine,
            tuning,
            matching,
            compatibility,
        }
    }

    /// Swap the spine strategy used by direct calculations and matching.
    pub fn with_spine_resolver(mut self, resolver: Arc<dyn SpineResolver>) -> Self {
        self.spine = self.spine.with_resolver(resolver);
        self.matching = ArrowMatchingEngine::new(self.spine.clone(), self.config.matching.clone());
        self
    }

    pub fn with_custom_rules(mut self, rules: &[StoredRule]) -> Self {
        self.compatibility =
            CompatibilityEngine::with_custom_rules(self.config.compatibility.clone(), rules);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn spine_calculator(&self) -> &SpineCalculator {
        &self.spine
    }

    pub fn tuning_calculator(&self) -> &TuningCalculator {
        &self.tuning
    }

    pub fn matching_engine(&self) -> &ArrowMatchingEngine {
        &self.matching
    }

    pub fn compatibility_engine(&self) -> &CompatibilityEngine {
        &self.compatibility
    }

    /// Build a session for `profile` against `arrows`. The first goal drives
    /// the per-arrow analysis; every goal gets an optimization pass. With no
    /// goals, balanced performance is used.
    ///
    /// Finding nothing is an `Ok` session with
    /// [`SessionOutcome::NoArrowsFound`]; invalid profile numbers are an
    /// error.
    pub fn create_tuning_session(
        &self,
        profile: &ArcherProfile,
        goals: &[TuningGoal],
        requirements: Option<&CustomRequirements>,
        arrows: &[Arrow],
    ) -> Result<TuningSession, TuningError> {
        let goals: Vec<TuningGoal> = if goals.is_empty() {
            vec![TuningGoal::BalancedPerformance]
        } else {
            goals.to_vec()
        };

        let request = self.match_request(profile, requirements);
        let found = self.matching.find_matches(&request, arrows)?;

        let session = if found.matches.is_empty() {
            empty_session(profile, goals, found.requirement)
        } else {
            self.matched_session(profile, goals, found.requirement, found.matches)?
        };

        info!(
            archer = %session.archer,
            matches = session.recommended_arrows.len(),
            goals = session.goals.len(),
            outcome = ?session.outcome,
            "tuning session built"
        );
        Ok(session)
    }

    fn match_request(
        &self,
        profile: &ArcherProfile,
        requirements: Option<&CustomRequirements>,
    ) -> MatchRequest {
        let cfg = &self.config.session;
        let mut request = MatchRequest::new(profile.bow.clone(), profile.arrow_length);
        request.point_weight = profile.point_weight_preference;
        request.nock_weight = cfg.standard_nock_weight;
        request.fletching_weight = cfg.standard_fletching_weight;
        request.insert_weight = cfg.standard_insert_weight;
        request.preferred_manufacturers = profile.preferred_manufacturers.clone();
        request.target_foc_range = profile.target_foc_range;
        request.arrow_type_preference = profile.arrow_type_preference();
        request.material_preference = profile.material_preference.clone();
        request.max_results = Some(cfg.max_results);
        if let Some(req) = requirements {
            request.target_diameter_range = req.diameter_range;
            request.target_weight_range = req.weight_range;
        }
        request
    }

    /// Components a matched shaft would be built with for this archer.
    fn assembly(&self, profile: &ArcherProfile, m: &ArrowMatch) -> (ArrowComponents, ShotSetup) {
        let cfg = &self.config.session;
        let components = ArrowComponents::new(
            m.gpi_weight * profile.arrow_length,
            profile.point_weight_preference,
            cfg.standard_nock_weight,
            cfg.standard_fletching_weight,
            cfg.standard_insert_weight,
        );
        let diameter = if m.outer_diameter > 0.0 {
            m.outer_diameter
        } else {
            self.config.tuning.default_arrow_diameter
        };
        (
            components,
            ShotSetup::for_bow(&profile.bow, profile.arrow_length, diameter),
        )
    }

    fn matched_session(
        &self,
        profile: &ArcherProfile,
        goals: Vec<TuningGoal>,
        spine_requirement: SpineRequirement,
        matches: Vec<ArrowMatch>,
    ) -> Result<TuningSession, TuningError> {
        let arrow_type = profile.arrow_type();
        let primary_goal = goals[0];

        let wanted = self.config.session.analysed_matches;
        let mut tuning_analysis = BTreeMap::new();
        let mut base = None;
        for m in &matches {
            if tuning_analysis.len() == wanted {
                break;
            }
            let (components, setup) = self.assembly(profile, m);
            match self.tuning.comprehensive_tuning_analysis(
                &components,
                &setup,
                primary_goal,
                arrow_type,
            ) {
                Ok(analysis) => {
                    let key = format!("{}_{}", m.manufacturer, m.model_name);
                    tuning_analysis.insert(key, analysis);
                    base.get_or_insert((components, setup));
                }
                Err(e) => warn!(
                    arrow_id = m.arrow_id,
                    manufacturer = %m.manufacturer,
                    error = %e,
                    "tuning analysis skipped"
                ),
            }
        }

        let mut optimization_results = BTreeMap::new();
        if let Some((base, setup)) = &base {
            for goal in &goals {
                let outcome = self.tuning.optimize_for_goal(
                    base,
                    setup,
                    *goal,
                    arrow_type,
                    &self.config.session.point_weights,
                )?;
                optimization_results.insert(goal.as_str().to_string(), outcome);
            }
        }

        let recommendations =
            session_recommendations(profile, &goals, &matches, &optimization_results);
        let next_steps = session_next_steps(profile, &matches);
        Ok(TuningSession {
            archer: profile.name.clone(),
            outcome: SessionOutcome::Matched,
            goals,
            spine_requirement,
            recommended_arrows: matches,
            tuning_analysis,
            optimization_results,
            recommendations,
            next_steps,
        })
    }
}

fn empty_session(
    profile: &ArcherProfile,
    goals: Vec<TuningGoal>,
    spine_requirement: SpineRequirement,
) -> TuningSession {
    TuningSession {
        archer: profile.name.clone(),
        outcome: SessionOutcome::NoArrowsFound,
        goals,
        spine_requirement,
        recommended_arrows: Vec::new(),
        tuning_analysis: BTreeMap::new(),
        optimization_results: BTreeMap::new(),
        recommendations: vec![
            "No arrows found matching your criteria".to_string(),
            "Consider expanding manufacturer preferences".to_string(),
            "Check if draw weight and length are correctly specified".to_string(),
            "Consider consulting with a professional archery shop".to_string(),
        ],
        next_steps: vec![
            "Review bow configuration settings".to_string(),
            "Expand search criteria".to_string(),
            "Consider custom arrow building".to_string(),
        ],
    }
}

fn session_recommendations(
    profile: &ArcherProfile,
    goals: &[TuningGoal],
    matches: &[ArrowMatch],
    optimization: &BTreeMap<String, OptimizationOutcome>,
) -> Vec<String> {
    let mut out = Vec::new();
    let best = &matches[0];
    out.push(format!(
        "Primary recommendation: {} {} with {} spine (match score: {})",
        best.manufacturer, best.model_name, best.matched_spine, best.match_score
    ));

    match profile.experience_level {
        ExperienceLevel::Beginner => {
            out.push(
                "As a beginner, focus on consistent form before fine-tuning equipment".to_string(),
            );
            out.push("Consider starting with the most forgiving arrow setup".to_string());
        }
        ExperienceLevel::Advanced => {
            out.push("Consider testing multiple spine options for optimal tuning".to_string());
            out.push("Paper tuning and bare shaft testing recommended".to_string());
        }
        ExperienceLevel::Intermediate => {}
    }

    if profile.is_hunter() {
        out.push("Ensure broadhead compatibility testing before hunting season".to_string());
        out.push("Consider fixed-blade broadheads for consistency".to_string());
    } else if profile.is_target_archer() {
        out.push("Focus on consistency and accuracy over speed".to_string());
        out.push("Consider spine selection based on shooting distance".to_string());
    }

    let mut seen = Vec::new();
    for goal in goals {
        if seen.contains(goal) {
            continue;
        }
        seen.push(*goal);
        if let Some(outcome) = optimization.get(goal.as_str()) {
            out.push(format!(
                "For {}: optimal point weight is {:.0} grains",
                goal.label(),
                outcome.best.point_weight
            ));
        }
    }

    out.push("Start with manufacturer's recommended spine, then fine-tune".to_string());
    out.push("Keep detailed records of your testing and results".to_string());
    out
}

fn session_next_steps(profile: &ArcherProfile, matches: &[ArrowMatch]) -> Vec<String> {
    let mut steps = vec![
        format!("Purchase test arrows in {} spine", matches[0].matched_spine),
        "Start with 6 arrows for initial testing".to_string(),
        "Perform paper tuning at 6 feet".to_string(),
        "Conduct group testing at your primary shooting distance".to_string(),
    ];
    if profile.is_hunter() {
        steps.push("Test with your intended broadheads".to_string());
        steps.push("Verify point of impact consistency".to_string());
    }
    steps.push("Adjust rest position if needed based on paper tuning".to_string());
    steps.push("Consider micro-spine adjustments if groups are inconsistent".to_string());
    steps.push("Document all testing results for future reference".to_string());
    steps.push("Schedule follow-up tuning session after testing".to_string());
    steps
}
