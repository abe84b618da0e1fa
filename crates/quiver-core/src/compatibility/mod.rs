//! Rule-based arrow/component compatibility scoring.
//!
//! Each category carries an ordered rule list: active custom rules by
//! descending priority, then the built-in table. Every rule is evaluated;
//! the highest-scoring match decides the compatibility type and all
//! matches are reported.

mod evaluate;
pub mod rules;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::catalog::CatalogSource;
use crate::config::CompatibilityConfig;
use crate::model::{Arrow, CompatibilityType, Component, ComponentCategory};

use evaluate::{RuleContext, evaluate};
pub use rules::{
    BuiltinCheck, CompatibilityRule, Condition, FletchingCheck, InsertCheck, NockCheck,
    PointCheck, StoredRule, builtin_rules,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityResult {
    pub component_id: u64,
    pub arrow_id: u64,
    pub compatibility_type: CompatibilityType,
    /// 0..=1.
    pub score: f64,
    pub matching_rules: Vec<String>,
    pub notes: String,
}

impl CompatibilityResult {
    fn incompatible(arrow_id: u64, component_id: u64, notes: &str) -> Self {
        Self {
            component_id,
            arrow_id,
            compatibility_type: CompatibilityType::Incompatible,
            score: 0.0,
            matching_rules: Vec::new(),
            notes: notes.to_string(),
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.compatibility_type != CompatibilityType::Incompatible
    }

    pub fn is_strong_match(&self, threshold: f64) -> bool {
        self.is_compatible() && self.score >= threshold
    }
}

/// A catalog component paired with its compatibility verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibleComponent {
    pub component: Component,
    pub compatibility: CompatibilityResult,
}

#[derive(Debug, Clone)]
pub struct CompatibilityEngine {
    config: CompatibilityConfig,
    rules: BTreeMap<ComponentCategory, Vec<CompatibilityRule>>,
}

impl Default for CompatibilityEngine {
    fn default() -> Self {
        Self::new(CompatibilityConfig::default())
    }
}

impl CompatibilityEngine {
    /// Engine with the built-in rule table only.
    pub fn new(config: CompatibilityConfig) -> Self {
        Self::with_custom_rules(config, &[])
    }

    /// Engine with `stored` rules ahead of the built-ins. Inactive rows are
    /// ignored; rows that fail to compile are logged and skipped.
    pub fn with_custom_rules(config: CompatibilityConfig, stored: &[StoredRule]) -> Self {
        let mut custom: Vec<(i32, CompatibilityRule)> = Vec::new();
        for row in stored.iter().filter(|r| r.active) {
            match row.compile() {
                Ok(rule) => custom.push((row.priority, rule)),
                Err(e) => warn!(rule = %row.rule_name, reason = %e, "custom rule skipped"),
            }
        }
        // Stable: equal priorities keep storage order.
        custom.sort_by(|a, b| b.0.cmp(&a.0));

        let table = custom
            .into_iter()
            .map(|(_, rule)| rule)
            .chain(ComponentCategory::ALL.iter().flat_map(|c| builtin_rules(*c)));
        Self::from_rules(config, table)
    }

    /// Engine over exactly `rules`, kept in the given order per category.
    pub fn from_rules(
        config: CompatibilityConfig,
        rules: impl IntoIterator<Item = CompatibilityRule>,
    ) -> Self {
        let mut table: BTreeMap<ComponentCategory, Vec<CompatibilityRule>> = BTreeMap::new();
        for rule in rules {
            table.entry(rule.category).or_default().push(rule);
        }
        Self {
            config,
            rules: table,
        }
    }

    pub fn config(&self) -> &CompatibilityConfig {
        &self.config
    }

    /// Rules for `category` in evaluation order.
    pub fn rules(&self, category: ComponentCategory) -> &[CompatibilityRule] {
        self.rules.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn check_compatibility(&self, arrow: &Arrow, component: &Component) -> CompatibilityResult {
        let Some(spec) = arrow.primary_spec() else {
            return CompatibilityResult::incompatible(
                arrow.id,
                component.id,
                "Arrow has no spine specifications",
            );
        };
        let ctx = RuleContext {
            arrow,
            spec,
            component,
            config: &self.config,
        };

        let mut matching_rules = Vec::new();
        let mut notes = Vec::new();
        let mut best_score = 0.0;
        let mut best_type = CompatibilityType::Incompatible;

        for rule in self.rules(component.category) {
            let hit = evaluate(&rule.condition, &ctx);
            let score = hit.as_ref().map_or(0.0, |h| rule.score * h.factor);
            trace!(
                category = %component.category,
                rule = %rule.rule_name,
                matched = hit.is_some(),
                score,
                "rule evaluated"
            );
            let Some(hit) = hit else { continue };
            matching_rules.push(rule.rule_name.clone());
            if score > best_score {
                best_score = score;
                best_type = rule.compatibility_type;
            }
            if !hit.note.is_empty() {
                notes.push(hit.note);
            }
        }

        if matching_rules.is_empty()
            && component.category == ComponentCategory::Fletchings
            && component
                .spec_str("attachment")
                .is_some_and(|a| a.eq_ignore_ascii_case("adhesive"))
        {
            matching_rules.push("universal_adhesive".to_string());
            best_score = self.config.adhesive_fallback_score;
            best_type = CompatibilityType::Universal;
            notes.push("Adhesive fletching works with most arrows".to_string());
        }

        debug!(
            arrow_id = arrow.id,
            component_id = component.id,
            compatibility_type = %best_type,
            score = best_score,
            "compatibility checked"
        );

        CompatibilityResult {
            component_id: component.id,
            arrow_id: arrow.id,
            compatibility_type: best_type,
            score: best_score,
            matching_rules,
            notes: if notes.is_empty() {
                "No specific compatibility rules matched".to_string()
            } else {
                notes.join("; ")
            },
        }
    }

    /// Like [`check_compatibility`](Self::check_compatibility), reading both
    /// records from `source`. Missing records yield an incompatible result.
    pub fn check_by_id(
        &self,
        source: &dyn CatalogSource,
        arrow_id: u64,
        component_id: u64,
    ) -> CompatibilityResult {
        let Some(arrow) = source.arrow(arrow_id) else {
            return CompatibilityResult::incompatible(arrow_id, component_id, "Arrow not found");
        };
        let Some(component) = source.component(component_id) else {
            return CompatibilityResult::incompatible(arrow_id, component_id, "Component not found");
        };
        self.check_compatibility(&arrow, &component)
    }

    /// Every compatible pair from the cross product, best score first.
    pub fn batch_compatibility_check(
        &self,
        source: &dyn CatalogSource,
        arrow_ids: &[u64],
        component_ids: &[u64],
    ) -> Vec<CompatibilityResult> {
        let mut results: Vec<CompatibilityResult> = arrow_ids
            .iter()
            .flat_map(|&a| component_ids.iter().map(move |&c| (a, c)))
            .map(|(a, c)| self.check_by_id(source, a, c))
            .filter(CompatibilityResult::is_compatible)
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }

    /// Compatible components for one arrow, best score first.
    pub fn get_compatible_components(
        &self,
        source: &dyn CatalogSource,
        arrow_id: u64,
        category: Option<ComponentCategory>,
    ) -> Vec<CompatibleComponent> {
        let Some(arrow) = source.arrow(arrow_id) else {
            return Vec::new();
        };
        let mut compatible: Vec<CompatibleComponent> = source
            .components(category)
            .into_iter()
            .filter_map(|component| {
                let compatibility = self.check_compatibility(&arrow, &component);
                compatibility.is_compatible().then_some(CompatibleComponent {
                    component,
                    compatibility,
                })
            })
            .collect();
        compatible.sort_by(|a, b| b.compatibility.score.total_cmp(&a.compatibility.score));
        compatible
    }

    /// Whether `result` clears the configured strong-match threshold.
    pub fn is_strong_match(&self, result: &CompatibilityResult) -> bool {
        result.is_strong_match(self.config.strong_match_threshold)
    }
}
