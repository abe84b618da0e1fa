//! Compatibility rules as data.
//!
//! Built-in checks are enums keyed by category, so a rule can only name a
//! check that exists for its category. Custom rules arrive as
//! [`StoredRule`] rows whose `rule_logic` column holds JSON:
//!
//! ```json
//! {
//!   "conditions": { "check": "all", "conditions": [
//!       { "check": "builtin", "builtin": { "point": "thread_compatibility" } },
//!       { "check": "spec_range", "key": "weight", "min": 85, "max": 125 }
//!   ]},
//!   "compatibility_type": "direct",
//!   "score": 0.92
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::TuningError;
use crate::model::{CompatibilityType, ComponentCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointCheck {
    ThreadCompatibility,
    WeightRange,
    UniversalThread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NockCheck {
    DiameterMatch,
    FitTypeCompatible,
    UniversalFit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertCheck {
    OuterDiameterMatch,
    ThreadCompatibility,
    ManufacturerMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FletchingCheck {
    UniversalAdhesive,
    MaterialCompatible,
    DiameterAppropriate,
}

/// A compiled-in predicate, keyed by the category it belongs to:
/// `{ "insert": "thread_compatibility" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinCheck {
    Point(PointCheck),
    Nock(NockCheck),
    Insert(InsertCheck),
    Fletching(FletchingCheck),
}

impl BuiltinCheck {
    pub fn category(&self) -> ComponentCategory {
        match self {
            Self::Point(_) => ComponentCategory::Points,
            Self::Nock(_) => ComponentCategory::Nocks,
            Self::Insert(_) => ComponentCategory::Inserts,
            Self::Fletching(_) => ComponentCategory::Fletchings,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Point(PointCheck::ThreadCompatibility) => "thread_compatibility",
            Self::Point(PointCheck::WeightRange) => "weight_range",
            Self::Point(PointCheck::UniversalThread) => "universal_thread",
            Self::Nock(NockCheck::DiameterMatch) => "diameter_match",
            Self::Nock(NockCheck::FitTypeCompatible) => "fit_type_compatible",
            Self::Nock(NockCheck::UniversalFit) => "universal_fit",
            Self::Insert(InsertCheck::OuterDiameterMatch) => "outer_diameter_match",
            Self::Insert(InsertCheck::ThreadCompatibility) => "thread_compatibility",
            Self::Insert(InsertCheck::ManufacturerMatch) => "manufacturer_match",
            Self::Fletching(FletchingCheck::UniversalAdhesive) => "universal_adhesive",
            Self::Fletching(FletchingCheck::MaterialCompatible) => "material_compatible",
            Self::Fletching(FletchingCheck::DiameterAppropriate) => "diameter_appropriate",
        }
    }

    /// Every check available to `category`.
    pub fn for_category(category: ComponentCategory) -> &'static [BuiltinCheck] {
        use BuiltinCheck::*;
        match category {
            ComponentCategory::Points => &[
                Point(PointCheck::ThreadCompatibility),
                Point(PointCheck::WeightRange),
                Point(PointCheck::UniversalThread),
            ],
            ComponentCategory::Nocks => &[
                Nock(NockCheck::DiameterMatch),
                Nock(NockCheck::FitTypeCompatible),
                Nock(NockCheck::UniversalFit),
            ],
            ComponentCategory::Inserts => &[
                Insert(InsertCheck::OuterDiameterMatch),
                Insert(InsertCheck::ThreadCompatibility),
                Insert(InsertCheck::ManufacturerMatch),
            ],
            ComponentCategory::Fletchings => &[
                Fletching(FletchingCheck::UniversalAdhesive),
                Fletching(FletchingCheck::MaterialCompatible),
                Fletching(FletchingCheck::DiameterAppropriate),
            ],
        }
    }

    pub fn lookup(category: ComponentCategory, name: &str) -> Option<BuiltinCheck> {
        Self::for_category(category)
            .iter()
            .copied()
            .find(|check| check.name() == name)
    }
}

/// Structured predicate over an (arrow, component) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Condition {
    Builtin { builtin: BuiltinCheck },
    /// Component spec equals `value`, ignoring case.
    SpecEquals { key: String, value: String },
    /// Component spec equals one of `values`, ignoring case.
    SpecIn { key: String, values: Vec<String> },
    /// Numeric component spec within the inclusive bounds.
    SpecRange {
        key: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// Arrow material is one of `materials`, ignoring case.
    ArrowMaterial { materials: Vec<String> },
    All { conditions: Vec<Condition> },
}

impl Condition {
    /// Checks what the type system cannot: built-ins belong to `category`,
    /// ranges are ordered and `all` is not empty.
    pub fn validate(&self, category: ComponentCategory) -> Result<(), String> {
        match self {
            Self::Builtin { builtin } if builtin.category() != category => Err(format!(
                "check '{}' belongs to {}, not {category}",
                builtin.name(),
                builtin.category()
            )),
            Self::SpecRange {
                min: Some(lo),
                max: Some(hi),
                ..
            } if lo > hi => Err(format!("spec_range min {lo} exceeds max {hi}")),
            Self::All { conditions } if conditions.is_empty() => {
                Err("all needs at least one condition".to_string())
            }
            Self::All { conditions } => conditions.iter().try_for_each(|c| c.validate(category)),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityRule {
    pub category: ComponentCategory,
    pub rule_name: String,
    pub condition: Condition,
    pub compatibility_type: CompatibilityType,
    /// 0..=1.
    pub score: f64,
    pub description: String,
}

impl CompatibilityRule {
    fn builtin(check: BuiltinCheck, ty: CompatibilityType, score: f64, description: &str) -> Self {
        Self {
            category: check.category(),
            rule_name: check.name().to_string(),
            condition: Condition::Builtin { builtin: check },
            compatibility_type: ty,
            score,
            description: description.to_string(),
        }
    }
}

/// The compiled-in rule table for one category, in evaluation order.
pub fn builtin_rules(category: ComponentCategory) -> Vec<CompatibilityRule> {
    use BuiltinCheck::*;
    use CompatibilityType::{Direct, Universal};
    let rule = CompatibilityRule::builtin;
    match category {
        ComponentCategory::Points => vec![
            rule(
                Point(PointCheck::ThreadCompatibility),
                Direct,
                0.95,
                "Point thread matches arrow insert thread",
            ),
            rule(
                Point(PointCheck::WeightRange),
                Direct,
                0.90,
                "Point weight within recommended range for arrow",
            ),
            rule(
                Point(PointCheck::UniversalThread),
                Universal,
                0.85,
                "Universal thread type (8-32 standard)",
            ),
        ],
        ComponentCategory::Nocks => vec![
            rule(
                Nock(NockCheck::DiameterMatch),
                Direct,
                0.95,
                "Nock size matches arrow shaft diameter",
            ),
            rule(
                Nock(NockCheck::FitTypeCompatible),
                Direct,
                0.90,
                "Nock fit type compatible with arrow shaft",
            ),
            rule(
                Nock(NockCheck::UniversalFit),
                Universal,
                0.80,
                "Universal push-in nock",
            ),
        ],
        ComponentCategory::Inserts => vec![
            rule(
                Insert(InsertCheck::OuterDiameterMatch),
                Direct,
                0.95,
                "Insert outer diameter matches arrow inner diameter",
            ),
            rule(
                Insert(InsertCheck::ThreadCompatibility),
                Direct,
                0.90,
                "Insert thread compatible with points",
            ),
            rule(
                Insert(InsertCheck::ManufacturerMatch),
                Direct,
                0.85,
                "Same manufacturer as arrow",
            ),
        ],
        ComponentCategory::Fletchings => vec![
            rule(
                Fletching(FletchingCheck::UniversalAdhesive),
                Universal,
                0.90,
                "Adhesive vanes work with all carbon/aluminum arrows",
            ),
            rule(
                Fletching(FletchingCheck::MaterialCompatible),
                Direct,
                0.85,
                "Fletching material compatible with arrow material",
            ),
            rule(
                Fletching(FletchingCheck::DiameterAppropriate),
                Direct,
                0.80,
                "Fletching size appropriate for arrow diameter",
            ),
        ],
    }
}

/// A custom rule row as persisted by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRule {
    pub category: String,
    pub rule_name: String,
    /// JSON: `{ "conditions", "compatibility_type", "score" }`.
    pub rule_logic: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Decoded `rule_logic` column.
#[derive(Debug, Deserialize)]
struct RuleLogic {
    conditions: Condition,
    #[serde(default = "default_compatibility_type")]
    compatibility_type: CompatibilityType,
    #[serde(default = "default_score")]
    score: f64,
}

fn default_compatibility_type() -> CompatibilityType {
    CompatibilityType::Direct
}

fn default_score() -> f64 {
    0.5
}

impl StoredRule {
    /// Compile the row into a rule. Fails with `Configuration` on an unknown
    /// category, bad JSON, a check from another category, or a score outside
    /// 0..=1.
    pub fn compile(&self) -> Result<CompatibilityRule, TuningError> {
        let err = |reason: String| TuningError::configuration(&self.rule_name, reason);

        let category: ComponentCategory = self.category.parse().map_err(|e| err(format!("{e}")))?;
        let logic: RuleLogic = serde_json::from_str(&self.rule_logic)
            .map_err(|e| err(format!("invalid rule_logic: {e}")))?;
        logic.conditions.validate(category).map_err(err)?;
        if !(0.0..=1.0).contains(&logic.score) {
            return Err(err(format!("score {} is outside 0..=1", logic.score)));
        }

        Ok(CompatibilityRule {
            category,
            rule_name: self.rule_name.clone(),
            condition: logic.conditions,
            compatibility_type: logic.compatibility_type,
            score: logic.score,
            description: self.description.clone(),
        })
    }
}
