//! Shared value types: bow setups, archer profiles, arrow assemblies, and
//! the catalog records (arrows, spine specifications, components) the
//! engine reads.
//!
//! Everything here is transient. Identity, persistence and timestamps belong
//! to whatever database sits in front of the engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TuningError, require_non_negative, require_positive};

/// Error returned when parsing one of the model enums from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Implements `as_str`, `Display` and `FromStr` over a fixed string table.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

// ── Bow setup ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BowType {
    Compound,
    Recurve,
    Traditional,
    Longbow,
}

string_enum!(BowType, "bow type", {
    Compound => "compound",
    Recurve => "recurve",
    Traditional => "traditional",
    Longbow => "longbow",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CamType {
    Soft,
    Medium,
    Hard,
}

string_enum!(CamType, "cam type", {
    Soft => "soft",
    Medium => "medium",
    Hard => "hard",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestType {
    DropAway,
    Blade,
    WhiskerBiscuit,
    FullContainment,
}

string_enum!(RestType, "arrow rest", {
    DropAway => "drop_away",
    Blade => "blade",
    WhiskerBiscuit => "whisker_biscuit",
    FullContainment => "full_containment",
});

/// Bow setup as entered by the archer. Immutable for the life of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowConfiguration {
    pub bow_type: BowType,
    /// Pounds at full draw.
    pub draw_weight: f64,
    /// Inches.
    pub draw_length: f64,
    #[serde(default)]
    pub cam_type: Option<CamType>,
    #[serde(default)]
    pub arrow_rest_type: Option<RestType>,
    /// IBO speed rating in fps. Only meaningful for compound bows.
    #[serde(default)]
    pub ibo_speed: Option<f64>,
    /// Inches from the riser center; the chart reference when absent.
    #[serde(default)]
    pub center_shot: Option<f64>,
}

impl BowConfiguration {
    pub fn new(bow_type: BowType, draw_weight: f64, draw_length: f64) -> Self {
        Self {
            bow_type,
            draw_weight,
            draw_length,
            cam_type: None,
            arrow_rest_type: None,
            ibo_speed: None,
            center_shot: None,
        }
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        require_positive("draw_weight", self.draw_weight)?;
        require_positive("draw_length", self.draw_length)?;
        if let Some(ibo) = self.ibo_speed {
            require_positive("ibo_speed", ibo)?;
        }
        if let Some(center_shot) = self.center_shot {
            require_non_negative("center_shot", center_shot)?;
        }
        Ok(())
    }

    /// IBO rating, if this is a compound bow that has one.
    pub fn compound_ibo(&self) -> Option<f64> {
        match self.bow_type {
            BowType::Compound => self.ibo_speed,
            _ => None,
        }
    }
}

// ── Archer ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

string_enum!(ExperienceLevel, "experience level", {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
});

/// Intended use of an arrow; drives the ideal FOC band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowType {
    TargetIndoor,
    TargetOutdoor,
    FieldArchery,
    HuntingSmallGame,
    HuntingBigGame,
    TraditionalArchery,
}

string_enum!(ArrowType, "arrow type", {
    TargetIndoor => "target_indoor",
    TargetOutdoor => "target_outdoor",
    FieldArchery => "field_archery",
    HuntingSmallGame => "hunting_small_game",
    HuntingBigGame => "hunting_big_game",
    TraditionalArchery => "traditional_archery",
});

impl ArrowType {
    /// Map a free-form shooting style ("hunting big game", "indoor target")
    /// onto an arrow application. Unrecognised styles fall back to outdoor
    /// target.
    pub fn from_shooting_style(style: &str) -> Self {
        let style = style.to_lowercase();
        if style.contains("hunting") {
            if style.contains("big game") {
                Self::HuntingBigGame
            } else {
                Self::HuntingSmallGame
            }
        } else if style.contains("target") {
            if style.contains("indoor") {
                Self::TargetIndoor
            } else {
                Self::TargetOutdoor
            }
        } else if style.contains("field") {
            Self::FieldArchery
        } else if style.contains("traditional") {
            Self::TraditionalArchery
        } else {
            Self::TargetOutdoor
        }
    }

    pub fn is_hunting(&self) -> bool {
        matches!(self, Self::HuntingSmallGame | Self::HuntingBigGame)
    }
}

/// Optimization objective for point-weight tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningGoal {
    MaximumSpeed,
    OptimalPenetration,
    BalancedPerformance,
    MaximumAccuracy,
    HuntingEffectiveness,
}

string_enum!(TuningGoal, "tuning goal", {
    MaximumSpeed => "maximum_speed",
    OptimalPenetration => "optimal_penetration",
    BalancedPerformance => "balanced_performance",
    MaximumAccuracy => "maximum_accuracy",
    HuntingEffectiveness => "hunting_effectiveness",
});

impl TuningGoal {
    /// Goal name with underscores replaced by spaces, for sentences.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcherProfile {
    pub name: String,
    pub bow: BowConfiguration,
    pub shooting_style: String,
    pub experience_level: ExperienceLevel,
    /// Inches.
    #[serde(default = "default_arrow_length")]
    pub arrow_length: f64,
    /// Grains.
    #[serde(default = "default_point_weight")]
    pub point_weight_preference: f64,
    #[serde(default)]
    pub preferred_manufacturers: Vec<String>,
    /// Price per dozen, (min, max).
    #[serde(default)]
    pub budget_range: Option<(f64, f64)>,
    /// Percent, (min, max).
    #[serde(default)]
    pub target_foc_range: Option<(f64, f64)>,
    #[serde(default)]
    pub material_preference: Option<String>,
}

fn default_arrow_length() -> f64 {
    29.0
}

fn default_point_weight() -> f64 {
    100.0
}

impl ArcherProfile {
    pub fn arrow_type(&self) -> ArrowType {
        ArrowType::from_shooting_style(&self.shooting_style)
    }

    pub fn is_hunter(&self) -> bool {
        self.shooting_style.to_lowercase().contains("hunting")
    }

    pub fn is_target_archer(&self) -> bool {
        self.shooting_style.to_lowercase().contains("target")
    }

    /// Coarse arrow-type label used for catalog matching ("hunting", "target").
    pub fn arrow_type_preference(&self) -> Option<String> {
        if self.is_hunter() {
            Some("hunting".to_string())
        } else if self.is_target_archer() {
            Some("target".to_string())
        } else {
            None
        }
    }
}

// ── Arrow assembly ──

/// Physical makeup of one assembled arrow. All weights in grains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrowComponents {
    pub shaft_weight: f64,
    pub point_weight: f64,
    pub nock_weight: f64,
    pub fletching_weight: f64,
    pub insert_weight: f64,
    #[serde(default)]
    pub wrap_weight: f64,
    #[serde(default)]
    pub outsert_weight: f64,
}

impl ArrowComponents {
    pub fn new(
        shaft_weight: f64,
        point_weight: f64,
        nock_weight: f64,
        fletching_weight: f64,
        insert_weight: f64,
    ) -> Self {
        Self {
            shaft_weight,
            point_weight,
            nock_weight,
            fletching_weight,
            insert_weight,
            wrap_weight: 0.0,
            outsert_weight: 0.0,
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.shaft_weight
            + self.point_weight
            + self.nock_weight
            + self.fletching_weight
            + self.insert_weight
            + self.wrap_weight
            + self.outsert_weight
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        require_non_negative("shaft_weight", self.shaft_weight)?;
        require_non_negative("point_weight", self.point_weight)?;
        require_non_negative("nock_weight", self.nock_weight)?;
        require_non_negative("fletching_weight", self.fletching_weight)?;
        require_non_negative("insert_weight", self.insert_weight)?;
        require_non_negative("wrap_weight", self.wrap_weight)?;
        require_non_negative("outsert_weight", self.outsert_weight)?;
        Ok(())
    }

    pub fn with_point_weight(&self, point_weight: f64) -> Self {
        Self {
            point_weight,
            ..*self
        }
    }

    /// Every weight multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            shaft_weight: self.shaft_weight * factor,
            point_weight: self.point_weight * factor,
            nock_weight: self.nock_weight * factor,
            fletching_weight: self.fletching_weight * factor,
            insert_weight: self.insert_weight * factor,
            wrap_weight: self.wrap_weight * factor,
            outsert_weight: self.outsert_weight * factor,
        }
    }
}

// ── Catalog records ──

/// One manufactured spine option of a catalog arrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpineSpecification {
    /// Stiffness rating; lower is stiffer.
    pub spine: i32,
    /// Inches.
    pub outer_diameter: f64,
    /// Inches.
    #[serde(default)]
    pub inner_diameter: Option<f64>,
    /// Grains per inch.
    pub gpi_weight: f64,
    #[serde(default)]
    pub length_options: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub id: u64,
    pub manufacturer: String,
    pub model_name: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub arrow_type: String,
    #[serde(default)]
    pub spine_specifications: Vec<SpineSpecification>,
}

impl Arrow {
    /// First spine specification; stands in for the arrow's geometry where
    /// a single representative spec is needed.
    pub fn primary_spec(&self) -> Option<&SpineSpecification> {
        self.spine_specifications.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Points,
    Nocks,
    Inserts,
    Fletchings,
}

string_enum!(ComponentCategory, "component category", {
    Points => "points",
    Nocks => "nocks",
    Inserts => "inserts",
    Fletchings => "fletchings",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: u64,
    pub category: ComponentCategory,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model_name: String,
    /// Category-specific keys such as `thread_type`, `weight`, `nock_size`,
    /// `fit_type`, `outer_diameter`, `material`, `attachment`, `length`.
    #[serde(default)]
    pub specifications: Map<String, Value>,
}

impl Component {
    /// String value of a specification key. Numbers are rendered as text.
    pub fn spec_str(&self, key: &str) -> Option<String> {
        match self.specifications.get(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Numeric value of a specification key. Strings with units
    /// (`"100gr"`, `"0.246\""`) yield their first number.
    pub fn spec_f64(&self, key: &str) -> Option<f64> {
        match self.specifications.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => leading_number(s),
            _ => None,
        }
    }
}

/// First decimal number found in `s`.
pub fn leading_number(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let start = bytes.iter().enumerate().position(|(i, b)| {
        b.is_ascii_digit()
            || (*b == b'.' && bytes.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
    })?;

    let mut end = start;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    s[start..end].trim_end_matches('.').parse().ok()
}

// ── Shared result vocabulary ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityType {
    Direct,
    Universal,
    Incompatible,
}

string_enum!(CompatibilityType, "compatibility type", {
    Direct => "direct",
    Universal => "universal",
    Incompatible => "incompatible",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

string_enum!(Confidence, "confidence", {
    High => "high",
    Medium => "medium",
    Low => "low",
});

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enum_parsing_is_lenient_about_case_and_separators() {
        assert_eq!("Compound".parse::<BowType>().unwrap(), BowType::Compound);
        assert_eq!(
            "whisker-biscuit".parse::<RestType>().unwrap(),
            RestType::WhiskerBiscuit
        );
        assert_eq!(
            "hunting big game".parse::<ArrowType>().unwrap(),
            ArrowType::HuntingBigGame
        );
        let err = "crossbow".parse::<BowType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown bow type 'crossbow'");
    }

    #[test]
    fn enum_serde_matches_as_str() {
        for goal in TuningGoal::ALL {
            let json = serde_json::to_string(goal).unwrap();
            assert_eq!(json, format!("\"{}\"", goal.as_str()));
        }
    }

    #[test]
    fn shooting_style_mapping() {
        assert_eq!(
            ArrowType::from_shooting_style("Hunting Big Game"),
            ArrowType::HuntingBigGame
        );
        assert_eq!(
            ArrowType::from_shooting_style("hunting"),
            ArrowType::HuntingSmallGame
        );
        assert_eq!(
            ArrowType::from_shooting_style("indoor target"),
            ArrowType::TargetIndoor
        );
        assert_eq!(
            ArrowType::from_shooting_style("target"),
            ArrowType::TargetOutdoor
        );
        assert_eq!(
            ArrowType::from_shooting_style("field"),
            ArrowType::FieldArchery
        );
        assert_eq!(
            ArrowType::from_shooting_style("traditional"),
            ArrowType::TraditionalArchery
        );
        assert_eq!(
            ArrowType::from_shooting_style("3d"),
            ArrowType::TargetOutdoor
        );
    }

    #[test]
    fn total_weight_sums_every_component() {
        let mut c = ArrowComponents::new(300.0, 100.0, 10.0, 15.0, 15.0);
        assert_eq!(c.total_weight(), 440.0);
        c.wrap_weight = 5.0;
        c.outsert_weight = 20.0;
        assert_eq!(c.total_weight(), 465.0);
    }

    #[test]
    fn negative_component_weight_is_rejected() {
        let c = ArrowComponents::new(300.0, -1.0, 10.0, 15.0, 15.0);
        assert!(matches!(
            c.validate(),
            Err(TuningError::Validation { field: "point_weight", .. })
        ));
    }

    #[test]
    fn bow_validation() {
        assert!(BowConfiguration::new(BowType::Compound, 60.0, 28.0).validate().is_ok());
        assert!(BowConfiguration::new(BowType::Compound, 0.0, 28.0).validate().is_err());
        assert!(BowConfiguration::new(BowType::Recurve, 40.0, -1.0).validate().is_err());
    }

    #[test]
    fn ibo_only_applies_to_compounds() {
        let mut bow = BowConfiguration::new(BowType::Recurve, 40.0, 28.0);
        bow.ibo_speed = Some(340.0);
        assert_eq!(bow.compound_ibo(), None);
        bow.bow_type = BowType::Compound;
        assert_eq!(bow.compound_ibo(), Some(340.0));
    }

    #[test]
    fn leading_number_extraction() {
        assert_eq!(leading_number("100gr"), Some(100.0));
        assert_eq!(leading_number("0.246\""), Some(0.246));
        assert_eq!(leading_number(".244"), Some(0.244));
        assert_eq!(leading_number("approx 85.5 grains"), Some(85.5));
        assert_eq!(leading_number("12."), Some(12.0));
        assert_eq!(leading_number("heavy"), None);
    }

    #[test]
    fn component_spec_accessors() {
        let component: Component = serde_json::from_value(json!({
            "id": 7,
            "category": "points",
            "manufacturer": "Easton",
            "model_name": "Field Point",
            "specifications": { "thread_type": "8-32", "weight": "100gr", "length": 2.5 }
        }))
        .unwrap();
        assert_eq!(component.spec_str("thread_type").as_deref(), Some("8-32"));
        assert_eq!(component.spec_f64("weight"), Some(100.0));
        assert_eq!(component.spec_f64("length"), Some(2.5));
        assert_eq!(component.spec_str("length").as_deref(), Some("2.5"));
        assert_eq!(component.spec_f64("missing"), None);
    }

    #[test]
    fn profile_defaults_from_json() {
        let profile: ArcherProfile = serde_json::from_value(json!({
            "name": "Sam",
            "bow": { "bow_type": "compound", "draw_weight": 65.0, "draw_length": 28.5 },
            "shooting_style": "hunting big game",
            "experience_level": "intermediate"
        }))
        .unwrap();
        assert_eq!(profile.arrow_length, 29.0);
        assert_eq!(profile.point_weight_preference, 100.0);
        assert!(profile.preferred_manufacturers.is_empty());
        assert_eq!(profile.arrow_type(), ArrowType::HuntingBigGame);
        assert_eq!(profile.arrow_type_preference().as_deref(), Some("hunting"));
    }
}
