pub mod ballistics;
pub mod catalog;
pub mod charts;
pub mod compatibility;
pub mod config;
pub mod error;
pub mod matching;
pub mod model;
pub mod session;
pub mod spine;
pub mod tuning;

pub use catalog::{Catalog, CatalogSource};
pub use compatibility::{CompatibilityEngine, CompatibilityResult, CompatibleComponent, StoredRule};
pub use config::EngineConfig;
pub use error::TuningError;
pub use matching::{ArrowMatch, ArrowMatchingEngine, MatchOutcome, MatchRequest};
pub use model::{
    ArcherProfile, Arrow, ArrowComponents, ArrowType, BowConfiguration, BowType, CamType,
    CompatibilityType, Component, ComponentCategory, Confidence, ExperienceLevel, RestType,
    SpineSpecification, TuningGoal,
};
pub use session::{ArrowTuningSystem, CustomRequirements, SessionOutcome, TuningSession};
pub use spine::{
    ChartSpine, FormulaSpine, SpineCalculator, SpineInput, SpineRequirement, SpineResolver,
    SpineUnits,
};
pub use tuning::{
    BroadheadAdjustment, OptimizationOutcome, ScoredConfiguration, ShotSetup, TuningCalculator,
    TuningResult,
};
