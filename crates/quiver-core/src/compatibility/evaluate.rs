//! Pure predicate evaluation over one (arrow, spec, component) triple.

use crate::config::CompatibilityConfig;
use crate::model::{Arrow, Component, SpineSpecification};

use super::rules::{BuiltinCheck, Condition, FletchingCheck, InsertCheck, NockCheck, PointCheck};

/// Float slack for tolerance comparisons on measured diameters.
const EPS: f64 = 1e-9;

pub(crate) struct RuleContext<'a> {
    pub arrow: &'a Arrow,
    pub spec: &'a SpineSpecification,
    pub component: &'a Component,
    pub config: &'a CompatibilityConfig,
}

/// A satisfied condition: multiplier on the rule score and a note.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Hit {
    pub factor: f64,
    pub note: String,
}

impl Hit {
    fn full(note: impl Into<String>) -> Self {
        Self {
            factor: 1.0,
            note: note.into(),
        }
    }
}

pub(crate) fn evaluate(condition: &Condition, ctx: &RuleContext<'_>) -> Option<Hit> {
    match condition {
        Condition::Builtin { builtin } => evaluate_builtin(*builtin, ctx),
        Condition::SpecEquals { key, value } => {
            let actual = ctx.component.spec_str(key)?;
            actual
                .eq_ignore_ascii_case(value.trim())
                .then(|| Hit::full(format!("{key} is {actual}")))
        }
        Condition::SpecIn { key, values } => {
            let actual = ctx.component.spec_str(key)?;
            values
                .iter()
                .any(|v| actual.eq_ignore_ascii_case(v.trim()))
                .then(|| Hit::full(format!("{key} {actual} is supported")))
        }
        Condition::SpecRange { key, min, max } => {
            let actual = ctx.component.spec_f64(key)?;
            let above = min.is_none_or(|lo| actual >= lo);
            let below = max.is_none_or(|hi| actual <= hi);
            (above && below).then(|| Hit::full(format!("{key} {actual} within range")))
        }
        Condition::ArrowMaterial { materials } => {
            let material = ctx.arrow.material.trim();
            materials
                .iter()
                .any(|m| material.eq_ignore_ascii_case(m.trim()))
                .then(|| Hit::full(format!("{material} shaft supported")))
        }
        Condition::All { conditions } => {
            let mut factor = 1.0;
            let mut notes = Vec::with_capacity(conditions.len());
            for c in conditions {
                let hit = evaluate(c, ctx)?;
                factor *= hit.factor;
                notes.push(hit.note);
            }
            Some(Hit {
                factor,
                note: notes.join(", "),
            })
        }
    }
}

fn evaluate_builtin(check: BuiltinCheck, ctx: &RuleContext<'_>) -> Option<Hit> {
    match check {
        BuiltinCheck::Point(c) => point(c, ctx),
        BuiltinCheck::Nock(c) => nock(c, ctx),
        BuiltinCheck::Insert(c) => insert(c, ctx),
        BuiltinCheck::Fletching(c) => fletching(c, ctx),
    }
}

fn is_standard_thread(cfg: &CompatibilityConfig, thread: &str) -> bool {
    cfg.standard_threads.iter().any(|t| t.eq_ignore_ascii_case(thread))
}

fn point(check: PointCheck, ctx: &RuleContext<'_>) -> Option<Hit> {
    let cfg = ctx.config;
    let thread = ctx
        .component
        .spec_str("thread_type")
        .unwrap_or_else(|| cfg.universal_thread.clone());

    match check {
        PointCheck::ThreadCompatibility => is_standard_thread(cfg, &thread)
            .then(|| Hit::full(format!("Thread {thread} compatible"))),
        PointCheck::UniversalThread => thread
            .eq_ignore_ascii_case(&cfg.universal_thread)
            .then(|| Hit::full(format!("Standard {} thread", cfg.universal_thread))),
        PointCheck::WeightRange => {
            let weight = ctx.component.spec_f64("weight")?;
            let gpi = ctx.spec.gpi_weight;
            if gpi > 0.0 {
                let total = gpi * cfg.estimate_length + weight;
                let (lo, hi) = cfg.point_weight_fraction;
                let fraction = weight / total;
                if lo <= fraction && fraction <= hi {
                    return Some(Hit::full(format!("{weight}gr appropriate for arrow")));
                }
            }
            let (lo, hi) = cfg.fallback_point_weight;
            (lo <= weight && weight <= hi).then(|| Hit {
                factor: cfg.fallback_score_factor,
                note: format!("{weight}gr in common range"),
            })
        }
    }
}

fn is_push_in(fit: &str) -> bool {
    matches!(fit.to_ascii_lowercase().as_str(), "push_in" | "push-in")
}

fn nock(check: NockCheck, ctx: &RuleContext<'_>) -> Option<Hit> {
    let fit = ctx
        .component
        .spec_str("fit_type")
        .unwrap_or_else(|| "push_in".to_string());

    match check {
        NockCheck::DiameterMatch => {
            let size = ctx.component.spec_f64("nock_size")?;
            let shaft = ctx.spec.outer_diameter;
            (size > 0.0
                && shaft > 0.0
                && (size - shaft).abs() <= ctx.config.nock_diameter_tolerance + EPS)
                .then(|| Hit::full(format!("Nock {size}\" matches shaft diameter")))
        }
        NockCheck::FitTypeCompatible => {
            is_push_in(&fit).then(|| Hit::full("Push-in fit compatible"))
        }
        NockCheck::UniversalFit => is_push_in(&fit).then(|| Hit::full("Universal push-in nock")),
    }
}

fn insert(check: InsertCheck, ctx: &RuleContext<'_>) -> Option<Hit> {
    let cfg = ctx.config;
    match check {
        InsertCheck::OuterDiameterMatch => {
            let od = ctx.component.spec_f64("outer_diameter")?;
            let id = ctx.spec.inner_diameter?;
            (od > 0.0 && id > 0.0 && (od - id).abs() <= cfg.insert_press_fit_tolerance + EPS)
                .then(|| Hit::full(format!("Insert OD {od} matches arrow ID")))
        }
        InsertCheck::ThreadCompatibility => {
            let thread = ctx
                .component
                .spec_str("thread_type")
                .or_else(|| ctx.component.spec_str("thread"))
                .unwrap_or_else(|| cfg.universal_thread.clone());
            is_standard_thread(cfg, &thread)
                .then(|| Hit::full(format!("Thread {thread} compatible")))
        }
        InsertCheck::ManufacturerMatch => {
            let arrow = ctx.arrow.manufacturer.trim();
            let component = ctx.component.manufacturer.trim();
            (!arrow.is_empty() && arrow.eq_ignore_ascii_case(component))
                .then(|| Hit::full("Same manufacturer"))
        }
    }
}

fn fletching(check: FletchingCheck, ctx: &RuleContext<'_>) -> Option<Hit> {
    let cfg = ctx.config;
    match check {
        FletchingCheck::UniversalAdhesive => {
            let attachment = ctx
                .component
                .spec_str("attachment")
                .unwrap_or_else(|| "adhesive".to_string());
            attachment
                .eq_ignore_ascii_case("adhesive")
                .then(|| Hit::full("Adhesive vanes work with all shafts"))
        }
        FletchingCheck::MaterialCompatible => {
            let material = ctx
                .component
                .spec_str("material")
                .unwrap_or_else(|| "plastic".to_string())
                .to_ascii_lowercase();
            let shaft = match ctx.arrow.material.trim() {
                "" => "carbon".to_string(),
                m => m.to_ascii_lowercase(),
            };
            match material.as_str() {
                "feather" | "feathers" => Some(Hit::full("Feathers work with all arrow types")),
                "plastic" if shaft == "carbon" || shaft == "aluminum" => {
                    Some(Hit::full("Plastic vanes work with carbon/aluminum"))
                }
                _ => None,
            }
        }
        FletchingCheck::DiameterAppropriate => {
            let length = ctx.component.spec_f64("length")?;
            let shaft = if ctx.spec.outer_diameter > 0.0 {
                ctx.spec.outer_diameter
            } else {
                cfg.default_outer_diameter
            };
            let max_length = if shaft >= cfg.fletching_diameter_boundary {
                cfg.large_shaft_max_fletching
            } else {
                cfg.small_shaft_max_fletching
            };
            (length > 0.0 && length <= max_length)
                .then(|| Hit::full(format!("{length}\" appropriate for shaft")))
        }
    }
}
