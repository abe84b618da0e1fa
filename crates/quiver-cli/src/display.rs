//! Plain-text cards for engine results.
//!
//! Every renderer returns a `String`; `main` decides where it goes. The core
//! never formats for humans, so all labels and rounding live here.

use std::fmt::Display;

use quiver_core::{
    BroadheadAdjustment, CompatibilityResult, CompatibleComponent, MatchOutcome,
    OptimizationOutcome, SessionOutcome, SpineRequirement, SpineUnits, TuningResult,
    TuningSession,
};

const LABEL_WIDTH: usize = 24;
const MAX_LIST_ITEMS: usize = 10;

/// Titled block of aligned `label value` rows.
struct Card {
    out: String,
}

impl Card {
    fn new(title: impl Display) -> Self {
        Self {
            out: format!("=== {title} ===\n"),
        }
    }

    fn section(&mut self, header: &str) {
        self.out.push('\n');
        self.out.push_str(header);
        self.out.push('\n');
    }

    fn field(&mut self, label: &str, value: impl Display) {
        self.out
            .push_str(&format!("  {label:<LABEL_WIDTH$} {value}\n"));
    }

    fn items<S: AsRef<str>>(&mut self, items: &[S]) {
        for item in items.iter().take(MAX_LIST_ITEMS) {
            self.out.push_str(&format!("  - {}\n", item.as_ref()));
        }
        if items.len() > MAX_LIST_ITEMS {
            self.out
                .push_str(&format!("  ... and {} more\n", items.len() - MAX_LIST_ITEMS));
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

fn range(lo: impl Display, hi: impl Display) -> String {
    format!("{lo} - {hi}")
}

fn spine_unit(units: SpineUnits) -> &'static str {
    match units {
        SpineUnits::Carbon => "",
        SpineUnits::Pounds => " lb",
    }
}

// ── Spine ──

pub fn spine(req: &SpineRequirement) -> String {
    let unit = spine_unit(req.units);
    let mut card = Card::new(format!("Required spine: {}{unit}", req.spine));
    card.field("bow type", req.bow_type);
    card.field("strategy", &req.strategy);
    card.field("acceptable range", range(req.minimum, req.maximum) + unit);
    card.field("tolerance", format!("±{}", req.tolerance));
    card.field("base spine", format!("{:.1}", req.base_spine));
    if !req.adjustments.is_empty() {
        card.section("Adjustments");
        for (name, value) in &req.adjustments {
            card.field(name, format!("{value:+.1}"));
        }
    }
    if !req.notes.is_empty() {
        card.section("Notes");
        card.items(&req.notes);
    }
    card.finish()
}

// ── Tuning ──

fn analysis_fields(card: &mut Card, r: &TuningResult) {
    card.field("total weight", format!("{:.0} gr", r.total_weight));
    card.field(
        "FOC",
        format!(
            "{:.1}% (ideal {})",
            r.foc_percentage,
            range(r.ideal_foc_range.0, r.ideal_foc_range.1)
        ),
    );
    card.field("balance point", format!("{:.2}\"", r.balance_point));
    card.field("speed", format!("{:.0} fps", r.speed_estimate));
    card.field("kinetic energy", format!("{:.1} ft-lb", r.kinetic_energy));
    card.field("momentum", format!("{:.3} slug-ft/s", r.momentum));
    card.field("penetration score", format!("{:.0}/100", r.penetration_score));
    card.field("accuracy score", format!("{:.0}/100", r.accuracy_score));
    card.field("wind drift factor", format!("{:.2}", r.wind_drift_factor));
    card.field("trajectory", &r.trajectory_rating);
}

pub fn analysis(r: &TuningResult) -> String {
    let mut card = Card::new("Tuning analysis");
    analysis_fields(&mut card, r);

    let b = &r.component_breakdown;
    card.section("Weight distribution");
    for (label, pct) in [
        ("shaft", b.shaft),
        ("point", b.point),
        ("nock", b.nock),
        ("fletching", b.fletching),
        ("insert", b.insert),
        ("wrap", b.wrap),
        ("outsert", b.outsert),
    ] {
        if pct > 0.0 {
            card.field(label, format!("{pct:.1}%"));
        }
    }
    if !r.recommendations.is_empty() {
        card.section("Recommendations");
        card.items(&r.recommendations);
    }
    card.finish()
}

pub fn optimization(o: &OptimizationOutcome) -> String {
    let mut card = Card::new(format!("Optimized for {}", o.goal.label()));
    card.field("best point weight", format!("{:.0} gr", o.best.point_weight));
    card.field("score", format!("{:.1}", o.best.score));
    analysis_fields(&mut card, &o.best.analysis);

    card.section("Candidates");
    for c in &o.all_results {
        card.field(&format!("{:.0} gr", c.point_weight), format!("{:.1}", c.score));
    }
    if !o.recommendations.is_empty() {
        card.section("Recommendations");
        card.items(&o.recommendations);
    }
    card.finish()
}

pub fn broadhead(b: &BroadheadAdjustment) -> String {
    let mut card = Card::new("Broadhead tuning");
    card.field("weight difference", format!("{:+.0} gr", b.weight_difference));
    card.field("FOC change", format!("{:+.2}%", b.foc_change));
    card.field("new FOC estimate", format!("{:.1}%", b.new_foc_estimate));
    card.field("adjustments needed", if b.adjustments_needed { "yes" } else { "no" });
    card.section("Recommendations");
    card.items(&b.recommendations);
    card.finish()
}

// ── Matching ──

pub fn matches(outcome: &MatchOutcome) -> String {
    let req = &outcome.requirement;
    let unit = spine_unit(req.units);
    let mut card = Card::new(format!(
        "{} matches for spine {}{unit} ({})",
        outcome.matches.len(),
        req.spine,
        range(req.minimum, req.maximum)
    ));
    if outcome.matches.is_empty() {
        card.section("No arrows matched; widen the manufacturer or material filters");
    }
    for (i, m) in outcome.matches.iter().enumerate() {
        card.section(&format!("{}. {} {}", i + 1, m.manufacturer, m.model_name));
        card.field("score", format!("{:.1} ({})", m.match_score, m.confidence));
        card.field(
            "spine",
            format!("{}{unit} (deviation {:.0})", m.matched_spine, m.spine_deviation),
        );
        card.field("gpi", format!("{:.1}", m.gpi_weight));
        card.field("outer diameter", format!("{:.3}\"", m.outer_diameter));
        card.field("spine options", m.spine_specifications.len());
        card.items(&m.match_reasons);
        if !m.potential_issues.is_empty() {
            let issues: Vec<String> = m.potential_issues.iter().map(|s| format!("! {s}")).collect();
            card.items(&issues);
        }
    }
    card.finish()
}

// ── Compatibility ──

fn compatibility_fields(card: &mut Card, r: &CompatibilityResult) {
    card.field("type", r.compatibility_type);
    card.field("score", format!("{:.2}", r.score));
    if !r.matching_rules.is_empty() {
        card.field("rules", r.matching_rules.join(", "));
    }
    card.field("notes", &r.notes);
}

pub fn compatibility(r: &CompatibilityResult) -> String {
    let mut card = Card::new(format!(
        "Arrow {} / component {}",
        r.arrow_id, r.component_id
    ));
    compatibility_fields(&mut card, r);
    card.finish()
}

pub fn compatible_components(arrow_id: u64, list: &[CompatibleComponent]) -> String {
    let mut card = Card::new(format!(
        "{} compatible components for arrow {arrow_id}",
        list.len()
    ));
    for c in list {
        card.section(&format!(
            "[{}] {} {} ({})",
            c.component.id, c.component.manufacturer, c.component.model_name, c.component.category
        ));
        compatibility_fields(&mut card, &c.compatibility);
    }
    card.finish()
}

// ── Session ──

pub fn session(s: &TuningSession, generated_at: &str) -> String {
    let mut card = Card::new(format!("Tuning session: {}", s.archer));
    card.field("generated", generated_at);
    let goals: Vec<String> = s.goals.iter().map(|g| g.label()).collect();
    card.field("goals", goals.join(", "));
    card.field(
        "required spine",
        format!("{}{}", s.spine_requirement.spine, spine_unit(s.spine_requirement.units)),
    );

    if s.outcome == SessionOutcome::NoArrowsFound {
        card.section("No arrows found");
    }
    for (i, m) in s.recommended_arrows.iter().take(3).enumerate() {
        card.section(&format!(
            "{}. {} {} - {:.1} ({})",
            i + 1,
            m.manufacturer,
            m.model_name,
            m.match_score,
            m.confidence
        ));
        card.field("spine", m.matched_spine);
        if let Some(a) = s
            .tuning_analysis
            .get(&format!("{}_{}", m.manufacturer, m.model_name))
        {
            analysis_fields(&mut card, a);
        }
    }
    for (goal, o) in &s.optimization_results {
        card.section(&format!("Optimization: {}", goal.replace('_', " ")));
        card.field("point weight", format!("{:.0} gr", o.best.point_weight));
        card.field("score", format!("{:.1}", o.best.score));
    }
    card.section("Recommendations");
    card.items(&s.recommendations);
    card.section("Next steps");
    card.items(&s.next_steps);
    card.finish()
}
