mod display;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use quiver_core::{
    ArcherProfile, ArrowComponents, ArrowTuningSystem, ArrowType, BowConfiguration, BowType,
    CamType, Catalog, ChartSpine, CompatibilityEngine, ComponentCategory, CustomRequirements,
    EngineConfig,
    MatchRequest, RestType, ShotSetup, SpineInput, StoredRule, TuningGoal,
};

#[derive(Parser, Debug)]
#[command(name = "quiver", version, about = "Arrow spine, tuning and component compatibility")]
struct Cli {
    /// Engine configuration file (JSON). Built-in defaults when absent.
    #[arg(long, global = true, env = "QUIVER_CONFIG")]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Spine resolution strategy.
    #[arg(long, global = true, value_enum, default_value_t = Strategy::Formula)]
    strategy: Strategy,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    Formula,
    Chart,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Required spine for a bow and arrow setup.
    Spine(SpineArgs),
    /// Full ballistic and tuning analysis of one assembled arrow.
    Analyze(AnalyzeArgs),
    /// Try candidate point weights and rank them for a goal.
    Optimize(OptimizeArgs),
    /// FOC impact of switching from field points to broadheads.
    Broadhead(BroadheadArgs),
    /// Rank catalog arrows for a bow.
    Match(MatchArgs),
    /// Check component compatibility against a catalog arrow.
    Compat(CompatArgs),
    /// Build a complete tuning session for an archer profile.
    Session(SessionArgs),
}

#[derive(Args, Debug)]
struct BowArgs {
    #[arg(long)]
    bow_type: BowType,
    /// Pounds.
    #[arg(long)]
    draw_weight: f64,
    /// Inches.
    #[arg(long)]
    draw_length: f64,
    #[arg(long)]
    cam: Option<CamType>,
    #[arg(long)]
    rest: Option<RestType>,
    /// IBO speed rating, fps (compound only).
    #[arg(long)]
    ibo: Option<f64>,
}

impl BowArgs {
    fn bow(&self) -> BowConfiguration {
        let mut bow = BowConfiguration::new(self.bow_type, self.draw_weight, self.draw_length);
        bow.cam_type = self.cam;
        bow.arrow_rest_type = self.rest;
        bow.ibo_speed = self.ibo;
        bow
    }
}

#[derive(Args, Debug)]
struct SpineArgs {
    #[command(flatten)]
    bow: BowArgs,
    #[arg(long)]
    arrow_length: f64,
    #[arg(long, default_value_t = 125.0)]
    point_weight: f64,
    /// Shaft material; `wood` switches traditional bows to pound ratings.
    #[arg(long)]
    material: Option<String>,
}

/// Component weights in grains.
#[derive(Args, Debug)]
struct ComponentArgs {
    #[arg(long)]
    shaft: f64,
    #[arg(long)]
    point: f64,
    #[arg(long)]
    nock: f64,
    #[arg(long)]
    fletching: f64,
    #[arg(long)]
    insert: f64,
    #[arg(long, default_value_t = 0.0)]
    wrap: f64,
    #[arg(long, default_value_t = 0.0)]
    outsert: f64,
}

impl ComponentArgs {
    fn components(&self) -> ArrowComponents {
        let mut c = ArrowComponents::new(
            self.shaft,
            self.point,
            self.nock,
            self.fletching,
            self.insert,
        );
        c.wrap_weight = self.wrap;
        c.outsert_weight = self.outsert;
        c
    }
}

#[derive(Args, Debug)]
struct ShotArgs {
    #[arg(long)]
    arrow_length: f64,
    /// Draw weight, pounds.
    #[arg(long)]
    bow_weight: f64,
    /// Shaft outer diameter, inches.
    #[arg(long, default_value_t = 0.246)]
    diameter: f64,
    #[arg(long)]
    bow_type: Option<BowType>,
    #[arg(long)]
    ibo: Option<f64>,
    #[arg(long, default_value = "balanced_performance")]
    goal: TuningGoal,
    #[arg(long, default_value = "target_outdoor")]
    arrow_type: ArrowType,
}

impl ShotArgs {
    fn setup(&self) -> ShotSetup {
        let mut setup = ShotSetup::new(self.arrow_length, self.bow_weight, self.diameter);
        setup.bow_type = self.bow_type;
        setup.ibo_speed = self.ibo.filter(|_| self.bow_type.is_none_or(|b| b == BowType::Compound));
        setup
    }
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[command(flatten)]
    components: ComponentArgs,
    #[command(flatten)]
    shot: ShotArgs,
}

#[derive(Args, Debug)]
struct OptimizeArgs {
    #[command(flatten)]
    components: ComponentArgs,
    #[command(flatten)]
    shot: ShotArgs,
    /// Candidate point weights; the configured set when omitted.
    #[arg(long, value_delimiter = ',')]
    points: Vec<f64>,
}

#[derive(Args, Debug)]
struct BroadheadArgs {
    #[arg(long)]
    field_point: f64,
    #[arg(long)]
    broadhead: f64,
    /// Current FOC, percent.
    #[arg(long)]
    foc: f64,
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// Catalog file: `{ "arrows": [...], "components": [...] }`.
    #[arg(long)]
    catalog: PathBuf,
    #[command(flatten)]
    bow: BowArgs,
    #[arg(long)]
    arrow_length: f64,
    #[arg(long, default_value_t = 100.0)]
    point_weight: f64,
    /// Preferred manufacturer; repeat for more, earlier wins ties.
    #[arg(long = "manufacturer")]
    manufacturers: Vec<String>,
    #[arg(long)]
    material: Option<String>,
    #[arg(long)]
    arrow_type: Option<String>,
    #[arg(long)]
    max_results: Option<usize>,
}

#[derive(Args, Debug)]
struct CompatArgs {
    #[arg(long)]
    catalog: PathBuf,
    /// Custom rule rows (JSON array).
    #[arg(long)]
    rules: Option<PathBuf>,
    #[arg(long)]
    arrow: u64,
    /// Check one component; otherwise list every compatible one.
    #[arg(long)]
    component: Option<u64>,
    #[arg(long)]
    category: Option<ComponentCategory>,
}

#[derive(Args, Debug)]
struct SessionArgs {
    #[arg(long)]
    catalog: PathBuf,
    /// Archer profile (JSON).
    #[arg(long)]
    profile: PathBuf,
    /// Tuning goal; repeat for more. Balanced performance when omitted.
    #[arg(long = "goal")]
    goals: Vec<TuningGoal>,
    /// Extra diameter / GPI ranges (JSON).
    #[arg(long)]
    requirements: Option<PathBuf>,
}

/// Session output as written by the CLI: the engine result plus when it
/// was produced.
#[derive(Serialize)]
struct SessionReport<'a> {
    generated_at: String,
    #[serde(flatten)]
    session: &'a quiver_core::TuningSession,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("quiver v{}", env!("CARGO_PKG_VERSION"));

    let system = build_system(&cli)?;
    run(&cli, &system)
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid {what} {}", path.display()))
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    let catalog: Catalog = read_json(path, "catalog")?;
    tracing::info!(
        arrows = catalog.arrows.len(),
        components = catalog.components.len(),
        path = %path.display(),
        "catalog loaded"
    );
    Ok(catalog)
}

fn build_system(cli: &Cli) -> Result<ArrowTuningSystem> {
    let config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            EngineConfig::from_json(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    let system = ArrowTuningSystem::new(config);
    Ok(match cli.strategy {
        Strategy::Formula => system,
        Strategy::Chart => system.with_spine_resolver(Arc::new(ChartSpine)),
    })
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

fn run(cli: &Cli, system: &ArrowTuningSystem) -> Result<()> {
    match &cli.command {
        Command::Spine(args) => {
            let mut input = SpineInput::new(args.arrow_length, args.point_weight);
            if let Some(material) = &args.material {
                input = input.with_material(material.clone());
            }
            let req = system
                .spine_calculator()
                .calculate_required_spine(&args.bow.bow(), &input)?;
            emit(cli.json, &req, display::spine)
        }
        Command::Analyze(args) => {
            let result = system.tuning_calculator().comprehensive_tuning_analysis(
                &args.components.components(),
                &args.shot.setup(),
                args.shot.goal,
                args.shot.arrow_type,
            )?;
            emit(cli.json, &result, display::analysis)
        }
        Command::Optimize(args) => {
            let points = if args.points.is_empty() {
                system.config().session.point_weights.clone()
            } else {
                args.points.clone()
            };
            let outcome = system.tuning_calculator().optimize_for_goal(
                &args.components.components(),
                &args.shot.setup(),
                args.shot.goal,
                args.shot.arrow_type,
                &points,
            )?;
            emit(cli.json, &outcome, display::optimization)
        }
        Command::Broadhead(args) => {
            let adj = system
                .tuning_calculator()
                .calculate_broadhead_tuning_adjustments(
                    args.field_point,
                    args.broadhead,
                    args.foc,
                )?;
            emit(cli.json, &adj, display::broadhead)
        }
        Command::Match(args) => {
            let catalog = load_catalog(&args.catalog)?;
            let mut request = MatchRequest::new(args.bow.bow(), args.arrow_length);
            request.point_weight = args.point_weight;
            request.preferred_manufacturers = args.manufacturers.clone();
            request.material_preference = args.material.clone();
            request.arrow_type_preference = args.arrow_type.clone();
            request.max_results = args.max_results;
            let outcome = system.matching_engine().find_matches(&request, catalog.arrows())?;
            emit(cli.json, &outcome, display::matches)
        }
        Command::Compat(args) => {
            let catalog = load_catalog(&args.catalog)?;
            let engine = match &args.rules {
                Some(path) => {
                    let rules: Vec<StoredRule> = read_json(path, "rules")?;
                    CompatibilityEngine::with_custom_rules(
                        system.config().compatibility.clone(),
                        &rules,
                    )
                }
                None => system.compatibility_engine().clone(),
            };
            match args.component {
                Some(component_id) => {
                    let result = engine.check_by_id(&catalog, args.arrow, component_id);
                    emit(cli.json, &result, display::compatibility)
                }
                None => {
                    let list =
                        engine.get_compatible_components(&catalog, args.arrow, args.category);
                    emit(cli.json, &list, |l| display::compatible_components(args.arrow, l))
                }
            }
        }
        Command::Session(args) => {
            let catalog = load_catalog(&args.catalog)?;
            let profile: ArcherProfile = read_json(&args.profile, "profile")?;
            let requirements: Option<CustomRequirements> = args
                .requirements
                .as_deref()
                .map(|p| read_json(p, "requirements"))
                .transpose()?;
            let session = system.create_tuning_session(
                &profile,
                &args.goals,
                requirements.as_ref(),
                catalog.arrows(),
            )?;
            let report = SessionReport {
                generated_at: chrono::Utc::now().to_rfc3339(),
                session: &session,
            };
            emit(cli.json, &report, |r| display::session(r.session, &r.generated_at))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn spine_command_parses_enums_and_defaults() {
        let cli = parse(&[
            "quiver", "spine", "--bow-type", "compound", "--draw-weight", "60",
            "--draw-length", "29", "--arrow-length", "28.5", "--rest", "whisker-biscuit",
        ]);
        assert!(!cli.json);
        assert_eq!(cli.strategy, Strategy::Formula);
        let Command::Spine(args) = cli.command else {
            panic!("expected spine");
        };
        assert_eq!(args.point_weight, 125.0);
        let bow = args.bow.bow();
        assert_eq!(bow.bow_type, BowType::Compound);
        assert_eq!(bow.arrow_rest_type, Some(RestType::WhiskerBiscuit));
        assert_eq!(bow.cam_type, None);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = parse(&[
            "quiver", "broadhead", "--field-point", "100", "--broadhead", "125", "--foc", "11",
            "--json", "--strategy", "chart",
        ]);
        assert!(cli.json);
        assert_eq!(cli.strategy, Strategy::Chart);
    }

    #[test]
    fn optimize_accepts_point_list() {
        let cli = parse(&[
            "quiver", "optimize", "--shaft", "300", "--point", "100", "--nock", "10",
            "--fletching", "15", "--insert", "15", "--arrow-length", "29",
            "--bow-weight", "60", "--goal", "maximum-speed", "--points", "85,100,125",
        ]);
        let Command::Optimize(args) = cli.command else {
            panic!("expected optimize");
        };
        assert_eq!(args.points, vec![85.0, 100.0, 125.0]);
        assert_eq!(args.shot.goal, TuningGoal::MaximumSpeed);
        assert_eq!(args.shot.arrow_type, ArrowType::TargetOutdoor);
        assert_eq!(args.components.components().total_weight(), 440.0);
    }

    #[test]
    fn session_goals_repeat() {
        let cli = parse(&[
            "quiver", "session", "--catalog", "c.json", "--profile", "p.json",
            "--goal", "hunting_effectiveness", "--goal", "balanced_performance",
        ]);
        let Command::Session(args) = cli.command else {
            panic!("expected session");
        };
        assert_eq!(
            args.goals,
            vec![TuningGoal::HuntingEffectiveness, TuningGoal::BalancedPerformance]
        );
    }

    #[test]
    fn bad_enum_is_rejected() {
        assert!(Cli::try_parse_from([
            "quiver", "spine", "--bow-type", "crossbow", "--draw-weight", "60",
            "--draw-length", "29", "--arrow-length", "28",
        ])
        .is_err());
    }

    #[test]
    fn ibo_only_reaches_compound_setups() {
        let cli = parse(&[
            "quiver", "analyze", "--shaft", "300", "--point", "100", "--nock", "10",
            "--fletching", "15", "--insert", "15", "--arrow-length", "29",
            "--bow-weight", "45", "--bow-type", "recurve", "--ibo", "320",
        ]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.shot.setup().ibo_speed, None);
    }

    #[test]
    fn chart_strategy_swaps_resolver() {
        let cli = parse(&[
            "quiver", "--strategy", "chart", "broadhead", "--field-point", "100", "--broadhead",
            "100", "--foc", "10",
        ]);
        let system = build_system(&cli).unwrap();
        assert_eq!(system.spine_calculator().resolver_name(), "chart");
    }
}
