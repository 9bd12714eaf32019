mod assets;
mod config;
mod output;
mod prompt;
mod store;

use anyhow::{bail, Context, Result};
use clap::Parser;
use perceptrank_core::{
    AssetResolver, Coverage, Dimensions, PairQueue, Phase, Session, SessionConfig, Weighting,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::assets::DirectoryAssets;
use crate::config::PerceptrankConfig;
use crate::prompt::Answer;
use crate::store::FlatFileStore;

#[derive(Parser)]
#[command(name = "perceptrank", version, about = "Collect pairwise perceptual judgments on images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Judge image pairs interactively until every dimension is covered
    Judge(JudgeArgs),
    /// Print the current leaderboards without judging
    Summary(SummaryArgs),
    /// Create a default config file at ~/.config/perceptrank/config.toml
    Init,
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Folder holding the images (default: ./image)
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Folder for results and counts files (default: current directory)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Perceptual dimension, in judging order (repeatable)
    #[arg(long = "dimension")]
    dimensions: Vec<String>,

    /// Judgments every image needs per dimension. 0 = no limit.
    #[arg(long)]
    min_coverage: Option<u32>,

    /// Sampling weight: "inverse-frequency" or "remaining-quota"
    #[arg(long)]
    weighting: Option<String>,

    /// CSV of fixed pairs (header, then Left_Image,Right_Image)
    #[arg(long)]
    pairs_file: Option<PathBuf>,

    /// RNG seed for reproducible pair order
    #[arg(long)]
    seed: Option<u64>,

    /// Path to config file (default: ~/.config/perceptrank/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args)]
struct JudgeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Identifier written next to every judgment
    #[arg(long)]
    subject: Option<String>,
}

#[derive(clap::Args)]
struct SummaryArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output JSON instead of tables
    #[arg(long)]
    json: bool,
}

/// Config file merged with CLI args (CLI wins).
struct Settings {
    image_dir: PathBuf,
    data_dir: PathBuf,
    dimensions: Dimensions,
    coverage: Coverage,
    weighting: Weighting,
    pairs_file: Option<PathBuf>,
    subject: Option<String>,
    seed: Option<u64>,
}

impl Settings {
    fn resolve(args: &CommonArgs, cfg: PerceptrankConfig, subject: Option<String>) -> Result<Self> {
        let dimensions = if !args.dimensions.is_empty() {
            args.dimensions.clone()
        } else {
            cfg.dimensions
                .unwrap_or_else(|| config::DEFAULT_DIMENSIONS.iter().map(|d| d.to_string()).collect())
        };
        let dimensions = Dimensions::new(dimensions).context("Invalid dimension list")?;

        let weighting = match args.weighting.as_deref().or(cfg.weighting.as_deref()) {
            Some("inverse-frequency") | None => Weighting::InverseFrequency,
            Some("remaining-quota") => Weighting::RemainingQuota,
            Some(other) => bail!("Unknown weighting \"{other}\". Use \"inverse-frequency\" or \"remaining-quota\"."),
        };

        Ok(Settings {
            image_dir: args.image_dir.clone().or_else(|| cfg.image_dir.map(PathBuf::from)).unwrap_or_else(|| PathBuf::from("image")),
            data_dir: args.data_dir.clone().or_else(|| cfg.data_dir.map(PathBuf::from)).unwrap_or_else(|| PathBuf::from(".")),
            dimensions,
            coverage: Coverage::from_min(args.min_coverage.or(cfg.min_coverage).unwrap_or(0)),
            weighting,
            pairs_file: args.pairs_file.clone().or_else(|| cfg.pairs_file.map(PathBuf::from)),
            subject: subject.or(cfg.subject),
            seed: args.seed.or(cfg.seed),
        })
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "perceptrank=debug,perceptrank_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Judge(args) => {
            init_tracing(args.common.verbose);
            run_judge(args)
        }
        Commands::Summary(args) => {
            init_tracing(args.common.verbose);
            run_summary(args)
        }
        Commands::Init => run_init(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run_init() -> Result<()> {
    let path = config::config_path()?;
    config::create_default_config(&path)?;
    println!("Created config at {}", path.display());
    println!("Edit it to set your image folder, dimensions and coverage.");
    Ok(())
}

fn load_settings(args: &CommonArgs, subject: Option<String>) -> Result<Settings> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::config_path()?,
    };
    let cfg = config::load_config(&config_path)?;
    Settings::resolve(args, cfg, subject)
}

/// Rebuild the campaign from the image folder and whatever the data folder
/// already holds.
fn open_session(settings: &Settings, assets: &DirectoryAssets, store: &FlatFileStore) -> Result<Session> {
    let mut session_config = SessionConfig::new(settings.dimensions.clone());
    session_config.coverage = settings.coverage;
    session_config.weighting = settings.weighting;
    session_config.subject = settings.subject.clone();
    session_config.seed = settings.seed;

    let universe = match &settings.pairs_file {
        Some(path) => {
            let pairs = store::read_pairs_file(path)?;
            let (queue, dropped) = PairQueue::resolvable(pairs, assets)?;
            if queue.is_empty() {
                bail!("No valid image pairs in {}", path.display());
            }
            if dropped > 0 {
                eprintln!("Warning: skipped {dropped} pairs whose images are missing");
            }
            let items = queue.items();
            session_config.schedule = Some(queue);
            items
        }
        None => assets.list_all(),
    };

    let counts = store.load_counts(&settings.dimensions)?;
    let records = store.load_records(&settings.dimensions)?;
    Session::restore(session_config, universe, counts, records)
        .with_context(|| format!("Failed to start a session over {}", settings.image_dir.display()))
}

fn run_judge(args: JudgeArgs) -> Result<()> {
    let settings = load_settings(&args.common, args.subject.clone())?;
    let assets = DirectoryAssets::open(&settings.image_dir)?;
    let mut store = FlatFileStore::open(&settings.data_dir, &settings.dimensions)?;
    let mut session = open_session(&settings, &assets, &store)?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    'judging: loop {
        let (left, right) = match session.next_displayable_pair(&assets) {
            Ok(Some(pair)) => pair,
            Ok(None) => break,
            Err(e) if e.is_recoverable() => {
                eprintln!("Warning: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let Phase::InDimension(dimension) = session.current_phase() else {
            break;
        };
        let name = session.dimensions().name(dimension)?.to_string();
        let progress = session.progress()[dimension];

        println!("\n{}", output::progress_line(session.dimensions(), &progress));
        println!("{}", prompt::build_question(&name));
        println!("  left:  {}  ({} comparisons)", assets.path_of(&left).display(), session.counts().count(&left, dimension));
        println!("  right: {}  ({} comparisons)", assets.path_of(&right).display(), session.counts().count(&right, dimension));

        let answer = loop {
            print!("{} > ", prompt::ANSWER_HINT);
            io::stdout().flush()?;
            let Some(line) = lines.next() else {
                break Answer::Quit;
            };
            let line = line.context("Failed to read from stdin")?;
            match prompt::parse_answer(&line) {
                Some(answer) => break answer,
                None => println!("Unrecognised answer \"{}\"", line.trim()),
            }
        };

        match answer {
            Answer::Quit => break 'judging,
            Answer::Skip => session.discard_pair(),
            Answer::Judged(outcome) => {
                session.record_judgment(outcome)?;
                // A failed save keeps the judgment queued for the next cycle.
                if let Err(e) = session.persist(&mut store) {
                    if !e.is_recoverable() {
                        return Err(e.into());
                    }
                    eprintln!("Warning: {e}. Will retry after the next judgment.");
                }
            }
        }
    }

    session.persist(&mut store).context("Failed to save judgments")?;

    if session.current_phase() == Phase::Completed {
        println!("\nAll dimensions complete.");
        let summary = session.export_summary();
        output::print_table(&summary);
        let path = store.write_summary(&summary)?;
        println!("Summary written to {}", path.display());
    } else {
        println!("\nProgress saved. Run again to continue.");
    }
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<()> {
    let settings = load_settings(&args.common, None)?;
    let assets = DirectoryAssets::open(&settings.image_dir)?;
    let store = FlatFileStore::open(&settings.data_dir, &settings.dimensions)?;
    let session = open_session(&settings, &assets, &store)?;
    let summary = session.export_summary();

    if args.json {
        output::print_json(&summary)
    } else {
        output::print_table(&summary);
        Ok(())
    }
}
