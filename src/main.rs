use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hexsite::{
    config::{ConfigLoader, ModelConfig},
    engine::Engine,
    filter,
    grid::{loader, synthetic::SyntheticRegion, HexGrid},
    objective::FishModel,
    params::parse_assignment,
    snapshot::SnapshotWriter,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Hex-grid aquaculture siting engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate a grid, apply a drawing and print a summary
    Run(RunArgs),
    /// Serve the interactive JSON API
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct ModelArgs {
    /// Model configuration YAML (built-in fish model when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hex grid GeoJSON FeatureCollection
    #[arg(long, conflicts_with = "synthetic")]
    grid: Option<PathBuf>,

    /// Generate a seeded synthetic grid instead of loading one
    #[arg(long)]
    synthetic: bool,

    #[arg(long, default_value_t = 40)]
    rows: u32,

    #[arg(long, default_value_t = 40)]
    cols: u32,

    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Drawing YAML with infrastructure lines to apply in order
    #[arg(long)]
    lines: Option<PathBuf>,

    /// Parameter override, repeatable (id=value)
    #[arg(long = "set", value_name = "ID=VALUE")]
    overrides: Vec<String>,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Filter YAML; reports how many cells stay visible
    #[arg(long)]
    filter: Option<PathBuf>,

    /// Directory for per-pass GeoJSON snapshots
    #[arg(long, default_value = "snapshots")]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[command(flatten)]
    model: ModelArgs,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ConfigLoader::new(".");
    match cli.command {
        Command::Run(args) => run(&loader, args),
        Command::Serve(args) => serve(&loader, args),
    }
}

fn init_logging(config: &ModelConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_model(loader: &ConfigLoader, args: &ModelArgs) -> Result<ModelConfig> {
    match &args.config {
        Some(path) => loader.load_model(path),
        None => ModelConfig::builtin().context("Built-in fish model is invalid"),
    }
}

fn load_grid(args: &ModelArgs) -> Result<HexGrid> {
    match &args.grid {
        Some(path) if !args.synthetic => loader::load(path),
        _ => {
            let region = SyntheticRegion::new(args.rows, args.cols, args.seed);
            region
                .build()
                .with_context(|| format!("Failed to build {}x{} synthetic grid", args.rows, args.cols))
        }
    }
}

/// Builds the engine, applies `--set` overrides and replays the drawing,
/// handing every published snapshot to `on_pass`.
fn prepare(
    loader: &ConfigLoader,
    config: &ModelConfig,
    args: &ModelArgs,
    mut on_pass: impl FnMut(&Engine) -> Result<()>,
) -> Result<Engine> {
    let mut params = config.parameter_set()?;
    for text in &args.overrides {
        let (id, value) = parse_assignment(text)?;
        params.set(&id, value)?;
    }

    let grid = load_grid(args)?;
    let mut engine = Engine::new(grid, params, FishModel::new(), config.engine_settings())?;
    on_pass(&engine)?;

    if let Some(path) = &args.lines {
        let drawing = loader.load_drawing(path)?;
        for line in drawing.lines {
            let (id, summary) = engine.draw_line(line.kind, line.points)?;
            tracing::debug!(target: "hexsite::cli", line = id.raw(), updated = summary.updated, "line.drawn");
            on_pass(&engine)?;
        }
    }
    Ok(engine)
}

fn run(loader: &ConfigLoader, args: RunArgs) -> Result<()> {
    let config = load_model(loader, &args.model)?;
    init_logging(&config);

    let writer = SnapshotWriter::new(&args.out);
    let engine = prepare(loader, &config, &args.model, |engine| {
        writer.write(&engine.snapshot())?;
        Ok(())
    })?;

    let spec = match &args.filter {
        Some(path) => loader.load_filter(path)?,
        None => config.filters.clone(),
    };
    let filter = filter::build(&spec)?;

    let snapshot = engine.snapshot();
    let grid = snapshot.grid();
    let producing: Vec<_> = grid
        .cells()
        .map(|cell| cell.derived())
        .filter(|derived| derived.fish_output > 0.0)
        .collect();
    let total_output: f64 = producing.iter().map(|d| d.fish_output).sum();
    let total_profit: f64 = producing.iter().map(|d| d.profit).sum();
    let visible = snapshot.visible(&filter).count();

    println!(
        "Model '{}' on {} cells after {} passes: {} lines, {} producing cells, output {:.1} t, profit {:.0}, {} visible under filter",
        config.name,
        grid.len(),
        snapshot.pass(),
        engine.lines().count(),
        producing.len(),
        total_output,
        total_profit,
        visible
    );
    Ok(())
}

fn serve(loader: &ConfigLoader, args: ServeArgs) -> Result<()> {
    let config = load_model(loader, &args.model)?;
    init_logging(&config);
    let engine = prepare(loader, &config, &args.model, |_| Ok(()))?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(web::run(WebServerConfig {
        model: config,
        engine,
        host: args.host,
        port: args.port,
    }))
}
