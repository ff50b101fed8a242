//! ringscore CLI: command-line interface for archery target scoring.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use ringscore::{
    render_overlay, DebugCollector, Perspective, ScoreConfig, ScoringStrategy, TargetScorer,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "ringscore")]
#[command(about = "Estimate archery target rings and score arrows from a photograph")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate rings, detect arrows and score them.
    Score(CliScoreArgs),

    /// Estimate the ten ring boundaries only.
    Rings(CliRingsArgs),

    /// Warp the target card to a fronto-parallel view.
    Rectify(CliRectifyArgs),

    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CliInputArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// JSON configuration; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliScoreArgs {
    #[command(flatten)]
    input: CliInputArgs,

    /// Path to write the score result (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Path to write an overlay PNG with rings and arrows.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Directory to write intermediate masks and edge maps (PNG).
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Path to write a versioned debug dump (JSON).
    #[arg(long)]
    debug_json: Option<PathBuf>,

    /// Point-to-score mapping.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Force the arrow-head side instead of inferring it.
    #[arg(long, value_enum)]
    perspective: Option<PerspectiveArg>,

    /// Rectify the target card before ring search.
    #[arg(long)]
    rectify: bool,

    #[command(flatten)]
    arrows: CliArrowArgs,
}

#[derive(Debug, Clone, Args, Default)]
struct CliArrowArgs {
    /// Hough accumulator votes needed to trace a line.
    #[arg(long)]
    hough_threshold: Option<u32>,
    /// Shortest accepted arrow segment (px).
    #[arg(long)]
    min_line_length: Option<f64>,
    /// Largest edge gap bridged while tracing a line (px).
    #[arg(long)]
    max_line_gap: Option<f64>,
    /// Distance below which two arrow ends are the same arrow (px).
    #[arg(long)]
    min_arrow_distance: Option<f64>,
    /// Radius of the dilation that bridges edge gaps (0 disables).
    #[arg(long)]
    close_gaps_radius: Option<u8>,
    /// Drop arrows whose length is an IQR outlier.
    #[arg(long)]
    filter_length_outliers: bool,
}

impl CliArrowArgs {
    fn apply(&self, config: &mut ScoreConfig) {
        let arrows = &mut config.arrows;
        if let Some(v) = self.hough_threshold {
            arrows.hough.threshold = v;
        }
        if let Some(v) = self.min_line_length {
            arrows.hough.min_line_length = v;
        }
        if let Some(v) = self.max_line_gap {
            arrows.hough.max_line_gap = v;
        }
        if let Some(v) = self.min_arrow_distance {
            arrows.min_distance_px = v;
        }
        if let Some(v) = self.close_gaps_radius {
            arrows.close_gaps_radius = v;
        }
        if self.filter_length_outliers {
            arrows.filter_length_outliers = true;
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CliRingsArgs {
    #[command(flatten)]
    input: CliInputArgs,

    /// Path to write the ring set (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Rectify the target card before ring search.
    #[arg(long)]
    rectify: bool,

    /// Path to write an overlay PNG with the rings.
    #[arg(long)]
    overlay: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliRectifyArgs {
    #[command(flatten)]
    input: CliInputArgs,

    /// Path to write the rectified image (PNG).
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Ellipses,
    Radial,
}

impl StrategyArg {
    fn to_core(self) -> ScoringStrategy {
        match self {
            Self::Ellipses => ScoringStrategy::Ellipses,
            Self::Radial => ScoringStrategy::Radial,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PerspectiveArg {
    Left,
    Right,
}

impl PerspectiveArg {
    fn to_core(self) -> Perspective {
        match self {
            Self::Left => Perspective::Left,
            Self::Right => Perspective::Right,
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score(args) => run_score(&args),
        Commands::Rings(args) => run_rings(&args),
        Commands::Rectify(args) => run_rectify(&args),
        Commands::DefaultConfig => run_default_config(),
    }
}

// ── shared ─────────────────────────────────────────────────────────────

impl CliInputArgs {
    fn load_config(&self) -> CliResult<ScoreConfig> {
        match &self.config {
            Some(path) => {
                tracing::info!("Loading config: {}", path.display());
                ScoreConfig::from_json_file(path)
                    .map_err(|e| format!("Failed to load config {}: {}", path.display(), e).into())
            }
            None => Ok(ScoreConfig::default()),
        }
    }

    fn load_image(&self) -> CliResult<image::RgbaImage> {
        tracing::info!("Loading image: {}", self.image.display());
        let img = image::open(&self.image).map_err(|e| -> CliError {
            format!("Failed to open image {}: {}", self.image.display(), e).into()
        })?;
        let rgba = img.to_rgba8();
        tracing::info!("Image size: {}x{}", rgba.width(), rgba.height());
        Ok(rgba)
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn write_debug_images(dir: &Path, collector: DebugCollector) -> CliResult<()> {
    std::fs::create_dir_all(dir)?;
    let images = collector.into_images();
    for (i, (label, img)) in images.iter().enumerate() {
        let name = format!("{:02}_{}.png", i, label.replace('/', "_"));
        img.save(dir.join(name))?;
    }
    tracing::info!("{} debug images written to {}", images.len(), dir.display());
    Ok(())
}

// ── score ──────────────────────────────────────────────────────────────

fn run_score(args: &CliScoreArgs) -> CliResult<()> {
    let mut config = args.input.load_config()?;
    if let Some(strategy) = args.strategy {
        config.scoring.strategy = strategy.to_core();
    }
    if let Some(perspective) = args.perspective {
        config.perspective = Some(perspective.to_core());
    }
    if args.rectify {
        config.rectify.enable = true;
    }
    args.arrows.apply(&mut config);

    let rgba = args.input.load_image()?;
    let scorer = TargetScorer::with_config(config);

    let mut collector = if args.debug_dir.is_some() {
        DebugCollector::with_images()
    } else {
        DebugCollector::new()
    };
    let outcome = scorer.score_with_sink(&rgba, &mut collector);

    if let Some(debug_path) = &args.debug_json {
        let mut dump = collector.dump(scorer.config(), rgba.width(), rgba.height());
        dump.image.path = Some(args.input.image.display().to_string());
        write_json(debug_path, &dump)?;
        tracing::info!("Debug dump written to {}", debug_path.display());
    }
    if let Some(dir) = &args.debug_dir {
        write_debug_images(dir, collector)?;
    }

    let result = outcome?;
    tracing::info!(
        "Scored {} of {} arrows, total {}",
        result.scored.len(),
        result.arrows.len(),
        result.total_score
    );
    for s in &result.scored {
        tracing::info!(
            "  ({:.1}, {:.1}) -> {}",
            s.point[0],
            s.point[1],
            s.value
        );
    }

    write_json(&args.out, &result)?;
    tracing::info!("Results written to {}", args.out.display());

    if let Some(overlay_path) = &args.overlay {
        let base = scorer.prepare_image(&rgba)?;
        render_overlay(&base, &result.rings, &result.arrows, &result.scored).save(overlay_path)?;
        tracing::info!("Overlay written to {}", overlay_path.display());
    }

    Ok(())
}

// ── rings ──────────────────────────────────────────────────────────────

fn run_rings(args: &CliRingsArgs) -> CliResult<()> {
    let mut config = args.input.load_config()?;
    if args.rectify {
        config.rectify.enable = true;
    }
    let scorer = TargetScorer::with_config(config);
    let rgba = args.input.load_image()?;

    let base = scorer.prepare_image(&rgba)?;
    let set = scorer.estimate_rings(&base)?;
    tracing::info!("Perspective: {:?}", set.perspective);
    for (i, ring) in set.rings.iter().enumerate() {
        tracing::info!(
            "  ring {:>2}: center=({:.1}, {:.1}) size=({:.1}, {:.1}) angle={:.1}",
            i,
            ring.center[0],
            ring.center[1],
            ring.size[0],
            ring.size[1],
            ring.angle_deg
        );
    }

    let out = serde_json::json!({
        "image_size": [base.width(), base.height()],
        "rectified": scorer.config().rectify.enable,
        "perspective": set.perspective,
        "rings": set.rings,
    });
    write_json(&args.out, &out)?;
    tracing::info!("Rings written to {}", args.out.display());

    if let Some(overlay_path) = &args.overlay {
        render_overlay(&base, &set.rings, &[], &[]).save(overlay_path)?;
        tracing::info!("Overlay written to {}", overlay_path.display());
    }
    Ok(())
}

// ── rectify ────────────────────────────────────────────────────────────

fn run_rectify(args: &CliRectifyArgs) -> CliResult<()> {
    let scorer = TargetScorer::with_config(args.input.load_config()?);
    let rgba = args.input.load_image()?;

    let rectified = scorer.rectify(&rgba)?;
    rectified.save(&args.out)?;
    tracing::info!(
        "Rectified {}x{} image written to {}",
        rectified.width(),
        rectified.height(),
        args.out.display()
    );
    Ok(())
}

// ── default-config ─────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&ScoreConfig::default())?);
    Ok(())
}
