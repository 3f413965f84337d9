use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};

use glitchkit::codec::{decode_file, encode_png, load_overlay};
use glitchkit::error_codes::{coded_or_render, CodedError};
use glitchkit::look::{parse_look, Look};
use glitchkit::pipeline::{render, RenderRequest};
use glitchkit::report::RenderReport;
use glitchkit::settings::{DitherType, GlitchSeed, LogoPosition};

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GLITCHKIT_GIT_HASH"), ")");
const FALLBACK_SIZE: (u32, u32) = (1920, 1080);

#[derive(Debug, Parser)]
#[command(name = "glitchkit")]
#[command(about = "Cover-fit, glitch, dither and brand still images")]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the effect pipeline over an image and write a PNG
    Render(RenderArgs),
    /// Validate a look file and print its resolved settings
    Check {
        look: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the default look as YAML
    Defaults,
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Source image; without one only the background is rendered
    source: Option<PathBuf>,
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
    /// YAML look file providing defaults for every setting below
    #[arg(long)]
    look: Option<PathBuf>,
    /// Overlay image composited last
    #[arg(long)]
    logo: Option<PathBuf>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Glitch seed; defaults to the look's seed, then the clock
    #[arg(long, allow_hyphen_values = true)]
    seed: Option<f64>,
    /// none | threshold | ordered | floyd-steinberg
    #[arg(long)]
    dither: Option<String>,
    #[arg(long)]
    dither_intensity: Option<u32>,
    /// Collapse to luma
    #[arg(long, conflicts_with = "color")]
    grayscale: bool,
    /// Keep colour even when the look asks for grayscale
    #[arg(long)]
    color: bool,
    #[arg(long)]
    pixelate: Option<u32>,
    #[arg(long)]
    noise: Option<u32>,
    #[arg(long)]
    glitch: Option<u32>,
    #[arg(long)]
    rgb_shift: Option<u32>,
    #[arg(long)]
    logo_size: Option<u32>,
    #[arg(long)]
    logo_opacity: Option<u32>,
    /// top-left | top-right | bottom-left | bottom-right | center
    #[arg(long)]
    logo_position: Option<String>,
    /// Print a JSON report (or error envelope) instead of plain text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let (label, json, result) = match cli.command {
        Commands::Render(args) => {
            let json = args.json;
            ("render", json, run_render(args))
        }
        Commands::Check { look, json } => ("check", json, run_check(&look, json)),
        Commands::Defaults => ("defaults", false, run_defaults()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let coded = coded_or_render(&error);
            if json {
                match serde_json::to_string(&coded.envelope()) {
                    Ok(envelope) => eprintln!("{envelope}"),
                    Err(_) => eprintln!("glitchkit {label}: {error:#}"),
                }
            } else {
                eprintln!("glitchkit {label}: {error:#}");
            }
            ExitCode::from(coded.kind.exit_code() as u8)
        }
    }
}

fn load_look(path: &Path) -> Result<Look> {
    let contents = fs::read_to_string(path).map_err(|error| {
        anyhow!(CodedError::io(
            "LOOK_READ_FAILED",
            format!("failed to read look {}: {error}", path.display()),
        ))
    })?;
    parse_look(&contents, path)
        .map_err(|error| anyhow!(CodedError::validation("INVALID_LOOK", format!("{error:#}"))))
}

fn run_check(path: &Path, json: bool) -> Result<()> {
    let look = load_look(path)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&look).context("failed to serialize look")?
        );
        return Ok(());
    }

    println!(
        "OK: {} (dither {}, intensity {}, pixelate {}, noise {}, glitch {}, rgb_shift {}, {})",
        path.display(),
        look.image.dither_type.keyword(),
        look.image.dither_intensity,
        look.image.pixelate,
        look.image.noise,
        look.image.glitch,
        look.image.rgb_shift,
        if look.image.color_mode { "color" } else { "grayscale" }
    );
    println!(
        "Logo: {}% at {}, opacity {}",
        look.logo.size,
        look.logo.position.keyword(),
        look.logo.opacity
    );
    if let Some(seed) = look.glitch_seed {
        println!("Seed: {seed}");
    }
    Ok(())
}

fn run_defaults() -> Result<()> {
    print!("{}", Look::default().to_yaml()?);
    Ok(())
}

/// Fold command-line overrides into the look and re-validate.
fn apply_overrides(mut look: Look, args: &RenderArgs) -> Result<Look> {
    let image = &mut look.image;
    if let Some(keyword) = &args.dither {
        image.dither_type = DitherType::from_keyword(keyword)?;
    }
    if args.grayscale {
        image.color_mode = false;
    } else if args.color {
        image.color_mode = true;
    }
    for (field, value) in [
        (&mut image.dither_intensity, args.dither_intensity),
        (&mut image.pixelate, args.pixelate),
        (&mut image.noise, args.noise),
        (&mut image.glitch, args.glitch),
        (&mut image.rgb_shift, args.rgb_shift),
    ] {
        if let Some(value) = value {
            *field = value;
        }
    }

    let logo = &mut look.logo;
    if let Some(keyword) = &args.logo_position {
        logo.position = LogoPosition::from_keyword(keyword)?;
    }
    if let Some(size) = args.logo_size {
        logo.size = size;
    }
    if let Some(opacity) = args.logo_opacity {
        logo.opacity = opacity;
    }
    if let Some(seed) = args.seed {
        look.glitch_seed = Some(seed);
    }

    look.validate()
        .map_err(|error| anyhow!(CodedError::usage("INVALID_SETTING", format!("{error:#}"))))?;
    Ok(look)
}

fn default_output_path() -> PathBuf {
    PathBuf::from(format!(
        "identity-{}.png",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ))
}

fn run_render(args: RenderArgs) -> Result<()> {
    let look = match &args.look {
        Some(path) => load_look(path)?,
        None => Look::default(),
    };
    let look = apply_overrides(look, &args)?;

    let source = match &args.source {
        Some(path) => Some(decode_file(path).map_err(|error| {
            anyhow!(CodedError::io("SOURCE_DECODE_FAILED", error.to_string()))
        })?),
        None => {
            log::info!("no source image given, rendering background only");
            None
        }
    };
    let overlay = args.logo.as_deref().and_then(load_overlay);

    let natural = look
        .output
        .map(|size| (size.width, size.height))
        .or(source.as_ref().map(|raster| (raster.width(), raster.height())))
        .unwrap_or(FALLBACK_SIZE);
    let width = args.width.unwrap_or(natural.0);
    let height = args.height.unwrap_or(natural.1);
    if width == 0 || height == 0 {
        return Err(anyhow!(CodedError::usage(
            "INVALID_SIZE",
            format!("output size must be positive, got {width}x{height}"),
        )));
    }

    let glitch_seed = look
        .glitch_seed
        .map(GlitchSeed)
        .unwrap_or_else(GlitchSeed::from_clock);

    let request = RenderRequest::new(width, height, source.as_ref())
        .with_overlay(overlay.as_ref())
        .with_image(look.image)
        .with_logo(look.logo)
        .with_glitch_seed(glitch_seed.value());
    let raster = render(&request).context("pipeline failed")?;

    let output_path = args.output.clone().unwrap_or_else(default_output_path);
    encode_png(&raster, &output_path)
        .map_err(|error| anyhow!(CodedError::io("EXPORT_FAILED", error.to_string())))?;

    if args.json {
        let report = RenderReport::new(
            output_path.display().to_string(),
            &raster,
            glitch_seed.value(),
            look.image,
            overlay.as_ref().map(|_| look.logo),
            source.as_ref().is_some_and(|raster| !raster.is_empty()),
        );
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        );
    } else {
        println!(
            "Wrote {} ({}x{}, seed {})",
            output_path.display(),
            raster.width(),
            raster.height(),
            glitch_seed.value()
        );
    }
    Ok(())
}
