use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use woolify_booth::{
    commands::{self, FlattenRequest, PrintOptions, SnapRequest},
    models::{AnimationStyle, FontFamily, GenerationStyle},
    AppState,
};

#[derive(Parser, Debug)]
#[command(name = "woolify-booth", version)]
struct Cli {
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the photo styles.
    Styles,
    /// List the polaroid frames.
    Frames,
    /// List the caption colors.
    Colors,
    /// Restyle a photo, print it, optionally animate it, and export the polaroid.
    Snap(SnapArgs),
    /// Frame a local image as-is and export the polaroid.
    Flatten(FlattenArgs),
}

#[derive(Args, Debug)]
struct PrintArgs {
    /// Frame id (see `frames`).
    #[arg(long)]
    frame: Option<String>,

    /// Caption, at most 20 characters.
    #[arg(long)]
    caption: Option<String>,

    /// Caption color as #hex.
    #[arg(long)]
    color: Option<String>,

    /// handwriting, sans or serif.
    #[arg(long)]
    font: Option<FontFamily>,

    /// Directory for the exported PNG.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

impl PrintArgs {
    fn options(&self) -> PrintOptions {
        PrintOptions {
            frame_id: self.frame.clone(),
            caption: self.caption.clone(),
            text_color: self.color.clone(),
            font: self.font,
        }
    }
}

#[derive(Args, Debug)]
struct SnapArgs {
    /// Photo path or base64 data URL.
    #[arg(long = "in")]
    input: String,

    /// Photo style (see `styles`).
    #[arg(long, default_value = "wool")]
    style: GenerationStyle,

    /// What should happen in the animation. Skips animating when absent.
    #[arg(long)]
    motion: Option<String>,

    /// wool, cartoon, watercolor or 3d.
    #[arg(long, default_value = "wool")]
    motion_style: AnimationStyle,

    /// Playback speed between 0.5 and 2.0.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    #[command(flatten)]
    print: PrintArgs,
}

#[derive(Args, Debug)]
struct FlattenArgs {
    /// Image path or base64 data URL.
    #[arg(long = "in")]
    input: String,

    #[command(flatten)]
    print: PrintArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "woolify_booth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Styles => cmd_styles(cli.json),
        Command::Frames => cmd_frames(cli.json),
        Command::Colors => cmd_colors(cli.json),
        Command::Snap(args) => cmd_snap(args, cli.json).await,
        Command::Flatten(args) => cmd_flatten(args, cli.json).await,
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_styles(json: bool) -> anyhow::Result<()> {
    let styles = commands::list_styles();
    if json {
        return print_json(&styles);
    }
    for option in styles {
        println!("{:<12} {}  {}", option.style.as_str(), option.label, option.description);
    }
    Ok(())
}

fn cmd_frames(json: bool) -> anyhow::Result<()> {
    let frames = commands::list_frames();
    if json {
        return print_json(&frames);
    }
    for frame in frames {
        println!("{:<14} {:<14} {} / {}", frame.id, frame.name, frame.color, frame.border_color);
    }
    Ok(())
}

fn cmd_colors(json: bool) -> anyhow::Result<()> {
    let colors = commands::list_text_colors();
    if json {
        return print_json(&colors);
    }
    for color in colors {
        println!("{:<10} {}", color.value, color.name);
    }
    Ok(())
}

async fn cmd_snap(args: SnapArgs, json: bool) -> anyhow::Result<()> {
    let state = AppState::from_env().context("load booth configuration")?;
    let request = SnapRequest {
        input: args.input,
        style: args.style,
        print: args.print.options(),
        motion: args.motion,
        motion_style: args.motion_style,
        speed: args.speed,
        out_dir: args.print.out_dir,
    };

    let result = commands::snap(&state, request).await;
    state.shutdown();
    let result = result.context("booth session failed")?;

    if json {
        return print_json(&result);
    }
    if let Some(error) = &result.animation_error {
        eprintln!("animation failed: {error}");
    }
    if let Some(url) = &result.video_url {
        println!("video: {url}");
    }
    println!("wrote {}", result.export_path.display());
    Ok(())
}

async fn cmd_flatten(args: FlattenArgs, json: bool) -> anyhow::Result<()> {
    let state = AppState::from_env().context("load booth configuration")?;
    let request = FlattenRequest {
        input: args.input,
        print: args.print.options(),
        out_dir: args.print.out_dir,
    };

    let path = commands::flatten_local(&state, request)
        .await
        .context("flatten failed")?;
    state.shutdown();

    if json {
        return print_json(&serde_json::json!({ "exportPath": path }));
    }
    println!("wrote {}", path.display());
    Ok(())
}
