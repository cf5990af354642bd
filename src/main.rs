//! `stylecast` CLI - repaint a photo in the style of an artwork.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stylecast::image::save_image;
use stylecast::{Config, ImageSize, StyleTransfer};

/// Repaint a content image in the style of a style image.
///
/// The ONNX style transfer model is taken from the local model cache.
/// On first use, pass it with --model PATH or have it fetched with
/// --model-url URL; a downloaded model stays cached for later runs.
#[derive(Parser, Debug)]
#[command(name = "stylecast")]
#[command(version, about)]
struct Args {
    /// Content image path.
    #[arg(value_name = "CONTENT")]
    content: PathBuf,

    /// Style image path.
    #[arg(value_name = "STYLE")]
    style: PathBuf,

    /// Output image path.
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Output resolution, as SIZE or WIDTHxHEIGHT.
    #[arg(short, long, default_value = "384", value_name = "SIZE")]
    output_size: ImageSize,

    /// Resolution the style image is reduced to, as SIZE or WIDTHxHEIGHT.
    #[arg(short, long, default_value = "256", value_name = "SIZE")]
    style_size: ImageSize,

    /// Use this ONNX model file instead of the cached one.
    #[arg(short, long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Download the model from this URL if it is not cached yet.
    #[arg(long, value_name = "URL", conflicts_with = "model")]
    model_url: Option<String>,

    /// Output JPEG quality (1-100).
    #[arg(short, long, default_value = "95", value_name = "INT")]
    quality: u8,

    /// Also save content, style and result side by side to this path.
    #[arg(long, value_name = "PATH")]
    comparison: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stylecast={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    let mut config = Config {
        style_image_size: args.style_size,
        output_image_size: args.output_size,
        model_path: args.model.clone(),
        output_quality: args.quality,
        ..Config::default()
    };
    if let Some(url) = &args.model_url {
        config.model_spec = config.model_spec.with_url(url);
    }

    let pipeline = StyleTransfer::from_config(&config).context("Failed to initialize pipeline")?;

    let request = config.request(&args.content, &args.style);
    let result = pipeline
        .stylize(&request)
        .context("Failed to stylize image")?;

    result
        .save(&args.output, config.output_quality)
        .context("Failed to save stylized image")?;

    if let Some(path) = &args.comparison {
        save_image(&result.comparison(), path, config.output_quality)
            .context("Failed to save comparison image")?;
    }

    let (width, height) = result.dimensions();
    println!(
        "Stylized {} with {} -> {} ({width}x{height})",
        args.content.display(),
        args.style.display(),
        args.output.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_help_explains_model_source() {
        let help = Args::command().render_long_help().to_string();
        assert!(help.contains("--model PATH"));
        assert!(help.contains("--model-url URL"));
    }

    #[test]
    fn test_parse_sizes() {
        let args = Args::try_parse_from([
            "stylecast", "cat.jpg", "mucha.jpg", "out.png", "-o", "600x400", "-s", "128",
        ])
        .unwrap();
        assert_eq!(args.output_size, ImageSize::new(600, 400));
        assert_eq!(args.style_size, ImageSize::square(128));
    }
}
