use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use stylist_core::{
    camera::CameraCapturer,
    config::Config,
    gemini::{Gender, Occasion, StyleClient},
    image_processing, init,
    session::{self, AnalysisRequest},
    ui,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "AI fashion stylist: webcam photo in, outfit recommendations out", long_about = None)]
struct Args {
    /// Skip the UI: capture one frame, print the report to stdout
    #[arg(long)]
    headless: bool,

    /// Gender to style for (male or female); required in headless mode
    #[arg(short, long)]
    gender: Option<Gender>,

    /// Occasion to style for (party, formal, casual or trending); required in headless mode
    #[arg(short, long)]
    occasion: Option<Occasion>,

    /// Select which camera to capture from
    #[arg(long, default_value_t = 0)]
    camera: u32,

    /// Override the analysis model defined in .env
    #[arg(short, long)]
    model: Option<String>,

    /// Save the generated product images into this directory (headless mode)
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// List available cameras and exit
    #[arg(long)]
    list_cameras: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup
    init();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stylist_core=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Handle --list-cameras before touching configuration
    if args.list_cameras {
        println!("Available cameras:");
        for info in CameraCapturer::list_cameras()? {
            println!("{}", info);
        }
        return Ok(());
    }

    // Load config and override model if specified via CLI
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(model) = args.model {
        config.analysis_model = model;
    }

    if !args.headless {
        ui::run_app(config)?;
        return Ok(());
    }

    let gender = args
        .gender
        .context("--gender is required in headless mode")?;
    let occasion = args
        .occasion
        .context("--occasion is required in headless mode")?;

    // Capture a still
    let mut capturer = CameraCapturer::open(args.camera)
        .context("Failed to open camera. Try --list-cameras to check indices")?;
    println!("Using camera: {}", capturer.name());

    // Let auto-exposure settle before taking the still
    let mut frame = capturer.next_frame()?;
    for _ in 0..4 {
        frame = capturer.next_frame()?;
    }
    capturer.close()?;

    let jpeg = image_processing::encode_still(&frame)?;

    // Send to API
    println!();
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(format!("Analyzing your style with {}...", config.analysis_model));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let client = StyleClient::new(&config)?;
    let request = AnalysisRequest {
        image: jpeg,
        gender,
        occasion,
        generation: 0,
    };

    let outcome = session::run_analysis_pipeline(&client, &request, |count| {
        spinner.set_message(format!("Creating {} recommendations...", count));
    })
    .await;

    spinner.finish_and_clear();

    let (analysis, images) = outcome?;
    print_report(gender, occasion, &analysis);

    if let Some(dir) = args.save_dir {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for (index, image) in images.iter().enumerate() {
            let path = dir.join(format!("item-{:02}.jpg", index + 1));
            fs::write(&path, image)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        println!("\nSaved {} product images to {}", images.len(), dir.display());
    }

    Ok(())
}

fn print_report(gender: Gender, occasion: Occasion, analysis: &stylist_core::AnalysisResult) {
    println!("Your Style Report ({} / {})", gender, occasion);
    println!();
    println!("Our take: {}", analysis.style_analysis);
    println!();

    if analysis.recommendations.is_empty() {
        println!("No recommendations were returned for this look.");
        return;
    }

    for (index, item) in analysis.recommendations.iter().enumerate() {
        println!("{}. {} ({})", index + 1, item.item_name, item.category);
        println!("   {}", item.reason);
        println!("   {}", session::marketplace_search_url(gender, &item.item_name));
    }
}
