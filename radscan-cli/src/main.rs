use clap::{Parser, Subcommand};
use radscan_core::imaging::UploadedImage;
use radscan_core::logging::InteractionLogger;
use radscan_core::prompt::ANALYSIS_PROMPT;
use radscan_core::session::Session;
use radscan_core::Error;
use std::path::{Path, PathBuf};

mod analyze_tui;

pub(crate) const RESULT_HEADER: &str = "### Analysis Results";
pub(crate) const RESULT_NOTE: &str =
    "Note: This analysis is AI-generated and must be reviewed by a qualified healthcare professional.";
pub(crate) const RATE_LIMIT_MESSAGE: &str =
    "Error 429: Too many requests. Please wait a moment before trying again, or check your API quota.";
pub(crate) const MISSING_KEY_MESSAGE: &str =
    "GOOGLE_API_KEY is not configured. Analysis is disabled.";

/// Wraps the model's markdown verbatim in the fixed header and footer.
pub(crate) fn framed_result(content: &str) -> String {
    format!(
        "{}\n---\n{}\n---\n{}",
        RESULT_HEADER, content, RESULT_NOTE
    )
}

#[derive(Parser)]
#[command(author, version, about = "Medical image analysis assistant", long_about = None)]
struct Cli {
    /// Append an interaction log to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a medical image
    Analyze {
        /// Path to the image (jpg, jpeg, png or dicom)
        image: Option<PathBuf>,
        /// Print the result to stdout instead of opening the interactive page
        #[arg(long)]
        plain: bool,
    },
    /// Report whether the analysis agent is configured
    Check,
}

fn main() {
    let cli = Cli::parse();

    let current_path = match std::env::current_dir() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: Could not determine working directory - {}", e);
            std::process::exit(1);
        }
    };

    let session = Session::initialize(&current_path);

    let mut logger = cli.log_file.as_deref().and_then(|path| {
        match InteractionLogger::new(path) {
            Ok(logger) => Some(logger),
            Err(e) => {
                eprintln!("Warning: Could not open log file - {}", e);
                None
            }
        }
    });
    if let Some(logger) = logger.as_mut() {
        logger.log(&format!(
            "session started (agent configured: {})",
            session.agent().is_some()
        ));
    }

    match &cli.command {
        Commands::Check => {
            if let Some(agent) = session.agent() {
                println!("API key is configured.");
                println!("Model: {}", agent.model_name());
                let tool = agent.search_tool();
                println!(
                    "Search tool: up to {} results, {}s timeout.",
                    tool.max_results,
                    tool.timeout.as_secs()
                );
            } else {
                println!("{}", MISSING_KEY_MESSAGE);
                println!("Set it in the environment or in a .env file in the working directory.");
            }
        }
        Commands::Analyze { image, plain } => {
            if *plain {
                let Some(image) = image else {
                    eprintln!("Error: --plain requires an image path.");
                    std::process::exit(1);
                };
                run_plain(&session, image, &mut logger);
            } else if let Err(e) = analyze_tui::run(session, image.as_deref(), logger) {
                eprintln!("Error: Interactive page failed - {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Non-interactive mode: one interaction, result on stdout, failures on
/// stderr with exit code 1. Never calls out without a configured agent.
fn run_plain(session: &Session, image_path: &Path, logger: &mut Option<InteractionLogger>) {
    if session.agent().is_none() {
        eprintln!("Error: {}", MISSING_KEY_MESSAGE);
        std::process::exit(1);
    }

    let uploaded = match UploadedImage::from_path(image_path) {
        Ok(uploaded) => uploaded,
        Err(e) => {
            eprintln!("Error: Failed to load image - {}", e);
            std::process::exit(1);
        }
    };
    let (width, height) = uploaded.dimensions();
    if let Some(logger) = logger.as_mut() {
        logger.log(&format!(
            "loaded image '{}' ({}x{})",
            uploaded.name(),
            width,
            height
        ));
    }

    let resized = uploaded.resize_to_target();
    let artifact = match resized.persist() {
        Ok(artifact) => artifact,
        Err(e) => {
            eprintln!("Error: Failed to persist resized image - {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("Analyzing image... please wait.");
    if let Some(logger) = logger.as_mut() {
        logger.log("analysis started");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: Could not start async runtime - {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(session.analyze(ANALYSIS_PROMPT, &artifact)) {
        Ok(content) => {
            if let Some(logger) = logger.as_mut() {
                logger.log("analysis succeeded");
            }
            println!("{}", framed_result(&content));
        }
        Err(Error::RateLimited(raw)) => {
            if let Some(logger) = logger.as_mut() {
                logger.log(&format!("analysis rate limited: {}", raw));
            }
            eprintln!("{}", RATE_LIMIT_MESSAGE);
            std::process::exit(1);
        }
        Err(e) => {
            if let Some(logger) = logger.as_mut() {
                logger.log(&format!("analysis failed: {}", e));
            }
            eprintln!("Error: Failed to analyze the image - {}", e);
            std::process::exit(1);
        }
    }
}
