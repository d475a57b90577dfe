use std::io::Stdout;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod plugins;
pub mod services;
pub mod terminal;

use plugins::vision::{
    AltTabSwitcher, DesktopWindows, FocusSwitcher, KeepFocus, RemoteModel, ScreenCapturer,
};
use services::assistant::Assistant;
use services::config::{load_app_config, AppConfig, PublicConfig};
use terminal::TerminalView;

#[derive(Parser, Debug)]
#[command(
    name = "visual-assist",
    version,
    about = "Capture or upload an image and ask a multimodal model about it"
)]
struct Cli {
    /// Canonical image file (default: ASSIST_IMAGE_PATH or ./picture.png)
    #[arg(long, global = true)]
    image_path: Option<PathBuf>,
    /// Capture the currently focused window instead of switching to the next one
    #[arg(long, global = true)]
    keep_focus: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture the next window into the canonical image file
    Capture,
    /// Ask one question about the canonical image (or --image) and exit
    Analyze {
        /// Question to ask
        #[arg(long, default_value = "")]
        prompt: String,
        /// Upload this PNG/JPEG first
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Print the model configuration (secrets hidden)
    Config,
}

type TerminalAssistant = Assistant<RemoteModel, TerminalView<Stdout>>;

fn build_assistant(config: &AppConfig, keep_focus: bool) -> TerminalAssistant {
    let focus: Box<dyn FocusSwitcher> = if keep_focus {
        Box::new(KeepFocus)
    } else {
        Box::new(AltTabSwitcher::new(config.focus_settle))
    };
    let capturer = ScreenCapturer::new(focus, Box::new(DesktopWindows));

    Assistant::new(
        capturer,
        RemoteModel::from_config(config.model.clone()),
        TerminalView::new(std::io::stdout()),
        config.image_path.clone(),
    )
    .with_public_config(PublicConfig::from(config))
}

async fn run_command(cli: Cli, config: AppConfig) -> ExitCode {
    let mut assistant = build_assistant(&config, cli.keep_focus);

    match cli.command {
        None => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            match terminal::run_session(&mut assistant, stdin).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    log::error!("Failed to read input: {}", err);
                    ExitCode::FAILURE
                }
            }
        }
        Some(Commands::Capture) => {
            if assistant.capture() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Some(Commands::Analyze { prompt, image }) => {
            if let Some(image) = image {
                if !assistant.upload(&image) {
                    return ExitCode::FAILURE;
                }
            }
            assistant.set_query(prompt);
            match assistant.analyze().await {
                Some(Ok(_)) => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            }
        }
        Some(Commands::Config) => {
            match serde_json::to_string_pretty(&PublicConfig::from(&config)) {
                Ok(json) => println!("{}", json),
                Err(err) => {
                    log::error!("Failed to render config: {}", err);
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
    }
}

pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = load_app_config();
    if let Some(path) = cli.image_path.clone() {
        config.image_path = path;
    }
    config.image_path = services::paths::resolve_image_path(&config.image_path);

    if config.model.api_key.is_empty() {
        log::warn!("GEMINI_API_KEY is not set; analyze requests will fail");
    }
    log::info!(
        "Using {:?} model '{}', canonical image {}",
        config.model.provider,
        config.model.model,
        config.image_path.display()
    );

    // One handler at a time: a single-threaded runtime is all the session needs.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("Failed to start async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run_command(cli, config))
}
