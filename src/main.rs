use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use qrstudio::config::Config;
use qrstudio::error::{AppError, Result};
use qrstudio::features::{classify, ExportFormat};
use qrstudio::gate::BlockedChoice;
use qrstudio::handlers::{self, AppState};
use qrstudio::models::{CornerDotStyle, CornerSquareStyle, DotStyle, StyleConfig};
use qrstudio::payments::{CheckoutLookup, DevCheckouts, StripeClient};
use qrstudio::qr::ModuleRenderer;
use qrstudio::render::{map, ExportOutcome, QrRenderer, RenderTarget};
use qrstudio::storage::FileStorage;
use qrstudio::studio::{ExportResponse, PaywallResolution, ReturnOutcome, Studio, StudioOptions};
use qrstudio::verify::HttpVerifier;

#[derive(Parser, Debug)]
#[command(name = "qrstudio")]
#[command(about = "Design styled QR codes and export them")]
struct Cli {
    /// Design file the commands read and write
    #[arg(long, global = true, default_value = "design.json")]
    design: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Edit the design
    Set {
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        fg: Option<String>,
        #[arg(long)]
        bg: Option<String>,
        #[arg(long, value_enum)]
        gradient: Option<Toggle>,
        /// Two gradient stop colors
        #[arg(long, num_args = 2, value_names = ["FIRST", "SECOND"])]
        stops: Option<Vec<String>>,
        #[arg(long)]
        dot: Option<DotStyle>,
        #[arg(long)]
        corner_square: Option<CornerSquareStyle>,
        #[arg(long)]
        corner_dot: Option<CornerDotStyle>,
        /// Image file to embed in the center
        #[arg(long, conflicts_with = "no_logo")]
        logo: Option<PathBuf>,
        #[arg(long)]
        no_logo: bool,
    },
    /// Print the preview rendering instructions
    Preview {
        /// Also write the preview drawing to this SVG file
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// Download the design
    Export {
        #[arg(long, default_value = "png")]
        format: ExportFormat,
        /// If premium features are in use, download without them
        #[arg(long)]
        free: bool,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Save the design and print the checkout link
    Checkout {
        #[arg(long, default_value = "png")]
        format: ExportFormat,
    },
    /// Handle the URL the payment page sent you back to
    Return { url: String },
    /// Show entitlement and hand-off state
    Status,
    /// Run the payment verification server
    Serve,
}

fn open_studio(config: &Config, design: &Path) -> Result<Studio> {
    let storage = Arc::new(FileStorage::open(&config.storage_dir)?);
    let verifier = Arc::new(HttpVerifier::new(&config.verify_url)?);
    let options = StudioOptions {
        app_base_url: parse_url(&config.app_base_url)?,
        payment_url: parse_url(&config.payment_url)?,
    };

    let mut studio = Studio::new(storage, Box::new(ModuleRenderer::new()), verifier, options);
    if design.exists() {
        let raw = std::fs::read_to_string(design)?;
        studio.replace_config(serde_json::from_str::<StyleConfig>(&raw)?);
    }
    Ok(studio)
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| AppError::BadRequest(format!("Invalid URL {}: {}", raw, e)))
}

fn save_design(design: &Path, config: &StyleConfig) -> Result<()> {
    std::fs::write(design, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

fn report_export(outcome: &ExportOutcome, out: &Path) -> Result<()> {
    match outcome {
        ExportOutcome::Produced(artifact) => {
            let path = artifact.save_to(out)?;
            println!("Saved {}", path.display());
        }
        ExportOutcome::Failed { reason } => {
            eprintln!("Export failed, no file was produced: {}", reason);
        }
    }
    Ok(())
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Set {
            content,
            fg,
            bg,
            gradient,
            stops,
            dot,
            corner_square,
            corner_dot,
            logo,
            no_logo,
        } => {
            let mut studio = open_studio(&config, &cli.design)?;
            if let Some(content) = content {
                studio.set_content(&content);
            }
            if let Some(fg) = fg {
                studio.set_foreground(&fg);
            }
            if let Some(bg) = bg {
                studio.set_background(&bg);
            }
            if let Some(toggle) = gradient {
                studio.set_gradient_enabled(matches!(toggle, Toggle::On));
            }
            if let Some([first, second]) = stops.as_deref() {
                studio.set_gradient_stops(first, second);
            }
            let mut shape = studio.config().shape();
            shape.dot = dot.unwrap_or(shape.dot);
            shape.corner_square = corner_square.unwrap_or(shape.corner_square);
            shape.corner_dot = corner_dot.unwrap_or(shape.corner_dot);
            studio.set_shape(shape);
            if let Some(path) = logo {
                studio.load_logo(&path).await?;
            }
            if no_logo {
                studio.remove_logo();
            }
            save_design(&cli.design, studio.config())?;
            println!("Design saved to {}", cli.design.display());
        }
        Command::Preview { svg } => {
            let studio = open_studio(&config, &cli.design)?;
            let instructions = map(studio.config(), true, RenderTarget::Preview);
            println!("{}", serde_json::to_string_pretty(&instructions)?);
            if let Some(path) = svg {
                let mut renderer = ModuleRenderer::new();
                renderer.attach(&instructions)?;
                if let Some(markup) = renderer.preview_svg() {
                    std::fs::write(&path, markup)?;
                }
            }
        }
        Command::Export { format, free, out } => {
            let mut studio = open_studio(&config, &cli.design)?;
            match studio.request_export(format)? {
                ExportResponse::Exported { outcome, .. } => report_export(&outcome, &out)?,
                ExportResponse::Paywall { features } => {
                    println!("Your design uses premium features:");
                    for label in features.labels() {
                        println!("  - {}", label);
                    }
                    if free {
                        if let PaywallResolution::Exported(outcome) =
                            studio.resolve_paywall(BlockedChoice::DownloadWithoutPremium)?
                        {
                            println!("Downloading the free version (PNG, no premium features)");
                            report_export(&outcome, &out)?;
                        }
                    } else {
                        studio.resolve_paywall(BlockedChoice::Dismiss)?;
                        println!("Run `qrstudio checkout` to unlock them, or add --free.");
                    }
                }
            }
        }
        Command::Checkout { format } => {
            let mut studio = open_studio(&config, &cli.design)?;
            if studio.is_entitled() {
                println!("Pro is already active on this machine.");
                return Ok(());
            }
            if classify(studio.config(), format).is_empty() {
                println!("This design uses no premium features; export it for free.");
                return Ok(());
            }
            if let ExportResponse::Paywall { .. } = studio.request_export(format)?
                && let PaywallResolution::Checkout(url) =
                    studio.resolve_paywall(BlockedChoice::Upgrade)?
            {
                println!("Design saved. Complete the payment at:");
                println!("  {}", url);
            }
        }
        Command::Return { url } => {
            let mut studio = open_studio(&config, &cli.design)?;
            let mut outcome = studio.handle_return(&url).await?;
            loop {
                match outcome {
                    ReturnOutcome::NoSignal => println!("Nothing to do for this URL."),
                    ReturnOutcome::Canceled { notice, .. } => println!("{}", notice),
                    ReturnOutcome::Activated { restore } => {
                        println!("Pro activated. All premium features are unlocked.");
                        if let Some(next) = restore {
                            outcome = studio.handle_return(next.as_str()).await?;
                            continue;
                        }
                    }
                    ReturnOutcome::VerificationFailed { reason, back } => {
                        eprintln!("We could not confirm your payment: {}", reason);
                        eprintln!("Nothing was charged twice. Try again, or go back to {}", back);
                    }
                    ReturnOutcome::Restored { notice, .. } => {
                        save_design(&cli.design, studio.config())?;
                        println!("{}", notice);
                    }
                    ReturnOutcome::Discarded { .. } => {}
                }
                break;
            }
        }
        Command::Status => {
            let studio = open_studio(&config, &cli.design)?;
            match studio.entitlement().granted_at() {
                Some(at) => println!("Pro: active since {}", at.to_rfc3339()),
                None if studio.is_entitled() => println!("Pro: active"),
                None => println!("Pro: not active"),
            }
            println!(
                "Pending hand-off: {}",
                if studio.handoff().is_pending() { "yes" } else { "no" }
            );
        }
        Command::Serve => serve(config).await?,
    }
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let mut dev = None;
    let checkouts: Option<Arc<dyn CheckoutLookup>> = match &config.stripe_secret_key {
        Some(key) => Some(Arc::new(StripeClient::new(key))),
        None if config.dev_mode => {
            let checkouts = Arc::new(DevCheckouts::new());
            dev = Some(checkouts.clone());
            tracing::info!("DEV endpoints enabled: POST /dev/sessions/{{session_id}}/paid");
            Some(checkouts as Arc<dyn CheckoutLookup>)
        }
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set: every verification will fail");
            None
        }
    };

    let app = handlers::app(AppState { checkouts }, dev);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    tracing::info!("Listening on {}", config.addr());
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrstudio=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    if let Err(e) = run(cli, config).await {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
