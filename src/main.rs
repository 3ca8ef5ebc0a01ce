use clap::{Parser, Subcommand};
use image::ImageReader;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use facescope::server::{self, AppState, ServerConfig};
use facescope::detection::oracle::default_cascade_dir;
use facescope::{DetectorSet, resolve};

#[derive(Parser)]
#[command(name = "facescope")]
#[command(about = "Detect faces, facial features and bodies in images")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP upload/detection server
    Serve {
        /// Bind host (overrides FACESCOPE_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides FACESCOPE_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Cascade directory (overrides FACESCOPE_CASCADE_DIR)
        #[arg(long, value_name = "DIR")]
        cascades: Option<PathBuf>,
    },

    /// Annotate a single image file
    Detect {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Detection type: face, eyes, mouth, fullbody or upperbody
        #[arg(short = 't', long = "type", default_value = "face")]
        detection_type: String,

        /// Where to write the annotated image (defaults to <IMAGE stem>_<type>.<ext>)
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Cascade directory (defaults to the OpenCV install's haarcascades)
        #[arg(long, value_name = "DIR", env = "FACESCOPE_CASCADE_DIR")]
        cascades: Option<PathBuf>,

        /// Save debug outputs to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let default_level = if verbose { "facescope=debug,tower_http=debug" } else { "facescope=info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(env_filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Serve { host, port, cascades } => {
            let mut config = ServerConfig::from_env();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(dir) = cascades {
                config.cascade_dir = dir;
            }
            info!(?config, "starting facescope server");

            let state = AppState::from_config(config).await?;
            server::serve(state).await
        }
        Command::Detect {
            image_path,
            detection_type,
            out,
            cascades,
            debug_out,
        } => detect_file(image_path, &detection_type, out, cascades, debug_out),
    }
}

fn detect_file(
    image_path: PathBuf,
    detection_type: &str,
    out: Option<PathBuf>,
    cascades: Option<PathBuf>,
    debug_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut pipeline = resolve(detection_type)?;
    if let Some(debug_dir) = debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let detectors = DetectorSet::load_dir(cascades.unwrap_or_else(default_cascade_dir))?;

    info!("Loading image: {:?}", image_path);
    let img = ImageReader::open(&image_path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
    info!("Image loaded: {}x{}", img.width(), img.height());

    let outcome = pipeline.run(&detectors, &img)?;

    let out_path = out.unwrap_or_else(|| {
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        let ext = image_path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("jpg");
        image_path.with_file_name(format!("{stem}_{detection_type}.{ext}"))
    });
    outcome.image.save(&out_path)?;

    println!("{} detection complete: {}", detection_type, out_path.display());
    if outcome.scoped_skipped() && !pipeline.scoped_stages().is_empty() {
        println!("No {} regions found; nothing annotated.", pipeline.root().name());
    }
    for det in &outcome.detections {
        println!(
            "  {} at ({}, {}) {}x{}",
            det.target, det.bbox.x, det.bbox.y, det.bbox.width, det.bbox.height
        );
    }

    Ok(())
}
