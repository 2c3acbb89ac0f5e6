//! CLI command implementations

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use marquee_core::playback::{FrameSpec, PlaybackKind, resolve, trailer_embed_url};
use marquee_core::{MarqueeConfig, Movie, classify};
use tracing::debug;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Classify server URLs into their playback path
    Classify {
        /// One or more server URLs
        #[arg(required = true)]
        urls: Vec<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show how every server of a catalog movie record would play
    Servers {
        /// Path to the movie JSON record
        movie: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the sandboxed frame an embedded server would render
    Frame {
        /// Server URL
        url: String,
    },
    /// Resolve a trailer link into its embed URL
    Trailer {
        /// Trailer link
        url: String,
    },
    /// Show the effective playback configuration
    Config,
}

/// Handle the CLI command
///
/// # Errors
/// Returns the first failure of the selected command
pub fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Classify { urls, json } => classify_urls(&urls, json),
        Commands::Servers { movie, json } => show_servers(movie, json),
        Commands::Frame { url } => show_frame(&url),
        Commands::Trailer { url } => show_trailer(&url),
        Commands::Config => show_config(),
    }
}

/// Print the playback path for each URL
///
/// # Errors
/// - `serde_json::Error` - JSON output could not be produced
pub fn classify_urls(urls: &[String], json: bool) -> anyhow::Result<()> {
    let targets: Vec<_> = urls.iter().map(|url| classify(url)).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
        return Ok(());
    }

    for (url, target) in urls.iter().zip(&targets) {
        println!("{:<16} {url}", target.kind.to_string());
        if target.resolved_url != *url {
            println!("{:<16} -> {}", "", target.resolved_url);
        }
    }

    Ok(())
}

/// Print every server of a movie record in catalog order
///
/// # Errors
/// - `MarqueeError::Io` - The record could not be read
/// - `MarqueeError::Json` - The record is not a valid movie
pub fn show_servers(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let movie = Movie::from_file(&path)
        .with_context(|| format!("Failed to load movie record {}", path.display()))?;
    debug!(movie_id = %movie.id, servers = movie.servers.len(), "Loaded movie record");

    let targets = movie.playback_targets();

    if json {
        let rows: Vec<_> = targets
            .iter()
            .map(|(server, target)| {
                serde_json::json!({
                    "name": server.name,
                    "quality": server.quality,
                    "url": server.url,
                    "kind": target.kind,
                    "resolvedUrl": target.resolved_url,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", movie.title);
    println!("{:-<60}", "");

    if targets.is_empty() {
        println!("No playback servers.");
    }

    for (index, (server, target)) in targets.iter().enumerate() {
        let default_marker = if index == 0 { "*" } else { " " };
        println!(
            "{default_marker} {:<12} {:<8} {:<16} {}",
            server.name,
            server.quality,
            target.kind.to_string(),
            target.resolved_url
        );
    }

    if let Some(frame) = movie.trailer_frame() {
        println!("\nTrailer: {}", frame.src);
    }

    Ok(())
}

/// Print the frame for an embedded server
///
/// # Errors
/// - `serde_json::Error` - JSON output could not be produced
pub fn show_frame(url: &str) -> anyhow::Result<()> {
    let target = classify(url);

    if target.kind != PlaybackKind::EmbeddedFrame {
        println!("{url} plays on the video surface as {}", target.kind);
        return Ok(());
    }

    print_frame(&resolve(&target))
}

/// Print the embed URL and frame for a trailer link
///
/// # Errors
/// - `anyhow::Error` - The link is empty
pub fn show_trailer(url: &str) -> anyhow::Result<()> {
    let frame = FrameSpec::for_trailer(url).context("Trailer link is empty")?;
    debug!(embed = %trailer_embed_url(url), "Resolved trailer");

    print_frame(&frame)
}

/// Print the configuration after environment overrides
///
/// # Errors
/// - `MarqueeError::Configuration` - A recovery budget is out of range
pub fn show_config() -> anyhow::Result<()> {
    let config = MarqueeConfig::from_env();
    config.validate()?;

    println!("Adaptive streams");
    println!("  autoplay:                  {}", config.adaptive.autoplay);
    println!(
        "  network recovery attempts: {}",
        config.adaptive.network_recovery_attempts
    );
    println!(
        "  media recovery attempts:   {}",
        config.adaptive.media_recovery_attempts
    );
    println!("Native files");
    println!("  autoplay:                  {}", config.native.autoplay);

    Ok(())
}

fn print_frame(frame: &FrameSpec) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(frame)?);
    println!("sandbox=\"{}\"", frame.sandbox);
    Ok(())
}
