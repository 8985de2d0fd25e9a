//! skyatlas CLI: social-graph layout exporter.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing::{info, warn};

use skyatlas::config::AtlasConfig;
use skyatlas::error::ExportError;
use skyatlas::export::Exporter;
use skyatlas::layout::SpringEngine;

#[derive(Parser)]
#[command(name = "skyatlas", version, about = "Social-graph layout exporter")]
struct Cli {
    /// Input directory holding graph snapshots and packaged archives.
    #[arg(long, global = true, default_value = "input")]
    input: PathBuf,

    /// Configuration document.
    #[arg(long, global = true, default_value = "input/config.json")]
    config: PathBuf,

    /// Sub-layout configuration document (optional).
    #[arg(long, global = true, default_value = "input/sub_config.json")]
    sub_config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every active layout, regenerating only what changed.
    Export {
        /// Output directory for artifacts and version markers.
        #[arg(long, default_value = "out")]
        out: PathBuf,

        /// Export the moderator layout set instead of the default one.
        #[arg(long)]
        moderator: bool,
    },

    /// List resolved layouts.
    Layouts,

    /// Print the effective graph version for the default layout's snapshot.
    GraphVersion,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let root = AtlasConfig::from_file(&cli.config)?;
    let sub = if cli.sub_config.exists() {
        Some(AtlasConfig::from_file(&cli.sub_config)?)
    } else {
        warn!(path = %cli.sub_config.display(), "no sub-layout configuration");
        None
    };

    match cli.command {
        Commands::Export { out, moderator } => {
            let engine = SpringEngine::default();
            let exporter = Exporter::new(&root, sub.as_ref(), &cli.input, &out, &engine);
            let summary = exporter.run(moderator)?;
            println!(
                "Exported layouts: {} generated, {} skipped, {} failed",
                summary.generated, summary.skipped, summary.failed
            );
            if summary.failed > 0 {
                return Err(ExportError::PartialFailure {
                    failed: summary.failed,
                    total: summary.generated + summary.skipped + summary.failed,
                }
                .into());
            }
        }

        Commands::Layouts => {
            let mut all: Vec<_> = root.layouts.iter().collect();
            if let Some(sub) = &sub {
                all.extend(sub.layouts.iter());
            }
            println!("Layouts ({}):", all.len());
            for layout in all {
                let modes: Vec<&str> = [
                    root.modes.default.contains(&layout.name).then_some("default"),
                    root.modes.moderator.contains(&layout.name).then_some("moderator"),
                ]
                .into_iter()
                .flatten()
                .collect();
                println!(
                    "  {} [{}]{} <- {}",
                    layout.name,
                    if modes.is_empty() { "-".to_string() } else { modes.join(", ") },
                    if layout.is_sub_layout { " (sub)" } else { "" },
                    layout.graph_file_path
                );
            }
        }

        Commands::GraphVersion => {
            let Some(layout) = root.default_layout(false, false) else {
                miette::bail!("no default layout resolved");
            };
            let path = cli.input.join(&layout.graph_file_path);
            let declared: Option<i64> = if path.exists() {
                let content = std::fs::read_to_string(&path).into_diagnostic()?;
                let value: serde_json::Value =
                    serde_json::from_str(&content).into_diagnostic()?;
                value.get("graphVersion").and_then(|v| v.as_i64())
            } else {
                None
            };

            match declared {
                None => println!("graphVersion:{}", root.graph_version),
                Some(found) if found == root.graph_version => {
                    println!("graphVersion:{}", root.graph_version);
                }
                Some(found) => {
                    info!(
                        expected = root.graph_version,
                        found, "snapshot graph version differs from configuration"
                    );
                }
            }
        }
    }

    Ok(())
}
