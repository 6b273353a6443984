#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use omni_mdr::config::set_config_file_override;
use omni_mdr::links::DEFAULT_PREVIEW_CHARS;
use omni_mdr::search::require_query;
use omni_mdr::{Canvas, IndexStore, Position, PositionStore, load_settings};

#[derive(Parser, Debug)]
#[command(
    name = "mdr",
    about = "Markdown folder reader: catalog, backlinks, search and whiteboard layout",
    arg_required_else_help = true
)]
struct Cli {
    /// Notes folder (or a single markdown file).
    #[arg(
        long,
        short = 'r',
        value_name = "DIR",
        default_value = ".",
        global = true
    )]
    root: PathBuf,

    /// Explicit mdr config file path (for example: `.config/omni-dev-fusion/mdr.yaml`).
    ///
    /// This overrides the default user settings path resolution.
    #[arg(long = "conf", short = 'c', value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Saved positions file (defaults to the configured `layout.positions_file`).
    #[arg(long, value_name = "FILE", global = true)]
    positions: Option<PathBuf>,

    /// Output format.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Json, global = true)]
    output: OutputFormat,

    /// Debug logging on stderr (`RUST_LOG` wins when set).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List notes sorted by relative path.
    Files,
    /// Print one note with its metadata.
    Read { id: String },
    /// Notes linking to and linked from one note.
    Backlinks { id: String },
    /// Fuzzy search over names and bodies.
    Search {
        query: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Whole-folder link graph.
    Graph,
    /// Heading outline of one note.
    Outline { id: String },
    /// Plain-text preview of one note.
    Preview {
        id: String,
        #[arg(long, default_value_t = DEFAULT_PREVIEW_CHARS)]
        chars: usize,
    },
    /// Whiteboard positions for every note.
    Layout {
        #[command(flatten)]
        canvas: CanvasArgs,
        #[arg(long)]
        iterations: Option<usize>,
        /// Persist the computed positions.
        #[arg(long, default_value_t = false)]
        save: bool,
    },
    /// Move one note on the whiteboard and persist the layout.
    Drag {
        id: String,
        x: f64,
        y: f64,
        #[command(flatten)]
        canvas: CanvasArgs,
    },
    /// Watch the folder and print note changes until interrupted.
    Watch,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct CanvasArgs {
    #[arg(long, default_value_t = 1200.0)]
    width: f64,
    #[arg(long, default_value_t = 800.0)]
    height: f64,
}

impl CanvasArgs {
    fn canvas(self) -> Canvas {
        Canvas::for_viewport(self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn emit<T: Serialize>(value: &T, output: OutputFormat) -> Result<()> {
    let rendered = match output {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
    }
    .context("failed to serialize CLI output as JSON")?;
    println!("{rendered}");
    Ok(())
}

fn folder_identity(root: &Path) -> PathBuf {
    std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf())
}

async fn execute(cli: &Cli, store: Arc<IndexStore>) -> Result<()> {
    let positions = PositionStore::new(
        cli.positions
            .clone()
            .unwrap_or_else(|| store.settings().layout.positions_file.clone()),
    );
    let folder = folder_identity(store.root());

    match &cli.command {
        Command::Files => emit(&*store.files().await?, cli.output),
        Command::Read { id } => emit(&store.read(id).await?, cli.output),
        Command::Backlinks { id } => emit(&store.backlinks(id).await?, cli.output),
        Command::Search { query, limit } => {
            let query = require_query(Some(query.as_str()))?;
            emit(&store.search(query, *limit).await?, cli.output)
        }
        Command::Graph => emit(&store.graph().await?, cli.output),
        Command::Outline { id } => emit(&store.outline(id).await?, cli.output),
        Command::Preview { id, chars } => emit(
            &json!({ "id": id, "preview": store.preview(id, *chars).await? }),
            cli.output,
        ),
        Command::Layout {
            canvas,
            iterations,
            save,
        } => {
            let saved = positions.load(&folder);
            let computed = store
                .layout(canvas.canvas(), Some(&saved), *iterations)
                .await?;
            if *save {
                positions.save(&folder, &computed)?;
            }
            emit(&computed, cli.output)
        }
        Command::Drag { id, x, y, canvas } => {
            let saved = positions.load(&folder);
            let mut computed = store.layout(canvas.canvas(), Some(&saved), None).await?;
            if !computed.contains_key(id) {
                bail!("unknown note: {id}");
            }
            computed.insert(id.clone(), Position { x: *x, y: *y });
            positions.save(&folder, &computed)?;
            emit(&json!({ "id": id, "x": x, "y": y }), cli.output)
        }
        Command::Watch => watch(store, cli.output).await,
    }
}

#[cfg(feature = "watch")]
async fn watch(store: Arc<IndexStore>, output: OutputFormat) -> Result<()> {
    use omni_mdr::{FileChange, WatcherConfig, watch_folder};

    let handle = watch_folder(
        Arc::clone(&store),
        &WatcherConfig::default(),
        Some(move |change: &FileChange| {
            if let Err(err) = emit(change, output) {
                tracing::warn!(error = %err, "failed to print change");
            }
        }),
    )?;
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for interrupt")?;
    handle.stop().await;
    Ok(())
}

#[cfg(not(feature = "watch"))]
async fn watch(_store: Arc<IndexStore>, _output: OutputFormat) -> Result<()> {
    bail!("mdr was built without the `watch` feature")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides; --verbose => debug; else warn
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "omni_mdr=debug,mdr=debug"
        } else {
            "omni_mdr=warn"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Some(conf) = &cli.config_file {
        set_config_file_override(conf.clone());
    }
    let settings = load_settings();
    let store = Arc::new(IndexStore::new(cli.root.clone(), settings));
    execute(&cli, store).await
}
