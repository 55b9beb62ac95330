use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tunedex_server::media::{FsMediaVault, MediaVault};
use tunedex_server::server::{run_server, RequestsLoggingLevel};
use tunedex_server::store::{LibraryStore, SqliteLibraryStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite library database file.
    #[clap(value_parser = parse_path)]
    pub library_db: PathBuf,

    /// Path to the directory holding uploaded artwork. Without it, artwork
    /// uploads and downloads are refused.
    #[clap(long, value_parser = parse_path)]
    pub media_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    info!(
        "Opening SQLite library database at {:?}...",
        cli_args.library_db
    );
    let store: Arc<dyn LibraryStore> = Arc::new(SqliteLibraryStore::new(&cli_args.library_db)?);

    let media = match cli_args.media_path {
        Some(path) => {
            info!("Storing artwork under {:?}", path);
            Some(Arc::new(FsMediaVault::new(path)?) as Arc<dyn MediaVault>)
        }
        None => {
            info!("No media path configured, artwork is disabled");
            None
        }
    };

    info!("Starting server on port {}...", cli_args.port);
    run_server(
        store,
        media,
        cli_args.logging_level,
        cli_args.port,
        cli_args.frontend_dir_path,
        env!("GIT_HASH").to_string(),
    )
    .await
}
