use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use fsgate_backend::LocalFs;
use fsgate_common::types::Identity;
use fsgate_http::{gateway_router, AppState, SiteConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fsgate", about = "HTTP delivery gateway for a file hierarchy")]
struct Cli {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value = "8080")]
    port: u16,

    /// Root of the served hierarchy.
    #[arg(long, default_value = "./data")]
    root: String,

    /// User all requests are evaluated as.
    #[arg(long, default_value = "guest")]
    user: String,

    /// Comma-separated groups of that user.
    #[arg(long, default_value = "guest")]
    groups: String,

    /// Served instead of a listing when present in a directory.
    #[arg(long, default_value = "index.html")]
    index_file: String,

    /// File whose content is inlined above listings.
    #[arg(long)]
    header_file: Option<String>,

    /// File whose content is inlined below listings.
    #[arg(long)]
    readme_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::from_default_env().add_directive("fsgate=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let addr = format!("{}:{}", cli.host, cli.port);

    // The backend handle is built before the listener so a bad root
    // fails startup instead of the first request.
    let root = PathBuf::from(&cli.root);
    let root = tokio::fs::canonicalize(&root).await.map_err(|err| {
        std::io::Error::new(
            err.kind(),
            format!("cannot open root {}: {err}", root.display()),
        )
    })?;
    let fs = Arc::new(LocalFs::new(root.clone()));

    let groups = cli
        .groups
        .split(',')
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .map(str::to_string);
    let identity = Identity::new(cli.user.clone(), groups);

    let config = SiteConfig {
        index_file: cli.index_file,
        header_file: cli.header_file,
        readme_file: cli.readme_file,
    };

    let app = gateway_router(AppState {
        fs,
        identity,
        config,
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(root = %root.display(), user = %cli.user, "fsgate listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
