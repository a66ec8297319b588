//! Main entrypoint.

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;

/// Watch IMAP mailboxes and challenge unknown senders.
#[derive(Debug, Parser)]
#[command(name = "imaplar", version)]
struct Cli {
    /// Config file to use; may be repeated, the first existing one wins.
    #[arg(short, long = "config", value_name = "PATH")]
    configs: Vec<PathBuf>,

    /// Servers to watch; defaults to the servers flagged `default`, or all.
    #[arg(value_name = "SERVER")]
    servers: Vec<String>,
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    let env_path: Option<PathBuf> = envfury::maybe("IMAPLAR_CONFIG")?;
    let explicit = if cli.configs.is_empty() {
        Vec::from_iter(env_path)
    } else {
        cli.configs
    };
    let paths: Vec<PathBuf> = config_paths::resolve(explicit).collect();

    let loaded = config_yaml::load_first(&paths).await?;
    tracing::info!(config = %loaded.path.display(), "config loaded");

    let mailboxes = config_bringup::mailboxes(&loaded.config, &cli.servers)?;
    if mailboxes.is_empty() {
        tracing::warn!("no mailboxes to watch");
        return Ok(());
    }
    drop(loaded);

    let cancel = CancellationToken::new();
    let mut join_set = tokio::task::JoinSet::new();
    watch_service::spawn_watches(&mailboxes, &mut join_set, &cancel);
    drop(mailboxes);

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "unable to listen for Ctrl-C");
                return;
            }
            tracing::info!("interrupted, shutting down");
            cancel.cancel();
        }
    });

    while let Some(result) = join_set.join_next().await {
        result?;
    }

    Ok(())
}
