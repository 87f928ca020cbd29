use anyhow::Result;
use clap::Parser;

use dragonify_daemon::cli::DaemonCli;
use dragonify_daemon::logging;
use dragonify_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드: 기본값 <- 파일 <- 환경변수 <- CLI
    let loaded = cli.resolve_config().await?;

    if cli.validate {
        for env_key in &loaded.ignored_env {
            eprintln!("warning: ignoring unparsable environment variable {env_key}");
        }
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&loaded.config.general)?;
    loaded.log_summary(&cli.config);
    let config = loaded.config;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        base_networks = ?config.networks.base_networks,
        connect_all = config.networks.connect_all,
        "dragonify-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await?;

    tracing::info!("dragonify-daemon shut down");
    Ok(())
}
