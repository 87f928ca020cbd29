//! CLI argument definitions for dragonify-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use dragonify_core::config::{DragonifyConfig, LoadedConfig};

/// Dragonify network reconciliation daemon.
///
/// Connects compose application containers to the bridge networks named
/// in their labels and removes managed networks once they are empty.
#[derive(Parser, Debug)]
#[command(name = "dragonify-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to dragonify.toml configuration file.
    ///
    /// A missing file falls back to defaults and environment variables.
    #[arg(short, long, default_value = "/etc/dragonify/dragonify.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// 설정을 기본값 <- 파일 <- 환경변수 <- CLI 순으로 합친 뒤 한 번 검증합니다.
    ///
    /// # Errors
    ///
    /// 설정 파일을 읽거나 파싱하지 못했거나, 최종 설정이 유효하지 않으면 에러를 반환합니다.
    pub async fn resolve_config(&self) -> anyhow::Result<LoadedConfig> {
        let mut loaded = DragonifyConfig::load_unvalidated(&self.config)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        self.apply_overrides(&mut loaded.config);
        loaded
            .config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        Ok(loaded)
    }

    /// CLI 오버라이드를 설정에 적용합니다.
    pub fn apply_overrides(&self, config: &mut DragonifyConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_system_config() {
        let cli = DaemonCli::parse_from(["dragonify-daemon"]);
        assert_eq!(cli.config, PathBuf::from("/etc/dragonify/dragonify.toml"));
        assert!(cli.log_level.is_none());
        assert!(cli.log_format.is_none());
        assert!(!cli.validate);
    }

    #[test]
    fn parses_all_flags() {
        let cli = DaemonCli::parse_from([
            "dragonify-daemon",
            "-c",
            "/tmp/d.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--validate",
        ]);
        assert_eq!(cli.config, PathBuf::from("/tmp/d.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("pretty"));
        assert!(cli.validate);
    }

    #[test]
    fn overrides_replace_general_section() {
        let cli = DaemonCli::parse_from(["dragonify-daemon", "--log-level", "trace"]);
        let mut config = DragonifyConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.general.log_level, "trace");
        assert_eq!(config.general.log_format, "json");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        DaemonCli::command().debug_assert();
    }
}
