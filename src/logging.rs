use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// ログファイル名
pub const LOG_FILE_NAME: &str = "txstream.log";

/// ログ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// ログレベル (trace, debug, info, warn, error) またはEnvFilter式
    pub level: String,
    /// ログディレクトリ
    pub log_dir: PathBuf,
    /// ファイルローテーション設定
    pub rotation: LogRotation,
    /// 出力形式
    pub format: LogFormat,
    /// コンソール出力有効
    pub console_enabled: bool,
    /// ファイル出力有効
    pub file_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// 日次ローテーション
    Daily,
    /// 時間毎ローテーション
    Hourly,
    /// ローテーションなし
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 人間向けテキスト
    Text,
    /// 1行1JSON
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            rotation: LogRotation::Daily,
            format: LogFormat::Text,
            console_enabled: true,
            file_enabled: true,
        }
    }
}

impl LogConfig {
    /// カスタムログディレクトリを設定
    pub fn with_log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// ログレベルを設定
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// コンソール出力制御
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.console_enabled = enabled;
        self
    }

    /// ファイル出力制御
    pub fn with_file(mut self, enabled: bool) -> Self {
        self.file_enabled = enabled;
        self
    }
}

/// ログシステムのハンドル
///
/// ファイル出力は別スレッドで書き込まれる。ハンドルを破棄すると
/// 未書き込みのログがフラッシュされる。
#[must_use = "dropping the handle stops file logging"]
pub struct LogHandle {
    guard: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LogHandle {
    /// ファイル出力先（ファイル出力無効ならNone）
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// フラッシュして終了
    pub fn shutdown(mut self) {
        if let Some(guard) = self.guard.take() {
            tracing::debug!("flushing log writer");
            drop(guard);
        }
    }
}

/// ログディレクトリを確保
fn ensure_log_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn file_writer(config: &LogConfig) -> (NonBlocking, WorkerGuard) {
    let file_appender = match config.rotation {
        LogRotation::Daily => rolling::daily(&config.log_dir, LOG_FILE_NAME),
        LogRotation::Hourly => rolling::hourly(&config.log_dir, LOG_FILE_NAME),
        LogRotation::Never => rolling::never(&config.log_dir, LOG_FILE_NAME),
    };
    non_blocking(file_appender)
}

/// ログシステムを初期化
pub fn init_logging(config: &LogConfig) -> Result<LogHandle> {
    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let handle = match (config.console_enabled, config.file_enabled) {
        (true, true) => {
            ensure_log_dir(&config.log_dir)?;
            let (file, guard) = file_writer(config);
            // ファイルにエスケープシーケンスを書かない
            init_subscriber(config, env_filter, std::io::stderr.and(file), false)?;
            LogHandle {
                guard: Some(guard),
                log_file: Some(config.log_dir.join(LOG_FILE_NAME)),
            }
        }
        (true, false) => {
            // コンソールのみ
            init_subscriber(config, env_filter, std::io::stderr, true)?;
            LogHandle {
                guard: None,
                log_file: None,
            }
        }
        (false, true) => {
            // ファイルのみ
            ensure_log_dir(&config.log_dir)?;
            let (file, guard) = file_writer(config);
            init_subscriber(config, env_filter, file, false)?;
            LogHandle {
                guard: Some(guard),
                log_file: Some(config.log_dir.join(LOG_FILE_NAME)),
            }
        }
        (false, false) => {
            // 最低限のコンソール出力
            tracing_subscriber::fmt()
                .with_max_level(tracing::Level::WARN)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!(e))?;
            LogHandle {
                guard: None,
                log_file: None,
            }
        }
    };

    tracing::info!("logging initialised");
    tracing::info!("log level: {}", config.level);
    if let Some(path) = handle.log_file() {
        tracing::info!("log file: {}", path.display());
    }

    Ok(handle)
}

fn init_subscriber<W>(config: &LogConfig, env_filter: EnvFilter, writer: W, ansi: bool) -> Result<()>
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_thread_names(true);

    let result = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.console_enabled, true);
        assert_eq!(config.file_enabled, true);
        assert_eq!(config.rotation, LogRotation::Daily);
    }

    #[test]
    fn test_log_config_builders() {
        let config = LogConfig::default()
            .with_level("debug")
            .with_log_dir("/tmp/txstream")
            .with_console(false)
            .with_file(true);
        assert_eq!(config.level, "debug");
        assert_eq!(config.log_dir, PathBuf::from("/tmp/txstream"));
        assert!(!config.console_enabled);
    }

    #[test]
    fn test_ensure_log_dir() {
        let temp_dir = tempdir().unwrap();
        let log_dir = temp_dir.path().join("test_logs");

        assert!(ensure_log_dir(&log_dir).is_ok());
        assert!(log_dir.exists());
    }

    #[test]
    fn test_rotation_deserialization() {
        let config: LogConfig = toml::from_str("rotation = \"hourly\"\nformat = \"json\"\n").unwrap();
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
    }
}
