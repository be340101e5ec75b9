//! Configuration Module
//!
//! デフォルト値 → 設定ファイル（TOML）→ 環境変数 の順で設定を重ねる

mod loader;
mod types;

pub use loader::{write_sample_config, ConfigLoader};
pub use types::StreamConfig;
