pub mod error;
pub mod profile;

pub use error::*;
pub use profile::{ConvergeConfig, RetryProfile, WaitProfile};

use std::path::{Path, PathBuf};

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "CONVERGE_CONFIG_PATH";

/// プロジェクトの設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 CONVERGE_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: converge.local.yaml, converge.yaml
/// 3. ./.converge/ ディレクトリ内: 同様の順序
/// 4. ~/.config/converge/converge.yaml (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points to a missing file: {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;
    let candidates = ["converge.local.yaml", "converge.yaml"];

    // 2. カレントディレクトリで検索
    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.converge/ ディレクトリで検索
    let converge_dir = current_dir.join(".converge");
    if converge_dir.is_dir() {
        for filename in &candidates {
            let path = converge_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル (~/.config/converge/converge.yaml)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("converge").join("converge.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// 設定ファイルを読み込む
///
/// 拡張子が `.json` なら JSON、それ以外は YAML として解析する。
pub fn load_config(path: &Path) -> Result<ConvergeConfig> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed: std::result::Result<ConvergeConfig, String> = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    };

    let config = parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    tracing::info!(
        "Loaded {} wait and {} retry profiles from {}",
        config.waits.len(),
        config.retries.len(),
        path.display()
    );
    Ok(config)
}

/// 設定ファイルを探して読み込む。見つからなければ空の設定を返す
pub fn load() -> Result<ConvergeConfig> {
    match find_config_file() {
        Ok(path) => load_config(&path),
        Err(ConfigError::ConfigFileNotFound) => {
            tracing::debug!("No config file found, using built-in presets");
            Ok(ConvergeConfig::default())
        }
        Err(e) => Err(e),
    }
}
