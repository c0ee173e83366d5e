use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: converge.local.yaml, converge.yaml\n\
        - ./.converge/ ディレクトリ\n\
        - ~/.config/converge/converge.yaml\n\
        または CONVERGE_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ConfigFileNotFound,

    #[error("設定ファイルの解析に失敗しました ({path}): {message}")]
    Parse { path: PathBuf, message: String },

    #[error("プロファイル '{name}' が不正です: {source}")]
    InvalidProfile {
        name: String,
        #[source]
        source: converge_core::SpecError,
    },

    #[error("リトライプロファイル '{name}' が不正です: {message}")]
    InvalidRetryProfile { name: String, message: String },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
