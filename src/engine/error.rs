use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("無効な IPv4 アドレスです: '{0}'")]
    InvalidAddress(String),

    #[error("無効なポート番号です: '{0}'")]
    InvalidPort(String),

    #[error("未対応のプロトコルです: '{0}'")]
    UnknownProtocol(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{line_number}: {line}")]
    InvalidLine {
        line_number: usize,
        line: String,
        #[source]
        source: Option<RuleError>,
    },

    #[error("ルールファイルを開けません '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ルールファイルの {line_number} 行目を読み込めません: {source}")]
    Read {
        line_number: usize,
        #[source]
        source: std::io::Error,
    },
}

// Ethernet ヘッダーすら読めないフレームはキャプチャ層の異常として扱い、
// 検出したワーカーはその場で停止する
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Ethernet ヘッダーが短すぎます ({actual} < {needed} バイト)")]
    Truncated { needed: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("インターフェースが見つかりません: {0}")]
    InterfaceNotFound(String),

    #[error("インターフェース {interface} のソケット作成に失敗しました: {source}")]
    Socket {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    #[error("フィルタは既に起動しています")]
    AlreadyRunning,

    #[error("キャプチャエラー: {0}")]
    Capture(#[from] std::io::Error),

    #[error("パケット解析エラー: {0}")]
    Decode(#[from] DecodeError),

    #[error("フレームの読み込みが途中で終わりました ({actual}/{expected} バイト)")]
    ShortRead { expected: usize, actual: usize },

    #[error("フレームの書き込みが途中で終わりました ({actual}/{expected} バイト)")]
    ShortWrite { expected: usize, actual: usize },
}

pub type FilterResult<T> = Result<T, FilterError>;
