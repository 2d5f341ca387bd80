use crate::security::firewall::Policy;
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// ルールに一致したパケットのみ転送する
    Whitelist,
    /// ルールに一致したパケットを破棄する
    Blacklist,
}

impl From<Mode> for Policy {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Whitelist => Policy::Whitelist,
            Mode::Blacklist => Policy::Blacklist,
        }
    }
}

/// 2 つのインターフェース間のトラフィックをルールに従って中継するブリッジフィルタ
#[derive(Parser, Debug, Clone)]
#[command(
    name = "bridge-filter",
    version,
    about,
    after_help = "標準入力に stop と入力するか Ctrl-C で停止する。標準入力が閉じられても転送は続く"
)]
pub struct AppConfig {
    /// 1 つ目のインターフェース
    pub iface1: String,

    /// 2 つ目のインターフェース
    pub iface2: String,

    /// ルールの解釈方法
    #[arg(value_enum)]
    pub mode: Mode,

    /// ルールファイル (1 行 1 ルール)
    pub rules: PathBuf,

    /// ログレベル (off, error, warn, info, debug, trace)
    #[arg(long, env = "BRIDGE_FILTER_LOG_LEVEL", default_value = "info", value_parser = parse_level)]
    pub log_level: LevelFilter,

    /// ログの出力先ファイル (未指定なら標準エラー出力)
    #[arg(long, env = "BRIDGE_FILTER_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// `.env` を読み込んでからコマンドライン引数を解析する
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args)
    }

    pub fn policy(&self) -> Policy {
        self.mode.into()
    }
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse::<LevelFilter>()
        .map_err(|_| format!("無効なログレベルです: {}", value))
}
