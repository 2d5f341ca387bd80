use log::{debug, error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

mod engine;
mod error;
mod network;
mod security;
mod select_device;
mod setup_logger;

use crate::engine::{AppConfig, Filter};
use crate::error::InitProcessError;
use crate::security::firewall::RuleSet;
use crate::setup_logger::setup_logger;

#[tokio::main]
async fn main() -> Result<(), InitProcessError> {
    let config = AppConfig::load();

    setup_logger(config.log_level, config.log_file.as_deref())
        .map_err(|e| InitProcessError::LoggerError(e.to_string()))?;

    // ログファイルにも残るよう、ロガー起動後のエラーはここで出力する
    if let Err(e) = run(&config).await {
        error!("{}", e);
        return Err(e);
    }

    Ok(())
}

async fn run(config: &AppConfig) -> Result<(), InitProcessError> {
    // ルールファイルの読み込み
    let rules = RuleSet::from_file(config.policy(), &config.rules)?;
    info!("ルールファイルを読み込みました: {} ({} 件)", config.rules.display(), rules.len());
    match serde_json::to_string(&rules) {
        Ok(json) => debug!("ルールセット: {}", json),
        Err(e) => warn!("ルールセットを JSON に変換できませんでした: {}", e),
    }

    // 両インターフェースへの接続と転送の開始
    let mut filter = Filter::new(rules);
    filter.start(&config.iface1, &config.iface2)?;

    // stop コマンドか Ctrl-C で停止する
    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = wait_for_stop_command(stdin) => result?,
        _ = tokio::signal::ctrl_c() => info!("割り込みを受け取りました"),
    }

    filter.stop().await;
    info!("フィルタを停止しました");

    Ok(())
}

// 入力が閉じられた後は stop を受け取れないため、呼び出し側の Ctrl-C 待ちに任せる
async fn wait_for_stop_command<R: AsyncBufRead + Unpin>(input: R) -> std::io::Result<()> {
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        for command in line.split_whitespace() {
            if command == "stop" {
                info!("stop コマンドを受け取りました");
                return Ok(());
            }
            warn!("不明なコマンドです: {}", command);
        }
    }

    info!("標準入力が閉じられました。Ctrl-C で停止します");
    std::future::pending().await
}
