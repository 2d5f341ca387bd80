use crate::engine::error::{ConfigError, FilterError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitProcessError {
    #[error("ロガーのセットアップに失敗しました: {0}")]
    LoggerError(String),

    #[error("ルールファイルが不正です: {0}")]
    RuleFileError(#[from] ConfigError),

    #[error("フィルタの起動に失敗しました: {0}")]
    FilterStartError(#[from] FilterError),

    #[error("標準入力の読み込みに失敗しました: {0}")]
    ControlInputError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_file_error_message_keeps_line() {
        let err = InitProcessError::from(ConfigError::InvalidLine {
            line_number: 3,
            line: "proto xyz".to_string(),
            source: None,
        });
        assert_eq!(err.to_string(), "ルールファイルが不正です: 3: proto xyz");
    }
}
