use super::rules::Rule;
use super::ruleset::{Policy, RuleSet};
use crate::engine::error::{ConfigError, RuleError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

impl RuleSet {
    pub fn from_file(policy: Policy, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(policy, BufReader::new(file))
    }

    // 1 行に 1 ルール (`<field> <value>`) の形式で読み込む
    // 空行は無視する。不正な行があった時点で行番号と行の内容を返して中断する
    pub fn from_reader<R: BufRead>(policy: Policy, reader: R) -> Result<Self, ConfigError> {
        let mut rules = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| ConfigError::Read {
                line_number: index + 1,
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let rule = parse_line(trimmed).map_err(|source| ConfigError::InvalidLine {
                line_number: index + 1,
                line: line.clone(),
                source,
            })?;
            rules.push(rule);
        }

        Ok(RuleSet::new(policy, rules))
    }
}

// フィールド名が不明な場合は `Err(None)`、値が不正な場合は `Err(Some(_))`
fn parse_line(line: &str) -> Result<Rule, Option<RuleError>> {
    let (field, value) = match line.split_once(char::is_whitespace) {
        Some((field, value)) => (field, value.trim_start()),
        None => (line, ""),
    };

    let rule = match field {
        "src.ip" => Rule::match_source_ip(value),
        "src.port" => Rule::match_source_port(value),
        "dst.ip" => Rule::match_destination_ip(value),
        "dst.port" => Rule::match_destination_port(value),
        "proto" => Rule::match_protocol(value),
        _ => return Err(None),
    };
    rule.map_err(Some)
}
