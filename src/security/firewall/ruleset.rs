use super::rules::{MatchResult, Rule};
use crate::network::packet::Packet;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    // 一致したパケットのみ許可
    Whitelist,
    // 一致したパケットのみ拒否
    Blacklist,
}

impl Policy {
    // ルールに一致したときの判定
    fn on_match(self) -> bool {
        matches!(self, Policy::Whitelist)
    }

    // どのルールにも一致しなかったときの判定
    fn on_no_match(self) -> bool {
        matches!(self, Policy::Blacklist)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Whitelist => f.write_str("whitelist"),
            Policy::Blacklist => f.write_str("blacklist"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub accept: bool,
    // 判定を決めたルールの位置 (デフォルトポリシーの場合は `None`)
    pub matched_rule: Option<usize>,
    // 適用されなかったポートルールの数
    pub skipped: usize,
}

// ファイルの記述順に評価されるルールの列
// 構築後は変更されないため、両方向のワーカーからロックなしで共有できる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    policy: Policy,
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(policy: Policy, rules: Vec<Rule>) -> Self {
        Self { policy, rules }
    }

    pub fn whitelist(rules: Vec<Rule>) -> Self {
        Self::new(Policy::Whitelist, rules)
    }

    pub fn blacklist(rules: Vec<Rule>) -> Self {
        Self::new(Policy::Blacklist, rules)
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn accept_packet(&self, packet: &Packet) -> bool {
        self.evaluate(packet).accept
    }

    // 先頭から順に評価し、最初に一致したルールで判定を確定する
    pub fn evaluate(&self, packet: &Packet) -> Decision {
        let mut skipped = 0;

        for (index, rule) in self.rules.iter().enumerate() {
            match rule.match_packet(packet) {
                MatchResult::Match => {
                    return Decision {
                        accept: self.policy.on_match(),
                        matched_rule: Some(index),
                        skipped,
                    };
                }
                MatchResult::Skip => skipped += 1,
                MatchResult::NoMatch => {}
            }
        }

        Decision {
            accept: self.policy.on_no_match(),
            matched_rule: None,
            skipped,
        }
    }
}
