use crate::engine::error::RuleError;
use crate::network::packet::{Packet, Protocol};
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;

const MIN_ADDR_LEN: usize = "0.0.0.0".len();
const MAX_ADDR_LEN: usize = "255.255.255.255".len();
const MAX_PORT_LEN: usize = "65535".len();

// 1 つのフィールドに対する条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum Rule {
    SourceIp(Ipv4Addr),
    DestinationIp(Ipv4Addr),
    Protocol(Protocol),
    SourcePort(u16),
    DestinationPort(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Match,
    NoMatch,
    // パケットにポートが無く、ルールが適用されない
    Skip,
}

impl From<bool> for MatchResult {
    fn from(matched: bool) -> Self {
        if matched {
            MatchResult::Match
        } else {
            MatchResult::NoMatch
        }
    }
}

impl Rule {
    pub fn match_source_ip(ip: &str) -> Result<Self, RuleError> {
        parse_ipv4(ip).map(Rule::SourceIp)
    }

    pub fn match_destination_ip(ip: &str) -> Result<Self, RuleError> {
        parse_ipv4(ip).map(Rule::DestinationIp)
    }

    pub fn match_source_port(port: &str) -> Result<Self, RuleError> {
        parse_port(port).map(Rule::SourcePort)
    }

    pub fn match_destination_port(port: &str) -> Result<Self, RuleError> {
        parse_port(port).map(Rule::DestinationPort)
    }

    pub fn match_protocol(protocol: &str) -> Result<Self, RuleError> {
        let protocol = match protocol {
            "icmp" => Protocol::Icmp,
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            _ => return Err(RuleError::UnknownProtocol(protocol.to_string())),
        };
        Ok(Rule::Protocol(protocol))
    }

    pub fn match_packet(&self, packet: &Packet) -> MatchResult {
        match *self {
            Rule::SourceIp(addr) => (packet.src_addr == addr).into(),
            Rule::DestinationIp(addr) => (packet.dst_addr == addr).into(),
            Rule::Protocol(protocol) => (packet.protocol == protocol).into(),
            Rule::SourcePort(port) => match packet.src_port() {
                Some(src_port) => (src_port == port).into(),
                None => MatchResult::Skip,
            },
            Rule::DestinationPort(port) => match packet.dst_port() {
                Some(dst_port) => (dst_port == port).into(),
                None => MatchResult::Skip,
            },
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::SourceIp(addr) => write!(f, "src.ip {}", addr),
            Rule::DestinationIp(addr) => write!(f, "dst.ip {}", addr),
            Rule::Protocol(protocol) => write!(f, "proto {}", protocol),
            Rule::SourcePort(port) => write!(f, "src.port {}", port),
            Rule::DestinationPort(port) => write!(f, "dst.port {}", port),
        }
    }
}

fn parse_ipv4(ip: &str) -> Result<Ipv4Addr, RuleError> {
    if !(MIN_ADDR_LEN..=MAX_ADDR_LEN).contains(&ip.len()) {
        return Err(RuleError::InvalidAddress(ip.to_string()));
    }
    ip.parse::<Ipv4Addr>()
        .map_err(|_| RuleError::InvalidAddress(ip.to_string()))
}

fn parse_port(port: &str) -> Result<u16, RuleError> {
    // 符号や空白は u16::from_str でも弾かれないものがあるため数字のみ許可する
    if port.is_empty() || port.len() > MAX_PORT_LEN || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RuleError::InvalidPort(port.to_string()));
    }
    port.parse::<u16>()
        .map_err(|_| RuleError::InvalidPort(port.to_string()))
}
