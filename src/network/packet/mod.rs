pub mod ethernet;
pub mod ipv4;
pub mod transport;

#[cfg(test)]
pub mod frames;

use crate::engine::error::DecodeError;
use crate::network::packet::ethernet::{EthernetHeader, ETHERNET_HEADER_LEN};
use crate::network::packet::ipv4::{IPv4Header, IPv4ParseError, IPV4_MAX_HEADER_LEN};
use crate::network::packet::transport::TRANSPORT_PORTS_LEN;
use pnet::packet::ethernet::EtherType;
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;

pub use transport::Ports;

// 判定に必要なヘッダーを全て含むのに十分な先読みサイズ
pub const HEADER_CAPACITY: usize = ETHERNET_HEADER_LEN + IPV4_MAX_HEADER_LEN + TRANSPORT_PORTS_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Icmp,
    Tcp,
    Udp,
}

impl Protocol {
    pub fn from_next_header(protocol: IpNextHeaderProtocol) -> Option<Self> {
        match protocol {
            IpNextHeaderProtocols::Icmp => Some(Protocol::Icmp),
            IpNextHeaderProtocols::Tcp => Some(Protocol::Tcp),
            IpNextHeaderProtocols::Udp => Some(Protocol::Udp),
            _ => None,
        }
    }

    pub fn has_ports(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Icmp => "icmp",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ICMP と 2 番目以降の IP フラグメントにはポート番号が無いため ports は None
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Packet {
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub protocol: Protocol,
    pub ports: Option<Ports>,
}

impl Packet {
    pub fn src_port(&self) -> Option<u16> {
        self.ports.map(|ports| ports.source)
    }

    pub fn dst_port(&self) -> Option<u16> {
        self.ports.map(|ports| ports.destination)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ports {
            Some(ports) => write!(
                f,
                "{} {}:{} -> {}:{}",
                self.protocol, self.src_addr, ports.source, self.dst_addr, ports.destination
            ),
            None => write!(f, "{} {} -> {}", self.protocol, self.src_addr, self.dst_addr),
        }
    }
}

// ルールを評価せずに転送するフレームの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThroughReason {
    // ARP, IPv6, VLAN タグ付きなど
    NonIpv4(EtherType),
    UnsupportedTransport(IpNextHeaderProtocol),
}

// ヘッダーが壊れていて判定できない IPv4 フレーム
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    Ipv4(IPv4ParseError),
    TruncatedPorts { protocol: Protocol, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Inspect(Packet),
    PassThrough(PassThroughReason),
    // 転送せずに破棄する
    Malformed(MalformedReason),
}

// IPv4 以外のフレームと ICMP/TCP/UDP 以外の IPv4 パケットはルールの対象外で常に転送する。
// エラーになるのは Ethernet ヘッダーに満たないデータだけ
pub fn classify(data: &[u8]) -> Result<Classification, DecodeError> {
    let (ethernet, rest) = EthernetHeader::parse(data).ok_or(DecodeError::Truncated {
        needed: ETHERNET_HEADER_LEN,
        actual: data.len(),
    })?;

    if !ethernet.is_ipv4() {
        return Ok(Classification::PassThrough(PassThroughReason::NonIpv4(ethernet.ethertype)));
    }

    let (ip, transport) = match IPv4Header::parse(rest) {
        Ok(parsed) => parsed,
        Err(e) => return Ok(Classification::Malformed(MalformedReason::Ipv4(e))),
    };

    let protocol = match Protocol::from_next_header(ip.protocol) {
        Some(protocol) => protocol,
        None => {
            return Ok(Classification::PassThrough(PassThroughReason::UnsupportedTransport(ip.protocol)));
        }
    };

    // 2 番目以降のフラグメントはトランスポートヘッダーを持たない
    let ports = if protocol.has_ports() && ip.fragment_offset == 0 {
        match Ports::parse(transport) {
            Some(ports) => Some(ports),
            None => {
                return Ok(Classification::Malformed(MalformedReason::TruncatedPorts {
                    protocol,
                    actual: transport.len(),
                }));
            }
        }
    } else {
        None
    };

    Ok(Classification::Inspect(Packet {
        src_addr: ip.source,
        dst_addr: ip.destination,
        protocol,
        ports,
    }))
}
