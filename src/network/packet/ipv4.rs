use pnet::packet::ip::IpNextHeaderProtocol;
use std::net::Ipv4Addr;

// オプションなしの IPv4 ヘッダー長
pub const IPV4_MIN_HEADER_LEN: usize = 20;
// IHL = 15 の場合の最大長
pub const IPV4_MAX_HEADER_LEN: usize = 60;

// フィルタリングに必要なフィールドのみを保持する IPv4 ヘッダー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IPv4Header {
    pub ihl: u8,
    pub fragment_offset: u16,
    pub protocol: IpNextHeaderProtocol,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IPv4ParseError {
    // 固定長部分が足りない
    Truncated,
    // IHL が 5 未満
    InvalidIhl(u8),
    // IHL が示すオプション部分が足りない
    TruncatedOptions { header_len: usize },
}

impl IPv4Header {
    // ヘッダーを解析し、トランスポート層の先頭 (IHL * 4 バイト目以降) を返す
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), IPv4ParseError> {
        if data.len() < IPV4_MIN_HEADER_LEN {
            return Err(IPv4ParseError::Truncated);
        }

        let ihl = data[0] & 0xf;
        if ihl < 5 {
            return Err(IPv4ParseError::InvalidIhl(ihl));
        }
        let header_len = ihl as usize * 4;
        if data.len() < header_len {
            return Err(IPv4ParseError::TruncatedOptions { header_len });
        }

        let fragment_offset = u16::from_be_bytes([data[6] & 0x1f, data[7]]);
        let protocol = IpNextHeaderProtocol(data[9]);
        let source = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
        let destination = Ipv4Addr::new(data[16], data[17], data[18], data[19]);

        Ok((
            Self {
                ihl,
                fragment_offset,
                protocol,
                source,
                destination,
            },
            &data[header_len..],
        ))
    }

    pub fn header_len(&self) -> usize {
        self.ihl as usize * 4
    }
}
