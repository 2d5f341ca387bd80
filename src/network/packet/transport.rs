use serde::Serialize;

// TCP/UDP ヘッダー先頭の送信元・宛先ポート (計 4 バイト)
pub const TRANSPORT_PORTS_LEN: usize = 4;

// TCP と UDP はどちらもヘッダー先頭にポート番号を 2 つ持つため、
// フラグやシーケンス番号は読まずにこの部分だけを取り出す
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ports {
    pub source: u16,
    pub destination: u16,
}

impl Ports {
    pub fn new(source: u16, destination: u16) -> Self {
        Self {
            source,
            destination,
        }
    }

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < TRANSPORT_PORTS_LEN {
            return None;
        }

        let source = u16::from_be_bytes([data[0], data[1]]);
        let destination = u16::from_be_bytes([data[2], data[3]]);

        Some(Self::new(source, destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_ports_in_network_order() {
        let data = [0x1f, 0x90, 0x00, 0x16, 0xde, 0xad];
        assert_eq!(Ports::parse(&data), Some(Ports::new(8080, 22)));
    }

    #[test]
    fn rejects_short_header() {
        assert_eq!(Ports::parse(&[0x00, 0x50, 0x00]), None);
    }
}
