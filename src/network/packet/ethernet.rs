use pnet::packet::ethernet::{EtherType, EtherTypes};

pub const ETHERNET_HEADER_LEN: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: [u8; 6],
    pub source: [u8; 6],
    pub ethertype: EtherType,
}

impl EthernetHeader {
    pub fn parse(data: &[u8]) -> Option<(Self, &[u8])> {
        if data.len() < ETHERNET_HEADER_LEN {
            return None;
        }

        let mut destination = [0u8; 6];
        let mut source = [0u8; 6];

        // 宛先が先頭、送信元がその次
        destination.copy_from_slice(&data[0..6]);
        source.copy_from_slice(&data[6..12]);
        let ethertype = EtherType(u16::from_be_bytes([data[12], data[13]]));

        Some((
            Self {
                destination,
                source,
                ethertype,
            },
            &data[ETHERNET_HEADER_LEN..],
        ))
    }

    pub fn is_ipv4(&self) -> bool {
        self.ethertype == EtherTypes::Ipv4
    }
}
