// テスト用のフレーム生成ヘルパー

const SRC_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
const DST_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x02];

fn ethernet(ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(14 + payload.len());
    frame.extend_from_slice(&DST_MAC);
    frame.extend_from_slice(&SRC_MAC);
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

pub fn ipv4_with_options(src: [u8; 4], dst: [u8; 4], protocol: u8, options: &[u8], payload: &[u8]) -> Vec<u8> {
    assert_eq!(options.len() % 4, 0);
    let header_len = 20 + options.len();
    let total_len = (header_len + payload.len()) as u16;

    let mut ip = Vec::with_capacity(total_len as usize);
    ip.push(0x40 | (header_len / 4) as u8);
    ip.push(0);
    ip.extend_from_slice(&total_len.to_be_bytes());
    ip.extend_from_slice(&[0x12, 0x34, 0x40, 0x00]);
    ip.push(64);
    ip.push(protocol);
    ip.extend_from_slice(&[0, 0]);
    ip.extend_from_slice(&src);
    ip.extend_from_slice(&dst);
    ip.extend_from_slice(options);
    ip.extend_from_slice(payload);

    ethernet(0x0800, &ip)
}

pub fn tcp(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16) -> Vec<u8> {
    let mut segment = Vec::with_capacity(24);
    segment.extend_from_slice(&src_port.to_be_bytes());
    segment.extend_from_slice(&dst_port.to_be_bytes());
    segment.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0, 0x50, 0x02, 0xff, 0xff, 0, 0, 0, 0]);
    segment.extend_from_slice(b"ping");
    ipv4_with_options(src, dst, 6, &[], &segment)
}

pub fn udp(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16) -> Vec<u8> {
    let payload = b"hello";
    let mut datagram = Vec::with_capacity(8 + payload.len());
    datagram.extend_from_slice(&src_port.to_be_bytes());
    datagram.extend_from_slice(&dst_port.to_be_bytes());
    datagram.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    datagram.extend_from_slice(&[0, 0]);
    datagram.extend_from_slice(payload);
    ipv4_with_options(src, dst, 17, &[], &datagram)
}

pub fn icmp(src: [u8; 4], dst: [u8; 4]) -> Vec<u8> {
    // echo request
    let message = [8, 0, 0, 0, 0, 1, 0, 1, 0xca, 0xfe];
    ipv4_with_options(src, dst, 1, &[], &message)
}

pub fn arp() -> Vec<u8> {
    let mut body = vec![0x00, 0x01, 0x08, 0x00, 6, 4, 0x00, 0x01];
    body.extend_from_slice(&SRC_MAC);
    body.extend_from_slice(&[10, 0, 0, 1]);
    body.extend_from_slice(&[0u8; 6]);
    body.extend_from_slice(&[10, 0, 0, 2]);
    ethernet(0x0806, &body)
}
