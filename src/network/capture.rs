use crate::engine::error::{FilterError, FilterResult};
use crate::network::packet::HEADER_CAPACITY;
use async_trait::async_trait;
use log::{info, warn};
use pnet::datalink::NetworkInterface;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use tokio::io::unix::AsyncFd;

// linux/if_packet.h
const PACKET_IGNORE_OUTGOING: libc::c_int = 23;

// キューから取り出さずに読んだフレーム先頭と、フレーム全体の長さ
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    buffer: [u8; HEADER_CAPACITY],
    captured: usize,
    pub frame_len: usize,
}

impl FrameHeader {
    pub fn new(buffer: [u8; HEADER_CAPACITY], captured: usize, frame_len: usize) -> Self {
        Self {
            buffer,
            captured: captured.min(HEADER_CAPACITY),
            frame_len,
        }
    }

    pub fn from_frame(frame: &[u8]) -> Self {
        let mut buffer = [0u8; HEADER_CAPACITY];
        let captured = frame.len().min(HEADER_CAPACITY);
        buffer[..captured].copy_from_slice(&frame[..captured]);
        Self::new(buffer, captured, frame.len())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.captured]
    }
}

// フレームの受信側
// peek_header はフレームをキューに残したまま先頭を返し、
// 続く consume_frame が同じフレームを取り出す
#[async_trait]
pub trait FrameSource: Send + Sync {
    fn interface(&self) -> &str;

    async fn peek_header(&self) -> io::Result<FrameHeader>;

    async fn consume_frame(&self, frame_len: usize) -> io::Result<Vec<u8>>;
}

#[async_trait]
pub trait FrameSink: Send + Sync {
    // 書き込めたバイト数を返す
    async fn send_frame(&self, frame: &[u8]) -> io::Result<usize>;
}

// インターフェースに bind した AF_PACKET raw ソケット
pub struct AfPacketSocket {
    fd: AsyncFd<OwnedFd>,
    interface: String,
}

impl AfPacketSocket {
    pub fn bind(interface: &NetworkInterface) -> FilterResult<Self> {
        let socket_error = |source: io::Error| FilterError::Socket {
            interface: interface.name.clone(),
            source,
        };

        // bind 前に他のインターフェースのフレームが溜まらないよう、プロトコル 0 で作成する
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                0,
            )
        };
        if fd < 0 {
            return Err(socket_error(io::Error::last_os_error()));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        let mut sll: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        sll.sll_family = libc::AF_PACKET as u16;
        sll.sll_protocol = (libc::ETH_P_ALL as u16).to_be();
        sll.sll_ifindex = interface.index as libc::c_int;

        let ret = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &sll as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(socket_error(io::Error::last_os_error()));
        }

        // 自分宛て以外のフレームも受け取る
        let mreq = promisc_membership(interface.index);
        if let Err(e) = set_option(&fd, libc::SOL_PACKET, libc::PACKET_ADD_MEMBERSHIP, &mreq) {
            warn!("{} をプロミスキャスモードにできませんでした: {}", interface.name, e);
        }

        // ホストが送信したフレームを再度キャプチャしない
        let enable: libc::c_int = 1;
        if let Err(e) = set_option(&fd, libc::SOL_PACKET, PACKET_IGNORE_OUTGOING, &enable) {
            warn!("{} で PACKET_IGNORE_OUTGOING を設定できませんでした: {}", interface.name, e);
        }

        let fd = AsyncFd::new(fd).map_err(socket_error)?;

        info!("AF_PACKET ソケットを {} (index={}) に bind しました", interface.name, interface.index);

        Ok(Self {
            fd,
            interface: interface.name.clone(),
        })
    }

    async fn recv_with(&self, buf: &mut [u8], flags: libc::c_int) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.readable().await?;
            match guard.try_io(|fd| recv(fd.as_raw_fd(), &mut *buf, flags)) {
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

#[async_trait]
impl FrameSource for AfPacketSocket {
    fn interface(&self) -> &str {
        &self.interface
    }

    async fn peek_header(&self) -> io::Result<FrameHeader> {
        let mut buffer = [0u8; HEADER_CAPACITY];
        // MSG_TRUNC により切り詰められる前のフレーム長が返る
        let frame_len = self.recv_with(&mut buffer, libc::MSG_PEEK | libc::MSG_TRUNC).await?;
        Ok(FrameHeader::new(buffer, frame_len, frame_len))
    }

    async fn consume_frame(&self, frame_len: usize) -> io::Result<Vec<u8>> {
        let mut frame = vec![0u8; frame_len];
        let read = self.recv_with(&mut frame, 0).await?;
        frame.truncate(read);
        Ok(frame)
    }
}

#[async_trait]
impl FrameSink for AfPacketSocket {
    async fn send_frame(&self, frame: &[u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.writable().await?;
            match guard.try_io(|fd| send(fd.as_raw_fd(), frame)) {
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

fn promisc_membership(ifindex: u32) -> libc::packet_mreq {
    libc::packet_mreq {
        mr_ifindex: ifindex as libc::c_int,
        mr_type: libc::PACKET_MR_PROMISC as libc::c_ushort,
        mr_alen: 0,
        mr_address: [0; 8],
    }
}

fn recv(fd: RawFd, buf: &mut [u8], flags: libc::c_int) -> io::Result<usize> {
    let n = unsafe { libc::recv(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), flags) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize)
}

fn send(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    let n = unsafe { libc::send(fd, buf.as_ptr() as *const libc::c_void, buf.len(), 0) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize)
}

fn set_option<T>(fd: &OwnedFd, level: libc::c_int, name: libc::c_int, value: &T) -> io::Result<()> {
    let ret = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            level,
            name,
            value as *const T as *const libc::c_void,
            std::mem::size_of::<T>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
