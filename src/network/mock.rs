// テスト用のメモリ上のインターフェース

use crate::network::capture::{FrameHeader, FrameSink, FrameSource};
use async_trait::async_trait;
use std::io;
use tokio::sync::{mpsc, Mutex};

// 受信キューと送信先をチャネルで表したインターフェース
// peek_header で受け取ったフレームは consume_frame まで保留される
pub struct MockEndpoint {
    name: String,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    pending: Mutex<Option<Vec<u8>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

// テスト側から操作するためのハンドル
pub struct MockWire {
    // インターフェースに届くフレームを流し込む
    pub inject: mpsc::UnboundedSender<Vec<u8>>,
    // インターフェースから送信されたフレーム
    pub transmitted: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MockEndpoint {
    pub fn new(name: &str) -> (Self, MockWire) {
        let (inject, inbound) = mpsc::unbounded_channel();
        let (outbound, transmitted) = mpsc::unbounded_channel();

        (
            Self {
                name: name.to_string(),
                inbound: Mutex::new(inbound),
                pending: Mutex::new(None),
                outbound,
            },
            MockWire { inject, transmitted },
        )
    }
}

#[async_trait]
impl FrameSource for MockEndpoint {
    fn interface(&self) -> &str {
        &self.name
    }

    async fn peek_header(&self) -> io::Result<FrameHeader> {
        let mut pending = self.pending.lock().await;
        if pending.is_none() {
            let frame = self
                .inbound
                .lock()
                .await
                .recv()
                .await
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "mock wire closed"))?;
            *pending = Some(frame);
        }
        let frame = pending.as_deref().unwrap_or_default();
        Ok(FrameHeader::from_frame(frame))
    }

    async fn consume_frame(&self, frame_len: usize) -> io::Result<Vec<u8>> {
        let mut frame = self
            .pending
            .lock()
            .await
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no frame was peeked"))?;
        frame.truncate(frame_len);
        Ok(frame)
    }
}

#[async_trait]
impl FrameSink for MockEndpoint {
    async fn send_frame(&self, frame: &[u8]) -> io::Result<usize> {
        self.outbound
            .send(frame.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "mock wire closed"))?;
        Ok(frame.len())
    }
}
