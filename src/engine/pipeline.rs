use crate::engine::error::{FilterError, FilterResult};
use crate::network::capture::{FrameSink, FrameSource};
use crate::network::packet::{classify, Classification};
use crate::security::firewall::RuleSet;
use log::{debug, trace};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// 1 方向分の転送カウンタ
#[derive(Debug, Default)]
pub struct PipelineStats {
    forwarded: AtomicU64,
    dropped: AtomicU64,
    passed_through: AtomicU64,
    malformed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub forwarded: u64,
    pub dropped: u64,
    // ルール対象外として転送した
    pub passed_through: u64,
    // ヘッダーが壊れていて破棄した
    pub malformed: u64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            passed_through: self.passed_through.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

// 受信側インターフェースのフレームを検査し、許可したものを送信側へ流す
pub struct ForwardingPipeline<S, D> {
    source: Arc<S>,
    sink: Arc<D>,
    rules: Arc<RuleSet>,
    stats: Arc<PipelineStats>,
    label: String,
}

impl<S, D> ForwardingPipeline<S, D>
where
    S: FrameSource,
    D: FrameSink,
{
    pub fn new(source: Arc<S>, sink: Arc<D>, rules: Arc<RuleSet>, label: String) -> Self {
        Self {
            source,
            sink,
            rules,
            stats: Arc::new(PipelineStats::default()),
            label,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    // エラーが起きるまでフレームを処理し続ける
    pub async fn run(&self) -> FilterResult<()> {
        loop {
            self.process_next_frame().await?;
        }
    }

    async fn process_next_frame(&self) -> FilterResult<()> {
        let header = self.source.peek_header().await?;

        let accept = match classify(header.bytes())? {
            Classification::Inspect(packet) => {
                let decision = self.rules.evaluate(&packet);
                trace!(
                    "[{}] {} -> {} (rule={:?}, skipped={})",
                    self.label,
                    packet,
                    if decision.accept { "accept" } else { "drop" },
                    decision.matched_rule,
                    decision.skipped
                );
                if decision.accept {
                    self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
                decision.accept
            }
            Classification::PassThrough(reason) => {
                trace!("[{}] pass through: {:?}", self.label, reason);
                self.stats.passed_through.fetch_add(1, Ordering::Relaxed);
                true
            }
            Classification::Malformed(reason) => {
                debug!("[{}] 壊れたフレームを破棄します: {:?}", self.label, reason);
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                false
            }
        };

        // 拒否した場合も取り出してキューから捨てる
        let frame = self.source.consume_frame(header.frame_len).await?;
        if frame.len() != header.frame_len {
            return Err(FilterError::ShortRead {
                expected: header.frame_len,
                actual: frame.len(),
            });
        }

        if accept {
            let written = self.sink.send_frame(&frame).await?;
            if written != frame.len() {
                return Err(FilterError::ShortWrite {
                    expected: frame.len(),
                    actual: written,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::DecodeError;
    use crate::network::capture::FrameHeader;
    use crate::network::mock::MockEndpoint;
    use crate::network::packet::frames;
    use crate::security::firewall::Rule;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Mutex;

    // 書き込みを途中で打ち切る送信側
    struct TruncatingSink;

    #[async_trait]
    impl FrameSink for TruncatingSink {
        async fn send_frame(&self, frame: &[u8]) -> io::Result<usize> {
            Ok(frame.len() / 2)
        }
    }

    // 覗いた長さより短いフレームしか返さない受信側
    struct ShrinkingSource {
        frame: Vec<u8>,
    }

    #[async_trait]
    impl FrameSource for ShrinkingSource {
        fn interface(&self) -> &str {
            "shrink0"
        }

        async fn peek_header(&self) -> io::Result<FrameHeader> {
            Ok(FrameHeader::from_frame(&self.frame))
        }

        async fn consume_frame(&self, frame_len: usize) -> io::Result<Vec<u8>> {
            Ok(self.frame[..frame_len - 1].to_vec())
        }
    }

    // 書き込まれたフレームを記録する送信側
    #[derive(Default)]
    struct RecordingSink {
        frames: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn send_frame(&self, frame: &[u8]) -> io::Result<usize> {
            self.frames.lock().unwrap().push(frame.to_vec());
            Ok(frame.len())
        }
    }

    fn pipeline_from_mock(
        rules: RuleSet,
    ) -> (
        ForwardingPipeline<MockEndpoint, RecordingSink>,
        crate::network::mock::MockWire,
        Arc<RecordingSink>,
    ) {
        let (source, wire) = MockEndpoint::new("mock0");
        let sink = Arc::new(RecordingSink::default());
        let pipeline = ForwardingPipeline::new(Arc::new(source), Arc::clone(&sink), Arc::new(rules), "mock0 -> rec0".to_string());
        (pipeline, wire, sink)
    }

    #[tokio::test]
    async fn forwards_accepted_and_drops_rejected_frames() {
        let rules = RuleSet::blacklist(vec![Rule::match_destination_port("22").unwrap()]);
        let (pipeline, wire, sink) = pipeline_from_mock(rules);

        let ssh = frames::tcp([10, 0, 0, 5], [10, 0, 0, 9], 40000, 22);
        let http = frames::tcp([10, 0, 0, 5], [10, 0, 0, 9], 40001, 80);
        let arp = frames::arp();
        wire.inject.send(ssh).unwrap();
        wire.inject.send(http.clone()).unwrap();
        wire.inject.send(arp.clone()).unwrap();

        for _ in 0..3 {
            pipeline.process_next_frame().await.unwrap();
        }

        assert_eq!(*sink.frames.lock().unwrap(), vec![http, arp]);
        assert_eq!(
            pipeline.stats().snapshot(),
            StatsSnapshot {
                forwarded: 1,
                dropped: 1,
                passed_through: 1,
                malformed: 0
            }
        );
    }

    #[tokio::test]
    async fn malformed_ipv4_is_dropped_and_counted() {
        let (pipeline, wire, sink) = pipeline_from_mock(RuleSet::blacklist(vec![]));

        let mut bad_ihl = frames::udp([10, 0, 0, 1], [10, 0, 0, 2], 1000, 2000);
        bad_ihl[14] = 0x43;
        let good = frames::udp([10, 0, 0, 1], [10, 0, 0, 2], 1000, 2000);
        wire.inject.send(bad_ihl).unwrap();
        wire.inject.send(good.clone()).unwrap();

        pipeline.process_next_frame().await.unwrap();
        pipeline.process_next_frame().await.unwrap();

        assert_eq!(*sink.frames.lock().unwrap(), vec![good]);
        let stats = pipeline.stats().snapshot();
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.forwarded, 1);
    }

    #[tokio::test]
    async fn runt_frame_stops_the_pipeline() {
        let (pipeline, wire, sink) = pipeline_from_mock(RuleSet::blacklist(vec![]));
        wire.inject.send(vec![0u8; 8]).unwrap();

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, FilterError::Decode(DecodeError::Truncated { needed: 14, actual: 8 })));
        assert!(sink.frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_write_is_fatal() {
        let (source, wire) = MockEndpoint::new("mock0");
        let pipeline = ForwardingPipeline::new(
            Arc::new(source),
            Arc::new(TruncatingSink),
            Arc::new(RuleSet::blacklist(vec![])),
            "mock0 -> trunc0".to_string(),
        );
        let frame = frames::udp([10, 0, 0, 1], [10, 0, 0, 2], 1000, 2000);
        let expected = frame.len();
        wire.inject.send(frame).unwrap();

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, FilterError::ShortWrite { expected: e, actual } if e == expected && actual == expected / 2));
    }

    #[tokio::test]
    async fn short_read_is_fatal() {
        let frame = frames::icmp([10, 0, 0, 1], [10, 0, 0, 2]);
        let expected = frame.len();
        let sink = Arc::new(RecordingSink::default());
        let pipeline = ForwardingPipeline::new(
            Arc::new(ShrinkingSource { frame }),
            Arc::clone(&sink),
            Arc::new(RuleSet::blacklist(vec![])),
            "shrink0 -> rec0".to_string(),
        );

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, FilterError::ShortRead { expected: e, actual } if e == expected && actual == expected - 1));
        assert!(sink.frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_source_ends_with_capture_error() {
        let (pipeline, wire, _sink) = pipeline_from_mock(RuleSet::whitelist(vec![]));
        drop(wire);

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, FilterError::Capture(_)));
    }
}
