use crate::engine::error::{FilterError, FilterResult};
use crate::engine::pipeline::{ForwardingPipeline, PipelineStats, StatsSnapshot};
use crate::network::capture::{AfPacketSocket, FrameSink, FrameSource};
use crate::security::firewall::RuleSet;
use crate::select_device::select_device;
use log::{error, info};
use std::sync::Arc;
use tokio::task::JoinHandle;

struct Worker {
    label: String,
    stats: Arc<PipelineStats>,
    handle: JoinHandle<()>,
}

// 2 つのインターフェース間でフレームを双方向に中継する。
// 方向ごとに独立したタスクが動き、ルールセットは読み取り専用で共有する
pub struct Filter {
    rules: Arc<RuleSet>,
    workers: Vec<Worker>,
}

impl Filter {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
            workers: Vec::new(),
        }
    }

    // 両方のインターフェースにソケットを bind してから転送を開始する
    // tokio ランタイム上で呼び出す必要がある
    pub fn start(&mut self, iface1: &str, iface2: &str) -> FilterResult<()> {
        if self.is_running() {
            return Err(FilterError::AlreadyRunning);
        }

        let socket1 = AfPacketSocket::bind(&select_device(iface1)?)?;
        let socket2 = AfPacketSocket::bind(&select_device(iface2)?)?;

        self.start_with(Arc::new(socket1), Arc::new(socket2))
    }

    pub fn start_with<E>(&mut self, endpoint1: Arc<E>, endpoint2: Arc<E>) -> FilterResult<()>
    where
        E: FrameSource + FrameSink + 'static,
    {
        if self.is_running() {
            return Err(FilterError::AlreadyRunning);
        }
        // 前回異常終了したワーカーの統計は引き継がない
        self.workers.clear();

        self.spawn_worker(Arc::clone(&endpoint1), Arc::clone(&endpoint2));
        self.spawn_worker(endpoint2, endpoint1);

        info!(
            "フィルタを開始しました ({}, ルール数: {})",
            self.rules.policy(),
            self.rules.len()
        );
        Ok(())
    }

    fn spawn_worker<E>(&mut self, from: Arc<E>, to: Arc<E>)
    where
        E: FrameSource + FrameSink + 'static,
    {
        let label = format!("{} -> {}", from.interface(), to.interface());
        let pipeline = ForwardingPipeline::new(from, to, Arc::clone(&self.rules), label.clone());
        let stats = pipeline.stats();

        let handle = tokio::spawn(async move {
            info!("[{}] 転送を開始します", pipeline.label());
            if let Err(e) = pipeline.run().await {
                // 反対方向のワーカーは影響を受けない
                error!("[{}] 転送を停止しました: {}", pipeline.label(), e);
            }
        });

        self.workers.push(Worker { label, stats, handle });
    }

    pub fn is_running(&self) -> bool {
        self.workers.iter().any(|worker| !worker.handle.is_finished())
    }

    pub fn stats(&self) -> Vec<(String, StatsSnapshot)> {
        self.workers
            .iter()
            .map(|worker| (worker.label.clone(), worker.stats.snapshot()))
            .collect()
    }

    // 両方のワーカーを強制終了する
    // 転送中のフレームは失われることがある。未起動・停止済みでも呼び出せる。
    pub async fn stop(&mut self) {
        for worker in self.workers.drain(..) {
            worker.handle.abort();
            // 中断による JoinError は想定どおり
            let _ = worker.handle.await;

            let stats = worker.stats.snapshot();
            info!(
                "[{}] 停止しました (転送: {}, 破棄: {}, 対象外: {}, 不正: {})",
                worker.label, stats.forwarded, stats.dropped, stats.passed_through, stats.malformed
            );
        }
    }
}

impl Drop for Filter {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.handle.abort();
        }
    }
}
