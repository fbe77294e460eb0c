use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::MetricSnapshot;
use crate::services::{snapshot_builder, UpstreamClient};

pub struct AppStateInner {
    pub upstream: Arc<dyn UpstreamClient>,
    /// 单次轮询的上限
    pub timeout: Duration,
    /// 最近一次发布的快照，只整体替换
    pub published: ArcSwap<MetricSnapshot>,
}

pub type AppState = Arc<AppStateInner>;

pub fn new_state(upstream: Arc<dyn UpstreamClient>, timeout: Duration) -> AppState {
    Arc::new(AppStateInner {
        upstream,
        timeout,
        published: ArcSwap::from_pointee(snapshot_builder::empty()),
    })
}
