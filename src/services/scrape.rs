use log::{debug, error};
use std::time::{Duration, Instant};

use crate::metrics::METRICS;
use crate::models::MetricSnapshot;
use crate::services::{snapshot_builder, ConnectivityError, UpstreamClient};

/// 一次完整的 poll-transform 周期，任何上游错误都被吸收为 connectivity = down
pub async fn poll(upstream: &dyn UpstreamClient, timeout: Duration) -> MetricSnapshot {
    let started = Instant::now();
    METRICS.scrapes_total.inc();

    let result = match tokio::time::timeout(timeout, upstream.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(ConnectivityError::Timeout(timeout)),
    };

    let snapshot = match result {
        Ok(records) => {
            debug!("Fetched {} process records from {}", records.len(), upstream.endpoint());
            snapshot_builder::reconcile(records)
        }
        Err(e) => {
            error!("Error fetching supervisor process info from {}: {}", upstream.endpoint(), e);
            METRICS.scrape_errors_total.inc();
            snapshot_builder::empty()
        }
    };

    METRICS
        .last_scrape_duration
        .set(started.elapsed().as_secs_f64());

    snapshot
}


#[cfg(test)]
mod tests {
    use super::testing::{running, FakeUpstream, Reply};
    use super::*;
    use crate::models::{Connectivity, ProcessKey};

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[actix_rt::test]
    async fn test_successful_poll_is_up() {
        let upstream = FakeUpstream::new(vec![Reply::Records(vec![
            running("worker", "web", 100),
            running("worker", "web", 50),
        ])]);

        let snapshot = poll(&upstream, TIMEOUT).await;
        assert_eq!(snapshot.connectivity, Connectivity::Up);
        assert_eq!(snapshot.processes.len(), 1);
        assert!(snapshot.uptimes.contains_key(&ProcessKey::new("worker", "web")));
    }

    #[actix_rt::test]
    async fn test_failure_does_not_carry_over_previous_poll() {
        let upstream = FakeUpstream::new(vec![
            Reply::Records(vec![running("worker", "web", 100)]),
            Reply::Refused,
        ]);

        let first = poll(&upstream, TIMEOUT).await;
        assert_eq!(first.processes.len(), 1);

        let second = poll(&upstream, TIMEOUT).await;
        assert_eq!(second.connectivity, Connectivity::Down);
        assert!(second.processes.is_empty());
        assert!(second.uptimes.is_empty());
    }

    #[actix_rt::test]
    async fn test_hung_upstream_times_out() {
        let upstream = FakeUpstream::new(vec![Reply::Hang(Duration::from_secs(30))]);

        let started = Instant::now();
        let snapshot = poll(&upstream, Duration::from_millis(50)).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(snapshot.connectivity, Connectivity::Down);
        assert!(snapshot.processes.is_empty());
    }

    #[actix_rt::test]
    async fn test_failed_poll_counts_error() {
        let before = METRICS.scrape_errors_total.get();
        let upstream = FakeUpstream::new(vec![Reply::Refused]);

        poll(&upstream, TIMEOUT).await;
        assert!(METRICS.scrape_errors_total.get() > before);
    }
}
