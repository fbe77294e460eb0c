use prometheus::{
    Encoder, Gauge, IntCounter, Opts, Registry, TextEncoder,
    register_gauge_vec_with_registry, register_gauge_with_registry,
    register_int_counter_with_registry,
};
use lazy_static::lazy_static;
use std::sync::Arc;

use crate::models::{MetricSnapshot, PROCESS_INFO_LABELS};

/// exporter 自身的指标，进程级全局，每次 scrape 追加输出
pub struct ExporterMetrics {
    registry: Registry,

    pub scrapes_total: IntCounter,
    pub scrape_errors_total: IntCounter,
    pub skipped_records_total: IntCounter,
    pub last_scrape_duration: Gauge,
}

impl ExporterMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let scrapes_total = register_int_counter_with_registry!(
            Opts::new("supervisord_exporter_scrapes_total", "Total number of supervisord polls"),
            registry
        ).unwrap();

        let scrape_errors_total = register_int_counter_with_registry!(
            Opts::new("supervisord_exporter_scrape_errors_total", "Number of supervisord polls that failed"),
            registry
        ).unwrap();

        let skipped_records_total = register_int_counter_with_registry!(
            Opts::new("supervisord_exporter_skipped_records_total", "Malformed process records skipped while decoding"),
            registry
        ).unwrap();

        let last_scrape_duration = register_gauge_with_registry!(
            Opts::new("supervisord_exporter_last_scrape_duration_seconds", "Duration of the most recent supervisord poll"),
            registry
        ).unwrap();

        register_process_collector(&registry);

        Self {
            registry,
            scrapes_total,
            scrape_errors_total,
            skipped_records_total,
            last_scrape_duration,
        }
    }
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// exporter 进程自身的 CPU、内存、fd
#[cfg(target_os = "linux")]
fn register_process_collector(registry: &Registry) {
    let collector = prometheus::process_collector::ProcessCollector::for_self();
    if let Err(e) = registry.register(Box::new(collector)) {
        log::warn!("Failed to register process collector: {}", e);
    }
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_registry: &Registry) {}

lazy_static! {
    pub static ref METRICS: Arc<ExporterMetrics> = Arc::new(ExporterMetrics::new());
}

/// 将快照渲染为 Prometheus 文本格式
///
/// 每次使用独立的 Registry，并发 scrape 之间不共享可变状态。
pub fn render(snapshot: &MetricSnapshot) -> prometheus::Result<String> {
    let registry = Registry::new();

    let process_info = register_gauge_vec_with_registry!(
        Opts::new("supervisor_process_info", "Supervisor process information"),
        &PROCESS_INFO_LABELS,
        registry
    )?;

    let process_uptime = register_gauge_vec_with_registry!(
        Opts::new("supervisor_process_uptime", "Uptime of Supervisor processes"),
        &["name", "group"],
        registry
    )?;

    let supervisord_up = register_gauge_with_registry!(
        Opts::new("supervisord_up", "Supervisord XML-RPC connection status (1 if up, 0 if down)"),
        registry
    )?;

    for metric in snapshot.processes.values() {
        process_info
            .with_label_values(&metric.labels.values())
            .set(metric.value);
    }

    for (key, uptime) in &snapshot.uptimes {
        process_uptime
            .with_label_values(&[key.name.as_str(), key.group.as_str()])
            .set(*uptime);
    }

    supervisord_up.set(snapshot.connectivity.as_gauge());

    let mut families = registry.gather();
    families.extend(METRICS.registry.gather());

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::process::ProcessState;
    use crate::models::{Connectivity, ProcessKey, ProcessRecord};
    use crate::services::snapshot_builder;

    fn record(name: &str, state: ProcessState, start: i64) -> ProcessRecord {
        ProcessRecord {
            name: name.to_string(),
            group: "web".to_string(),
            pid: 7,
            state,
            start_time: start,
            stop_time: 0,
            now_time: 160,
            exit_status: 0,
            description: "pid 7, uptime 0:01:00".to_string(),
        }
    }

    #[test]
    fn test_render_process_series() {
        let snapshot = snapshot_builder::reconcile_at(
            vec![
                record("worker", ProcessState::Running, 100),
                record("cron", ProcessState::Exited, 90),
            ],
            160.0,
        );

        let text = render(&snapshot).unwrap();

        assert!(text.contains("# TYPE supervisor_process_info gauge"));
        assert!(text.contains(
            "supervisor_process_info{description=\"pid 7, uptime 0:01:00\",exit_status=\"0\",group=\"web\",name=\"worker\",now_time=\"160\",pid=\"7\",start_time=\"100\",state=\"RUNNING\",stop_time=\"0\"} 1"
        ));
        assert!(text.contains("name=\"cron\",now_time=\"160\",pid=\"7\",start_time=\"90\",state=\"EXITED\",stop_time=\"0\"} 0"));
        assert!(text.contains("supervisor_process_uptime{group=\"web\",name=\"worker\"} 60"));
        assert!(!text.contains("supervisor_process_uptime{group=\"web\",name=\"cron\"}"));
        assert!(text.contains("supervisord_up 1"));
        assert!(text.contains("supervisord_exporter_scrapes_total"));
    }

    #[test]
    fn test_render_empty_snapshot() {
        let text = render(&snapshot_builder::empty()).unwrap();

        assert!(text.contains("supervisord_up 0"));
        assert!(!text.contains("supervisor_process_info{"));
        assert!(!text.contains("supervisor_process_uptime{"));
    }

    #[test]
    fn test_render_does_not_leak_between_snapshots() {
        let mut snapshot = snapshot_builder::reconcile_at(
            vec![record("worker", ProcessState::Running, 100)],
            160.0,
        );
        assert!(render(&snapshot).unwrap().contains("name=\"worker\""));

        snapshot.processes.remove(&ProcessKey::new("worker", "web"));
        snapshot.uptimes.clear();
        snapshot.connectivity = Connectivity::Down;
        assert!(!render(&snapshot).unwrap().contains("name=\"worker\""));
    }
}
