use log::debug;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{
    Connectivity, MetricSnapshot, ProcessKey, ProcessLabels, ProcessMetric, ProcessRecord,
};

/// 每个 (name, group) 只保留 start_time 最大的一条记录
///
/// start_time 相同时保留先出现的记录。
pub fn latest_per_process(records: Vec<ProcessRecord>) -> BTreeMap<ProcessKey, ProcessRecord> {
    let mut latest: BTreeMap<ProcessKey, ProcessRecord> = BTreeMap::new();

    for record in records {
        match latest.entry(record.key()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if record.start_time > slot.get().start_time {
                    debug!(
                        "Replacing {} started at {} with instance started at {}",
                        slot.key(),
                        slot.get().start_time,
                        record.start_time
                    );
                    slot.insert(record);
                }
            }
        }
    }

    latest
}

/// 以当前时间构建快照
pub fn reconcile(records: Vec<ProcessRecord>) -> MetricSnapshot {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();

    reconcile_at(records, now)
}

/// 以给定的 Unix 时间（秒）构建快照，uptime = now - start_time
pub fn reconcile_at(records: Vec<ProcessRecord>, now: f64) -> MetricSnapshot {
    let mut processes = BTreeMap::new();
    let mut uptimes = BTreeMap::new();

    for (key, record) in latest_per_process(records) {
        let running = record.state.is_running();

        if running {
            uptimes.insert(key.clone(), now - record.start_time as f64);
        }

        processes.insert(
            key,
            ProcessMetric {
                value: if running { 1.0 } else { 0.0 },
                labels: ProcessLabels::from(&record),
            },
        );
    }

    MetricSnapshot {
        processes,
        uptimes,
        connectivity: Connectivity::Up,
    }
}

/// 上游不可用时发布的快照：没有任何进程数据
pub fn empty() -> MetricSnapshot {
    MetricSnapshot {
        processes: BTreeMap::new(),
        uptimes: BTreeMap::new(),
        connectivity: Connectivity::Down,
    }
}
