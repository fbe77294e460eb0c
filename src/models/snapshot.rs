use std::collections::BTreeMap;

use crate::models::{ProcessKey, ProcessRecord};

/// `supervisor_process_info` 的标签顺序
pub const PROCESS_INFO_LABELS: [&str; 9] = [
    "pid",
    "name",
    "group",
    "state",
    "start_time",
    "stop_time",
    "now_time",
    "description",
    "exit_status",
];

/// 单个进程的完整标签集
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessLabels {
    pub pid: String,
    pub name: String,
    pub group: String,
    pub state: String,
    pub start_time: String,
    pub stop_time: String,
    pub now_time: String,
    pub description: String,
    pub exit_status: String,
}

impl ProcessLabels {
    /// 与 [`PROCESS_INFO_LABELS`] 顺序一致
    pub fn values(&self) -> [&str; 9] {
        [
            self.pid.as_str(),
            self.name.as_str(),
            self.group.as_str(),
            self.state.as_str(),
            self.start_time.as_str(),
            self.stop_time.as_str(),
            self.now_time.as_str(),
            self.description.as_str(),
            self.exit_status.as_str(),
        ]
    }
}

impl From<&ProcessRecord> for ProcessLabels {
    fn from(record: &ProcessRecord) -> Self {
        Self {
            pid: record.pid.to_string(),
            name: record.name.clone(),
            group: record.group.clone(),
            state: record.state.to_string(),
            start_time: record.start_time.to_string(),
            stop_time: record.stop_time.to_string(),
            now_time: record.now_time.to_string(),
            description: record.description.clone(),
            exit_status: record.exit_status.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessMetric {
    /// 1 = RUNNING，其余为 0
    pub value: f64,
    pub labels: ProcessLabels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Up,
    Down,
}

impl Connectivity {
    pub fn as_gauge(self) -> f64 {
        match self {
            Connectivity::Up => 1.0,
            Connectivity::Down => 0.0,
        }
    }
}

/// 一次轮询的完整结果，每次 scrape 整体替换，从不合并
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    pub processes: BTreeMap<ProcessKey, ProcessMetric>,
    /// 只包含 RUNNING 的进程
    pub uptimes: BTreeMap<ProcessKey, f64>,
    pub connectivity: Connectivity,
}

impl MetricSnapshot {
    pub fn is_up(&self) -> bool {
        self.connectivity == Connectivity::Up
    }
}
