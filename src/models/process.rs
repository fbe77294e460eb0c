use serde::Deserialize;
use std::fmt;

/// supervisord 的进程状态（`statename` 字段）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Backoff,
    Stopping,
    Exited,
    Fatal,
    Unknown,
    /// 未知的状态名，原样保留用于标签输出
    Other(String),
}

impl ProcessState {
    pub fn as_str(&self) -> &str {
        match self {
            ProcessState::Stopped => "STOPPED",
            ProcessState::Starting => "STARTING",
            ProcessState::Running => "RUNNING",
            ProcessState::Backoff => "BACKOFF",
            ProcessState::Stopping => "STOPPING",
            ProcessState::Exited => "EXITED",
            ProcessState::Fatal => "FATAL",
            ProcessState::Unknown => "UNKNOWN",
            ProcessState::Other(name) => name,
        }
    }

    /// 只有 RUNNING 视为 "up"
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running)
    }
}

impl From<String> for ProcessState {
    fn from(name: String) -> Self {
        match name.as_str() {
            "STOPPED" => ProcessState::Stopped,
            "STARTING" => ProcessState::Starting,
            "RUNNING" => ProcessState::Running,
            "BACKOFF" => ProcessState::Backoff,
            "STOPPING" => ProcessState::Stopping,
            "EXITED" => ProcessState::Exited,
            "FATAL" => ProcessState::Fatal,
            "UNKNOWN" => ProcessState::Unknown,
            _ => ProcessState::Other(name),
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 逻辑进程标识：(name, group)，与重启次数无关
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessKey {
    pub name: String,
    pub group: String,
}

impl ProcessKey {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
        }
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// `supervisor.getAllProcessInfo` 返回的单条进程记录
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessRecord {
    pub name: String,
    pub group: String,
    /// 未运行时为 0
    #[serde(default)]
    pub pid: i64,
    #[serde(rename = "statename")]
    pub state: ProcessState,
    #[serde(rename = "start")]
    pub start_time: i64,
    #[serde(rename = "stop", default)]
    pub stop_time: i64,
    #[serde(rename = "now", default)]
    pub now_time: i64,
    /// 仅在进程未运行时有意义
    #[serde(rename = "exitstatus", default)]
    pub exit_status: i64,
    #[serde(default)]
    pub description: String,
}

impl ProcessRecord {
    pub fn key(&self) -> ProcessKey {
        ProcessKey::new(self.name.clone(), self.group.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_supervisor_fields() {
        let record: ProcessRecord = serde_json::from_value(json!({
            "name": "worker",
            "group": "web",
            "pid": 4242,
            "statename": "RUNNING",
            "state": 20,
            "start": 1700000000,
            "stop": 0,
            "now": 1700000060,
            "exitstatus": 0,
            "description": "pid 4242, uptime 0:01:00",
            "spawnerr": "",
        }))
        .unwrap();

        assert_eq!(record.key(), ProcessKey::new("worker", "web"));
        assert_eq!(record.pid, 4242);
        assert_eq!(record.state, ProcessState::Running);
        assert_eq!(record.start_time, 1700000000);
        assert_eq!(record.now_time, 1700000060);
        assert_eq!(record.description, "pid 4242, uptime 0:01:00");
    }

    #[test]
    fn test_optional_fields_default() {
        let record: ProcessRecord = serde_json::from_value(json!({
            "name": "cron",
            "group": "cron",
            "statename": "STOPPED",
            "start": 0,
        }))
        .unwrap();

        assert_eq!(record.pid, 0);
        assert_eq!(record.exit_status, 0);
        assert!(record.description.is_empty());
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let result = serde_json::from_value::<ProcessRecord>(json!({
            "name": "worker",
            "statename": "RUNNING",
            "start": 100,
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_key_display_is_group_qualified() {
        let key = ProcessKey::new("worker", "web");
        assert_eq!(key.to_string(), "web:worker");
    }

    #[test]
    fn test_unknown_state_is_preserved() {
        let state = ProcessState::from("WEIRD".to_string());
        assert_eq!(state, ProcessState::Other("WEIRD".to_string()));
        assert_eq!(state.to_string(), "WEIRD");
        assert!(!state.is_running());
        assert!(ProcessState::from("RUNNING".to_string()).is_running());
    }
}
