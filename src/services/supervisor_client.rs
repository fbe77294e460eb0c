use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::metrics::METRICS;
use crate::models::ProcessRecord;
use crate::services::xmlrpc::{self, XmlRpcError};

const GET_ALL_PROCESS_INFO: &str = "supervisor.getAllProcessInfo";

/// 上游不可用时的统一错误：网络、HTTP 状态、XML-RPC 解析/fault、超时
#[derive(Debug, Error)]
pub enum ConnectivityError {
    #[error("request to supervisord failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("supervisord answered with HTTP {0}")]
    Status(StatusCode),

    #[error("invalid response from supervisord: {0}")]
    Protocol(#[from] XmlRpcError),

    #[error("supervisord did not answer within {0:?}")]
    Timeout(Duration),
}

/// 进程信息来源
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// 返回上游已知的全部进程记录，顺序无意义
    async fn fetch(&self) -> Result<Vec<ProcessRecord>, ConnectivityError>;

    /// 用于日志输出的上游地址
    fn endpoint(&self) -> &str;
}

/// supervisord XML-RPC 客户端，不做任何缓存
pub struct SupervisorClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl SupervisorClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ConnectivityError {
        if e.is_timeout() {
            ConnectivityError::Timeout(self.timeout)
        } else {
            ConnectivityError::Transport(e)
        }
    }
}

#[async_trait]
impl UpstreamClient for SupervisorClient {
    async fn fetch(&self) -> Result<Vec<ProcessRecord>, ConnectivityError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml")
            .body(xmlrpc::encode_call(GET_ALL_PROCESS_INFO))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectivityError::Status(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        let value = xmlrpc::decode_response(&body)?;
        records_from_value(value)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// 将 getAllProcessInfo 的返回值映射为记录列表
///
/// 缺少必需字段或类型错误的单条记录会被跳过并记录日志，不影响整次 scrape。
pub fn records_from_value(value: Value) -> Result<Vec<ProcessRecord>, ConnectivityError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(XmlRpcError::Malformed(format!(
                "{} returned {} instead of an array",
                GET_ALL_PROCESS_INFO,
                json_type(&other)
            ))
            .into())
        }
    };

    let total = items.len();
    let mut records = Vec::with_capacity(total);

    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<ProcessRecord>(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping malformed process record #{}: {}", index, e);
                METRICS.skipped_records_total.inc();
            }
        }
    }

    debug!("Decoded {} of {} process records", records.len(), total);
    Ok(records)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a struct",
    }
}
