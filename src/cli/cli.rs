use clap::Parser;

/// Supervisord Exporter - 将 supervisord 进程状态导出为 Prometheus 指标
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// supervisord XML-RPC 地址
    #[arg(long, env = "SUPERVISORD_URL", default_value = "http://localhost:9001/RPC2")]
    pub supervisord_url: String,

    /// 监听地址，":9101" 表示监听所有网卡
    #[arg(short = 'a', long, env = "LISTEN_ADDRESS", default_value = ":9101")]
    pub listen_address: String,

    /// 指标路径
    #[arg(long, env = "METRICS_PATH", default_value = "/metrics", value_parser = parse_metrics_path)]
    pub metrics_path: String,

    /// 轮询 supervisord 的超时时间（秒）
    #[arg(short, long, env = "SUPERVISORD_TIMEOUT", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,
}

impl CommandArgs {
    /// 实际绑定的地址，省略主机部分时补全为 0.0.0.0
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }
}

fn parse_metrics_path(path: &str) -> Result<String, String> {
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Err(format!("metrics path must start with '/', got {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CommandArgs::try_parse_from(["supervisord-exporter"]).unwrap();
        assert_eq!(args.supervisord_url, "http://localhost:9001/RPC2");
        assert_eq!(args.listen_address, ":9101");
        assert_eq!(args.metrics_path, "/metrics");
        assert_eq!(args.timeout, 5);
        assert_eq!(args.bind_address(), "0.0.0.0:9101");
    }

    #[test]
    fn test_explicit_host_is_kept() {
        let args = CommandArgs::try_parse_from([
            "supervisord-exporter",
            "--listen-address",
            "127.0.0.1:9200",
            "--supervisord-url",
            "http://10.0.0.5:9001/RPC2",
            "--metrics-path",
            "/supervisor/metrics",
        ])
        .unwrap();

        assert_eq!(args.bind_address(), "127.0.0.1:9200");
        assert_eq!(args.supervisord_url, "http://10.0.0.5:9001/RPC2");
        assert_eq!(args.metrics_path, "/supervisor/metrics");
    }

    #[test]
    fn test_rejects_relative_metrics_path() {
        let result = CommandArgs::try_parse_from(["supervisord-exporter", "--metrics-path", "metrics"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = CommandArgs::try_parse_from(["supervisord-exporter", "--timeout", "0"]);
        assert!(result.is_err());
    }
}
