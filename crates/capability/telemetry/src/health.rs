//! 就绪检查注册表。
//!
//! 各子系统在启动时注册探测项（名称 + 超时 + 探测实现），
//! `/readyz` 汇总执行：任一探测超时或失败即判定未就绪。

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// 探测失败信息。
#[derive(Debug)]
pub struct ProbeError {
    message: String,
}

impl ProbeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProbeError {}

/// 就绪探测接口。
///
/// 成功时返回的键值对作为不透明元数据附在检查结果上。
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn probe(&self) -> Result<HashMap<String, String>, ProbeError>;
}

struct ReadinessCheck {
    name: String,
    timeout: Duration,
    probe: Arc<dyn ReadinessProbe>,
}

/// 单项检查结果。
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub ready: bool,
    pub details: HashMap<String, String>,
    pub error: Option<String>,
}

/// 汇总结果。
#[derive(Debug, Clone)]
pub struct ReadinessReport {
    pub ready: bool,
    pub checks: Vec<CheckResult>,
}

/// 就绪检查注册表。
pub struct ReadinessRegistry {
    checks: RwLock<Vec<ReadinessCheck>>,
}

impl ReadinessRegistry {
    pub fn new() -> Self {
        Self {
            checks: RwLock::new(Vec::new()),
        }
    }

    /// 注册一项就绪检查。
    pub fn register(&self, name: impl Into<String>, timeout_ms: u64, probe: Arc<dyn ReadinessProbe>) {
        let check = ReadinessCheck {
            name: name.into(),
            timeout: Duration::from_millis(timeout_ms),
            probe,
        };
        if let Ok(mut checks) = self.checks.write() {
            checks.push(check);
        }
    }

    /// 执行所有已注册检查，每项受各自超时约束。
    pub async fn run(&self) -> ReadinessReport {
        // 先把探测句柄拷出来，避免跨 await 持锁
        let pending: Vec<(String, Duration, Arc<dyn ReadinessProbe>)> = self
            .checks
            .read()
            .map(|checks| {
                checks
                    .iter()
                    .map(|check| (check.name.clone(), check.timeout, check.probe.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut results = Vec::with_capacity(pending.len());
        let mut ready = true;
        for (name, timeout, probe) in pending {
            let result = match tokio::time::timeout(timeout, probe.probe()).await {
                Ok(Ok(details)) => CheckResult {
                    name,
                    ready: true,
                    details,
                    error: None,
                },
                Ok(Err(err)) => CheckResult {
                    name,
                    ready: false,
                    details: HashMap::new(),
                    error: Some(err.to_string()),
                },
                Err(_) => CheckResult {
                    name,
                    ready: false,
                    details: HashMap::new(),
                    error: Some("timeout".to_string()),
                },
            };
            ready &= result.ready;
            results.push(result);
        }
        ReadinessReport {
            ready,
            checks: results,
        }
    }
}

impl Default for ReadinessRegistry {
    fn default() -> Self {
        Self::new()
    }
}
