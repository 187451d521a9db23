//! 存储连通性探测模块
//!
//! 启动时对 Wasabi 发起一次 `ListBuckets` 调用，用于检查端点可达性和密钥是否有效。
//! 探测结果只用于诊断，是否影响启动由 [`ProbePolicy`] 决定。

use crate::config::WasabiSettings;
use crate::s3::client::build_client;
use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::list_buckets::ListBucketsError;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// 探测失败的原因。
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0} is not set")]
    MissingSetting(&'static str),

    #[error("storage service rejected the request ({code}): {message}")]
    Service { code: String, message: String },

    #[error("storage endpoint unreachable: {0}")]
    Transport(String),

    #[error("no response from storage endpoint within {0:?}")]
    Timeout(Duration),
}

impl ProbeError {
    fn from_sdk(err: SdkError<ListBucketsError>) -> Self {
        match err.as_service_error() {
            Some(service) => Self::Service {
                code: service.code().unwrap_or("Unknown").to_string(),
                message: service.message().unwrap_or_default().to_string(),
            },
            None => Self::Transport(DisplayErrorContext(&err).to_string()),
        }
    }
}

/// 探测失败时的处理策略。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ProbePolicy {
    /// 只记录日志，不影响启动
    #[default]
    Advisory,
    /// 探测失败时终止启动
    Required,
}

/// 配置的存储桶是否出现在列表中。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetBucket {
    pub name: String,
    pub listed: bool,
}

/// 一次探测的结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Reachable {
        bucket_count: usize,
        target_bucket: Option<TargetBucket>,
    },
    Failed {
        detail: String,
    },
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable { .. })
    }
}

/// 存储后端的探测接口。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageProbe: Send + Sync {
    /// 列出凭据可见的存储桶名称。
    async fn list_buckets(&self) -> Result<Vec<String>, ProbeError>;
}

/// 基于 `aws-sdk-s3` 的探测实现。
///
/// 客户端在每次探测时创建，用完即丢弃，不与机器人进程共享。
#[derive(Debug, Clone)]
pub struct S3Probe {
    settings: WasabiSettings,
}

impl S3Probe {
    pub fn new(settings: WasabiSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl StorageProbe for S3Probe {
    async fn list_buckets(&self) -> Result<Vec<String>, ProbeError> {
        let client = build_client(&self.settings).await?;

        let output = client
            .list_buckets()
            .send()
            .await
            .map_err(ProbeError::from_sdk)?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_string))
            .collect())
    }
}

/// 执行一次连通性探测。
///
/// 任何错误都会被捕获并转换为 [`ProbeOutcome::Failed`]，此函数本身不会失败。
///
/// # 参数
///
/// * `probe` - 探测实现。
/// * `bucket` - 需要确认是否可见的存储桶，可选。
/// * `timeout` - 探测超时，`None` 表示不限时。
pub async fn run_probe<P>(probe: &P, bucket: Option<&str>, timeout: Option<Duration>) -> ProbeOutcome
where
    P: StorageProbe + ?Sized,
{
    info!("☁️ Testing Wasabi connection...");

    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, probe.list_buckets())
            .await
            .unwrap_or(Err(ProbeError::Timeout(limit))),
        None => probe.list_buckets().await,
    };

    match result {
        Ok(buckets) => {
            info!(buckets = buckets.len(), "✅ Wasabi connection successful!");

            let target_bucket = bucket.map(|name| TargetBucket {
                name: name.to_string(),
                listed: buckets.iter().any(|b| b == name),
            });
            if let Some(target) = &target_bucket {
                if target.listed {
                    info!(bucket = %target.name, "✅ Bucket is visible");
                } else {
                    warn!(bucket = %target.name, "⚠️ Bucket not found in the bucket listing");
                }
            }

            ProbeOutcome::Reachable {
                bucket_count: buckets.len(),
                target_bucket,
            }
        }
        Err(e) => {
            warn!("❌ Wasabi connection failed: {}", e);
            ProbeOutcome::Failed {
                detail: e.to_string(),
            }
        }
    }
}
