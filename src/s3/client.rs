//! S3客户端配置模块
//!
//! 根据 Wasabi 配置创建一次性使用的 S3 客户端。

use crate::config::{WASABI_ACCESS_KEY, WASABI_REGION, WASABI_SECRET_KEY, WasabiSettings};
use crate::s3::probe::ProbeError;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use tracing::debug;

/// 使用 Wasabi 配置创建 S3 客户端。
///
/// 客户端不做全局缓存，每次调用都会重新构建。
///
/// # 参数
///
/// * `settings` - Wasabi 区域、密钥和可选端点。
///
/// # 返回值
///
/// 配置好的 `aws_sdk_s3::Client`。
///
/// # Errors
///
/// 缺少区域或密钥时返回 [`ProbeError::MissingSetting`]。
pub async fn build_client(settings: &WasabiSettings) -> Result<Client, ProbeError> {
    let region = settings
        .region
        .clone()
        .ok_or(ProbeError::MissingSetting(WASABI_REGION))?;
    let access_key = settings
        .access_key
        .clone()
        .ok_or(ProbeError::MissingSetting(WASABI_ACCESS_KEY))?;
    let secret_key = settings
        .secret_key
        .clone()
        .ok_or(ProbeError::MissingSetting(WASABI_SECRET_KEY))?;
    let endpoint = settings
        .endpoint_url()
        .ok_or(ProbeError::MissingSetting(WASABI_REGION))?;

    debug!(%region, %endpoint, "building storage client");

    let credentials = Credentials::new(access_key, secret_key, None, None, "wasabi-config");

    let region_provider = RegionProviderChain::first_try(Some(Region::new(region)));

    let config_builder = aws_config::defaults(BehaviorVersion::latest())
        .credentials_provider(credentials)
        .region(region_provider)
        .endpoint_url(endpoint);

    let aws_config = config_builder.load().await;
    Ok(Client::new(&aws_config))
}
