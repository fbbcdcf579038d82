//! 设备连接解析器
//!
//! 实现注册表的五个公开操作：
//! - set/get 最近网关（最后写入者胜出，无版本跟踪）
//! - set 命令处理适配器实例（无条件写入）
//! - remove 命令处理适配器实例（值与版本都匹配才删除，乐观并发）
//! - get 命令处理适配器实例（按网关数选择查询策略）
//!
//! 解析优先级：设备自身的登记永远压过任何网关登记；
//! 多个网关命中时用最近网关消歧，消歧不成立则全部返回。

use crate::error::ConnectionError;
use crate::keys::{
    KEY_SEPARATOR, adapter_instance_key, adapter_instance_keys,
    device_id_from_adapter_instance_key, gateway_key,
};
use crate::results::{AdapterInstances, LastKnownGateway};
use dcr_cache::{CacheError, RemoteCache};
use domain::{SpanContext, TenantContext};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 查询策略切换阈值的默认值。
///
/// 网关数不超过该值时，一次批量查询覆盖设备与全部网关；
/// 超过该值时先查最近网关，省掉对大网关集的整批读取。
pub const DEFAULT_GATEWAY_QUERY_THRESHOLD: usize = 3;

/// 设备连接解析器
///
/// 持有远程缓存句柄（缓存由宿主进程共享，生命周期长于解析器），
/// 自身无可变状态，可被任意多的调用方并发使用。
pub struct DeviceConnectionInfo {
    cache: Arc<dyn RemoteCache>,
    gateway_query_threshold: usize,
}

impl DeviceConnectionInfo {
    pub fn new(cache: Arc<dyn RemoteCache>) -> Self {
        Self {
            cache,
            gateway_query_threshold: DEFAULT_GATEWAY_QUERY_THRESHOLD,
        }
    }

    /// 覆盖查询策略切换阈值（默认 3，部署方可按负载调整）。
    pub fn with_gateway_query_threshold(mut self, threshold: usize) -> Self {
        self.gateway_query_threshold = threshold;
        self
    }

    /// 记录设备的最近网关（设备直连时网关即设备自身）。
    pub async fn set_last_known_gateway(
        &self,
        ctx: &TenantContext,
        device_id: &str,
        gateway_id: &str,
        span: &SpanContext,
    ) -> Result<(), ConnectionError> {
        ensure_tenant(ctx)?;
        ensure_id(device_id, "device_id")?;
        ensure_id(gateway_id, "gateway_id")?;

        match self
            .cache
            .put(&gateway_key(&ctx.tenant_id, device_id), gateway_id)
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    tenant = %ctx.tenant_id,
                    device_id = %device_id,
                    gateway = %gateway_id,
                    trace_id = %span.trace_id,
                    "set last known gateway"
                );
                Ok(())
            }
            Err(err) => {
                tracing::debug!(
                    tenant = %ctx.tenant_id,
                    device_id = %device_id,
                    gateway = %gateway_id,
                    trace_id = %span.trace_id,
                    error = %err,
                    "failed to set last known gateway"
                );
                Err(ConnectionError::Internal(err))
            }
        }
    }

    /// 查询设备的最近网关。
    pub async fn get_last_known_gateway(
        &self,
        ctx: &TenantContext,
        device_id: &str,
        span: &SpanContext,
    ) -> Result<LastKnownGateway, ConnectionError> {
        ensure_tenant(ctx)?;
        ensure_id(device_id, "device_id")?;

        let gateway_id = self
            .cache
            .get(&gateway_key(&ctx.tenant_id, device_id))
            .await
            .map_err(|err| {
                tracing::debug!(
                    tenant = %ctx.tenant_id,
                    device_id = %device_id,
                    trace_id = %span.trace_id,
                    error = %err,
                    "failed to find last known gateway for device"
                );
                ConnectionError::Internal(err)
            })?;
        match gateway_id {
            None => {
                tracing::debug!(
                    tenant = %ctx.tenant_id,
                    device_id = %device_id,
                    trace_id = %span.trace_id,
                    "could not find last known gateway for device"
                );
                Err(ConnectionError::NotFound)
            }
            Some(gateway_id) => {
                tracing::debug!(
                    tenant = %ctx.tenant_id,
                    device_id = %device_id,
                    gateway = %gateway_id,
                    trace_id = %span.trace_id,
                    "found last known gateway for device"
                );
                Ok(LastKnownGateway { gateway_id })
            }
        }
    }

    /// 登记设备的命令处理适配器实例（无条件覆盖）。
    pub async fn set_command_handling_adapter_instance(
        &self,
        ctx: &TenantContext,
        device_id: &str,
        adapter_instance_id: &str,
        span: &SpanContext,
    ) -> Result<(), ConnectionError> {
        ensure_tenant(ctx)?;
        ensure_id(device_id, "device_id")?;
        ensure_id(adapter_instance_id, "adapter_instance_id")?;

        match self
            .cache
            .put(
                &adapter_instance_key(&ctx.tenant_id, device_id),
                adapter_instance_id,
            )
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    tenant = %ctx.tenant_id,
                    device_id = %device_id,
                    adapter_instance = %adapter_instance_id,
                    trace_id = %span.trace_id,
                    "set command handling adapter instance"
                );
                Ok(())
            }
            Err(err) => {
                tracing::debug!(
                    tenant = %ctx.tenant_id,
                    device_id = %device_id,
                    adapter_instance = %adapter_instance_id,
                    trace_id = %span.trace_id,
                    error = %err,
                    "failed to set command handling adapter instance"
                );
                Err(ConnectionError::Internal(err))
            }
        }
    }

    /// 注销设备的命令处理适配器实例。
    ///
    /// 仅当存储值等于调用方声称的实例、且读取时观察到的版本
    /// 在删除时仍未变化才执行删除；并发接管不会被悄悄抹掉。
    pub async fn remove_command_handling_adapter_instance(
        &self,
        ctx: &TenantContext,
        device_id: &str,
        adapter_instance_id: &str,
        span: &SpanContext,
    ) -> Result<(), ConnectionError> {
        ensure_tenant(ctx)?;
        ensure_id(device_id, "device_id")?;
        ensure_id(adapter_instance_id, "adapter_instance_id")?;

        let key = adapter_instance_key(&ctx.tenant_id, device_id);
        let versioned = self.cache.get_with_version(&key).await.map_err(|err| {
            tracing::debug!(
                tenant = %ctx.tenant_id,
                device_id = %device_id,
                adapter_instance = %adapter_instance_id,
                trace_id = %span.trace_id,
                error = %err,
                "failed to get cache entry when trying to remove command handling adapter instance"
            );
            ConnectionError::Internal(err)
        })?;
        let Some(versioned) = versioned else {
            tracing::debug!(
                tenant = %ctx.tenant_id,
                device_id = %device_id,
                adapter_instance = %adapter_instance_id,
                trace_id = %span.trace_id,
                "command handling adapter instance was not removed, entry not found"
            );
            return Err(ConnectionError::NotFound);
        };
        if versioned.value != adapter_instance_id {
            tracing::debug!(
                tenant = %ctx.tenant_id,
                device_id = %device_id,
                adapter_instance = %adapter_instance_id,
                stored = %versioned.value,
                trace_id = %span.trace_id,
                "command handling adapter instance was not removed, value didn't match"
            );
            return Err(ConnectionError::PreconditionFailed);
        }
        let removed = self
            .cache
            .remove_with_version(&key, &versioned.version)
            .await
            .map_err(|err| {
                tracing::debug!(
                    tenant = %ctx.tenant_id,
                    device_id = %device_id,
                    adapter_instance = %adapter_instance_id,
                    trace_id = %span.trace_id,
                    error = %err,
                    "failed to remove command handling adapter instance"
                );
                ConnectionError::Internal(err)
            })?;
        if removed {
            tracing::debug!(
                tenant = %ctx.tenant_id,
                device_id = %device_id,
                adapter_instance = %adapter_instance_id,
                trace_id = %span.trace_id,
                "removed command handling adapter instance"
            );
            Ok(())
        } else {
            tracing::debug!(
                tenant = %ctx.tenant_id,
                device_id = %device_id,
                adapter_instance = %adapter_instance_id,
                trace_id = %span.trace_id,
                "command handling adapter instance was not removed, has been updated in the meantime"
            );
            Err(ConnectionError::PreconditionFailed)
        }
    }

    /// 解析可处理设备命令的适配器实例。
    ///
    /// `via_gateways` 为声明可代该设备行事的网关集合。按集合大小分三路：
    /// 空集只查设备自身；小集合一次批量查询后按优先级挑选；
    /// 大集合先查最近网关，省去对整个集合的批量读取。
    pub async fn get_command_handling_adapter_instances(
        &self,
        ctx: &TenantContext,
        device_id: &str,
        via_gateways: &HashSet<String>,
        span: &SpanContext,
    ) -> Result<AdapterInstances, ConnectionError> {
        ensure_tenant(ctx)?;
        ensure_id(device_id, "device_id")?;
        for gateway_id in via_gateways {
            ensure_id(gateway_id, "via_gateways")?;
        }

        if via_gateways.is_empty() {
            // 无网关参与，只看设备自身的登记
            let instance = self
                .cache
                .get(&adapter_instance_key(&ctx.tenant_id, device_id))
                .await
                .map_err(|err| lookup_failure(ctx, device_id, span, err))?;
            match instance {
                None => {
                    tracing::debug!(
                        tenant = %ctx.tenant_id,
                        device_id = %device_id,
                        trace_id = %span.trace_id,
                        "no command handling adapter instances found"
                    );
                    Err(ConnectionError::NotFound)
                }
                Some(instance) => {
                    tracing::debug!(
                        tenant = %ctx.tenant_id,
                        device_id = %device_id,
                        adapter_instance = %instance,
                        trace_id = %span.trace_id,
                        "found command handling adapter instance"
                    );
                    Ok(AdapterInstances::single(device_id, instance))
                }
            }
        } else if via_gateways.len() <= self.gateway_query_threshold {
            self.instances_querying_all_gateways_first(ctx, device_id, via_gateways, span)
                .await
        } else {
            // 网关数超过阈值，先试最近网关以减少缓存访问
            self.instances_last_known_gateway_first(ctx, device_id, via_gateways, span)
                .await
        }
    }

    /// 小网关集策略：一次批量查询设备与全部网关，再按优先级挑选。
    async fn instances_querying_all_gateways_first(
        &self,
        ctx: &TenantContext,
        device_id: &str,
        via_gateways: &HashSet<String>,
        span: &SpanContext,
    ) -> Result<AdapterInstances, ConnectionError> {
        let keys = adapter_instance_keys(&ctx.tenant_id, device_id, via_gateways.iter());
        let found = self
            .cache
            .get_all(&keys)
            .await
            .map_err(|err| lookup_failure(ctx, device_id, span, err))?;
        let device_map = device_instance_map(found);

        if device_map.is_empty() {
            tracing::debug!(
                tenant = %ctx.tenant_id,
                device_id = %device_id,
                trace_id = %span.trace_id,
                "no command handling adapter instances found"
            );
            return Err(ConnectionError::NotFound);
        }
        if let Some(instance) = device_map.get(device_id).cloned() {
            // 设备自身有登记，压过所有网关条目
            return Ok(self.device_itself_result(ctx, device_id, instance, span));
        }
        if device_map.len() > 1 {
            // 多个网关命中，查最近网关消歧
            let last_known = self
                .cache
                .get(&gateway_key(&ctx.tenant_id, device_id))
                .await
                .map_err(|err| lookup_failure(ctx, device_id, span, err))?;
            return match last_known {
                None => {
                    tracing::debug!(
                        tenant = %ctx.tenant_id,
                        device_id = %device_id,
                        count = device_map.len(),
                        trace_id = %span.trace_id,
                        "returning adapter instances for device gateways (no last known gateway found)"
                    );
                    Ok(AdapterInstances::from_map(device_map))
                }
                Some(last_known) if !via_gateways.contains(&last_known) => {
                    tracing::debug!(
                        tenant = %ctx.tenant_id,
                        device_id = %device_id,
                        gateway = %last_known,
                        count = device_map.len(),
                        trace_id = %span.trace_id,
                        "returning adapter instances for device gateways (last known gateway not valid anymore)"
                    );
                    Ok(AdapterInstances::from_map(device_map))
                }
                Some(last_known) => {
                    if let Some(instance) = device_map.get(&last_known).cloned() {
                        tracing::debug!(
                            tenant = %ctx.tenant_id,
                            device_id = %device_id,
                            gateway = %last_known,
                            adapter_instance = %instance,
                            trace_id = %span.trace_id,
                            "returning command handling adapter instance for last known gateway"
                        );
                        Ok(AdapterInstances::single(last_known, instance))
                    } else {
                        tracing::debug!(
                            tenant = %ctx.tenant_id,
                            device_id = %device_id,
                            gateway = %last_known,
                            count = device_map.len(),
                            trace_id = %span.trace_id,
                            "returning adapter instances for device gateways (last known gateway has no entry)"
                        );
                        Ok(AdapterInstances::from_map(device_map))
                    }
                }
            };
        }
        // 恰好一个网关条目
        if let Some((gateway_id, instance)) = device_map.iter().next() {
            tracing::debug!(
                tenant = %ctx.tenant_id,
                device_id = %device_id,
                gateway = %gateway_id,
                adapter_instance = %instance,
                trace_id = %span.trace_id,
                "returning command handling adapter instance associated with gateway"
            );
        }
        Ok(AdapterInstances::from_map(device_map))
    }

    /// 大网关集策略：先查最近网关，可用则只批量读设备与该网关两个键。
    async fn instances_last_known_gateway_first(
        &self,
        ctx: &TenantContext,
        device_id: &str,
        via_gateways: &HashSet<String>,
        span: &SpanContext,
    ) -> Result<AdapterInstances, ConnectionError> {
        let last_known = self
            .cache
            .get(&gateway_key(&ctx.tenant_id, device_id))
            .await
            .map_err(|err| lookup_failure(ctx, device_id, span, err))?;

        match last_known {
            Some(last_known) if via_gateways.contains(&last_known) => {
                let keys =
                    adapter_instance_keys(&ctx.tenant_id, device_id, std::iter::once(&last_known));
                let found = self
                    .cache
                    .get_all(&keys)
                    .await
                    .map_err(|err| lookup_failure(ctx, device_id, span, err))?;
                let device_map = device_instance_map(found);
                if device_map.is_empty() {
                    // 最近网关与设备都没有在管实例，回退检查全部网关
                    self.instances_without_last_known_check(ctx, device_id, via_gateways, span)
                        .await
                } else if let Some(instance) = device_map.get(device_id).cloned() {
                    Ok(self.device_itself_result(ctx, device_id, instance, span))
                } else {
                    tracing::debug!(
                        tenant = %ctx.tenant_id,
                        device_id = %device_id,
                        gateway = %last_known,
                        trace_id = %span.trace_id,
                        "returning command handling adapter instance for last known gateway"
                    );
                    Ok(AdapterInstances::from_map(device_map))
                }
            }
            other => {
                match &other {
                    None => tracing::trace!(
                        tenant = %ctx.tenant_id,
                        device_id = %device_id,
                        "no last known gateway found"
                    ),
                    Some(gateway) => tracing::trace!(
                        tenant = %ctx.tenant_id,
                        device_id = %device_id,
                        gateway = %gateway,
                        "found gateway is not valid for the device anymore"
                    ),
                }
                self.instances_without_last_known_check(ctx, device_id, via_gateways, span)
                    .await
            }
        }
    }

    /// 批量查询设备与全部网关，不再复核最近网关（已知其不可用）。
    async fn instances_without_last_known_check(
        &self,
        ctx: &TenantContext,
        device_id: &str,
        via_gateways: &HashSet<String>,
        span: &SpanContext,
    ) -> Result<AdapterInstances, ConnectionError> {
        let keys = adapter_instance_keys(&ctx.tenant_id, device_id, via_gateways.iter());
        let found = self
            .cache
            .get_all(&keys)
            .await
            .map_err(|err| lookup_failure(ctx, device_id, span, err))?;
        let device_map = device_instance_map(found);

        if device_map.is_empty() {
            tracing::debug!(
                tenant = %ctx.tenant_id,
                device_id = %device_id,
                trace_id = %span.trace_id,
                "no command handling adapter instances found"
            );
            return Err(ConnectionError::NotFound);
        }
        if let Some(instance) = device_map.get(device_id).cloned() {
            return Ok(self.device_itself_result(ctx, device_id, instance, span));
        }
        tracing::debug!(
            tenant = %ctx.tenant_id,
            device_id = %device_id,
            count = device_map.len(),
            trace_id = %span.trace_id,
            "returning adapter instances for device gateways (no usable last known gateway)"
        );
        Ok(AdapterInstances::from_map(device_map))
    }

    fn device_itself_result(
        &self,
        ctx: &TenantContext,
        device_id: &str,
        adapter_instance_id: String,
        span: &SpanContext,
    ) -> AdapterInstances {
        tracing::debug!(
            tenant = %ctx.tenant_id,
            device_id = %device_id,
            adapter_instance = %adapter_instance_id,
            trace_id = %span.trace_id,
            "returning command handling adapter instance for device itself"
        );
        AdapterInstances::single(device_id, adapter_instance_id)
    }
}

/// 将批量查询结果的完整键还原为设备标识键。
fn device_instance_map(found: HashMap<String, String>) -> HashMap<String, String> {
    found
        .into_iter()
        .map(|(key, value)| {
            (
                device_id_from_adapter_instance_key(&key).to_string(),
                value,
            )
        })
        .collect()
}

fn ensure_tenant(ctx: &TenantContext) -> Result<(), ConnectionError> {
    ensure_id(&ctx.tenant_id, "tenant_id")
}

fn ensure_id(value: &str, field: &str) -> Result<(), ConnectionError> {
    if value.is_empty() {
        return Err(ConnectionError::InvalidArgument(format!("{field} required")));
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(ConnectionError::InvalidArgument(format!(
            "{field} must not contain '{KEY_SEPARATOR}'"
        )));
    }
    Ok(())
}

fn lookup_failure(
    ctx: &TenantContext,
    device_id: &str,
    span: &SpanContext,
    err: CacheError,
) -> ConnectionError {
    tracing::debug!(
        tenant = %ctx.tenant_id,
        device_id = %device_id,
        trace_id = %span.trace_id,
        error = %err,
        "failed to get cache entries when trying to get command handling adapter instances"
    );
    ConnectionError::Internal(err)
}
