use async_trait::async_trait;
use dcr_cache::{CacheError, CacheStats, CacheVersion, InMemoryRemoteCache, RemoteCache, VersionedValue};
use dcr_connection::{AdapterInstances, ConnectionError, DeviceConnectionInfo};
use domain::{SpanContext, TenantContext};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn setup() -> (Arc<InMemoryRemoteCache>, DeviceConnectionInfo) {
    let cache = Arc::new(InMemoryRemoteCache::new());
    let info = DeviceConnectionInfo::new(cache.clone());
    (cache, info)
}

fn ctx() -> TenantContext {
    TenantContext::new("tenant-1")
}

fn span() -> SpanContext {
    SpanContext::new("trace-1", None)
}

fn gateways(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn entries(result: &AdapterInstances) -> HashMap<String, String> {
    result
        .adapter_instances
        .iter()
        .map(|entry| (entry.device_id.clone(), entry.adapter_instance_id.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// 最近网关操作
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_then_get_last_known_gateway() {
    let (_cache, info) = setup();
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-1", &span())
        .await
        .expect("set gateway");

    let result = info
        .get_last_known_gateway(&ctx(), "dev-1", &span())
        .await
        .expect("get gateway");
    assert_eq!(result.gateway_id, "gw-1");

    let json = serde_json::to_value(&result).expect("serialize");
    assert_eq!(json, serde_json::json!({ "gateway-id": "gw-1" }));
}

#[tokio::test]
async fn get_last_known_gateway_absent_is_not_found() {
    let (_cache, info) = setup();
    let err = info
        .get_last_known_gateway(&ctx(), "absent", &span())
        .await
        .expect_err("should miss");
    assert!(matches!(err, ConnectionError::NotFound));
}

#[tokio::test]
async fn last_known_gateway_is_last_writer_wins() {
    let (_cache, info) = setup();
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-1", &span())
        .await
        .expect("set gateway");
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-2", &span())
        .await
        .expect("overwrite gateway");

    let result = info
        .get_last_known_gateway(&ctx(), "dev-1", &span())
        .await
        .expect("get gateway");
    assert_eq!(result.gateway_id, "gw-2");
}

#[tokio::test]
async fn gateway_mappings_are_tenant_scoped() {
    let (_cache, info) = setup();
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-1", &span())
        .await
        .expect("set gateway");

    let other = TenantContext::new("tenant-2");
    let err = info
        .get_last_known_gateway(&other, "dev-1", &span())
        .await
        .expect_err("other tenant must not see mapping");
    assert!(matches!(err, ConnectionError::NotFound));
}

// ---------------------------------------------------------------------------
// 适配器实例登记与注销
// ---------------------------------------------------------------------------

#[tokio::test]
async fn instances_for_directly_connected_device() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "dev-1", "adapter-A", &span())
        .await
        .expect("set instance");

    let result = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &HashSet::new(), &span())
        .await
        .expect("get instances");
    assert_eq!(entries(&result), HashMap::from([("dev-1".to_string(), "adapter-A".to_string())]));

    let json = serde_json::to_value(&result).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "adapter-instances": [
                { "device-id": "dev-1", "adapter-instance-id": "adapter-A" }
            ]
        })
    );
}

#[tokio::test]
async fn instances_absent_without_gateways_is_not_found() {
    let (_cache, info) = setup();
    let err = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &HashSet::new(), &span())
        .await
        .expect_err("should miss");
    assert!(matches!(err, ConnectionError::NotFound));
}

#[tokio::test]
async fn set_instance_is_idempotent() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "dev-1", "adapter-A", &span())
        .await
        .expect("set instance");
    info.set_command_handling_adapter_instance(&ctx(), "dev-1", "adapter-A", &span())
        .await
        .expect("set instance again");

    let result = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &HashSet::new(), &span())
        .await
        .expect("get instances");
    assert_eq!(result.adapter_instances.len(), 1);
    assert_eq!(result.adapter_instances[0].adapter_instance_id, "adapter-A");
}

#[tokio::test]
async fn remove_instance_succeeds_for_matching_value() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "dev-1", "adapter-A", &span())
        .await
        .expect("set instance");

    info.remove_command_handling_adapter_instance(&ctx(), "dev-1", "adapter-A", &span())
        .await
        .expect("remove instance");

    let err = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &HashSet::new(), &span())
        .await
        .expect_err("entry gone");
    assert!(matches!(err, ConnectionError::NotFound));
}

#[tokio::test]
async fn remove_instance_with_wrong_value_fails_and_preserves_entry() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "dev-1", "A", &span())
        .await
        .expect("set instance");

    let err = info
        .remove_command_handling_adapter_instance(&ctx(), "dev-1", "B", &span())
        .await
        .expect_err("value mismatch");
    assert!(matches!(err, ConnectionError::PreconditionFailed));

    let result = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &HashSet::new(), &span())
        .await
        .expect("entry still present");
    assert_eq!(result.adapter_instances[0].adapter_instance_id, "A");
}

#[tokio::test]
async fn remove_instance_of_absent_entry_is_not_found() {
    let (_cache, info) = setup();
    let err = info
        .remove_command_handling_adapter_instance(&ctx(), "dev-1", "adapter-A", &span())
        .await
        .expect_err("nothing to remove");
    assert!(matches!(err, ConnectionError::NotFound));
}

#[tokio::test]
async fn remove_instance_lost_race_is_precondition_failed() {
    let (cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "dev-1", "adapter-A", &span())
        .await
        .expect("set instance");

    // 并发接管：另一实例在同一键上覆盖了相同的值（版本随之变化）。
    // 直接向缓存写入以模拟注销流程读取版本之后发生的更新。
    let versioned = cache
        .get_with_version("ai@@tenant-1@@dev-1")
        .await
        .expect("get versioned")
        .expect("present");
    cache
        .put("ai@@tenant-1@@dev-1", "adapter-A")
        .await
        .expect("concurrent overwrite");
    let removed = cache
        .remove_with_version("ai@@tenant-1@@dev-1", &versioned.version)
        .await
        .expect("remove attempt");
    assert!(!removed);

    // 注册表层面的注销依然可用（值仍匹配，拿的是新版本）
    info.remove_command_handling_adapter_instance(&ctx(), "dev-1", "adapter-A", &span())
        .await
        .expect("remove with fresh version");
}

// ---------------------------------------------------------------------------
// 小网关集策略（批量查询优先）
// ---------------------------------------------------------------------------

#[tokio::test]
async fn device_itself_takes_precedence_over_gateways() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "dev-1", "adapter-D", &span())
        .await
        .expect("set device instance");
    info.set_command_handling_adapter_instance(&ctx(), "gw-1", "adapter-A", &span())
        .await
        .expect("set gateway instance");

    let result = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &gateways(&["gw-1"]), &span())
        .await
        .expect("get instances");
    assert_eq!(
        entries(&result),
        HashMap::from([("dev-1".to_string(), "adapter-D".to_string())])
    );
}

#[tokio::test]
async fn single_gateway_entry_is_returned() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "gw-1", "adapter-A", &span())
        .await
        .expect("set gateway instance");

    let result = info
        .get_command_handling_adapter_instances(
            &ctx(),
            "dev-1",
            &gateways(&["gw-1", "gw-2"]),
            &span(),
        )
        .await
        .expect("get instances");
    assert_eq!(
        entries(&result),
        HashMap::from([("gw-1".to_string(), "adapter-A".to_string())])
    );
}

#[tokio::test]
async fn last_known_gateway_selects_single_mapping() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "gw-1", "adapter-A", &span())
        .await
        .expect("set instance");
    info.set_command_handling_adapter_instance(&ctx(), "gw-2", "adapter-B", &span())
        .await
        .expect("set instance");
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-2", &span())
        .await
        .expect("set gateway");

    let result = info
        .get_command_handling_adapter_instances(
            &ctx(),
            "dev-1",
            &gateways(&["gw-1", "gw-2"]),
            &span(),
        )
        .await
        .expect("get instances");
    assert_eq!(
        entries(&result),
        HashMap::from([("gw-2".to_string(), "adapter-B".to_string())])
    );
}

#[tokio::test]
async fn multiple_entries_without_last_known_gateway_returns_all() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "gw-1", "adapter-A", &span())
        .await
        .expect("set instance");
    info.set_command_handling_adapter_instance(&ctx(), "gw-2", "adapter-B", &span())
        .await
        .expect("set instance");

    let result = info
        .get_command_handling_adapter_instances(
            &ctx(),
            "dev-1",
            &gateways(&["gw-1", "gw-2"]),
            &span(),
        )
        .await
        .expect("get instances");
    assert_eq!(
        entries(&result),
        HashMap::from([
            ("gw-1".to_string(), "adapter-A".to_string()),
            ("gw-2".to_string(), "adapter-B".to_string()),
        ])
    );
}

#[tokio::test]
async fn stale_last_known_gateway_outside_via_set_returns_all() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "gw-1", "adapter-A", &span())
        .await
        .expect("set instance");
    info.set_command_handling_adapter_instance(&ctx(), "gw-2", "adapter-B", &span())
        .await
        .expect("set instance");
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-other", &span())
        .await
        .expect("set gateway");

    let result = info
        .get_command_handling_adapter_instances(
            &ctx(),
            "dev-1",
            &gateways(&["gw-1", "gw-2"]),
            &span(),
        )
        .await
        .expect("get instances");
    assert_eq!(result.adapter_instances.len(), 2);
}

#[tokio::test]
async fn last_known_gateway_without_entry_returns_all() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "gw-1", "adapter-A", &span())
        .await
        .expect("set instance");
    info.set_command_handling_adapter_instance(&ctx(), "gw-2", "adapter-B", &span())
        .await
        .expect("set instance");
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-3", &span())
        .await
        .expect("set gateway");

    let result = info
        .get_command_handling_adapter_instances(
            &ctx(),
            "dev-1",
            &gateways(&["gw-1", "gw-2", "gw-3"]),
            &span(),
        )
        .await
        .expect("get instances");
    assert_eq!(result.adapter_instances.len(), 2);
}

#[tokio::test]
async fn no_entries_at_all_is_not_found() {
    let (_cache, info) = setup();
    let err = info
        .get_command_handling_adapter_instances(
            &ctx(),
            "dev-1",
            &gateways(&["gw-1", "gw-2"]),
            &span(),
        )
        .await
        .expect_err("nothing registered");
    assert!(matches!(err, ConnectionError::NotFound));
}

// ---------------------------------------------------------------------------
// 大网关集策略（最近网关优先）
// ---------------------------------------------------------------------------

fn five_gateways() -> HashSet<String> {
    gateways(&["gw-1", "gw-2", "gw-3", "gw-4", "gw-5"])
}

#[tokio::test]
async fn large_set_with_usable_last_known_gateway_needs_two_cache_calls() {
    let (cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "gw-2", "adapter-B", &span())
        .await
        .expect("set instance");
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-2", &span())
        .await
        .expect("set gateway");

    cache.reset_ops();
    let result = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &five_gateways(), &span())
        .await
        .expect("get instances");
    assert_eq!(
        entries(&result),
        HashMap::from([("gw-2".to_string(), "adapter-B".to_string())])
    );
    // 一次最近网关读取 + 一次两键批量读取
    assert_eq!(cache.read_ops(), 2);
}

#[tokio::test]
async fn large_set_device_itself_still_wins() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "dev-1", "adapter-D", &span())
        .await
        .expect("set device instance");
    info.set_command_handling_adapter_instance(&ctx(), "gw-2", "adapter-B", &span())
        .await
        .expect("set gateway instance");
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-2", &span())
        .await
        .expect("set gateway");

    let result = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &five_gateways(), &span())
        .await
        .expect("get instances");
    assert_eq!(
        entries(&result),
        HashMap::from([("dev-1".to_string(), "adapter-D".to_string())])
    );
}

#[tokio::test]
async fn large_set_falls_back_when_last_known_gateway_has_no_entry() {
    let (cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "gw-4", "adapter-C", &span())
        .await
        .expect("set instance");
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-2", &span())
        .await
        .expect("set gateway");

    cache.reset_ops();
    let result = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &five_gateways(), &span())
        .await
        .expect("get instances");
    assert_eq!(
        entries(&result),
        HashMap::from([("gw-4".to_string(), "adapter-C".to_string())])
    );
    // 最近网关读取 + 两键批量读取落空 + 全量批量读取
    assert_eq!(cache.read_ops(), 3);
}

#[tokio::test]
async fn large_set_without_last_known_gateway_queries_all() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "gw-1", "adapter-A", &span())
        .await
        .expect("set instance");
    info.set_command_handling_adapter_instance(&ctx(), "gw-5", "adapter-E", &span())
        .await
        .expect("set instance");

    let result = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &five_gateways(), &span())
        .await
        .expect("get instances");
    assert_eq!(result.adapter_instances.len(), 2);
}

#[tokio::test]
async fn large_set_with_stale_last_known_gateway_queries_all() {
    let (_cache, info) = setup();
    info.set_command_handling_adapter_instance(&ctx(), "gw-3", "adapter-C", &span())
        .await
        .expect("set instance");
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-other", &span())
        .await
        .expect("set gateway");

    let result = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &five_gateways(), &span())
        .await
        .expect("get instances");
    assert_eq!(
        entries(&result),
        HashMap::from([("gw-3".to_string(), "adapter-C".to_string())])
    );
}

#[tokio::test]
async fn threshold_override_changes_strategy_switch() {
    let cache = Arc::new(InMemoryRemoteCache::new());
    let info = DeviceConnectionInfo::new(cache.clone()).with_gateway_query_threshold(1);
    info.set_command_handling_adapter_instance(&ctx(), "gw-2", "adapter-B", &span())
        .await
        .expect("set instance");
    info.set_last_known_gateway(&ctx(), "dev-1", "gw-2", &span())
        .await
        .expect("set gateway");

    cache.reset_ops();
    let result = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &gateways(&["gw-1", "gw-2"]), &span())
        .await
        .expect("get instances");
    assert_eq!(
        entries(&result),
        HashMap::from([("gw-2".to_string(), "adapter-B".to_string())])
    );
    // 两个网关已超过阈值 1，走最近网关优先路径
    assert_eq!(cache.read_ops(), 2);
}

// ---------------------------------------------------------------------------
// 参数校验
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_identifiers_are_rejected_before_any_cache_call() {
    let (cache, info) = setup();

    let err = info
        .set_last_known_gateway(&TenantContext::default(), "dev-1", "gw-1", &span())
        .await
        .expect_err("empty tenant");
    assert!(matches!(err, ConnectionError::InvalidArgument(_)));

    let err = info
        .set_last_known_gateway(&ctx(), "", "gw-1", &span())
        .await
        .expect_err("empty device");
    assert!(matches!(err, ConnectionError::InvalidArgument(_)));

    let err = info
        .set_command_handling_adapter_instance(&ctx(), "dev-1", "", &span())
        .await
        .expect_err("empty instance");
    assert!(matches!(err, ConnectionError::InvalidArgument(_)));

    assert_eq!(cache.read_ops(), 0);
    assert_eq!(cache.write_ops(), 0);
}

#[tokio::test]
async fn identifiers_containing_key_separator_are_rejected() {
    let (_cache, info) = setup();
    let err = info
        .set_last_known_gateway(&ctx(), "dev@@1", "gw-1", &span())
        .await
        .expect_err("separator in device id");
    assert!(matches!(err, ConnectionError::InvalidArgument(_)));

    let err = info
        .get_command_handling_adapter_instances(
            &ctx(),
            "dev-1",
            &gateways(&["gw@@1"]),
            &span(),
        )
        .await
        .expect_err("separator in gateway id");
    assert!(matches!(err, ConnectionError::InvalidArgument(_)));
}

// ---------------------------------------------------------------------------
// 缓存故障折叠为内部错误
// ---------------------------------------------------------------------------

struct FailingCache;

#[async_trait]
impl RemoteCache for FailingCache {
    async fn put(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
        Err(CacheError::new("connection refused"))
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::new("connection refused"))
    }

    async fn get_all(&self, _keys: &[String]) -> Result<HashMap<String, String>, CacheError> {
        Err(CacheError::new("connection refused"))
    }

    async fn get_with_version(&self, _key: &str) -> Result<Option<VersionedValue>, CacheError> {
        Err(CacheError::new("connection refused"))
    }

    async fn remove_with_version(
        &self,
        _key: &str,
        _version: &CacheVersion,
    ) -> Result<bool, CacheError> {
        Err(CacheError::new("connection refused"))
    }

    async fn check_availability(&self) -> Result<CacheStats, CacheError> {
        Err(CacheError::new("connection refused"))
    }
}

#[tokio::test]
async fn cache_failures_surface_as_internal_errors() {
    let info = DeviceConnectionInfo::new(Arc::new(FailingCache));

    let err = info
        .set_last_known_gateway(&ctx(), "dev-1", "gw-1", &span())
        .await
        .expect_err("put fails");
    assert!(matches!(err, ConnectionError::Internal(_)));

    let err = info
        .get_last_known_gateway(&ctx(), "dev-1", &span())
        .await
        .expect_err("get fails");
    assert!(matches!(err, ConnectionError::Internal(_)));

    let err = info
        .remove_command_handling_adapter_instance(&ctx(), "dev-1", "adapter-A", &span())
        .await
        .expect_err("versioned get fails");
    assert!(matches!(err, ConnectionError::Internal(_)));

    let err = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &HashSet::new(), &span())
        .await
        .expect_err("get fails");
    assert!(matches!(err, ConnectionError::Internal(_)));

    let err = info
        .get_command_handling_adapter_instances(&ctx(), "dev-1", &gateways(&["gw-1"]), &span())
        .await
        .expect_err("get_all fails");
    assert!(matches!(err, ConnectionError::Internal(_)));
}
