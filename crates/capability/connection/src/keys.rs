//! 缓存键编码
//!
//! 两类前缀键，分属互不相交的键空间：
//! - 最近网关：`gw@@<tenant>@@<device>`
//! - 适配器实例：`ai@@<tenant>@@<device>`
//!
//! 键格式与既有部署位级兼容，不可改动。

/// 键段分隔符。租户与设备标识中不允许出现该序列（解析器入口处拒绝）。
pub const KEY_SEPARATOR: &str = "@@";

/// 最近网关条目的键前缀。
const GATEWAY_KEY_PREFIX: &str = "gw";

/// 适配器实例条目的键前缀。
const ADAPTER_INSTANCE_KEY_PREFIX: &str = "ai";

/// 构造设备的最近网关键。
pub fn gateway_key(tenant_id: &str, device_id: &str) -> String {
    format!(
        "{}{}{}{}{}",
        GATEWAY_KEY_PREFIX, KEY_SEPARATOR, tenant_id, KEY_SEPARATOR, device_id
    )
}

/// 构造设备的适配器实例键。
pub fn adapter_instance_key(tenant_id: &str, device_id: &str) -> String {
    format!(
        "{}{}{}{}{}",
        ADAPTER_INSTANCE_KEY_PREFIX, KEY_SEPARATOR, tenant_id, KEY_SEPARATOR, device_id
    )
}

/// 构造设备自身加一组网关的适配器实例键（去重）。
pub fn adapter_instance_keys<'a, I>(tenant_id: &str, device_id: &str, gateway_ids: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut keys = Vec::new();
    keys.push(adapter_instance_key(tenant_id, device_id));
    for gateway_id in gateway_ids {
        let key = adapter_instance_key(tenant_id, gateway_id);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// 从适配器实例键中取回设备标识：最后一个分隔符之后的部分。
///
/// 只用于本模块自己产出的键；分隔符缺失时原样返回。
pub fn device_id_from_adapter_instance_key(key: &str) -> &str {
    match key.rfind(KEY_SEPARATOR) {
        Some(pos) => &key[pos + KEY_SEPARATOR.len()..],
        None => key,
    }
}
