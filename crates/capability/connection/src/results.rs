//! 查询结果结构
//!
//! 字段名与既有调用方约定的线上形态一致（kebab-case），不可改动。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 最近网关查询结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastKnownGateway {
    #[serde(rename = "gateway-id")]
    pub gateway_id: String,
}

/// 单条设备到适配器实例的映射。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInstanceEntry {
    #[serde(rename = "device-id")]
    pub device_id: String,
    #[serde(rename = "adapter-instance-id")]
    pub adapter_instance_id: String,
}

/// 实例解析结果：命中的映射数组（顺序不作保证）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInstances {
    #[serde(rename = "adapter-instances")]
    pub adapter_instances: Vec<AdapterInstanceEntry>,
}

impl AdapterInstances {
    /// 单条映射的结果。
    pub fn single(device_id: impl Into<String>, adapter_instance_id: impl Into<String>) -> Self {
        Self {
            adapter_instances: vec![AdapterInstanceEntry {
                device_id: device_id.into(),
                adapter_instance_id: adapter_instance_id.into(),
            }],
        }
    }

    /// 由设备到实例的映射表构造结果。
    pub fn from_map(map: HashMap<String, String>) -> Self {
        Self {
            adapter_instances: map
                .into_iter()
                .map(|(device_id, adapter_instance_id)| AdapterInstanceEntry {
                    device_id,
                    adapter_instance_id,
                })
                .collect(),
        }
    }
}
