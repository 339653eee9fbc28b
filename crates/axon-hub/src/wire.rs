//! Wire types for the hub JSON dialect

use serde::{Deserialize, Serialize};

/// Response to the liveness probe (`GET /api/info`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubInfo {
    /// Serial number of the hub itself
    pub serial: String,
    #[serde(default)]
    pub product: String,
}

/// One module entry in the hub directory (`GET /api/modules`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub serial: String,
    /// User-assigned alias, empty when unset
    #[serde(default)]
    pub logical_name: String,
    #[serde(default)]
    pub functions: Vec<FunctionRecord>,
}

/// One function exposed by a module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRecord {
    /// Hardware function identifier, unique within the module
    pub func_id: String,
    #[serde(default)]
    pub logical_name: String,
    /// Function class name (e.g. "LightSensor")
    pub class: String,
    #[serde(default)]
    pub advertised_value: String,
}

/// Body of an attribute write (`POST /api/functions/{id}/{attr}`)
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteRequest {
    pub value: serde_json::Value,
}
