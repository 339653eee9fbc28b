//! Mock hub servers for runtime tests
//!
//! A mock hub serves the same JSON dialect as a real gateway and counts
//! attribute fetches so tests can assert cache behavior.

use axon_hub::{FunctionRecord, ModuleRecord};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

pub(crate) struct MockHubState {
    serial: String,
    modules: Mutex<Vec<ModuleRecord>>,
    /// Attribute objects keyed by hardware id
    attributes: Mutex<HashMap<String, serde_json::Value>>,
    fetch_count: AtomicUsize,
    writes: Mutex<Vec<(String, String, serde_json::Value)>>,
}

pub(crate) struct MockHub {
    pub(crate) url: String,
    state: Arc<MockHubState>,
    server: JoinHandle<()>,
}

impl MockHub {
    pub(crate) async fn start(serial: &str) -> Self {
        Self::start_with(serial, Vec::new(), HashMap::new()).await
    }

    pub(crate) async fn start_with(
        serial: &str,
        modules: Vec<ModuleRecord>,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Self {
        let state = Arc::new(MockHubState {
            serial: serial.to_string(),
            modules: Mutex::new(modules),
            attributes: Mutex::new(attributes),
            fetch_count: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/info", get(info))
            .route("/api/modules", get(list_modules))
            .route("/api/functions/{id}", get(fetch_attributes))
            .route("/api/functions/{id}/{attr}", post(write_attribute))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
            server,
        }
    }

    /// Number of attribute fetches served so far
    pub(crate) fn fetches(&self) -> usize {
        self.state.fetch_count.load(Ordering::SeqCst)
    }

    /// Every write received, in order
    pub(crate) fn writes(&self) -> Vec<(String, String, serde_json::Value)> {
        self.state.writes.lock().unwrap().clone()
    }

    /// Mutate a device attribute, as if the physical value moved
    pub(crate) fn set_attribute(&self, hardware_id: &str, attribute: &str, value: serde_json::Value) {
        let mut attributes = self.state.attributes.lock().unwrap();
        if let Some(object) = attributes.get_mut(hardware_id).and_then(|v| v.as_object_mut()) {
            object.insert(attribute.to_string(), value);
        }
    }

    /// Kill the server; subsequent requests see a refused connection
    pub(crate) fn stop(&self) {
        self.server.abort();
    }
}

impl Drop for MockHub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn info(State(state): State<Arc<MockHubState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({"serial": state.serial, "product": "MockHub"}))
}

async fn list_modules(State(state): State<Arc<MockHubState>>) -> Json<Vec<ModuleRecord>> {
    Json(state.modules.lock().unwrap().clone())
}

async fn fetch_attributes(
    State(state): State<Arc<MockHubState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    state.fetch_count.fetch_add(1, Ordering::SeqCst);
    state
        .attributes
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn write_attribute(
    State(state): State<Arc<MockHubState>>,
    Path((id, attr)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let value = body.get("value").cloned().unwrap_or(serde_json::Value::Null);
    let mut attributes = state.attributes.lock().unwrap();
    match attributes.get_mut(&id).and_then(|v| v.as_object_mut()) {
        Some(object) => {
            object.insert(attr.clone(), value.clone());
            state.writes.lock().unwrap().push((id, attr, value));
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// Build a module record with the given functions
pub(crate) fn module(
    serial: &str,
    logical_name: &str,
    functions: &[(&str, &str, &str)],
) -> ModuleRecord {
    ModuleRecord {
        serial: serial.to_string(),
        logical_name: logical_name.to_string(),
        functions: functions
            .iter()
            .map(|(func_id, class, logical)| FunctionRecord {
                func_id: func_id.to_string(),
                logical_name: logical.to_string(),
                class: class.to_string(),
                advertised_value: String::new(),
            })
            .collect(),
    }
}

/// Attribute object for a basic sensor function
pub(crate) fn sensor_attributes(
    logical_name: &str,
    advertised: &str,
    unit: &str,
    current: f64,
) -> serde_json::Value {
    serde_json::json!({
        "logicalName": logical_name,
        "advertisedValue": advertised,
        "unit": unit,
        "currentValue": current,
    })
}

/// One module carrying one function, the common single-device fixture
pub(crate) fn single_sensor(
    serial: &str,
    func_id: &str,
    class: &str,
    logical_name: &str,
) -> (Vec<ModuleRecord>, HashMap<String, serde_json::Value>) {
    let modules = vec![module(serial, "", &[(func_id, class, logical_name)])];
    let mut attributes = HashMap::new();
    attributes.insert(
        format!("{}.{}", serial, func_id),
        sensor_attributes(logical_name, "810", "lx", 810.5),
    );
    (modules, attributes)
}
