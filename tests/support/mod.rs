#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use video_pipeline::common::error::{EncodeError, LaunchError, QueueError, StorageError};
use video_pipeline::infrastructure::encoder::Encoder;
use video_pipeline::infrastructure::orchestrator::{
    ContainerLauncher, CredentialsContext, LaunchReceipt, LaunchRequest,
};
use video_pipeline::infrastructure::queue::{MessageQueue, QueueMessage};
use video_pipeline::infrastructure::storage::ObjectStore;
use video_pipeline::modules::transcode::model::RenditionSpec;
use video_pipeline::workers::dispatcher::DispatchSettings;

pub const PROBE_BODY: &str =
    r#"{"Service":"Amazon S3","Event":"s3:TestEvent","Time":"2024-01-01T00:00:00Z","Bucket":"uploads"}"#;

pub fn batch_body(keys: &[&str]) -> String {
    let records: Vec<String> = keys
        .iter()
        .map(|key| {
            format!(
                r#"{{"eventName":"ObjectCreated:Put","s3":{{"bucket":{{"name":"uploads"}},"object":{{"key":"{}"}}}}}}"#,
                key
            )
        })
        .collect();
    format!(r#"{{"Records":[{}]}}"#, records.join(","))
}

pub fn dispatch_settings() -> DispatchSettings {
    DispatchSettings {
        output_container: "renditions".to_string(),
        credentials: CredentialsContext {
            region: "ap-south-1".to_string(),
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            s3_endpoint: None,
        },
        max_messages: 1,
        wait_seconds: 0,
        receive_error_pause: Duration::from_millis(5),
    }
}

// --- queue ---

#[derive(Default)]
struct QueueState {
    visible: VecDeque<QueueMessage>,
    in_flight: Vec<QueueMessage>,
    deleted: Vec<String>,
    receives: usize,
    failing_receives: usize,
}

/// In-memory queue with SQS-like visibility: received messages stay in flight
/// until deleted or until `expire_visibility` puts them back.
#[derive(Default)]
pub struct FakeQueue {
    state: Mutex<QueueState>,
    cancel_when_drained: Option<CancellationToken>,
}

impl FakeQueue {
    pub fn with_bodies(bodies: &[&str]) -> Self {
        let queue = Self::default();
        for body in bodies {
            queue.push(Some(body));
        }
        queue
    }

    /// Cancels `token` the first time a receive finds nothing visible.
    pub fn cancel_when_drained(mut self, token: CancellationToken) -> Self {
        self.cancel_when_drained = Some(token);
        self
    }

    pub fn fail_next_receives(self, count: usize) -> Self {
        self.state.lock().unwrap().failing_receives = count;
        self
    }

    pub fn push(&self, body: Option<&str>) -> QueueMessage {
        let mut state = self.state.lock().unwrap();
        let n = state.visible.len() + state.in_flight.len() + state.deleted.len();
        let message = QueueMessage {
            id: format!("msg-{}", n),
            ack_token: format!("receipt-{}", n),
            body: body.map(str::to_string),
        };
        state.visible.push_back(message.clone());
        message
    }

    pub fn expire_visibility(&self) {
        let mut state = self.state.lock().unwrap();
        let expired: Vec<QueueMessage> = state.in_flight.drain(..).collect();
        state.visible.extend(expired);
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn in_flight_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .in_flight
            .iter()
            .map(|m| m.id.clone())
            .collect()
    }

    pub fn receives(&self) -> usize {
        self.state.lock().unwrap().receives
    }
}

#[async_trait]
impl MessageQueue for FakeQueue {
    async fn receive(&self, max_messages: i32, _wait_seconds: i32) -> Result<Vec<QueueMessage>, QueueError> {
        let mut state = self.state.lock().unwrap();
        state.receives += 1;

        if state.failing_receives > 0 {
            state.failing_receives -= 1;
            return Err(QueueError::Receive("connection reset".to_string()));
        }

        if state.visible.is_empty() {
            if let Some(token) = &self.cancel_when_drained {
                token.cancel();
            }
            return Ok(Vec::new());
        }

        let mut batch = Vec::new();
        while batch.len() < max_messages.max(1) as usize {
            let Some(message) = state.visible.pop_front() else {
                break;
            };
            state.in_flight.push(message.clone());
            batch.push(message);
        }
        Ok(batch)
    }

    async fn delete(&self, ack_token: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        let Some(pos) = state.in_flight.iter().position(|m| m.ack_token == ack_token) else {
            return Err(QueueError::Acknowledge(format!("unknown receipt {}", ack_token)));
        };
        let message = state.in_flight.remove(pos);
        state.deleted.push(message.id);
        Ok(())
    }
}

// --- orchestrator ---

#[derive(Default)]
pub struct FakeLauncher {
    requests: Mutex<Vec<LaunchRequest>>,
    failing_keys: Mutex<HashSet<String>>,
    cancel_on_launch: Option<(CancellationToken, Duration)>,
}

impl FakeLauncher {
    pub fn failing_on(keys: &[&str]) -> Self {
        let launcher = Self::default();
        launcher
            .failing_keys
            .lock()
            .unwrap()
            .extend(keys.iter().map(|k| k.to_string()));
        launcher
    }

    /// Cancels `token` as soon as a launch starts, then takes `latency` to
    /// answer, so shutdown arrives while a message is being handled.
    pub fn cancelling(mut self, token: CancellationToken, latency: Duration) -> Self {
        self.cancel_on_launch = Some((token, latency));
        self
    }

    pub fn recover(&self) {
        self.failing_keys.lock().unwrap().clear();
    }

    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn launched_keys(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.source.key).collect()
    }
}

#[async_trait]
impl ContainerLauncher for FakeLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchReceipt, LaunchError> {
        if let Some((token, latency)) = &self.cancel_on_launch {
            token.cancel();
            tokio::time::sleep(*latency).await;
        }

        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());

        if self.failing_keys.lock().unwrap().contains(&request.source.key) {
            return Err(LaunchError::Rejected("RESOURCE:MEMORY".to_string()));
        }
        Ok(LaunchReceipt {
            task_id: format!("task-{}", requests.len()),
        })
    }
}

// --- object store ---

#[derive(Default)]
pub struct FakeStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    deleted: Mutex<Vec<(String, String)>>,
    failing_uploads: Mutex<HashSet<String>>,
    fail_deletes: bool,
}

impl FakeStore {
    pub fn with_object(container: &str, key: &str, data: &[u8]) -> Self {
        let store = Self::default();
        store
            .objects
            .lock()
            .unwrap()
            .insert((container.to_string(), key.to_string()), data.to_vec());
        store
    }

    pub fn failing_uploads(self, keys: &[&str]) -> Self {
        self.failing_uploads
            .lock()
            .unwrap()
            .extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn contains(&self, container: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(container.to_string(), key.to_string()))
    }

    pub fn object(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys_in(&self, container: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn download_to_file(&self, container: &str, key: &str, dest: &Path) -> Result<u64, StorageError> {
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(&(container.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                container: container.to_string(),
                key: key.to_string(),
            })?;
        tokio::fs::write(dest, &data).await?;
        Ok(data.len() as u64)
    }

    async fn upload_file(
        &self,
        container: &str,
        key: &str,
        src: &Path,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let data = tokio::fs::read(src).await?;
        if self.failing_uploads.lock().unwrap().contains(key) {
            return Err(StorageError::UploadFailed(format!("503 SlowDown for {}", key)));
        }
        self.objects
            .lock()
            .unwrap()
            .insert((container.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn delete_object(&self, container: &str, key: &str) -> Result<(), StorageError> {
        if self.fail_deletes {
            return Err(StorageError::DeleteFailed("AccessDenied".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .remove(&(container.to_string(), key.to_string()));
        self.deleted
            .lock()
            .unwrap()
            .push((container.to_string(), key.to_string()));
        Ok(())
    }
}

// --- encoder ---

/// Writes `<input bytes>|<rendition name>` to the output, or fails without
/// producing a file for the configured renditions.
#[derive(Default)]
pub struct FakeEncoder {
    failing: HashSet<String>,
    delay: Option<Duration>,
    barrier: Option<tokio::sync::Barrier>,
    calls: AtomicUsize,
}

impl FakeEncoder {
    pub fn failing_on(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every encode waits until `parties` encodes are running at once.
    pub fn requiring_concurrency(mut self, parties: usize) -> Self {
        self.barrier = Some(tokio::sync::Barrier::new(parties));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(&self, input: &Path, output: &Path, spec: &RenditionSpec) -> Result<(), EncodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        if self.failing.contains(&spec.name) {
            return Err(EncodeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: format!("Error while opening encoder for {}", spec.name),
            });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut data = tokio::fs::read(input).await.map_err(EncodeError::Spawn)?;
        data.extend_from_slice(format!("|{}", spec.name).as_bytes());
        tokio::fs::write(output, data).await.map_err(EncodeError::Spawn)?;
        Ok(())
    }
}
