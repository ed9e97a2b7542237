//! Async stages of initialisation: device wait and model load.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::audio::CaptureSource;
use crate::error::{EarshotError, Result};
use crate::inference::{ModelHandle, ModelProvider};

/// Poll until the capture source reports a device. Returns the number of
/// polls that found nothing.
///
/// There is no timeout: the caller decides whether to wrap this in
/// `tokio::time::timeout`.
pub async fn wait_for_device(capture: &dyn CaptureSource, poll_interval: Duration) -> usize {
    let mut misses = 0usize;
    while !capture.is_available() {
        if misses == 0 {
            info!("waiting for an audio input device");
        }
        misses += 1;
        tokio::time::sleep(poll_interval).await;
    }
    debug!(misses, "audio input device present");
    misses
}

/// Load the model on the blocking pool.
///
/// # Errors
/// Whatever the provider returns; a panicked load surfaces as
/// `EarshotError::ModelLoad`.
pub async fn load_model(models: Arc<dyn ModelProvider>, path: PathBuf) -> Result<ModelHandle> {
    let task_path = path.clone();
    tokio::task::spawn_blocking(move || models.load_model(&task_path))
        .await
        .map_err(|e| EarshotError::ModelLoad {
            path,
            reason: format!("load task failed: {e}"),
        })?
}
