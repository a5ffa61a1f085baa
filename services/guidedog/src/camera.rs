use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use guidedog_core::ImageQuality;
use guidedog_core::analyzer::Camera;
use guidedog_native_utils::frame::encode_data_url;
use guidedog_native_utils::source::get_frame_source;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Plays back still frames from a directory as if they were a live feed.
/// Each grab returns the next frame, wrapping around at the end.
pub struct DirectoryCamera {
    dir: PathBuf,
    frames: Mutex<Option<Vec<PathBuf>>>,
    cursor: AtomicUsize,
}

impl DirectoryCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            frames: Mutex::new(None),
            cursor: AtomicUsize::new(0),
        }
    }

    fn frames(&self) -> MutexGuard<'_, Option<Vec<PathBuf>>> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_frame(&self) -> Result<PathBuf> {
        let frames = self.frames();
        let frames = frames.as_ref().ok_or_else(|| anyhow!("Camera is not open"))?;
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % frames.len();
        Ok(frames[index].clone())
    }
}

#[async_trait]
impl Camera for DirectoryCamera {
    async fn open(&self) -> Result<()> {
        let frames = get_frame_source(&self.dir)?;
        tracing::info!("Camera opened: {} frames in {}", frames.len(), self.dir.display());
        *self.frames() = Some(frames);
        Ok(())
    }

    async fn grab_frame(&self, quality: ImageQuality) -> Result<String> {
        let path = self.next_frame()?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read frame {}", path.display()))?;
        let data_url = tokio::task::spawn_blocking(move || encode_data_url(&bytes, quality))
            .await
            .context("Frame encoder panicked")?
            .with_context(|| format!("Failed to encode frame {}", path.display()))?;
        tracing::debug!("Captured {} at q{}", path.display(), quality.percent());
        Ok(data_url)
    }

    fn release(&self) {
        if self.frames().take().is_some() {
            tracing::info!("Camera released");
        }
    }

    fn is_open(&self) -> bool {
        self.frames().is_some()
    }
}
