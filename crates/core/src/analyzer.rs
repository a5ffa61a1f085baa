//! Collaborators the hazard monitor drives: the frame source and the remote
//! vision model. Implementations live in the service crate; tests use the
//! generated mocks.

use crate::ImageQuality;
use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Remote image analysis. Every method takes a JPEG data URL.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Raw hazard payload, handed to `HazardReport::parse`. With a search
    /// target the analyzer is asked for guidance toward it as well.
    async fn analyze_hazards(&self, image_data: String, search_target: Option<String>)
    -> Result<String>;

    async fn describe_scene(&self, image_data: String) -> Result<String>;

    /// Clock-position and distance description of `query`, free text.
    async fn find_object(&self, image_data: String, query: String) -> Result<String>;
}

/// A live video stream that can be sampled for single frames.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Camera: Send + Sync {
    /// Acquires the stream. An error here means access was denied.
    async fn open(&self) -> Result<()>;

    /// Encodes the current frame as a data URL.
    async fn grab_frame(&self, quality: ImageQuality) -> Result<String>;

    /// Releases the stream. Safe to call when already released.
    fn release(&self);

    fn is_open(&self) -> bool;
}
