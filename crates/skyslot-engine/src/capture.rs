use crate::renderer::{RenderError, RenderSession};
use chrono::{DateTime, Utc};
use skyslot_common::model::{CaptureResult, ClipSpec, Rect, ResolvedRegion};
use skyslot_common::slug::slugify;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Region '{0}' has an empty bounding box")]
    EmptyRegion(String),

    #[error("Region '{0}' disappeared before capture")]
    Detached(String),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a resolved region into one PNG on disk.
#[derive(Debug, Clone)]
pub struct CaptureEngine {
    /// Pause after scrolling so lazily loaded icons can paint.
    pub settle_delay: Duration,
}

impl CaptureEngine {
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    pub async fn capture(
        &self,
        session: &mut dyn RenderSession,
        region: &ResolvedRegion,
        out_dir: &Path,
        captured_at: DateTime<Utc>,
    ) -> Result<CaptureResult, CaptureError> {
        let name = region.target.name.clone();

        session.scroll_into_view(region.element).await?;
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let measured = session
            .bounding_box(region.element)
            .await?
            .ok_or_else(|| CaptureError::Detached(name.clone()))?;
        let clip = clip_rect(region.target.clip.as_ref(), measured);
        if clip.is_empty() {
            return Err(CaptureError::EmptyRegion(name));
        }

        tokio::fs::create_dir_all(out_dir).await?;
        let local_path = capture_path(out_dir, &name);
        session.screenshot(&local_path, clip).await?;

        info!(
            "[{}] captured {}x{} at ({}, {}) -> {}",
            name,
            clip.width,
            clip.height,
            clip.x,
            clip.y,
            local_path.display()
        );

        Ok(CaptureResult {
            name,
            local_path,
            captured_at,
        })
    }
}

/// Explicit clips are used verbatim, except that element-relative clips take
/// the element's measured top-left. Without a clip the whole element is used.
pub fn clip_rect(clip: Option<&ClipSpec>, element: Rect) -> Rect {
    match clip {
        Some(c) if c.relative_to_element => Rect::new(element.x, element.y, c.width, c.height),
        Some(c) => Rect::new(c.x, c.y, c.width, c.height),
        None => element,
    }
}

pub fn capture_path(out_dir: &Path, name: &str) -> PathBuf {
    out_dir.join(format!("{}.png", slugify(name)))
}
