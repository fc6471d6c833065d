use async_trait::async_trait;
pub use skyslot_common::error::RenderError;
use skyslot_common::model::{ElementHandle, Rect, WaitPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Show the browser window instead of running headless.
    pub visible: bool,
    pub executable: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
}

/// Factory for render sessions. One session is launched per run.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn RenderSession>, RenderError>;
}

/// A live page inside the rendering engine.
///
/// Sessions own OS resources (a browser process, temp profile dirs), so every
/// exit path of the pipeline calls `close`.
#[async_trait]
pub trait RenderSession: Send {
    /// Resize the viewport before navigating.
    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Load `url` and wait until `policy` is satisfied or `timeout` elapses.
    async fn navigate(
        &mut self,
        url: &str,
        policy: WaitPolicy,
        timeout: Duration,
    ) -> Result<(), RenderError>;

    /// Return a handle for the first element matching `selector`, if any.
    async fn query_selector(&mut self, selector: &str)
    -> Result<Option<ElementHandle>, RenderError>;

    /// Bounding box in document coordinates, `None` if the element is detached
    /// or not rendered.
    async fn bounding_box(&mut self, element: ElementHandle) -> Result<Option<Rect>, RenderError>;

    async fn scroll_into_view(&mut self, element: ElementHandle) -> Result<(), RenderError>;

    /// Write a PNG of `clip` (document coordinates) to `path`.
    async fn screenshot(&mut self, path: &Path, clip: Rect) -> Result<(), RenderError>;

    async fn close(&mut self) -> Result<(), RenderError>;

    fn is_closed(&self) -> bool;
}
