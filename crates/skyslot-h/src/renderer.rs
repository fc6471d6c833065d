use crate::cdp::CdpClient;
use crate::network::network_events;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use serde::Deserialize;
use skyslot_engine::common::model::{ElementHandle, Rect, WaitPolicy};
use skyslot_engine::navigator::{QuietSettings, wait_for_network_quiet};
use skyslot_engine::renderer::{LaunchOptions, PageRenderer, RenderError, RenderSession};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Bounding box in document coordinates, or `null` once detached.
const MEASURE_JS: &str = r#"function() {
    if (!this.isConnected) { return null; }
    const r = this.getBoundingClientRect();
    return JSON.stringify({
        x: r.left + window.scrollX,
        y: r.top + window.scrollY,
        width: r.width,
        height: r.height
    });
}"#;

/// Launches headless Chromium over CDP.
pub struct HeadlessRenderer {
    quiet: QuietSettings,
    request_timeout: Duration,
}

impl HeadlessRenderer {
    pub fn new(quiet: QuietSettings, request_timeout: Duration) -> Self {
        Self {
            quiet,
            request_timeout,
        }
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(QuietSettings::default(), Duration::from_secs(60))
    }
}

#[async_trait]
impl PageRenderer for HeadlessRenderer {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn RenderSession>, RenderError> {
        info!("Launching Chromium...");
        let client = CdpClient::launch(options, self.request_timeout).await?;
        Ok(Box::new(HeadlessSession {
            client: Some(client),
            elements: Vec::new(),
            quiet: self.quiet,
        }))
    }
}

pub struct HeadlessSession {
    client: Option<CdpClient>,
    elements: Vec<Element>,
    quiet: QuietSettings,
}

impl HeadlessSession {
    fn page(&self) -> Result<&Page, RenderError> {
        self.client
            .as_ref()
            .map(|c| &c.page)
            .ok_or(RenderError::Closed)
    }

    fn element(&self, handle: ElementHandle) -> Result<&Element, RenderError> {
        self.elements
            .get(handle.0 as usize)
            .ok_or(RenderError::StaleElement(handle.0))
    }
}

#[derive(Deserialize)]
struct Measured {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

fn navigation_error(e: CdpError, timeout: Duration) -> RenderError {
    match e {
        CdpError::Timeout => RenderError::NavigationTimeout(timeout.as_millis() as u64),
        other => RenderError::Navigation(other.to_string()),
    }
}

#[async_trait]
impl RenderSession for HeadlessSession {
    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let params = SetDeviceMetricsOverrideParams::new(width as i64, height as i64, 1.0, false);
        self.page()?
            .execute(params)
            .await
            .map_err(|e| RenderError::Other(format!("Failed to set viewport: {}", e)))?;
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        policy: WaitPolicy,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        let quiet = self.quiet;
        self.elements.clear();
        let page = self.page()?;

        let events = match policy {
            WaitPolicy::NetworkQuiet => Some(network_events(page).await?),
            WaitPolicy::DomReady => None,
        };

        let load = async {
            page.goto(url)
                .await
                .map_err(|e| navigation_error(e, timeout))?;
            if let Some(events) = events {
                wait_for_network_quiet(events, quiet).await;
            }
            Ok(())
        };

        match tokio::time::timeout(timeout, load).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::NavigationTimeout(timeout.as_millis() as u64)),
        }
    }

    async fn query_selector(
        &mut self,
        selector: &str,
    ) -> Result<Option<ElementHandle>, RenderError> {
        let found = self
            .page()?
            .find_elements(selector)
            .await
            .map_err(|e| RenderError::Query {
                selector: selector.to_string(),
                reason: e.to_string(),
            })?;

        Ok(found.into_iter().next().map(|element| {
            self.elements.push(element);
            ElementHandle((self.elements.len() - 1) as u64)
        }))
    }

    async fn bounding_box(&mut self, handle: ElementHandle) -> Result<Option<Rect>, RenderError> {
        let returns = self
            .element(handle)?
            .call_js_fn(MEASURE_JS, false)
            .await
            .map_err(|e| RenderError::Other(format!("Failed to measure element: {}", e)))?;

        let Some(json) = returns.result.value.as_ref().and_then(|v| v.as_str()) else {
            debug!("Element {} is detached", handle.0);
            return Ok(None);
        };
        let m: Measured = serde_json::from_str(json)
            .map_err(|e| RenderError::Other(format!("Bad measurement: {}", e)))?;
        Ok(Some(Rect::new(m.x, m.y, m.width, m.height)))
    }

    async fn scroll_into_view(&mut self, handle: ElementHandle) -> Result<(), RenderError> {
        self.element(handle)?
            .scroll_into_view()
            .await
            .map_err(|e| RenderError::Other(format!("Failed to scroll: {}", e)))?;
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path, clip: Rect) -> Result<(), RenderError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(Viewport {
                x: clip.x,
                y: clip.y,
                width: clip.width,
                height: clip.height,
                scale: 1.0,
            })
            .capture_beyond_viewport(true)
            .build();

        self.page()?
            .save_screenshot(params, path)
            .await
            .map_err(|e| RenderError::Screenshot(e.to_string()))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.elements.clear();
        if let Some(client) = self.client.take() {
            info!("Closing Chromium");
            client.close().await?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.client.is_none()
    }
}
