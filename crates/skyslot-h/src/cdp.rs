use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use skyslot_engine::renderer::{LaunchOptions, RenderError};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    pub page: Page,
    profile: ProfileDir,
}

/// Chromium user-data dir. Throwaway dirs are removed on drop, so a launch
/// that fails partway does not leave one behind.
pub struct ProfileDir {
    path: PathBuf,
    cleanup: bool,
}

impl ProfileDir {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if !self.cleanup {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            tracing::debug!(
                "Failed to clean up user-data-dir {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

impl CdpClient {
    pub async fn launch(
        options: &LaunchOptions,
        request_timeout: Duration,
    ) -> Result<Self, RenderError> {
        let mut config_builder = BrowserConfig::builder()
            .no_sandbox() // Needed in CI containers
            .request_timeout(request_timeout);
        let profile = resolve_user_data_dir(options)?;
        config_builder = config_builder.user_data_dir(profile.path());

        if options.visible {
            tracing::info!("Launching browser in visible mode");
            config_builder = config_builder.with_head();
        } else {
            tracing::info!("Launching browser in headless mode");
        }

        if let Some(chrome_bin) = &options.executable {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin.display());
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        let config = config_builder
            .build()
            .map_err(|e| RenderError::Launch(format!("Failed to build browser config: {}", e)))?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::debug!("Browser handler error (ignoring): {}", e);
                }
            }
            tracing::debug!("Browser handler task ended");
        });

        match open_page(&browser).await {
            Ok(page) => Ok(Self {
                browser,
                handler_task,
                page,
                profile,
            }),
            Err(e) => {
                shutdown(&mut browser, &handler_task).await;
                Err(e)
            }
        }
    }

    pub async fn close(mut self) -> Result<(), RenderError> {
        let closed = shutdown(&mut self.browser, &self.handler_task).await;
        tracing::debug!("Released profile {}", self.profile.path().display());
        closed
    }
}

async fn open_page(browser: &Browser) -> Result<Page, RenderError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| RenderError::Launch(format!("Failed to create page: {}", e)))?;

    // Weather widgets occasionally raise alerts; a pending dialog would
    // block every later evaluation.
    let mut dialog_events = page
        .event_listener::<chromiumoxide::cdp::browser_protocol::page::EventJavascriptDialogOpening>()
        .await
        .map_err(|e| RenderError::Launch(format!("Failed to subscribe to dialog events: {}", e)))?;

    let page_clone = page.clone();
    tokio::spawn(async move {
        while let Some(event) = dialog_events.next().await {
            tracing::info!("Dismissing JavaScript dialog: {}", event.message);
            let cmd =
                chromiumoxide::cdp::browser_protocol::page::HandleJavaScriptDialogParams::new(
                    true,
                );
            if let Err(e) = page_clone.execute(cmd).await {
                tracing::warn!("Failed to accept dialog: {}", e);
            }
        }
    });

    Ok(page)
}

/// Close the browser, reap the process and stop the handler.
async fn shutdown(browser: &mut Browser, handler_task: &JoinHandle<()>) -> Result<(), RenderError> {
    let closed = browser
        .close()
        .await
        .map(|_| ())
        .map_err(|e| RenderError::Other(format!("Error closing browser: {}", e)));
    if let Err(e) = browser.wait().await {
        tracing::debug!("Error waiting for browser exit: {}", e);
    }
    handler_task.abort();
    closed
}

pub fn resolve_user_data_dir(options: &LaunchOptions) -> Result<ProfileDir, RenderError> {
    if let Some(dir) = &options.user_data_dir {
        std::fs::create_dir_all(dir)?;
        tracing::info!("Using user data dir {}", dir.display());
        return Ok(ProfileDir {
            path: dir.clone(),
            cleanup: false,
        });
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| RenderError::Launch(format!("System clock error: {}", e)))?
        .as_nanos();
    let path = std::env::temp_dir().join(format!("{}{}", profile_prefix(), nanos));
    std::fs::create_dir_all(&path)?;
    tracing::debug!("Using isolated user data dir: {}", path.display());
    Ok(ProfileDir {
        path,
        cleanup: true,
    })
}

/// Name prefix of throwaway profiles created by this process.
pub fn profile_prefix() -> String {
    format!("skyslot-chromium-profile-{}-", std::process::id())
}
