//! Page loading and the network quiescence check.

use crate::renderer::{RenderError, RenderSession};
use futures::{Stream, StreamExt};
use skyslot_common::model::WaitPolicy;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Request lifecycle events observed while a page loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Started(String),
    /// Finished, failed, or served from cache.
    Finished(String),
}

#[derive(Debug, Clone, Copy)]
pub struct QuietSettings {
    pub max_inflight: usize,
    pub window: Duration,
}

impl Default for QuietSettings {
    fn default() -> Self {
        Self {
            max_inflight: 2,
            window: Duration::from_millis(500),
        }
    }
}

/// Resolve once at most `max_inflight` requests have been pending for a full
/// `window`. Has no deadline of its own; callers wrap it in a timeout.
///
/// If the event stream ends the page can no longer be observed and the
/// function returns immediately.
pub async fn wait_for_network_quiet<S>(mut events: S, settings: QuietSettings)
where
    S: Stream<Item = NetworkEvent> + Unpin,
{
    let mut inflight: HashSet<String> = HashSet::new();
    let mut quiet_since = Some(Instant::now());

    loop {
        let next = match quiet_since {
            Some(since) => {
                match tokio::time::timeout_at(since + settings.window, events.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        debug!("Network quiet with {} request(s) pending", inflight.len());
                        return;
                    }
                }
            }
            None => events.next().await,
        };

        let Some(event) = next else {
            debug!("Network event stream ended");
            return;
        };

        match event {
            NetworkEvent::Started(id) => {
                inflight.insert(id);
            }
            NetworkEvent::Finished(id) => {
                inflight.remove(&id);
            }
        }

        if inflight.len() <= settings.max_inflight {
            quiet_since.get_or_insert_with(Instant::now);
        } else {
            quiet_since = None;
        }
    }
}

/// Loads the target page into a session.
#[derive(Debug, Clone)]
pub struct Navigator {
    pub policy: WaitPolicy,
    pub timeout: Duration,
    pub viewport: (u32, u32),
}

impl Navigator {
    pub fn new(policy: WaitPolicy, timeout: Duration, viewport: (u32, u32)) -> Self {
        Self {
            policy,
            timeout,
            viewport,
        }
    }

    /// Navigate and wait for the configured policy. The outer timeout also
    /// covers sessions that do not honour the one they are given.
    pub async fn load(&self, session: &mut dyn RenderSession, url: &str) -> Result<(), RenderError> {
        let (width, height) = self.viewport;
        session.set_viewport(width, height).await?;

        info!("Navigating to {} (wait: {:?})", url, self.policy);
        let timeout_ms = self.timeout.as_millis() as u64;
        match tokio::time::timeout(self.timeout, session.navigate(url, self.policy, self.timeout))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(RenderError::NavigationTimeout(timeout_ms)),
        }
    }
}
