//! Resolves capture targets to live elements, tolerating markup drift.

use crate::renderer::RenderSession;
use skyslot_common::model::{CaptureTarget, ResolvedRegion};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RegionLocator {
    /// Budget for each individual selector candidate.
    pub candidate_timeout: Duration,
}

impl RegionLocator {
    pub fn new(candidate_timeout: Duration) -> Self {
        Self { candidate_timeout }
    }

    /// Try each selector candidate in order and bind the first one that yields
    /// an attached element. Errors and timeouts on a candidate count as a miss.
    /// `None` only when every candidate missed.
    pub async fn resolve(
        &self,
        session: &mut dyn RenderSession,
        target: &CaptureTarget,
    ) -> Option<ResolvedRegion> {
        for selector in target.selectors.iter().filter(|s| !s.trim().is_empty()) {
            let found =
                tokio::time::timeout(self.candidate_timeout, session.query_selector(selector)).await;
            let element = match found {
                Ok(Ok(Some(element))) => element,
                Ok(Ok(None)) => {
                    debug!("[{}] '{}' matched nothing", target.name, selector);
                    continue;
                }
                Ok(Err(e)) => {
                    debug!("[{}] '{}' failed: {}", target.name, selector, e);
                    continue;
                }
                Err(_) => {
                    debug!("[{}] '{}' timed out", target.name, selector);
                    continue;
                }
            };

            let measured =
                tokio::time::timeout(self.candidate_timeout, session.bounding_box(element)).await;
            match measured {
                Ok(Ok(Some(rect))) => {
                    info!("[{}] resolved via '{}'", target.name, selector);
                    return Some(ResolvedRegion {
                        target: target.clone(),
                        element,
                        selector: selector.clone(),
                        rect,
                    });
                }
                Ok(Ok(None)) => debug!("[{}] '{}' is detached", target.name, selector),
                Ok(Err(e)) => debug!("[{}] '{}' could not be measured: {}", target.name, selector, e),
                Err(_) => debug!("[{}] '{}' measurement timed out", target.name, selector),
            }
        }

        warn!(
            "[{}] no selector candidate resolved ({} tried), skipping",
            target.name,
            target.selectors.len()
        );
        None
    }
}
