//! Slot discovery and artifact-to-slot synchronization.
//!
//! Slots are the image blocks found by a pre-order walk of the document tree.
//! Artifacts are paired with slots by `slot:<name>` caption keys when the
//! document carries any, and by position otherwise.

use crate::stores::{DocumentStore, StoreError};
use skyslot_common::model::{
    Artifact, BlockKind, BlockSummary, DocumentSlot, PairingMode, SyncPlan,
};
use skyslot_common::slug::slugify;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

const SLOT_KEY_PREFIX: &str = "slot:";
const CACHE_BUST_PARAM: &str = "v";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub updated: usize,
    pub failed: usize,
}

pub struct DocumentSyncer {
    store: Arc<dyn DocumentStore>,
    max_depth: usize,
    cache_bust: bool,
}

struct Pending {
    block: BlockSummary,
    depth: usize,
    container_id: String,
}

impl DocumentSyncer {
    pub fn new(store: Arc<dyn DocumentStore>, max_depth: usize, cache_bust: bool) -> Self {
        Self {
            store,
            max_depth,
            cache_bust,
        }
    }

    /// Image slots under `root_id` in depth-first pre-order.
    ///
    /// Containers deeper than `max_depth` are not expanded. A container seen
    /// twice means the tree is cyclic; it is skipped like a depth violation.
    pub async fn discover_slots(&self, root_id: &str) -> Result<Vec<DocumentSlot>, StoreError> {
        let mut slots = Vec::new();
        let mut expanded: HashSet<String> = HashSet::from([root_id.to_string()]);
        let mut stack = Vec::new();

        let children = self.store.list_children(root_id).await?;
        push_children(&mut stack, children, 0, root_id);

        while let Some(Pending {
            block,
            depth,
            container_id,
        }) = stack.pop()
        {
            if block.kind == BlockKind::Image {
                slots.push(DocumentSlot {
                    block_id: block.id.clone(),
                    depth,
                    container_id,
                    key: block.caption.as_deref().and_then(slot_key),
                });
            }

            if !block.has_children {
                continue;
            }
            if depth >= self.max_depth {
                debug!("Not expanding {} at depth {} (limit)", block.id, depth);
                continue;
            }
            if !expanded.insert(block.id.clone()) {
                warn!("Block {} was already expanded, skipping cycle", block.id);
                continue;
            }

            match self.store.list_children(&block.id).await {
                Ok(children) => push_children(&mut stack, children, depth + 1, &block.id),
                Err(e) => warn!("Failed to list children of {}: {}", block.id, e),
            }
        }

        info!("Discovered {} image slot(s) under {}", slots.len(), root_id);
        Ok(slots)
    }

    /// Write every paired artifact URL into its slot. A failed update is
    /// logged and does not stop the remaining ones.
    pub async fn apply(&self, plan: &SyncPlan, run_stamp: &str) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        for (artifact, slot) in &plan.pairs {
            let url = if self.cache_bust {
                cache_busted_url(&artifact.url, run_stamp)
            } else {
                artifact.url.clone()
            };

            match self.store.update_image_block(&slot.block_id, &url).await {
                Ok(()) => {
                    info!("[{}] slot {} -> {}", artifact.name(), slot.block_id, url);
                    outcome.updated += 1;
                }
                Err(e) => {
                    warn!(
                        "[{}] failed to update slot {}: {}",
                        artifact.name(),
                        slot.block_id,
                        e
                    );
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }
}

fn push_children(
    stack: &mut Vec<Pending>,
    children: Vec<BlockSummary>,
    depth: usize,
    container_id: &str,
) {
    // Reversed so the first child is popped first.
    stack.extend(children.into_iter().rev().map(|block| Pending {
        block,
        depth,
        container_id: container_id.to_string(),
    }));
}

/// `slot:today` -> `today`
pub fn slot_key(caption: &str) -> Option<String> {
    caption
        .trim()
        .strip_prefix(SLOT_KEY_PREFIX)
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

/// Pair artifacts with slots. Keyed when any slot carries a key, positional
/// otherwise; whatever has no partner is dropped.
pub fn plan(artifacts: &[Artifact], slots: &[DocumentSlot]) -> SyncPlan {
    if slots.iter().any(|s| s.key.is_some()) {
        let mut used = vec![false; slots.len()];
        let mut pairs = Vec::new();

        for artifact in artifacts {
            let wanted = slugify(artifact.name());
            let found = slots.iter().enumerate().position(|(i, slot)| {
                !used[i] && slot.key.as_deref().map(slugify).as_deref() == Some(wanted.as_str())
            });
            match found {
                Some(i) => {
                    used[i] = true;
                    pairs.push((artifact.clone(), slots[i].clone()));
                }
                None => debug!("[{}] no slot keyed '{}'", artifact.name(), wanted),
            }
        }

        return SyncPlan {
            mode: PairingMode::Keyed,
            pairs,
        };
    }

    if artifacts.len() != slots.len() {
        debug!(
            "{} artifact(s) for {} slot(s), pairing the first {}",
            artifacts.len(),
            slots.len(),
            artifacts.len().min(slots.len())
        );
    }

    SyncPlan {
        mode: PairingMode::Positional,
        pairs: artifacts
            .iter()
            .cloned()
            .zip(slots.iter().cloned())
            .collect(),
    }
}

/// Replace any previous `v` parameter with `run_stamp`. Unparseable URLs are
/// returned untouched.
pub fn cache_busted_url(raw: &str, run_stamp: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        warn!("Not a valid URL, skipping cache busting: {}", raw);
        return raw.to_string();
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != CACHE_BUST_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(CACHE_BUST_PARAM, run_stamp);
    url.to_string()
}
