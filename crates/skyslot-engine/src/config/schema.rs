use serde::{Deserialize, Serialize};
use skyslot_common::model::{CaptureTarget, WaitPolicy};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkyslotConfig {
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub wait_policy: WaitPolicy,
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    /// Network counts as quiet at or below this many in-flight requests.
    #[serde(default = "default_idle_max_inflight")]
    pub idle_max_inflight: usize,
    #[serde(default = "default_idle_window_ms")]
    pub idle_window_ms: u64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            wait_policy: WaitPolicy::default(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            idle_max_inflight: default_idle_max_inflight(),
            idle_window_ms: default_idle_window_ms(),
        }
    }
}

fn default_url() -> String {
    "https://weather.yahoo.co.jp/weather/jp/41/8510/41425.html".to_string()
}

fn default_navigation_timeout_ms() -> u64 {
    60000
}

fn default_viewport_width() -> u32 {
    1000
}

fn default_viewport_height() -> u32 {
    1200
}

fn default_idle_max_inflight() -> usize {
    2
}

fn default_idle_window_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_selector_timeout_ms")]
    pub selector_timeout_ms: u64,
    #[serde(default = "default_targets")]
    pub targets: Vec<CaptureTarget>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            settle_delay_ms: default_settle_delay_ms(),
            selector_timeout_ms: default_selector_timeout_ms(),
            targets: default_targets(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("captures")
}

fn default_settle_delay_ms() -> u64 {
    1500
}

fn default_selector_timeout_ms() -> u64 {
    5000
}

/// Current and previous markup of the forecast page, newest first.
fn default_targets() -> Vec<CaptureTarget> {
    vec![
        CaptureTarget::new(
            "today",
            &[
                "#yjw_pinpoint_today",
                ".forecastCity td:nth-of-type(1) .pict",
                ".forecastCity td:nth-of-type(1)",
                "#main",
            ],
        ),
        CaptureTarget::new(
            "tomorrow",
            &[
                "#yjw_pinpoint_tomorrow",
                ".forecastCity td:nth-of-type(2) .pict",
                ".forecastCity td:nth-of-type(2)",
            ],
        ),
        CaptureTarget::new("10-day", &["#yjw_week", ".yjw_table", "#week"]),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishFailurePolicy {
    /// Drop the failed target and keep going.
    #[default]
    SkipTarget,
    AbortRun,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Remote folder prepended to every artifact id.
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub on_failure: PublishFailurePolicy,
    #[serde(default)]
    pub signature_algorithm: SignatureAlgorithm,
}

/// Digest used to sign uploads. Cloudinary accounts verify SHA-1 unless
/// switched to SHA-256 in their security settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_cache_bust")]
    pub cache_bust: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            cache_bust: default_cache_bust(),
        }
    }
}

fn default_max_depth() -> usize {
    3
}

fn default_cache_bust() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub trigger_hour: u32,
    /// `±HH:MM`; the host's local zone is used when absent.
    #[serde(default)]
    pub utc_offset: Option<String>,
    /// Title property of the archive database ("名前" in Japanese workspaces).
    #[serde(default = "default_title_property")]
    pub title_property: String,
    #[serde(default = "default_date_property")]
    pub date_property: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            trigger_hour: 0,
            utc_offset: None,
            title_property: default_title_property(),
            date_property: default_date_property(),
        }
    }
}

fn default_title_property() -> String {
    "Name".to_string()
}

fn default_date_property() -> String {
    "Date".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Extra time allowed for closing the session before the hard kill.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            grace_ms: default_grace_ms(),
        }
    }
}

fn default_deadline_ms() -> u64 {
    180000
}

fn default_grace_ms() -> u64 {
    15000
}
