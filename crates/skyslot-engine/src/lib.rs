pub mod accumulation;
pub mod capture;
pub mod clock;
pub mod config;
pub mod locator;
pub mod navigator;
pub mod pipeline;
pub mod publisher;
pub mod renderer;
pub mod stores;
pub mod syncer;
pub mod watchdog;

pub use skyslot_common as common;
