pub mod cdp;
pub mod network;
pub mod renderer;

pub use renderer::{HeadlessRenderer, HeadlessSession};
