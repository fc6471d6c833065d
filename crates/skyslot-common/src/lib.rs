pub mod error;
pub mod model;
pub mod slug;

pub use error::{RenderError, StoreError};
pub use model::*;
pub use slug::slugify;
