pub mod component;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod link;
pub mod math;
pub mod operations;
pub mod registry;
pub mod rule;
pub mod vars;
pub mod zone;

pub use context::{BuildContext, ComponentId, Geometry};
pub use error::{BeamcsgError, Result};
