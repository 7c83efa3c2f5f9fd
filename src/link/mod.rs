mod cut;
mod link_point;
mod named;

pub use cut::{ExternalCut, BACK, FRONT};
pub use link_point::{LinkPoint, LinkSet};
pub use named::{NamedCells, NamedSurfaces};
