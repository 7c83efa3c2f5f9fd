pub mod surface;

pub use surface::{Cylinder, Plane, Sense, Surface, SurfaceKind};
