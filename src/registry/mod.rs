mod cell;
mod surface;

pub use cell::{Cell, CellId, CellRecord, CellSink, CellState, CellStore, MaterialId, VOID};
pub use surface::{SurfaceRegistry, BLOCK_SIZE};
