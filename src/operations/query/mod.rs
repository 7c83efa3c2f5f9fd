mod volume;

pub use volume::{SampleVolume, VolumeEstimate};
