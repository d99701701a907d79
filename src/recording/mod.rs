pub mod accumulator;
pub mod recorder;

pub use accumulator::PageAccumulator;
pub use recorder::{Recorder, RecorderEvent, StartOptions};
