pub mod artifacts;
pub mod emitter;
pub mod locator;

pub use artifacts::ArtifactWriter;
pub use emitter::{CodeEmitter, TestMetadata};
