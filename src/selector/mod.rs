pub mod generator;
pub mod stability;
pub mod strategies;

pub use generator::SelectorGenerator;
pub use stability::{is_stable_class, is_stable_id};
