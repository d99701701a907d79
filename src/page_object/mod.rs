pub mod naming;
pub mod synthesizer;

pub use naming::page_key;
pub use synthesizer::{group_by_page, PageGroup, PageObjectSynthesizer};
