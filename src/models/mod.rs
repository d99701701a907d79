pub mod action;
pub mod element;
pub mod page_object;
pub mod report;
pub mod requests;
pub mod responses;
pub mod selector;
pub mod test_step;

pub use action::*;
pub use element::*;
pub use page_object::*;
pub use report::*;
pub use requests::*;
pub use responses::*;
pub use selector::*;
pub use test_step::*;
