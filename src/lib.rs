pub mod api;
pub mod browser;
pub mod codegen;
pub mod config;
pub mod error;
pub mod models;
pub mod page_object;
pub mod parser;
pub mod recording;
pub mod selector;
