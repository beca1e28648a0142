pub mod backend;
pub mod content;
