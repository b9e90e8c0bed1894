pub mod common;
pub mod log;
pub mod security;
