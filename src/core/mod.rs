pub mod config;
pub mod error;
pub mod text_utils;
