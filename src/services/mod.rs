pub mod container;
pub mod detector;
pub mod extraction;
pub mod pdf;
pub mod plain_text;
pub mod presentation;
pub mod word;
pub mod xml_text;
