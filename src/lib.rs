// Library entrypoint: format-detecting text extraction for uploaded documents.
mod core;
mod services;

pub use self::core::{config, error, text_utils};
pub use self::services::{
    container, detector, extraction, pdf, plain_text, presentation, word, xml_text,
};

pub use self::core::config::{load_config, load_config_from, ExtractorConfig};
pub use self::core::error::{ExtractionError, ExtractionErrorKind};
pub use self::core::text_utils::ExtractedUnit;
pub use self::services::detector::{detect, FormatKind};
pub use self::services::extraction::{extract, DocumentBuffer, ExtractionResult, Extractor};
