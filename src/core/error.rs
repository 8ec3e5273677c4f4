// 抽取错误分类：稳定错误码、可直接展示的提示语与诊断上下文。
use crate::services::detector::FormatKind;
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionErrorKind {
    UnsupportedFormat,
    CorruptContainer,
    MalformedXml,
    EmptyContent,
    IoFailure(String),
    DecodeFailure(String),
}

impl ExtractionErrorKind {
    /// Stable variant name used in the `errorKind` field of the payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::CorruptContainer => "CorruptContainer",
            Self::MalformedXml => "MalformedXml",
            Self::EmptyContent => "EmptyContent",
            Self::IoFailure(_) => "IoFailure",
            Self::DecodeFailure(_) => "DecodeFailure",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::CorruptContainer => "CORRUPT_CONTAINER",
            Self::MalformedXml => "MALFORMED_XML",
            Self::EmptyContent => "EMPTY_CONTENT",
            Self::IoFailure(_) => "IO_FAILURE",
            Self::DecodeFailure(_) => "DECODE_FAILURE",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::IoFailure(reason) | Self::DecodeFailure(reason) => Some(reason.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionError {
    kind: ExtractionErrorKind,
    message: String,
    filename: Option<String>,
    format: Option<FormatKind>,
}

impl ExtractionError {
    pub fn new(kind: ExtractionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            filename: None,
            format: None,
        }
    }

    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::UnsupportedFormat, message)
    }

    pub fn corrupt_container(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::CorruptContainer, message)
    }

    pub fn malformed_xml(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::MalformedXml, message)
    }

    pub fn empty_content() -> Self {
        Self::new(
            ExtractionErrorKind::EmptyContent,
            "No readable text could be extracted from this file.",
        )
    }

    pub fn io_failure(reason: impl Into<String>) -> Self {
        Self::new(
            ExtractionErrorKind::IoFailure(reason.into()),
            "The file could not be read. Please try uploading it again.",
        )
    }

    pub fn decode_failure(reason: impl Into<String>) -> Self {
        Self::new(
            ExtractionErrorKind::DecodeFailure(reason.into()),
            "The file could not be decoded. It may be damaged or use an unsupported encoding.",
        )
    }

    /// Attaches the upload context; an already attached context is kept.
    pub fn with_context(mut self, filename: &str, format: FormatKind) -> Self {
        if self.filename.is_none() {
            self.filename = Some(filename.to_string());
        }
        if self.format.is_none() {
            self.format = Some(format);
        }
        self
    }

    pub fn kind(&self) -> &ExtractionErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn format(&self) -> Option<FormatKind> {
        self.format
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "errorKind": self.kind.as_str(),
            "message": self.message,
        })
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExtractionError {}
