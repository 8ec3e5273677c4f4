// 抽取编排：识别格式、分派到对应抽取器、统一错误上下文并校验非空结果。
use crate::core::config::ExtractorConfig;
use crate::core::error::ExtractionError;
use crate::core::text_utils::join_units;
use crate::services::detector::{
    detect, detect_with_extension, is_cloud_shortcut, Detection, FormatKind,
};
use crate::services::{pdf, plain_text, presentation, word};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One uploaded file. Moved into the pipeline once and never shared.
#[derive(Debug, Clone)]
pub struct DocumentBuffer {
    bytes: Vec<u8>,
    filename: String,
}

impl DocumentBuffer {
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    /// Reads a file from disk, using its file name as the format hint.
    pub fn read_path(path: &Path) -> Result<Self, ExtractionError> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let bytes = std::fs::read(path)
            .map_err(|err| ExtractionError::io_failure(format!("{}: {err}", path.display())))?;
        Ok(Self::new(bytes, filename))
    }

    /// Replaces the format hint, e.g. when the upload layer knows the original name.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub full_text: String,
    pub format: FormatKind,
    /// Number of labeled slides or pages; `0` for prose formats.
    pub unit_count: usize,
}

impl ExtractionResult {
    pub fn to_payload(&self) -> Value {
        json!({ "text": self.full_text })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: Arc<ExtractorConfig>,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn extract(&self, document: DocumentBuffer) -> Result<ExtractionResult, ExtractionError> {
        let DocumentBuffer { bytes, filename } = document;
        let detection = detect_with_extension(&filename);
        debug!(
            "extracting {filename} ({} bytes) as {}",
            bytes.len(),
            detection.kind
        );

        let outcome = self
            .dispatch(&bytes, &detection)
            .and_then(|(full_text, unit_count)| {
                if full_text.trim().is_empty() {
                    Err(ExtractionError::empty_content())
                } else {
                    Ok(ExtractionResult {
                        full_text,
                        format: detection.kind,
                        unit_count,
                    })
                }
            });

        match outcome {
            Ok(result) => {
                info!(
                    "extracted {} chars from {filename} ({}, {} units)",
                    result.full_text.chars().count(),
                    result.format,
                    result.unit_count
                );
                Ok(result)
            }
            Err(err) => {
                let err = err.with_context(&filename, detection.kind);
                warn!(
                    "extraction failed for {filename} ({}): {} {:?}",
                    detection.kind,
                    err.kind().code(),
                    err.kind().reason()
                );
                Err(err)
            }
        }
    }

    fn dispatch(
        &self,
        bytes: &[u8],
        detection: &Detection,
    ) -> Result<(String, usize), ExtractionError> {
        match detection.kind {
            FormatKind::Word => Ok((word::extract_with(bytes, &self.config)?, 0)),
            FormatKind::Presentation => {
                let units = presentation::extract_units(bytes, &self.config)?;
                Ok((join_units(&units), units.len()))
            }
            FormatKind::Pdf => {
                let units = pdf::extract_units(bytes)?;
                Ok((join_units(&units), units.len()))
            }
            FormatKind::PlainText => Ok((
                plain_text::extract_with(bytes, self.config.plain_text.on_invalid_utf8)?,
                0,
            )),
            FormatKind::Unsupported => Err(ExtractionError::unsupported_format(
                unsupported_message(&detection.extension),
            )),
        }
    }

    /// Runs the extraction on the blocking pool under the configured timeout.
    /// A timeout or a failed worker is reported as `IoFailure`.
    pub async fn extract_async(
        &self,
        document: DocumentBuffer,
    ) -> Result<ExtractionResult, ExtractionError> {
        let filename = document.filename.clone();
        let timeout_s = self.config.extraction.timeout_s;
        let timeout = (timeout_s > 0).then(|| Duration::from_secs(timeout_s));
        let extractor = self.clone();
        run_blocking(&filename, timeout, move || extractor.extract(document)).await
    }
}

async fn run_blocking<F>(
    filename: &str,
    timeout: Option<Duration>,
    job: F,
) -> Result<ExtractionResult, ExtractionError>
where
    F: FnOnce() -> Result<ExtractionResult, ExtractionError> + Send + 'static,
{
    let format = detect(filename);
    let task = tokio::task::spawn_blocking(job);
    let joined = match timeout {
        None => task.await,
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!("extraction of {filename} timed out after {limit:?}");
                return Err(
                    ExtractionError::io_failure(format!("timed out after {limit:?}"))
                        .with_context(filename, format),
                );
            }
        },
    };
    joined.map_err(|err| {
        ExtractionError::io_failure(format!("extraction task failed: {err}"))
            .with_context(filename, format)
    })?
}

pub fn extract(document: DocumentBuffer) -> Result<ExtractionResult, ExtractionError> {
    Extractor::default().extract(document)
}

fn unsupported_message(extension: &str) -> String {
    if is_cloud_shortcut(extension) {
        return "Google Docs shortcut files (.gdoc) do not contain the document itself. \
                Open it in Google Docs, download it as .docx or .pdf, and upload that file instead."
            .to_string();
    }
    format!(
        "Files of type .{extension} are not supported. Please upload a .docx, .pptx, .pdf or .txt file."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ExtractionErrorKind;

    #[test]
    fn gdoc_fails_without_reading_bytes() {
        let document = DocumentBuffer::new(
            b"{\"url\": \"https://docs.google.com/\"}".to_vec(),
            "Plan.gdoc",
        );
        let err = extract(document).unwrap_err();
        assert_eq!(err.kind(), &ExtractionErrorKind::UnsupportedFormat);
        assert!(err.message().contains(".docx"));
        assert!(err.message().contains(".pdf"));
        assert_eq!(err.filename(), Some("Plan.gdoc"));
        assert_eq!(err.format(), Some(FormatKind::Unsupported));
    }

    #[test]
    fn whitespace_only_text_is_empty_content() {
        let err = extract(DocumentBuffer::new(b" \n\t \r\n".to_vec(), "notes.txt")).unwrap_err();
        assert_eq!(err.kind(), &ExtractionErrorKind::EmptyContent);
        assert_eq!(err.format(), Some(FormatKind::PlainText));
    }

    #[test]
    fn plain_text_is_returned_verbatim() {
        let result =
            extract(DocumentBuffer::new(b"First line\r\nSecond".to_vec(), "README")).unwrap();
        assert_eq!(result.full_text, "First line\nSecond");
        assert_eq!(result.format, FormatKind::PlainText);
        assert_eq!(result.unit_count, 0);
        assert_eq!(result.to_payload(), json!({ "text": "First line\nSecond" }));
    }

    #[test]
    fn errors_carry_upload_context() {
        let err = extract(DocumentBuffer::new(b"garbage".to_vec(), "Deck.PPTX")).unwrap_err();
        assert_eq!(err.kind(), &ExtractionErrorKind::CorruptContainer);
        assert_eq!(err.filename(), Some("Deck.PPTX"));
        assert_eq!(err.format(), Some(FormatKind::Presentation));
    }

    #[tokio::test]
    async fn slow_extraction_times_out_as_io_failure() {
        let err = run_blocking("slow.pdf", Some(Duration::from_millis(20)), || {
            std::thread::sleep(Duration::from_millis(500));
            Err(ExtractionError::empty_content())
        })
        .await
        .unwrap_err();
        assert!(matches!(err.kind(), ExtractionErrorKind::IoFailure(_)));
        assert_eq!(err.filename(), Some("slow.pdf"));
        assert_eq!(err.format(), Some(FormatKind::Pdf));
    }

    #[tokio::test]
    async fn panicking_worker_is_io_failure() {
        let err = run_blocking("boom.txt", None, || panic!("worker died"))
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ExtractionErrorKind::IoFailure(_)));
        assert_eq!(err.format(), Some(FormatKind::PlainText));
    }

    #[tokio::test]
    async fn async_extraction_matches_blocking() {
        let extractor = Extractor::default();
        let document = DocumentBuffer::new(b"hello async".to_vec(), "a.txt");
        let blocking = extractor.extract(document.clone()).unwrap();
        let result = extractor.extract_async(document).await.unwrap();
        assert_eq!(result, blocking);
    }
}
