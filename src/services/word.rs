// Word 文档抽取：仅解析 OOXML 包内的 word/document.xml，二进制 .doc 不在支持范围。
use crate::core::config::ExtractorConfig;
use crate::core::error::ExtractionError;
use crate::services::container::ContainerSession;
use crate::services::xml_text::{extract_with_policy, TextQuery};
use tracing::debug;

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_TEXT: TextQuery = TextQuery::new(&["w:t", "t"])
    .with_paragraph("p")
    .with_run_separator("")
    .with_inline_breaks();

pub fn extract(buffer: &[u8]) -> Result<String, ExtractionError> {
    extract_with(buffer, &ExtractorConfig::default())
}

pub fn extract_with(buffer: &[u8], config: &ExtractorConfig) -> Result<String, ExtractionError> {
    let mut session = ContainerSession::open_with_limit(buffer, config.container.max_member_bytes)?;
    if !session.has_member(DOCUMENT_PART) {
        return Err(ExtractionError::corrupt_container(
            "This Word file has no document body. Legacy .doc files must be re-saved as .docx.",
        ));
    }
    let xml = session.read_member(DOCUMENT_PART)?;
    let text = extract_with_policy(&xml, &DOCUMENT_TEXT, config.xml.on_malformed)?;
    debug!(
        "word document body: {} bytes xml, {} chars text",
        xml.len(),
        text.chars().count()
    );
    Ok(text)
}
