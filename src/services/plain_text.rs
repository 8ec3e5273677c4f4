// 纯文本与字幕文件：UTF-8 解码（识别 BOM），非法字节按配置替换、报错或按 Latin-1 重解码。
use crate::core::config::InvalidUtf8Policy;
use crate::core::error::ExtractionError;
use crate::core::text_utils::normalize_line_endings;
use encoding_rs::{UTF_8, WINDOWS_1252};
use tracing::{debug, warn};

pub fn extract(buffer: &[u8]) -> Result<String, ExtractionError> {
    extract_with(buffer, InvalidUtf8Policy::Replace)
}

pub fn extract_with(buffer: &[u8], policy: InvalidUtf8Policy) -> Result<String, ExtractionError> {
    let (decoded, encoding, had_errors) = UTF_8.decode(buffer);
    if encoding != UTF_8 {
        debug!("byte order mark selects {}", encoding.name());
    }
    if !had_errors {
        return Ok(normalize_line_endings(&decoded));
    }
    match policy {
        InvalidUtf8Policy::Replace => {
            warn!("invalid utf-8 sequences replaced with U+FFFD");
            Ok(normalize_line_endings(&decoded))
        }
        InvalidUtf8Policy::Fail => Err(ExtractionError::decode_failure(
            "text is not valid utf-8",
        )),
        InvalidUtf8Policy::Latin1 => {
            warn!("invalid utf-8, decoding as windows-1252");
            let (decoded, _, _) = WINDOWS_1252.decode(buffer);
            Ok(normalize_line_endings(&decoded))
        }
    }
}
