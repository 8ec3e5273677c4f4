// PDF 抽取：lopdf 解析交叉引用与页树，逐页解码内容流；单页失败时改用 pdf-extract 重试。
use crate::core::error::ExtractionError;
use crate::core::text_utils::{collapse_whitespace, join_units, ExtractedUnit};
use lopdf::Document;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

pub fn extract(buffer: &[u8]) -> Result<String, ExtractionError> {
    let units = extract_units(buffer)?;
    Ok(join_units(&units))
}

/// Pages with text, labeled by their 1-based page number.
pub fn extract_units(buffer: &[u8]) -> Result<Vec<ExtractedUnit>, ExtractionError> {
    let document = guarded("pdf parse", || {
        Document::load_mem(buffer).map_err(|err| err.to_string())
    })?;
    let pages = document.get_pages();
    debug!("pdf page tree lists {} pages", pages.len());

    let mut secondary = SecondaryEngine::new(buffer);
    let mut units = Vec::new();
    for (position, page_number) in pages.keys().copied().enumerate() {
        let raw = match guarded("pdf page text", || {
            document
                .extract_text(&[page_number])
                .map_err(|err| err.to_string())
        }) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "pdf page {page_number} unreadable by structural walker, retrying: {:?}",
                    err.kind().reason()
                );
                secondary.page_text(position)?
            }
        };
        let text = collapse_whitespace(&raw);
        if text.is_empty() {
            debug!("pdf page {page_number} has no text");
            continue;
        }
        units.push(ExtractedUnit::new(format!("Page {page_number}"), text));
    }
    Ok(units)
}

/// Font-aware extraction of the whole document, run at most once and only
/// when a page defeats the structural walker.
struct SecondaryEngine<'a> {
    buffer: &'a [u8],
    pages: Option<Vec<String>>,
}

impl<'a> SecondaryEngine<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            pages: None,
        }
    }

    fn page_text(&mut self, position: usize) -> Result<String, ExtractionError> {
        if self.pages.is_none() {
            let buffer = self.buffer;
            let pages = guarded("pdf-extract", || {
                pdf_extract::extract_text_from_mem_by_pages(buffer).map_err(|err| err.to_string())
            })?;
            self.pages = Some(pages);
        }
        Ok(self
            .pages
            .as_ref()
            .and_then(|pages| pages.get(position))
            .cloned()
            .unwrap_or_default())
    }
}

/// Runs one parser step, turning both errors and panics into `DecodeFailure`.
fn guarded<T, F>(stage: &str, step: F) -> Result<T, ExtractionError>
where
    F: FnOnce() -> Result<T, String>,
{
    match panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(reason)) => Err(ExtractionError::decode_failure(format!("{stage}: {reason}"))),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|text| text.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ExtractionError::decode_failure(format!(
                "{stage} panicked: {reason}"
            )))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::{dictionary, Document, Object, Stream};

    /// Builds a PDF with one page per entry; `None` gives a page without text.
    pub(crate) fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut page_ids = Vec::new();
        for text in pages {
            let content = match text {
                Some(text) => format!(
                    "BT /F1 12 Tf 100 700 Td ({}) Tj ET",
                    text.replace('\\', "\\\\")
                        .replace('(', "\\(")
                        .replace(')', "\\)")
                ),
                None => "0 0 m 100 100 l S".to_string(),
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            page_ids.push(page_id);
        }

        let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(pages.len() as i64),
        });
        for page_id in &page_ids {
            if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(*page_id) {
                dict.set("Parent", pages_id);
            }
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}
