// PowerPoint 抽取：逐页读取 ppt/slides/slideN.xml，按配置的顺序输出 "Slide k" 分段。
use crate::core::config::{ExtractorConfig, SlideOrder};
use crate::core::error::ExtractionError;
use crate::core::text_utils::{join_units, ExtractedUnit};
use crate::services::container::ContainerSession;
use crate::services::xml_text::{extract_with_policy, TextQuery};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, error};

const SLIDE_TEXT: TextQuery = TextQuery::new(&["a:t", "t"]);

pub fn extract(buffer: &[u8]) -> Result<String, ExtractionError> {
    extract_with(buffer, &ExtractorConfig::default())
}

pub fn extract_with(buffer: &[u8], config: &ExtractorConfig) -> Result<String, ExtractionError> {
    let units = extract_units(buffer, config)?;
    Ok(join_units(&units))
}

/// Non-empty slides in output order. An empty list is not an error here.
pub fn extract_units(
    buffer: &[u8],
    config: &ExtractorConfig,
) -> Result<Vec<ExtractedUnit>, ExtractionError> {
    let mut session = ContainerSession::open_with_limit(buffer, config.container.max_member_bytes)?;
    let slides = ordered_slides(&session, config.presentation.slide_order);
    debug!("presentation has {} slide parts", slides.len());

    let mut units = Vec::new();
    for (position, path) in slides.iter().enumerate() {
        let xml = session.read_member(path)?;
        let text = extract_with_policy(&xml, &SLIDE_TEXT, config.xml.on_malformed)?;
        let text = text.trim();
        if text.is_empty() {
            debug!("slide part {path} has no text");
            continue;
        }
        units.push(ExtractedUnit::new(format!("Slide {}", position + 1), text));
    }
    Ok(units)
}

fn ordered_slides(session: &ContainerSession<'_>, order: SlideOrder) -> Vec<String> {
    let mut slides = session
        .list_members()
        .filter_map(|name| slide_number(name).map(|number| (number, name.to_string())))
        .collect::<Vec<_>>();
    match order {
        // 按成员名字典序：slide10.xml 排在 slide2.xml 之前。
        SlideOrder::Lexicographic => slides.sort_by(|a, b| a.1.cmp(&b.1)),
        SlideOrder::Numeric => slides.sort(),
    }
    slides.into_iter().map(|(_, name)| name).collect()
}

fn slide_number(name: &str) -> Option<u64> {
    let captures = slide_path_regex()?.captures(name)?;
    captures.get(1)?.as_str().parse::<u64>().ok()
}

fn slide_path_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| match Regex::new(r"^ppt/slides/slide(\d+)\.xml$") {
            Ok(regex) => Some(regex),
            Err(err) => {
                error!("invalid slide path regex: {err}");
                None
            }
        })
        .as_ref()
}
