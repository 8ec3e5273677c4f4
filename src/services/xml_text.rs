// XML 文本抽取：优先结构化解析，失败时退回正则扫描，统一输出 String。
use crate::core::config::MalformedXmlPolicy;
use crate::core::error::ExtractionError;
use crate::core::text_utils::{normalize_text, unescape_xml};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use regex::Regex;
use tracing::{debug, error, warn};

/// What to collect from an XML part.
///
/// `tags` is ordered: a qualified entry (`a:t`) matches the exact element name,
/// a bare entry (`t`) matches any element with that local name. Each element is
/// captured by the first entry it matches and never twice.
#[derive(Debug, Clone, Copy)]
pub struct TextQuery {
    pub tags: &'static [&'static str],
    pub paragraph: Option<&'static str>,
    pub run_separator: &'static str,
    pub inline_breaks: bool,
}

impl TextQuery {
    pub const fn new(tags: &'static [&'static str]) -> Self {
        Self {
            tags,
            paragraph: None,
            run_separator: " ",
            inline_breaks: false,
        }
    }

    pub const fn with_paragraph(mut self, local_name: &'static str) -> Self {
        self.paragraph = Some(local_name);
        self
    }

    pub const fn with_run_separator(mut self, separator: &'static str) -> Self {
        self.run_separator = separator;
        self
    }

    pub const fn with_inline_breaks(mut self) -> Self {
        self.inline_breaks = true;
        self
    }

    fn match_target(&self, element: &BytesStart) -> bool {
        let name = element.name();
        let local = element.local_name();
        self.tags.iter().any(|tag| {
            if tag.contains(':') {
                name.as_ref() == tag.as_bytes()
            } else {
                local.as_ref() == tag.as_bytes()
            }
        })
    }

    fn is_paragraph(&self, local: &[u8]) -> bool {
        self.paragraph
            .map(|name| name.as_bytes() == local)
            .unwrap_or(false)
    }
}

pub fn extract_text(xml: &[u8], query: &TextQuery) -> String {
    match try_extract_structural(xml, query) {
        Ok(text) => text,
        Err(err) => {
            warn!("structural xml parse failed, scanning for text runs: {err}");
            scan_text(xml, query)
        }
    }
}

pub fn extract_with_policy(
    xml: &[u8],
    query: &TextQuery,
    policy: MalformedXmlPolicy,
) -> Result<String, ExtractionError> {
    match policy {
        MalformedXmlPolicy::Fallback => Ok(extract_text(xml, query)),
        MalformedXmlPolicy::Fail => try_extract_structural(xml, query),
    }
}

enum Piece {
    Text(String),
    Break(char),
}

#[derive(Default)]
struct Collector {
    paragraphs: Vec<String>,
    pieces: Vec<Piece>,
}

impl Collector {
    fn flush(&mut self, separator: &str) {
        let mut rendered = String::new();
        let mut after_text = false;
        for piece in self.pieces.drain(..) {
            match piece {
                Piece::Text(text) => {
                    if after_text {
                        rendered.push_str(separator);
                    }
                    rendered.push_str(&text);
                    after_text = true;
                }
                Piece::Break(ch) => {
                    rendered.push(ch);
                    after_text = false;
                }
            }
        }
        let text = normalize_text(&rendered);
        if !text.is_empty() {
            self.paragraphs.push(text);
        }
    }

    fn finish(mut self, separator: &str) -> String {
        self.flush(separator);
        self.paragraphs.join("\n")
    }
}

fn is_fallback(local: &[u8]) -> bool {
    local == b"Fallback"
}

fn inline_break(local: &[u8], parent: Option<&[u8]>) -> Option<char> {
    if parent != Some(b"r".as_slice()) {
        return None;
    }
    match local {
        b"br" | b"cr" => Some('\n'),
        b"tab" => Some('\t'),
        _ => None,
    }
}

/// Strict event-stream pass. Any syntax error, mismatched or unclosed element
/// is reported as `MalformedXml`.
pub fn try_extract_structural(xml: &[u8], query: &TextQuery) -> Result<String, ExtractionError> {
    let mut reader = XmlReader::from_reader(xml);
    reader.trim_text(false);
    reader.check_end_names(true);
    let mut buf = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut capture_depth: Option<usize> = None;
    // mc:Fallback 与 mc:Choice 内容重复，整棵子树跳过。
    let mut skip_depth: Option<usize> = None;
    let mut current = String::new();
    let mut collector = Collector::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let local = e.local_name().as_ref().to_vec();
                if skip_depth.is_none() && capture_depth.is_none() {
                    if is_fallback(&local) {
                        skip_depth = Some(stack.len() + 1);
                    } else if query.match_target(e) {
                        capture_depth = Some(stack.len() + 1);
                        current.clear();
                    } else if query.is_paragraph(&local) {
                        collector.flush(query.run_separator);
                    }
                }
                stack.push(local);
            }
            Ok(Event::Empty(ref e)) => {
                if skip_depth.is_none() && capture_depth.is_none() && query.inline_breaks {
                    let parent = stack.last().map(|name| name.as_slice());
                    if let Some(ch) = inline_break(e.local_name().as_ref(), parent) {
                        collector.pieces.push(Piece::Break(ch));
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if capture_depth.is_some() {
                    match e.unescape() {
                        Ok(text) => current.push_str(text.as_ref()),
                        Err(_) => current.push_str(&unescape_xml(&String::from_utf8_lossy(&e))),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if capture_depth.is_some() {
                    current.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(ref e)) => {
                if stack.pop().is_none() {
                    return Err(malformed("closing tag without opening tag"));
                }
                if skip_depth.is_some() {
                    if skip_depth == Some(stack.len() + 1) {
                        skip_depth = None;
                    }
                } else if capture_depth == Some(stack.len() + 1) {
                    capture_depth = None;
                    collector.pieces.push(Piece::Text(std::mem::take(&mut current)));
                } else if capture_depth.is_none() && query.is_paragraph(e.local_name().as_ref()) {
                    collector.flush(query.run_separator);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(malformed(&err.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(malformed("unexpected end of document"));
    }
    Ok(collector.finish(query.run_separator))
}

fn malformed(reason: &str) -> ExtractionError {
    debug!("malformed xml: {reason}");
    ExtractionError::malformed_xml("The document contains malformed XML and could not be read.")
}

/// Pattern-matching pass over possibly broken markup. Never fails; returns an
/// empty string when nothing matches.
pub fn scan_text(xml: &[u8], query: &TextQuery) -> String {
    let raw = String::from_utf8_lossy(xml);
    let Some(runs) = compile_regex(&run_pattern(query.tags), "text_runs") else {
        return String::new();
    };
    let Some(tags) = compile_regex(r"<[^>]*>", "embedded_tags") else {
        return String::new();
    };
    let Some(fallbacks) = compile_regex(
        r"(?s)<(?:[A-Za-z0-9_.-]+:)?Fallback(?:\s[^>]*)?>.*?</(?:[A-Za-z0-9_.-]+:)?Fallback>",
        "fallback_blocks",
    ) else {
        return String::new();
    };
    let source = fallbacks.replace_all(&raw, "");
    let segments: Vec<&str> = match query.paragraph {
        Some(paragraph) => match compile_regex(
            &format!(r"</(?:[A-Za-z0-9_.-]+:)?{}>", regex::escape(paragraph)),
            "paragraph_end",
        ) {
            Some(splitter) => splitter.split(&source).collect(),
            None => vec![source.as_ref()],
        },
        None => vec![source.as_ref()],
    };

    let mut collector = Collector::default();
    for segment in segments {
        for captures in runs.captures_iter(segment) {
            // 每个分支占两个分组：属性与正文。
            let Some(body) = (0..query.tags.len())
                .find_map(|index| captures.get(index * 2 + 2))
                .map(|body| body.as_str())
            else {
                continue;
            };
            let text = unescape_xml(&tags.replace_all(body, ""));
            collector.pieces.push(Piece::Text(text));
        }
        collector.flush(query.run_separator);
    }
    collector.finish(query.run_separator)
}

fn run_pattern(tags: &[&str]) -> String {
    // 每个目标标签一个分支；同一位置先匹配靠前的标签，元素不会重复命中。
    let alternatives = tags
        .iter()
        .map(|tag| {
            let (open, close) = if tag.contains(':') {
                let escaped = regex::escape(tag);
                (escaped.clone(), escaped)
            } else {
                let qualified = format!("(?:[A-Za-z0-9_.-]+:)?{}", regex::escape(tag));
                (qualified.clone(), qualified)
            };
            // 属性不能以 / 结尾，自闭合标签不会吞掉后面的文本。
            format!("<{open}(\\s[^>]*[^/>]|\\s)?>(.*?)</{close}>")
        })
        .collect::<Vec<_>>()
        .join("|");
    format!("(?s){alternatives}")
}

fn compile_regex(pattern: &str, label: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            error!("invalid xml scan regex {label}: {err}");
            None
        }
    }
}
