// 文本规范化与分段拼接工具。

/// One labeled chunk of recovered text, e.g. a slide or a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedUnit {
    pub label: String,
    pub text: String,
}

impl ExtractedUnit {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    fn render(&self) -> String {
        format!("{}:\n{}", self.label, self.text)
    }
}

pub fn join_units(units: &[ExtractedUnit]) -> String {
    units
        .iter()
        .map(ExtractedUnit::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Collapses every whitespace run (line breaks included) into one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapses horizontal whitespace while keeping single line breaks.
pub fn normalize_text(text: &str) -> String {
    let mut output = String::new();
    let mut last_space = false;
    for ch in text.chars() {
        if ch == '\r' {
            continue;
        }
        if ch == '\n' {
            while output.ends_with(' ') {
                output.pop();
            }
            if !output.ends_with('\n') {
                output.push('\n');
            }
            last_space = false;
            continue;
        }
        if ch.is_whitespace() {
            if !last_space && !output.is_empty() && !output.ends_with('\n') {
                output.push(' ');
                last_space = true;
            }
            continue;
        }
        output.push(ch);
        last_space = false;
    }
    output.trim().to_string()
}

pub fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Decodes the predefined XML entities and numeric character references.
pub fn unescape_xml(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        output.push_str(&rest[..start]);
        rest = &rest[start..];
        let Some(end) = rest.find(';').filter(|end| *end <= 12) else {
            output.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_char_reference(entity),
        };
        match decoded {
            Some(ch) => {
                output.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                output.push('&');
                rest = &rest[1..];
            }
        }
    }
    output.push_str(rest);
    output
}

fn decode_char_reference(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(&['x', 'X'][..]) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}
