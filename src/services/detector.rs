// 按文件名判定文档类型：只看扩展名，不嗅探内容。

const WORD_EXTENSIONS: &[&str] = &["doc", "docx"];
const PRESENTATION_EXTENSIONS: &[&str] = &["pptx"];
const PDF_EXTENSIONS: &[&str] = &["pdf"];
const PLAIN_TEXT_EXTENSIONS: &[&str] = &["srt", "text", "txt", "vtt"];
const CLOUD_SHORTCUT_EXTENSION: &str = "gdoc";
const TRANSCRIPT_MARKER: &str = "transcript";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Word,
    Presentation,
    Pdf,
    PlainText,
    Unsupported,
}

impl FormatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Presentation => "presentation",
            Self::Pdf => "pdf",
            Self::PlainText => "plain_text",
            Self::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub kind: FormatKind,
    /// Lower-cased text after the last `.`, empty when the name has none.
    pub extension: String,
}

pub fn detect(filename: &str) -> FormatKind {
    detect_with_extension(filename).kind
}

pub fn detect_with_extension(filename: &str) -> Detection {
    let extension = extension_of(filename);
    let kind = if filename.to_lowercase().contains(TRANSCRIPT_MARKER) {
        FormatKind::PlainText
    } else {
        kind_for_extension(&extension)
    };
    Detection { kind, extension }
}

pub fn supported_extensions() -> Vec<String> {
    let mut exts = WORD_EXTENSIONS
        .iter()
        .chain(PRESENTATION_EXTENSIONS)
        .chain(PDF_EXTENSIONS)
        .chain(PLAIN_TEXT_EXTENSIONS)
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>();
    exts.sort();
    exts
}

pub(crate) fn is_cloud_shortcut(extension: &str) -> bool {
    extension == CLOUD_SHORTCUT_EXTENSION
}

fn kind_for_extension(extension: &str) -> FormatKind {
    if WORD_EXTENSIONS.contains(&extension) {
        FormatKind::Word
    } else if PRESENTATION_EXTENSIONS.contains(&extension) {
        FormatKind::Presentation
    } else if PDF_EXTENSIONS.contains(&extension) {
        FormatKind::Pdf
    } else if is_cloud_shortcut(extension) {
        FormatKind::Unsupported
    } else {
        FormatKind::PlainText
    }
}

fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.trim().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_table_is_case_insensitive() {
        assert_eq!(detect("Report.DOCX"), FormatKind::Word);
        assert_eq!(detect("legacy.doc"), FormatKind::Word);
        assert_eq!(detect("deck.PptX"), FormatKind::Presentation);
        assert_eq!(detect("paper.pdf"), FormatKind::Pdf);
        for name in ["a.txt", "a.TEXT", "a.srt", "a.vtt"] {
            assert_eq!(detect(name), FormatKind::PlainText, "{name}");
        }
    }

    #[test]
    fn transcript_in_name_forces_plain_text() {
        assert_eq!(detect("Meeting-Transcript.docx"), FormatKind::PlainText);
        assert_eq!(detect("transcript.pdf"), FormatKind::PlainText);
        assert_eq!(detect("TRANSCRIPT.gdoc"), FormatKind::PlainText);
    }

    #[test]
    fn gdoc_is_unsupported() {
        let detection = detect_with_extension("Notes.GDOC");
        assert_eq!(detection.kind, FormatKind::Unsupported);
        assert_eq!(detection.extension, "gdoc");
    }

    #[test]
    fn unknown_or_missing_extension_falls_back_to_plain_text() {
        assert_eq!(detect("README"), FormatKind::PlainText);
        assert_eq!(detect("data.xlsx"), FormatKind::PlainText);
        assert_eq!(detect("trailing."), FormatKind::PlainText);
        assert_eq!(detect_with_extension("README").extension, "");
    }

    #[test]
    fn only_last_extension_counts() {
        assert_eq!(detect("slides.pdf.pptx"), FormatKind::Presentation);
        assert_eq!(detect("archive.docx.txt"), FormatKind::PlainText);
    }

    #[test]
    fn supported_extensions_are_sorted() {
        let exts = supported_extensions();
        let mut sorted = exts.clone();
        sorted.sort();
        assert_eq!(exts, sorted);
        assert!(exts.contains(&".pptx".to_string()));
        assert!(!exts.contains(&".gdoc".to_string()));
    }
}
