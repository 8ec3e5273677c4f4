use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// doctext CLI（文档文本抽取）
///
/// Extracts plain text from Word, PowerPoint, PDF and text files.
/// 从 Word、PowerPoint、PDF 与文本文件中抽取纯文本。
#[derive(Debug, Parser)]
#[command(author, version, bin_name = "doctext-cli")]
pub struct Cli {
    /// Files to extract / 待抽取的文件。
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,

    /// Config path / 配置文件路径（默认读取 DOCTEXT_CONFIG_PATH 或 config/doctext.yaml）。
    #[arg(long = "config")]
    pub config_path: Option<PathBuf>,

    /// Filename hint override for a single input / 单个输入时覆盖用于判定格式的文件名。
    #[arg(long = "name")]
    pub name: Option<String>,

    /// Output format / 输出格式。
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Log level override (e.g. debug) / 日志级别覆盖。
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain extracted text / 纯文本。
    Text,
    /// One JSON payload per line / 每行一个 JSON 结果。
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_json_output_with_name_override() {
        let cli = Cli::try_parse_from([
            "doctext-cli",
            "--output",
            "json",
            "--name",
            "lecture-transcript.txt",
            "upload.bin",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.name.as_deref(), Some("lecture-transcript.txt"));
        assert_eq!(cli.files, vec![PathBuf::from("upload.bin")]);
    }

    #[test]
    fn requires_at_least_one_file() {
        assert!(Cli::try_parse_from(["doctext-cli"]).is_err());
    }
}
