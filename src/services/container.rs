// OOXML 容器读取：基于中央目录按需解压单个成员。
use crate::core::error::ExtractionError;
use std::io::{self, Cursor, Read};
use tracing::debug;
use zip::result::ZipError;
use zip::{CompressionMethod, ZipArchive};

pub const DEFAULT_MAX_MEMBER_BYTES: u64 = 64 * 1024 * 1024;

/// A named member and its decompressed content.
#[derive(Debug, Clone)]
pub struct ContainerMember {
    pub path: String,
    pub data: Vec<u8>,
}

/// An open ZIP package borrowing the caller's buffer. Members are inflated one
/// at a time on request, so peak memory stays at the buffer plus one member.
pub struct ContainerSession<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    max_member_bytes: u64,
}

impl<'a> ContainerSession<'a> {
    pub fn open(buffer: &'a [u8]) -> Result<Self, ExtractionError> {
        Self::open_with_limit(buffer, DEFAULT_MAX_MEMBER_BYTES)
    }

    pub fn open_with_limit(
        buffer: &'a [u8],
        max_member_bytes: u64,
    ) -> Result<Self, ExtractionError> {
        let archive = ZipArchive::new(Cursor::new(buffer)).map_err(|err| {
            debug!("zip central directory rejected: {err}");
            ExtractionError::corrupt_container(
                "The file is not a valid Office document. Please re-save it as .docx or .pptx and upload it again.",
            )
        })?;
        debug!("opened container with {} members", archive.len());
        Ok(Self {
            archive,
            max_member_bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    pub fn list_members(&self) -> impl Iterator<Item = &str> + '_ {
        self.archive.file_names()
    }

    pub fn has_member(&self, path: &str) -> bool {
        self.archive.file_names().any(|name| name == path)
    }

    pub fn read_member(&mut self, path: &str) -> Result<Vec<u8>, ExtractionError> {
        let limit = self.max_member_bytes;
        let mut entry = match self.archive.by_name(path) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(ExtractionError::corrupt_container(format!(
                    "The document is incomplete: the part \"{path}\" is missing."
                )))
            }
            Err(ZipError::UnsupportedArchive(reason)) => {
                return Err(ExtractionError::decode_failure(format!(
                    "{path}: unsupported archive feature: {reason}"
                )))
            }
            Err(ZipError::InvalidArchive(reason)) => {
                debug!("invalid local header for {path}: {reason}");
                return Err(ExtractionError::corrupt_container(
                    "The file is damaged and could not be opened.",
                ));
            }
            Err(err) => return Err(ExtractionError::io_failure(format!("{path}: {err}"))),
        };

        match entry.compression() {
            CompressionMethod::Stored | CompressionMethod::Deflated => {}
            other => {
                return Err(ExtractionError::decode_failure(format!(
                    "{path}: unsupported compression method {other:?}"
                )))
            }
        }
        if entry.size() > limit {
            return Err(ExtractionError::decode_failure(format!(
                "{path}: declared size {} exceeds limit {limit}",
                entry.size()
            )));
        }

        let mut data = Vec::with_capacity(entry.size() as usize);
        (&mut entry)
            .take(limit.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|err| member_read_error(path, err))?;
        if data.len() as u64 > limit {
            return Err(ExtractionError::decode_failure(format!(
                "{path}: inflated size exceeds limit {limit}"
            )));
        }
        debug!("read container member {path} ({} bytes)", data.len());
        Ok(data)
    }

    pub fn read(&mut self, path: &str) -> Result<ContainerMember, ExtractionError> {
        let data = self.read_member(path)?;
        Ok(ContainerMember {
            path: path.to_string(),
            data,
        })
    }
}

// 缓冲区在内存中，解压阶段的错误（坏的 deflate 流、CRC 不符）都意味着成员数据损坏。
fn member_read_error(path: &str, err: io::Error) -> ExtractionError {
    match err.kind() {
        io::ErrorKind::InvalidData
        | io::ErrorKind::InvalidInput
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::Other => {
            debug!("container member {path} is damaged: {err}");
            ExtractionError::corrupt_container("The file is damaged and could not be opened.")
        }
        _ => ExtractionError::io_failure(format!("{path}: {err}")),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    pub(crate) fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        build_zip_with_method(entries, CompressionMethod::Deflated)
    }

    pub(crate) fn build_zip_with_method(
        entries: &[(&str, &str)],
        method: CompressionMethod,
    ) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(method);
        for (name, body) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{build_zip, build_zip_with_method};
    use super::*;
    use crate::core::error::ExtractionErrorKind;

    #[test]
    fn reads_stored_and_deflated_members() {
        for method in [CompressionMethod::Stored, CompressionMethod::Deflated] {
            let data = build_zip_with_method(&[("word/document.xml", "<w:document/>")], method);
            let mut session = ContainerSession::open(&data).unwrap();
            assert_eq!(session.len(), 1);
            let member = session.read("word/document.xml").unwrap();
            assert_eq!(member.data, b"<w:document/>");
        }
    }

    #[test]
    fn lists_members_without_inflating() {
        let data = build_zip(&[("a.xml", "a"), ("ppt/slides/slide1.xml", "b")]);
        let session = ContainerSession::open(&data).unwrap();
        let names = session.list_members().collect::<Vec<_>>();
        assert_eq!(names.len(), 2);
        assert!(session.has_member("ppt/slides/slide1.xml"));
        assert!(!session.has_member("ppt/slides/slide2.xml"));
    }

    #[test]
    fn missing_member_is_corrupt_container() {
        let data = build_zip(&[("a.xml", "a")]);
        let mut session = ContainerSession::open(&data).unwrap();
        let err = session.read_member("word/document.xml").unwrap_err();
        assert_eq!(err.kind(), &ExtractionErrorKind::CorruptContainer);
    }

    #[test]
    fn truncated_archive_is_rejected() {
        let data = build_zip(&[("word/document.xml", "<w:document/>")]);
        let truncated = &data[..data.len() / 2];
        let err = ContainerSession::open(truncated).err().unwrap();
        assert_eq!(err.kind(), &ExtractionErrorKind::CorruptContainer);

        let err = ContainerSession::open(b"not a zip at all").err().unwrap();
        assert_eq!(err.kind(), &ExtractionErrorKind::CorruptContainer);
    }

    #[test]
    fn damaged_member_data_is_corrupt_container() {
        let body = (0..400)
            .map(|index| format!("<w:t>run {index} of {}</w:t>", index * 7919 % 1013))
            .collect::<String>();
        let mut data = build_zip(&[("word/document.xml", body.as_str())]);
        let (start, len) = {
            let mut archive = ZipArchive::new(Cursor::new(data.as_slice())).unwrap();
            let entry = archive.by_name("word/document.xml").unwrap();
            (entry.data_start() as usize, entry.compressed_size() as usize)
        };
        assert!(len > 60);
        for byte in &mut data[start + len / 3..start + len / 3 + 20] {
            *byte ^= 0xFF;
        }

        let mut session = ContainerSession::open(&data).unwrap();
        let err = session.read_member("word/document.xml").unwrap_err();
        assert_eq!(err.kind(), &ExtractionErrorKind::CorruptContainer);
    }

    #[test]
    fn checksum_mismatch_is_corrupt_container() {
        let mut data = build_zip_with_method(
            &[("word/document.xml", "<w:document>stored body</w:document>")],
            CompressionMethod::Stored,
        );
        let start = {
            let mut archive = ZipArchive::new(Cursor::new(data.as_slice())).unwrap();
            let entry = archive.by_name("word/document.xml").unwrap();
            entry.data_start() as usize
        };
        data[start + 13] ^= 0x20;

        let mut session = ContainerSession::open(&data).unwrap();
        let err = session.read_member("word/document.xml").unwrap_err();
        assert_eq!(err.kind(), &ExtractionErrorKind::CorruptContainer);
    }

    #[test]
    fn other_compression_methods_are_decode_failures() {
        let data =
            build_zip_with_method(&[("word/document.xml", "<w:document/>")], CompressionMethod::Bzip2);
        let mut session = ContainerSession::open(&data).unwrap();
        let err = session.read_member("word/document.xml").unwrap_err();
        assert!(matches!(err.kind(), ExtractionErrorKind::DecodeFailure(_)));
    }

    #[test]
    fn oversized_member_is_refused() {
        let body = "x".repeat(4096);
        let data = build_zip(&[("big.xml", body.as_str())]);
        let mut session = ContainerSession::open_with_limit(&data, 1024).unwrap();
        let err = session.read_member("big.xml").unwrap_err();
        assert!(matches!(err.kind(), ExtractionErrorKind::DecodeFailure(_)));
    }
}
