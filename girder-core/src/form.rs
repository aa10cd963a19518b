//! Uploaded files and multipart form parsing

use crate::logging::debug;
use crate::params::ParameterSpace;
use crate::Error;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::io;
use std::path::{Path, PathBuf};

/// A file received in a `multipart/form-data` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    /// Form field the file was sent under
    pub field_name: String,
    /// Client-side file name
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            size: content.len(),
            content,
        }
    }

    /// Content decoded as UTF-8, invalid sequences replaced
    pub fn content_as_string(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Extension including the dot; `.dat` when the name has none.
    pub fn extension(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(dot) => &self.file_name[dot..],
            None => ".dat",
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == "application/pdf"
    }

    pub fn is_text(&self) -> bool {
        self.content_type.starts_with("text/")
            || self.content_type.contains("javascript")
            || self.content_type.contains("json")
            || self.content_type.contains("xml")
    }

    /// Save under `directory` with a sanitized file name.
    ///
    /// The directory is created if needed. An existing file is never
    /// overwritten: `name_1.ext`, `name_2.ext`, ... are tried instead.
    /// Returns the path written.
    pub fn save_to(&self, directory: impl AsRef<Path>) -> Result<PathBuf, Error> {
        self.ensure_content()?;
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory)?;

        let safe = safe_file_name(&self.file_name);
        let (stem, ext) = split_extension(&safe);
        let mut path = directory.join(&safe);
        let mut counter = 1;
        while path.exists() {
            path = directory.join(format!("{}_{}{}", stem, counter, ext));
            counter += 1;
        }

        std::fs::write(&path, &self.content)?;
        debug!(path = %path.display(), size = self.size, "Saved upload");
        Ok(path)
    }

    /// Save to an exact path, creating parent directories.
    pub fn save_as(&self, path: impl AsRef<Path>) -> Result<PathBuf, Error> {
        self.ensure_content()?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.content)?;
        Ok(path.to_path_buf())
    }

    fn ensure_content(&self) -> Result<(), Error> {
        if self.content.is_empty() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "No content to save",
            )));
        }
        Ok(())
    }
}

/// Replace path separators and reserved characters, cap the length at 255.
fn safe_file_name(name: &str) -> String {
    if name.trim().is_empty() {
        return "uploaded_file.dat".to_string();
    }

    let safe: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if safe.chars().count() <= 255 {
        return safe;
    }
    let (stem, ext) = split_extension(&safe);
    let keep = 255usize.saturating_sub(ext.chars().count());
    let stem: String = stem.chars().take(keep).collect();
    format!("{}{}", stem, ext)
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < name.len() => name.split_at(dot),
        _ => (name, ""),
    }
}

/// Size caps for request bodies and multipart parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadLimits {
    /// Largest single multipart part, in bytes
    pub max_file_size: usize,
    /// Largest request body, in bytes
    pub max_request_size: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            max_request_size: 50 * 1024 * 1024,
        }
    }
}

/// Text fields and files of a multipart body
#[derive(Debug, Default, Clone)]
pub struct MultipartForm {
    pub fields: ParameterSpace,
    pub files: Vec<UploadedFile>,
}

/// Multipart form data parser
pub struct MultipartParser {
    boundary: String,
    limits: UploadLimits,
}

impl MultipartParser {
    /// Create a new multipart parser from Content-Type header
    pub fn from_content_type(content_type: &str) -> Result<Self, Error> {
        let boundary = multer::parse_boundary(content_type)
            .map_err(|e| Error::BadRequest(format!("Invalid multipart Content-Type: {}", e)))?;

        Ok(Self {
            boundary,
            limits: UploadLimits::default(),
        })
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn is_multipart(content_type: &str) -> bool {
        content_type
            .to_ascii_lowercase()
            .starts_with("multipart/form-data")
    }

    /// Split a body into text fields and files. Binary content is kept as is.
    ///
    /// A part larger than `max_file_size`, or a body larger than
    /// `max_request_size`, fails with [`Error::PayloadTooLarge`].
    pub async fn parse(&self, body: Bytes) -> Result<MultipartForm, Error> {
        let stream = futures_util::stream::once(async move { Ok::<Bytes, Infallible>(body) });
        let constraints = multer::Constraints::new().size_limit(
            multer::SizeLimit::new()
                .whole_stream(self.limits.max_request_size as u64)
                .per_field(self.limits.max_file_size as u64),
        );
        let mut multipart = multer::Multipart::with_constraints(stream, &self.boundary, constraints);
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field
                .name()
                .map(str::to_string)
                .ok_or_else(|| Error::BadRequest("Missing field name".to_string()))?;
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(|mime| mime.to_string());
            let content = field.bytes().await.map_err(multipart_error)?;

            match file_name {
                // browsers send an empty filename for an untouched file input
                Some(file_name) if !file_name.is_empty() => form.files.push(UploadedFile::new(
                    name,
                    file_name,
                    content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
                    content.to_vec(),
                )),
                Some(_) => {}
                None => form
                    .fields
                    .append(name, String::from_utf8_lossy(&content).into_owned()),
            }
        }

        Ok(form)
    }
}

fn multipart_error(err: multer::Error) -> Error {
    match err {
        multer::Error::FieldSizeExceeded { limit, field_name } => Error::PayloadTooLarge(format!(
            "part '{}' exceeds {} bytes",
            field_name.unwrap_or_default(),
            limit
        )),
        multer::Error::StreamSizeExceeded { limit } => {
            Error::PayloadTooLarge(format!("multipart body exceeds {} bytes", limit))
        }
        other => Error::BadRequest(format!("Malformed multipart body: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "--XyZ\r\n\
        Content-Disposition: form-data; name=\"title\"\r\n\r\n\
        Quarterly\r\n\
        --XyZ\r\n\
        Content-Disposition: form-data; name=\"report\"; filename=\"q1.csv\"\r\n\
        Content-Type: text/csv\r\n\r\n\
        a,b\r\n1,2\r\n\
        --XyZ\r\n\
        Content-Disposition: form-data; name=\"empty\"; filename=\"\"\r\n\r\n\
        \r\n\
        --XyZ--\r\n";

    fn parser() -> MultipartParser {
        MultipartParser::from_content_type("multipart/form-data; boundary=XyZ").unwrap()
    }

    #[test]
    fn test_boundary_extraction() {
        assert!(MultipartParser::from_content_type("multipart/form-data; boundary=\"abc\"").is_ok());
        assert!(MultipartParser::from_content_type("multipart/form-data").is_err());
        assert!(MultipartParser::is_multipart("Multipart/Form-Data; boundary=x"));
    }

    #[tokio::test]
    async fn test_parse_fields_and_files() {
        let form = parser().parse(Bytes::from_static(BODY.as_bytes())).await.unwrap();

        assert_eq!(form.fields.first("title"), Some("Quarterly"));
        assert_eq!(form.files.len(), 1);
        let file = &form.files[0];
        assert_eq!(file.field_name, "report");
        assert_eq!(file.file_name, "q1.csv");
        assert_eq!(file.content_type, "text/csv");
        assert_eq!(file.content_as_string(), "a,b\r\n1,2");
        assert_eq!(file.size, 8);
        assert!(file.is_text());
    }

    #[test]
    fn test_default_limits() {
        let limits = UploadLimits::default();
        assert_eq!(limits.max_file_size, 10 * 1024 * 1024);
        assert_eq!(limits.max_request_size, 50 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_part_over_file_limit_is_too_large() {
        let parser = parser().with_limits(UploadLimits {
            max_file_size: 4,
            max_request_size: 1024,
        });
        let err = parser.parse(Bytes::from_static(BODY.as_bytes())).await.unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge(_)), "{:?}", err);
        assert_eq!(err.status_code(), 413);
    }

    #[tokio::test]
    async fn test_body_over_request_limit_is_too_large() {
        let parser = parser().with_limits(UploadLimits {
            max_file_size: 1024,
            max_request_size: 64,
        });
        let err = parser.parse(Bytes::from_static(BODY.as_bytes())).await.unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_truncated_body_is_bad_request() {
        let err = parser()
            .parse(Bytes::from_static(b"--XyZ\r\nContent-Disposition: form-data"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)), "{:?}", err);
    }

    #[test]
    fn test_file_kinds() {
        let png = UploadedFile::new("f", "cat.png", "image/png", vec![1]);
        assert!(png.is_image());
        assert!(!png.is_pdf());
        assert_eq!(png.extension(), ".png");

        let blob = UploadedFile::new("f", "blob", "application/pdf", vec![1]);
        assert!(blob.is_pdf());
        assert_eq!(blob.extension(), ".dat");
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("../etc/passwd"), ".._etc_passwd");
        assert_eq!(safe_file_name("a:b*c?.txt"), "a_b_c_.txt");
        assert_eq!(safe_file_name(""), "uploaded_file.dat");
        let long = format!("{}.txt", "x".repeat(300));
        let safe = safe_file_name(&long);
        assert_eq!(safe.chars().count(), 255);
        assert!(safe.ends_with(".txt"));
    }

    #[test]
    fn test_save_to_adds_suffix_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let file = UploadedFile::new("f", "notes.txt", "text/plain", b"hello".to_vec());

        let first = file.save_to(dir.path()).unwrap();
        let second = file.save_to(dir.path()).unwrap();
        let third = file.save_to(dir.path()).unwrap();

        assert_eq!(first.file_name().unwrap(), "notes.txt");
        assert_eq!(second.file_name().unwrap(), "notes_1.txt");
        assert_eq!(third.file_name().unwrap(), "notes_2.txt");
        assert_eq!(std::fs::read_to_string(third).unwrap(), "hello");
    }

    #[test]
    fn test_save_as_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let file = UploadedFile::new("f", "a.bin", "application/octet-stream", vec![0, 159, 146]);
        let target = dir.path().join("nested/deeper/a.bin");
        file.save_as(&target).unwrap();
        assert_eq!(std::fs::read(target).unwrap(), vec![0, 159, 146]);
    }

    #[test]
    fn test_empty_content_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = UploadedFile::new("f", "a.txt", "text/plain", Vec::new());
        assert!(file.save_to(dir.path()).is_err());
    }
}
