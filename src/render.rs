//! Rendering of lookup results into inline replies or file attachments.
//!
//! File output goes through a uniquely named temp file per request. The file
//! is removed when the `FileArtifact` is dropped, whether or not sending
//! succeeded.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::lookup::records::NO_INFORMATION;
use crate::preferences::OutputFormat;

/// Attachment name for plain-text output.
pub const TEXT_FILE_NAME: &str = "info.txt";
/// Attachment name for JSON output.
pub const JSON_FILE_NAME: &str = "info.json";
/// Longest text a single Telegram message may carry, in characters.
pub const MESSAGE_LIMIT: usize = 4096;

#[derive(Serialize)]
struct JsonEnvelope<'a> {
    response: &'a str,
}

/// Serialize a result as `{"response": ...}` with 4-space indentation.
pub fn to_json(result: &str) -> crate::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    JsonEnvelope { response: result }.serialize(&mut serializer)?;
    // serde_json only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Split text into chunks of at most `limit` characters.
///
/// Breaks after the last newline inside the window when there is one, otherwise
/// at the limit. Empty input yields no chunks. A `limit` of 0 is treated as 1.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    debug_assert!(limit > 0, "split_message limit must be > 0");
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        // Byte offset just past `limit` chars, or the whole remainder
        let window_end = rest
            .char_indices()
            .nth(limit)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());

        if window_end == rest.len() {
            chunks.push(rest.to_string());
            break;
        }

        let cut = match rest[..window_end].rfind('\n') {
            Some(nl) if nl > 0 => nl + 1,
            _ => window_end,
        };
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    chunks
}

/// A rendered reply, ready to send.
#[derive(Debug)]
pub enum Rendered {
    /// One or more inline messages.
    Inline(Vec<String>),
    /// A file attachment backed by a temp file.
    File(FileArtifact),
}

/// Temp file holding a serialized result, deleted on drop.
#[derive(Debug)]
pub struct FileArtifact {
    file_name: &'static str,
    file: NamedTempFile,
}

impl FileArtifact {
    /// Name the recipient sees (`info.txt` / `info.json`).
    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    /// On-disk location of the temp file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub async fn contents(&self) -> crate::Result<Vec<u8>> {
        Ok(tokio::fs::read(self.file.path()).await?)
    }
}

/// Turns results into `Rendered` replies according to a chat's preference.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    temp_dir: Option<PathBuf>,
}

impl Renderer {
    /// `temp_dir` of `None` uses the OS temp directory.
    pub fn new(temp_dir: Option<PathBuf>) -> Self {
        Self { temp_dir }
    }

    pub fn render(&self, result: &str, format: OutputFormat) -> crate::Result<Rendered> {
        match format {
            OutputFormat::Messages | OutputFormat::Html => {
                let text = if result.trim().is_empty() {
                    NO_INFORMATION
                } else {
                    result
                };
                Ok(Rendered::Inline(split_message(text, MESSAGE_LIMIT)))
            }
            OutputFormat::Txt => self.write_artifact(TEXT_FILE_NAME, ".txt", result),
            OutputFormat::Json => {
                let json = to_json(result)?;
                self.write_artifact(JSON_FILE_NAME, ".json", &json)
            }
        }
    }

    fn write_artifact(
        &self,
        file_name: &'static str,
        suffix: &str,
        content: &str,
    ) -> crate::Result<Rendered> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("domain-scout-").suffix(suffix);
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(content.as_bytes())?;
        file.flush()?;

        tracing::debug!(
            path = %file.path().display(),
            file_name = file_name,
            bytes = content.len(),
            "file artifact written"
        );
        Ok(Rendered::File(FileArtifact { file_name, file }))
    }
}
