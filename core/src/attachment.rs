/// Attachment resolution: picker results -> message payloads
use crate::chat_types::{AttachmentDescriptor, MimeKind};
use crate::error::{ChatError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const GENERIC_FILE_TAG: &str = "FILE";
const MAX_TAG_LEN: usize = 8;

/// What the device picker hands back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub uri: String,
    pub size_bytes: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickResult {
    Picked(PickedFile),
    /// The user backed out; not an error
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PickError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("picker failed: {0}")]
    Failed(String),
}

impl From<PickError> for ChatError {
    fn from(e: PickError) -> Self {
        match e {
            PickError::PermissionDenied => ChatError::PermissionDenied,
            PickError::Failed(msg) => ChatError::Attachment(msg),
        }
    }
}

pub type PickOutcome = std::result::Result<PickResult, PickError>;

/// External image/document picker
pub trait AttachmentPicker: Send + Sync {
    fn pick_image(&self) -> impl Future<Output = PickOutcome> + Send;
    fn pick_document(&self) -> impl Future<Output = PickOutcome> + Send;
}

/// Turn a resolved pick into a descriptor. `Ok(None)` means the user cancelled.
pub fn resolve(kind: MimeKind, outcome: PickOutcome) -> Result<Option<AttachmentDescriptor>> {
    let picked = match outcome? {
        PickResult::Cancelled => {
            debug!("attachment pick cancelled");
            return Ok(None);
        }
        PickResult::Picked(picked) => picked,
    };

    if picked.uri.trim().is_empty() {
        return Err(ChatError::Attachment("picker returned an empty uri".to_string()));
    }

    let display_name = if picked.name.trim().is_empty() {
        name_from_uri(&picked.uri)
    } else {
        picked.name.trim().to_string()
    };

    let file_type = match kind {
        MimeKind::Image => None,
        MimeKind::File => Some(file_type_tag(&display_name)),
    };

    Ok(Some(AttachmentDescriptor {
        size_label: format_size(picked.size_bytes),
        size_bytes: picked.size_bytes,
        display_name,
        mime_kind: kind,
        file_type,
        source_ref: picked.uri,
    }))
}

/// Human-readable size in binary units, one decimal, trailing ".0" dropped
pub fn format_size(bytes: u64) -> String {
    let round = |v: f64| (v * 10.0).round() / 10.0;
    let mut value = bytes as f64;
    let mut unit = 0;
    // Compare the rounded value so 1023.95 KB carries over to "1 MB"
    while round(value) >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = round(value);
    if rounded.fract() == 0.0 {
        format!("{:.0} {}", rounded, SIZE_UNITS[unit])
    } else {
        format!("{:.1} {}", rounded, SIZE_UNITS[unit])
    }
}

/// Uppercase extension tag; anything odd or missing becomes "FILE"
pub fn file_type_tag(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= MAX_TAG_LEN && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_uppercase())
        .unwrap_or_else(|| GENERIC_FILE_TAG.to_string())
}

fn name_from_uri(uri: &str) -> String {
    uri.rsplit('/')
        .find(|part| !part.is_empty())
        .unwrap_or("attachment")
        .to_string()
}

/// Picker backed by a filesystem path (terminal demo). `None` behaves like a cancel.
#[derive(Debug, Clone, Default)]
pub struct FsPicker {
    path: Option<PathBuf>,
}

impl FsPicker {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    async fn pick(&self) -> PickOutcome {
        let Some(path) = &self.path else {
            return Ok(PickResult::Cancelled);
        };

        let meta = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                PickError::PermissionDenied
            } else {
                PickError::Failed(format!("{}: {}", path.display(), e))
            }
        })?;
        if !meta.is_file() {
            return Err(PickError::Failed(format!("{} is not a file", path.display())));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(PickResult::Picked(PickedFile {
            uri: format!("file://{}", path.display()),
            size_bytes: meta.len(),
            name,
        }))
    }
}

impl AttachmentPicker for FsPicker {
    fn pick_image(&self) -> impl Future<Output = PickOutcome> + Send {
        self.pick()
    }

    fn pick_document(&self) -> impl Future<Output = PickOutcome> + Send {
        self.pick()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn picked(name: &str, size: u64) -> PickOutcome {
        Ok(PickResult::Picked(PickedFile {
            uri: format!("content://picker/{}", name),
            size_bytes: size,
            name: name.to_string(),
        }))
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(2_516_582), "2.4 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[test]
    fn test_format_size_carries_at_unit_boundary() {
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1_048_524), "1 MB");
        assert_eq!(format_size(1_048_575), "1 MB");
        assert_eq!(format_size(1_047_552), "1023 KB");
    }

    #[test]
    fn test_file_type_tag() {
        assert_eq!(file_type_tag("resume.pdf"), "PDF");
        assert_eq!(file_type_tag("Cover Letter.docx"), "DOCX");
        assert_eq!(file_type_tag("archive.tar.gz"), "GZ");
        assert_eq!(file_type_tag("README"), GENERIC_FILE_TAG);
        assert_eq!(file_type_tag(".bashrc"), GENERIC_FILE_TAG);
        assert_eq!(file_type_tag("weird.ex-t"), GENERIC_FILE_TAG);
    }

    #[test]
    fn test_resolve_image() {
        let desc = resolve(MimeKind::Image, picked("photo.jpg", 2_516_582))
            .unwrap()
            .unwrap();
        assert_eq!(desc.size_label, "2.4 MB");
        assert_eq!(desc.mime_kind, MimeKind::Image);
        assert_eq!(desc.file_type, None);
        assert_eq!(desc.source_ref, "content://picker/photo.jpg");
    }

    #[test]
    fn test_resolve_document_tags_extension() {
        let desc = resolve(MimeKind::File, picked("resume.pdf", 48_000))
            .unwrap()
            .unwrap();
        assert_eq!(desc.file_type.as_deref(), Some("PDF"));
        assert_eq!(desc.size_label, "46.9 KB");
    }

    #[test]
    fn test_resolve_missing_name_falls_back_to_uri() {
        let outcome = Ok(PickResult::Picked(PickedFile {
            uri: "content://docs/offer.txt".to_string(),
            size_bytes: 10,
            name: "  ".to_string(),
        }));
        let desc = resolve(MimeKind::File, outcome).unwrap().unwrap();
        assert_eq!(desc.display_name, "offer.txt");
        assert_eq!(desc.file_type.as_deref(), Some("TXT"));
    }

    #[test]
    fn test_cancel_is_not_an_error() {
        assert!(resolve(MimeKind::Image, Ok(PickResult::Cancelled)).unwrap().is_none());
    }

    #[test]
    fn test_picker_failures_map_to_chat_errors() {
        assert!(matches!(
            resolve(MimeKind::Image, Err(PickError::PermissionDenied)),
            Err(ChatError::PermissionDenied)
        ));
        assert!(matches!(
            resolve(MimeKind::File, Err(PickError::Failed("disk".to_string()))),
            Err(ChatError::Attachment(_))
        ));
    }

    #[tokio::test]
    async fn test_fs_picker() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(&[0u8; 2048]).unwrap();

        let picker = FsPicker::new(Some(file.path().to_path_buf()));
        let outcome = picker.pick_document().await;
        let desc = resolve(MimeKind::File, outcome).unwrap().unwrap();
        assert_eq!(desc.size_label, "2 KB");
        assert_eq!(desc.file_type.as_deref(), Some("PDF"));

        let cancelled = FsPicker::new(None).pick_image().await;
        assert_eq!(cancelled, Ok(PickResult::Cancelled));

        let missing = FsPicker::new(Some(PathBuf::from("/definitely/not/here.png")))
            .pick_image()
            .await;
        assert!(matches!(missing, Err(PickError::Failed(_))));
    }
}
