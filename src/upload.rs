use crate::error::UploadError;
use crate::models::{Branch, Note, Semester, User};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Renders a byte count the way limits are shown to users: `10MB`, `1.5KB`,
/// `512 bytes`.
pub fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    let scaled = |unit: u64, suffix: &str| {
        let value = format!("{:.1}", bytes as f64 / unit as f64);
        format!("{}{}", value.trim_end_matches(".0"), suffix)
    };

    if bytes >= MB {
        scaled(MB, "MB")
    } else if bytes >= KB {
        scaled(KB, "KB")
    } else {
        format!("{} bytes", bytes)
    }
}

/// Describes the selected file. The bytes themselves are never kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadForm {
    pub title: String,
    pub subject: String,
    pub description: String,
    pub branch: Branch,
    pub semester: Semester,
    pub file: Option<FileMeta>,
}

impl UploadForm {
    pub fn validate(&self, max_file_size: u64) -> Result<(), UploadError> {
        for (field, value) in [
            ("Title", &self.title),
            ("Subject", &self.subject),
            ("Description", &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(UploadError::MissingField(field));
            }
        }

        let file = self.file.as_ref().ok_or(UploadError::MissingFile)?;
        if file.size > max_file_size {
            return Err(UploadError::FileTooLarge {
                size: file.size,
                limit: max_file_size,
            });
        }

        Ok(())
    }

    /// Validates and turns the form into a fresh note owned by `uploader`.
    pub fn into_note(self, uploader: &User, max_file_size: u64) -> Result<Note, UploadError> {
        self.validate(max_file_size)?;
        let file = self.file.ok_or(UploadError::MissingFile)?;

        Ok(Note {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            subject: self.subject,
            description: self.description,
            branch: self.branch,
            semester: self.semester,
            uploader_id: uploader.id.clone(),
            uploader_name: uploader.name.clone(),
            file_name: file.name,
            file_size: file.size,
            file_type: file.mime_type,
            file_data: None,
            download_count: 0,
            created_at: Utc::now(),
        })
    }
}
