use serde::{Serialize, Deserialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Metadata row describing one stored file.
///
/// `ready` is the two-phase completion marker: it is written as `false` and
/// only flipped once every declared chunk has been acknowledged by the store.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub file_id: Uuid,
    pub filename: String,
    pub total_chunks: i32,
    #[sqlx(rename = "upload_time")]
    pub created_at: DateTime<Utc>,
    pub ready: bool,
}

impl FileRecord {
    pub fn new(file_id: Uuid, filename: impl Into<String>, total_chunks: i32) -> Self {
        Self {
            file_id,
            filename: filename.into(),
            total_chunks,
            created_at: Utc::now(),
            ready: false,
        }
    }

    /// One line of the plain-text listing.
    pub fn summary_line(&self) -> String {
        format!(
            "File ID: {}, Filename: {}, Chunks: {}, Uploaded: {}",
            self.file_id,
            self.filename,
            self.total_chunks,
            self.created_at.to_rfc3339(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_records_start_unpublished() {
        let record = FileRecord::new(Uuid::nil(), "report.pdf", 3);
        assert!(!record.ready);
        assert_eq!(record.total_chunks, 3);
        assert_eq!(record.filename, "report.pdf");
    }

    #[test]
    fn summary_line_lists_every_field() {
        let record = FileRecord::new(Uuid::nil(), "a.txt", 2);
        let line = record.summary_line();
        assert!(line.starts_with(&format!("File ID: {}, Filename: a.txt, Chunks: 2, Uploaded: ", Uuid::nil())));
    }
}
