use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of file, as shown to users and used by the type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Pdf,
    Csv,
    Text,
    Doc,
    Zip,
}

impl FileType {
    pub const ALL: [FileType; 6] = [
        FileType::Image,
        FileType::Pdf,
        FileType::Csv,
        FileType::Text,
        FileType::Doc,
        FileType::Zip,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Pdf => "pdf",
            FileType::Csv => "csv",
            FileType::Text => "text",
            FileType::Doc => "doc",
            FileType::Zip => "zip",
        }
    }

    /// Parses the stored form. Matching is case-sensitive.
    pub fn parse(s: &str) -> Option<FileType> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Maps an upload's MIME type to a file kind.
    pub fn from_mime(mime: &str) -> Option<FileType> {
        match mime {
            "image/png" | "image/jpg" | "image/jpeg" | "image/HEIC" => Some(FileType::Image),
            "application/pdf" => Some(FileType::Pdf),
            "application/doc" | "application/docx" => Some(FileType::Doc),
            "application/zip" => Some(FileType::Zip),
            "text/plain" => Some(FileType::Text),
            "text/csv" | "text/txt" | "text/xlsx" | "text/xls" => Some(FileType::Csv),
            _ => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
