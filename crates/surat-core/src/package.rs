//! DOCX package I/O.
//!
//! A [`Package`] is the full list of ZIP entries of a WordprocessingML file,
//! kept in archive order, plus a parsed [`Part`] for every entry that can carry
//! template text: the main document, headers, footers, footnotes and endnotes.
//! Everything else (styles, media, relationships) passes through untouched.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::ArchiveError;
use crate::part::Part;

/// Media type of a Word document.
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The main document part. Every package must have one.
pub const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// An opened DOCX package.
#[derive(Debug, Clone)]
pub struct Package {
    entries: Vec<Entry>,
    parts: Vec<Part>,
}

/// Whether the entry named `name` is parsed for template text.
pub fn is_templated_part(name: &str) -> bool {
    if name == DOCUMENT_PART || name == "word/footnotes.xml" || name == "word/endnotes.xml" {
        return true;
    }
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    !file.contains('/')
        && file.ends_with(".xml")
        && (file.starts_with("header") || file.starts_with("footer"))
}

fn corrupt(err: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Corrupt {
        reason: err.to_string(),
    }
}

impl Package {
    /// Open a package from its bytes.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::Corrupt`] if the bytes are not a readable ZIP archive,
    /// [`ArchiveError::MissingPart`] if there is no main document, and
    /// [`ArchiveError::MalformedXml`] if a templated part is not well-formed.
    pub fn open(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(corrupt)?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index).map_err(corrupt)?;
            let mut data = Vec::new();
            if !file.is_dir() {
                file.read_to_end(&mut data).map_err(|e| ArchiveError::Corrupt {
                    reason: format!("entry '{}': {e}", file.name()),
                })?;
            }
            entries.push(Entry {
                name: file.name().to_owned(),
                data,
                compression: file.compression(),
                is_dir: file.is_dir(),
            });
        }

        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<Entry>) -> Result<Self, ArchiveError> {
        if !entries.iter().any(|e| e.name == DOCUMENT_PART) {
            return Err(ArchiveError::MissingPart {
                part: DOCUMENT_PART.to_owned(),
            });
        }
        let parts = entries
            .iter()
            .filter(|e| !e.is_dir && is_templated_part(&e.name))
            .map(|e| Part::parse(&e.name, &e.data))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries, parts })
    }

    /// A copy of this package with the named entries' bytes replaced.
    pub(crate) fn with_parts(
        &self,
        replaced: Vec<(String, Vec<u8>)>,
    ) -> Result<Self, ArchiveError> {
        let mut entries = self.entries.clone();
        for (name, data) in replaced {
            if let Some(entry) = entries.iter_mut().find(|e| e.name == name) {
                entry.data = data;
            }
        }
        Self::from_entries(entries)
    }

    pub(crate) fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Names of all entries, in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Uncompressed bytes of entry `name`.
    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name && !e.is_dir)
            .map(|e| e.data.as_slice())
    }

    /// The visible text of every templated part, one line per paragraph.
    pub fn text(&self) -> String {
        let lines: Vec<&str> = self
            .parts
            .iter()
            .flat_map(Part::paragraph_texts)
            .collect();
        lines.join("\n")
    }

    /// Serialize the package back to ZIP bytes.
    ///
    /// Entries keep their order and names. Stored entries stay stored;
    /// everything else is written deflated.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::Write`] if the archive cannot be written.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        let write = |e: &dyn std::fmt::Display| ArchiveError::Write {
            reason: e.to_string(),
        };

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.entries {
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default().compression_method(method);
            if entry.is_dir {
                writer
                    .add_directory(entry.name.as_str(), options)
                    .map_err(|e| write(&e))?;
            } else {
                writer
                    .start_file(entry.name.as_str(), options)
                    .map_err(|e| write(&e))?;
                writer.write_all(&entry.data).map_err(|e| write(&e))?;
            }
        }
        let cursor = writer.finish().map_err(|e| write(&e))?;
        Ok(cursor.into_inner())
    }
}
