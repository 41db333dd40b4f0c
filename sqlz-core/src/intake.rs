use crate::error::{Result, SqlzError};
use std::fmt;
use std::fs::{self, File};
use std::io::{Cursor, Read, Seek};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Suffixes are matched exactly; `.SQL` or `.Zip` are not recognised.
pub const ARCHIVE_SUFFIX: &str = ".zip";
pub const SOURCE_SUFFIX: &str = ".sql";

#[derive(Clone, Debug)]
pub enum BlobData {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// One user-supplied input before classification.
#[derive(Clone, Debug)]
pub struct Blob {
    pub name: String,
    pub data: BlobData,
}

impl Blob {
    /// Named after the final path component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self {
            name,
            data: BlobData::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data: BlobData::Bytes(bytes),
        }
    }
}

#[derive(Clone, Debug)]
enum Content {
    /// Read lazily; the file may have changed or vanished by then.
    Disk(PathBuf),
    Memory(Arc<[u8]>),
}

/// A named, immutable SQL script in the working set.
#[derive(Clone, Debug)]
pub struct SourceFile {
    name: String,
    size: u64,
    content: Content,
}

impl SourceFile {
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::from_bytes(name, text.into().into_bytes())
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            content: Content::Memory(bytes.into()),
        }
    }

    fn from_disk(name: String, path: PathBuf) -> Result<Self> {
        let size = fs::metadata(&path)?.len();
        Ok(Self {
            name,
            size,
            content: Content::Disk(path),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes as seen at intake.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Decodes the content as UTF-8, replacing invalid sequences.
    pub fn read_text(&self) -> Result<String> {
        match &self.content {
            Content::Disk(path) => {
                let raw = fs::read(path)?;
                Ok(String::from_utf8_lossy(&raw).into_owned())
            }
            Content::Memory(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    pub(crate) fn renamed(mut self, name: String) -> Self {
        self.name = name;
        self
    }
}

/// A blob that could not be read as an archive or source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntakeFailure {
    pub blob: String,
    pub reason: String,
}

impl fmt::Display for IntakeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.blob, self.reason)
    }
}

/// Outcome of classifying one batch of blobs.
#[derive(Debug, Default)]
pub struct Intake {
    pub files: Vec<SourceFile>,
    pub failures: Vec<IntakeFailure>,
    /// Blobs whose name matched neither suffix.
    pub skipped: Vec<String>,
}

/// Classify a batch. Archives are expanded into their `.sql` members, `.sql`
/// blobs pass through and everything else is skipped. A broken blob is
/// recorded in `failures` and never affects its siblings.
pub fn intake(blobs: Vec<Blob>) -> Intake {
    let mut out = Intake::default();
    for blob in blobs {
        if blob.name.ends_with(ARCHIVE_SUFFIX) {
            match extract_blob(&blob) {
                Ok(members) => {
                    debug!(archive = %blob.name, members = members.len(), "expanded archive");
                    out.files.extend(members);
                }
                Err(e) => {
                    warn!(archive = %blob.name, error = %e, "archive extraction failed");
                    out.failures.push(IntakeFailure {
                        blob: blob.name,
                        reason: e.to_string(),
                    });
                }
            }
        } else if blob.name.ends_with(SOURCE_SUFFIX) {
            match source_from_blob(blob) {
                Ok(file) => out.files.push(file),
                Err((name, e)) => {
                    warn!(file = %name, error = %e, "source file unreadable");
                    out.failures.push(IntakeFailure {
                        blob: name,
                        reason: e.to_string(),
                    });
                }
            }
        } else {
            debug!(blob = %blob.name, "skipping unsupported input");
            out.skipped.push(blob.name);
        }
    }
    out
}

fn source_from_blob(blob: Blob) -> std::result::Result<SourceFile, (String, SqlzError)> {
    match blob.data {
        BlobData::Bytes(bytes) => Ok(SourceFile::from_bytes(blob.name, bytes)),
        BlobData::Path(path) => {
            SourceFile::from_disk(blob.name.clone(), path).map_err(|e| (blob.name, e))
        }
    }
}

fn extract_blob(blob: &Blob) -> Result<Vec<SourceFile>> {
    match &blob.data {
        BlobData::Path(path) => extract_members(File::open(path)?),
        BlobData::Bytes(bytes) => extract_members(Cursor::new(bytes.as_slice())),
    }
}

/// Every non-directory entry ending in `.sql`, decoded to text, in archive
/// order. The first unreadable entry fails the whole archive.
pub fn extract_members<R: Read + Seek>(reader: R) -> Result<Vec<SourceFile>> {
    let mut archive = ZipArchive::new(reader)?;
    let mut members = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().ends_with(SOURCE_SUFFIX) {
            continue;
        }
        let name = entry.name().to_string();
        let mut raw = Vec::new();
        entry.read_to_end(&mut raw)?;
        members.push(SourceFile::from_text(
            name,
            String::from_utf8_lossy(&raw).into_owned(),
        ));
    }
    Ok(members)
}

/// Turn command line paths into blobs. Directories are walked recursively in
/// file-name order; files are taken as given, existing or not, so that intake
/// reports on them.
pub fn collect_blobs(paths: &[PathBuf]) -> Result<Vec<Blob>> {
    let mut blobs = Vec::new();
    for root in paths {
        if root.is_dir() {
            for e in WalkDir::new(root).follow_links(false).sort_by_file_name() {
                let e = e.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
                if e.file_type().is_file() {
                    blobs.push(Blob::from_path(e.path()));
                }
            }
        } else {
            blobs.push(Blob::from_path(root.as_path()));
        }
    }
    Ok(blobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            if name.ends_with('/') {
                w.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                w.start_file(*name, SimpleFileOptions::default()).unwrap();
                w.write_all(body.as_bytes()).unwrap();
            }
        }
        w.finish().unwrap().into_inner()
    }

    #[test]
    fn passes_sql_blobs_through() {
        let out = intake(vec![Blob::from_bytes("a.sql", b"SELECT 1;".to_vec())]);
        assert_eq!(out.files.len(), 1);
        assert_eq!(out.files[0].name(), "a.sql");
        assert_eq!(out.files[0].size(), 9);
        assert_eq!(out.files[0].read_text().unwrap(), "SELECT 1;");
    }

    #[test]
    fn skips_unrecognised_names() {
        let out = intake(vec![
            Blob::from_bytes("notes.txt", b"hi".to_vec()),
            Blob::from_bytes("UPPER.SQL", b"SELECT 1;".to_vec()),
            Blob::from_bytes("archive.ZIP", Vec::new()),
        ]);
        assert!(out.files.is_empty());
        assert!(out.failures.is_empty());
        assert_eq!(out.skipped, vec!["notes.txt", "UPPER.SQL", "archive.ZIP"]);
    }

    #[test]
    fn expands_only_sql_members() {
        let bytes = zip_of(&[
            ("one.sql", "SELECT 1;"),
            ("readme.md", "# no"),
            ("nested/", ""),
            ("nested/two.sql", "SELECT 2;"),
            ("data.csv", "a,b"),
        ]);
        let out = intake(vec![Blob::from_bytes("bundle.zip", bytes)]);
        let names: Vec<_> = out.files.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["one.sql", "nested/two.sql"]);
        assert_eq!(out.files[1].read_text().unwrap(), "SELECT 2;");
    }

    #[test]
    fn directory_entries_named_like_sources_are_ignored() {
        let bytes = zip_of(&[("weird.sql/", ""), ("real.sql", "SELECT 1;")]);
        let out = intake(vec![Blob::from_bytes("x.zip", bytes)]);
        assert_eq!(out.files.len(), 1);
        assert_eq!(out.files[0].name(), "real.sql");
    }

    /// Overwrite the declared uncompressed size of every entry, in both the
    /// local and the central headers.
    fn lie_about_sizes(bytes: &mut [u8], size: u32) {
        let mut i = 0;
        while i + 4 <= bytes.len() {
            let field = match &bytes[i..i + 4] {
                [0x50, 0x4b, 0x03, 0x04] => Some(i + 22),
                [0x50, 0x4b, 0x01, 0x02] => Some(i + 24),
                _ => None,
            };
            if let Some(at) = field {
                bytes[at..at + 4].copy_from_slice(&size.to_le_bytes());
            }
            i += 1;
        }
    }

    #[test]
    fn declared_member_size_is_not_trusted() {
        let mut bytes = zip_of(&[("big.sql", "SELECT 1;")]);
        lie_about_sizes(&mut bytes, 0xFFFF_FFFE);
        let out = intake(vec![Blob::from_bytes("huge.zip", bytes)]);
        assert!(out.failures.is_empty());
        assert_eq!(out.files.len(), 1);
        assert_eq!(out.files[0].read_text().unwrap(), "SELECT 1;");
    }

    #[test]
    fn corrupt_archive_fails_only_itself() {
        let out = intake(vec![
            Blob::from_bytes("broken.zip", b"PK not really".to_vec()),
            Blob::from_bytes("ok.sql", b"SELECT 1;".to_vec()),
        ]);
        assert_eq!(out.files.len(), 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].blob, "broken.zip");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let f = SourceFile::from_bytes("bad.sql", vec![b'S', 0xff, b'1']);
        assert_eq!(f.read_text().unwrap(), "S\u{fffd}1");
    }

    #[test]
    fn disk_sources_are_read_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.sql");
        fs::write(&path, "SELECT 1;").unwrap();
        let out = intake(vec![Blob::from_path(&path)]);
        assert_eq!(out.files[0].size(), 9);

        fs::write(&path, "SELECT 2;").unwrap();
        assert_eq!(out.files[0].read_text().unwrap(), "SELECT 2;");

        fs::remove_file(&path).unwrap();
        assert!(out.files[0].read_text().is_err());
    }

    #[test]
    fn missing_source_path_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = intake(vec![Blob::from_path(dir.path().join("gone.sql"))]);
        assert!(out.files.is_empty());
        assert_eq!(out.failures[0].blob, "gone.sql");
    }

    #[test]
    fn collect_walks_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.sql"), "b").unwrap();
        fs::write(dir.path().join("a.sql"), "a").unwrap();
        fs::write(dir.path().join("sub/c.txt"), "c").unwrap();

        let blobs = collect_blobs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = blobs.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["a.sql", "b.sql", "c.txt"]);
    }
}
