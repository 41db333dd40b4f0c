use crate::codec::Compressor;
use crate::error::{Result, SqlzError};
use crate::intake::ARCHIVE_SUFFIX;
use crate::session::CompressionResult;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const BUNDLE_NAME: &str = "sql_compressed.zip";
pub const ARTIFACT_PREFIX: &str = "compressed_";
pub const ARTIFACT_SUFFIX: &str = ".gz";

/// `compressed_<name>.gz`
pub fn artifact_name(source: &str) -> String {
    format!("{ARTIFACT_PREFIX}{source}{ARTIFACT_SUFFIX}")
}

/// Bytes ready to hand to the user under a file name.
#[derive(Clone, Debug)]
pub struct Download<'a> {
    pub file_name: String,
    pub bytes: Cow<'a, [u8]>,
}

impl Download<'_> {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Writes into `dir` and returns the path. Separators inside the file name
    /// (archive members keep their folders) become `_` so the write stays in
    /// `dir`.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(flat_file_name(&self.file_name));
        fs::write(&path, &self.bytes)?;
        debug!(path = %path.display(), bytes = self.bytes.len(), "saved download");
        Ok(path)
    }
}

pub(crate) fn flat_file_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BundleOptions {
    /// Stamp entries with the ZIP epoch (1980-01-01) instead of the current
    /// time, so equal inputs give equal bundles.
    pub deterministic: bool,
}

/// The compressed payload of one file, or `NotAvailable` when it has not been
/// compressed.
pub fn single<'a>(
    results: &'a BTreeMap<String, CompressionResult>,
    name: &str,
) -> Result<Download<'a>> {
    let result = results
        .get(name)
        .ok_or_else(|| SqlzError::NotAvailable(name.to_string()))?;
    Ok(Download {
        file_name: artifact_name(name),
        bytes: Cow::Borrowed(&result.payload),
    })
}

/// One ZIP holding every payload as `compressed_<name>.gz`. Payloads are
/// already gzip, so entries are stored as-is. No results yields a valid empty
/// archive.
pub fn bundle(
    results: &BTreeMap<String, CompressionResult>,
    opts: BundleOptions,
) -> Result<Download<'static>> {
    let stamp = if opts.deterministic {
        zip::DateTime::default()
    } else {
        zip::DateTime::try_from(OffsetDateTime::now_utc())
            .map_err(|e| SqlzError::Format(format!("timestamp out of zip range: {e}")))?
    };
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(stamp);

    let mut w = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, result) in results {
        w.start_file(artifact_name(name), options)?;
        w.write_all(&result.payload)?;
    }
    let bytes = w.finish()?.into_inner();
    debug!(entries = results.len(), bytes = bytes.len(), "bundle assembled");

    Ok(Download {
        file_name: BUNDLE_NAME.to_string(),
        bytes: Cow::Owned(bytes),
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactCheck {
    pub name: String,
    pub compressed: u64,
    pub decompressed: u64,
}

/// Decompress a saved artifact end to end: a single `.gz`, or every entry of a
/// bundle `.zip`. Any payload that fails to decode fails the whole check.
pub fn verify(path: &Path, codec: &dyn Compressor) -> Result<Vec<ArtifactCheck>> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !name.ends_with(ARCHIVE_SUFFIX) {
        let payload = fs::read(path)?;
        return Ok(vec![check_payload(&name, &payload, codec)?]);
    }

    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut checks = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let mut payload = Vec::new();
        entry.read_to_end(&mut payload)?;
        checks.push(check_payload(entry.name(), &payload, codec)?);
    }
    Ok(checks)
}

fn check_payload(name: &str, payload: &[u8], codec: &dyn Compressor) -> Result<ArtifactCheck> {
    let decompressed = codec
        .decompress(&mut &payload[..], &mut std::io::sink())
        .map_err(|e| SqlzError::Format(format!("{name}: {e}")))?;
    Ok(ArtifactCheck {
        name: name.to_string(),
        compressed: payload.len() as u64,
        decompressed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::gzip::GzipCompressor;

    fn result(payload: &[u8]) -> CompressionResult {
        CompressionResult {
            payload: payload.to_vec(),
            minified_len: 0,
            codec: "gzip",
        }
    }

    fn results() -> BTreeMap<String, CompressionResult> {
        let mut m = BTreeMap::new();
        m.insert("a.sql".to_string(), result(b"AAA"));
        m.insert("dir/b.sql".to_string(), result(b"BBBB"));
        m
    }

    #[test]
    fn names_follow_the_artifact_pattern() {
        assert_eq!(artifact_name("x.sql"), "compressed_x.sql.gz");
    }

    #[test]
    fn single_borrows_the_payload() {
        let r = results();
        let d = single(&r, "a.sql").unwrap();
        assert_eq!(d.file_name, "compressed_a.sql.gz");
        assert_eq!(&*d.bytes, b"AAA");
        assert!(matches!(d.bytes, Cow::Borrowed(_)));
    }

    #[test]
    fn single_without_result_is_not_available() {
        let r = results();
        match single(&r, "missing.sql") {
            Err(SqlzError::NotAvailable(n)) => assert_eq!(n, "missing.sql"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn bundle_stores_each_payload() {
        let d = bundle(&results(), BundleOptions::default()).unwrap();
        assert_eq!(d.file_name, BUNDLE_NAME);

        let mut zip = ZipArchive::new(Cursor::new(d.bytes.into_owned())).unwrap();
        assert_eq!(zip.len(), 2);
        let mut entry = zip.by_name("compressed_dir/b.sql.gz").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Stored);
        let mut body = Vec::new();
        entry.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"BBBB");
    }

    #[test]
    fn empty_bundle_is_a_valid_archive() {
        let d = bundle(&BTreeMap::new(), BundleOptions::default()).unwrap();
        let zip = ZipArchive::new(Cursor::new(d.bytes.into_owned())).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[test]
    fn deterministic_bundles_are_identical() {
        let opts = BundleOptions {
            deterministic: true,
        };
        let a = bundle(&results(), opts).unwrap();
        let b = bundle(&results(), opts).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn save_flattens_member_folders() {
        let dir = tempfile::tempdir().unwrap();
        let r = results();
        let path = single(&r, "dir/b.sql").unwrap().save_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("compressed_dir_b.sql.gz"));
        assert_eq!(fs::read(path).unwrap(), b"BBBB");
    }

    #[test]
    fn verify_checks_every_bundle_entry() {
        let codec = GzipCompressor::new();
        let mut r = BTreeMap::new();
        let payload = codec.compress_bytes(b"SELECT 1;").unwrap();
        r.insert("a.sql".to_string(), result(&payload));
        let dir = tempfile::tempdir().unwrap();
        let path = bundle(&r, BundleOptions::default())
            .unwrap()
            .save_to(dir.path())
            .unwrap();

        let checks = verify(&path, &codec).unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].name, "compressed_a.sql.gz");
        assert_eq!(checks[0].decompressed, 9);
    }

    #[test]
    fn verify_rejects_corrupt_payloads() {
        let codec = GzipCompressor::new();
        let dir = tempfile::tempdir().unwrap();
        let path = bundle(&results(), BundleOptions::default())
            .unwrap()
            .save_to(dir.path())
            .unwrap();
        assert!(matches!(verify(&path, &codec), Err(SqlzError::Format(_))));

        let gz = dir.path().join("x.sql.gz");
        fs::write(&gz, codec.compress_bytes(b"SELECT 2;").unwrap()).unwrap();
        assert_eq!(verify(&gz, &codec).unwrap()[0].decompressed, 9);
    }
}
