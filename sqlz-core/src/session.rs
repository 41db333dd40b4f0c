//! The working state of one interactive run: the files the user handed in,
//! their compressed artifacts, per-file status and the current selection.
//!
//! Everything goes through `&mut Session`, so a file cannot be removed while
//! it is being compressed, and removing a file always drops its artifact and
//! status with it.

use crate::codec::Compressor;
use crate::codec::gzip::GzipCompressor;
use crate::config::Config;
use crate::error::{Result, SqlzError};
use crate::intake::{self, Blob, IntakeFailure, SourceFile};
use crate::minify::Minifier;
use crate::package::{self, BundleOptions, Download};
use crate::progress::ProgressStatus;
use crate::stats::SizeSummary;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Compressed artifact of one source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionResult {
    pub payload: Vec<u8>,
    pub minified_len: u64,
    pub codec: &'static str,
}

impl CompressionResult {
    /// Payload length in bytes.
    pub fn len(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Minify and compress already-read text.
pub fn compress_text(
    codec: &dyn Compressor,
    text: &str,
    minifier: &Minifier,
) -> Result<CompressionResult> {
    let minified = minifier.minify(text);
    let payload = codec.compress_bytes(minified.as_bytes())?;
    Ok(CompressionResult {
        payload,
        minified_len: minified.len() as u64,
        codec: codec.name(),
    })
}

#[derive(Debug, Default)]
pub struct IntakeReport {
    /// Names as stored in the session, in intake order.
    pub added: Vec<String>,
    /// `(requested, stored)` for names that collided.
    pub renamed: Vec<(String, String)>,
    pub failures: Vec<IntakeFailure>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompressReport {
    pub compressed: Vec<String>,
    /// Already had an artifact.
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// A borrowed view of one file for display. Holding it keeps the session
/// borrowed, so the file cannot disappear underneath it; dropping it releases
/// everything.
#[derive(Debug)]
pub struct Preview<'a> {
    pub file: &'a SourceFile,
    pub original: String,
    pub minified: String,
    pub result: Option<&'a CompressionResult>,
}

pub struct Session {
    files: Vec<SourceFile>,
    results: BTreeMap<String, CompressionResult>,
    progress: HashMap<String, ProgressStatus>,
    selected: Option<String>,
    minifier: Minifier,
    codec: Box<dyn Compressor>,
    bundle_opts: BundleOptions,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self::with_codec(config, Box::new(GzipCompressor::with_level(config.level)))
    }

    pub fn with_codec(config: &Config, codec: Box<dyn Compressor>) -> Self {
        Self {
            files: Vec::new(),
            results: BTreeMap::new(),
            progress: HashMap::new(),
            selected: None,
            minifier: Minifier::new(config.block_comments),
            codec,
            bundle_opts: BundleOptions {
                deterministic: config.deterministic,
            },
        }
    }

    /// Add a batch. Fails with `NoValidFiles`, leaving the session untouched,
    /// when nothing in the batch is usable. Colliding names get a ` (n)`
    /// suffix.
    pub fn intake(&mut self, blobs: Vec<Blob>) -> Result<IntakeReport> {
        let batch = intake::intake(blobs);
        if batch.files.is_empty() {
            return Err(SqlzError::NoValidFiles {
                failures: batch.failures,
            });
        }

        let mut report = IntakeReport {
            failures: batch.failures,
            skipped: batch.skipped,
            ..Default::default()
        };
        for file in batch.files {
            let name = self.unique_name(file.name());
            let file = if name != file.name() {
                debug!(from = %file.name(), to = %name, "renamed colliding file");
                report.renamed.push((file.name().to_string(), name.clone()));
                file.renamed(name.clone())
            } else {
                file
            };
            self.progress.insert(name.clone(), ProgressStatus::NotStarted);
            self.files.push(file);
            report.added.push(name);
        }
        debug!(added = report.added.len(), total = self.files.len(), "intake complete");
        Ok(report)
    }

    /// Names are compared in their saved form, so `dir/b.sql` and `dir_b.sql`
    /// collide just like two `b.sql` do.
    fn unique_name(&self, wanted: &str) -> String {
        if !self.name_taken(wanted) {
            return wanted.to_string();
        }
        (1..)
            .map(|n| numbered(wanted, n))
            .find(|candidate| !self.name_taken(candidate))
            .unwrap_or_else(|| wanted.to_string())
    }

    fn name_taken(&self, name: &str) -> bool {
        let flat = package::flat_file_name(name);
        self.files
            .iter()
            .any(|f| f.name() == name || package::flat_file_name(f.name()) == flat)
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, name: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.name() == name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Removes the file together with its status and artifact. Returns whether
    /// anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(at) = self.files.iter().position(|f| f.name() == name) else {
            return false;
        };
        self.files.remove(at);
        self.results.remove(name);
        self.progress.remove(name);
        if self.selected.as_deref() == Some(name) {
            self.selected = None;
        }
        debug!(file = name, "removed");
        true
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.results.clear();
        self.progress.clear();
        self.selected = None;
    }

    pub fn status(&self, name: &str) -> ProgressStatus {
        self.progress.get(name).copied().unwrap_or_default()
    }

    pub fn result(&self, name: &str) -> Option<&CompressionResult> {
        self.results.get(name)
    }

    pub fn results(&self) -> &BTreeMap<String, CompressionResult> {
        &self.results
    }

    /// Compress every file that has no artifact yet, one at a time in working
    /// set order. `on_progress` sees every status change. A failure marks
    /// only that file; the pass continues.
    pub fn compress_all<F>(&mut self, mut on_progress: F) -> CompressReport
    where
        F: FnMut(&str, ProgressStatus),
    {
        let mut report = CompressReport::default();
        for at in 0..self.files.len() {
            let name = self.files[at].name().to_string();
            if self.results.contains_key(&name) {
                report.skipped.push(name);
                continue;
            }
            match self.compress_at(at, &mut on_progress) {
                Ok(()) => report.compressed.push(name),
                Err(_) => report.failed.push(name),
            }
        }
        debug!(
            compressed = report.compressed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "compression pass finished"
        );
        report
    }

    /// Compress a single file unless it already has an artifact.
    pub fn compress_one(&mut self, name: &str) -> Result<&CompressionResult> {
        let at = self
            .files
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| SqlzError::UnknownFile(name.to_string()))?;
        if !self.results.contains_key(name) {
            self.compress_at(at, &mut |_: &str, _: ProgressStatus| {})?;
        }
        self.results
            .get(name)
            .ok_or_else(|| SqlzError::NotAvailable(name.to_string()))
    }

    fn compress_at<F>(&mut self, at: usize, on_progress: &mut F) -> Result<()>
    where
        F: FnMut(&str, ProgressStatus),
    {
        let name = self.files[at].name().to_string();
        self.set_status(&name, ProgressStatus::InProgress(0), on_progress);

        let text = match self.files[at].read_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %name, error = %e, "could not read source");
                self.set_status(&name, ProgressStatus::Failed, on_progress);
                return Err(e);
            }
        };
        self.set_status(&name, ProgressStatus::InProgress(50), on_progress);

        match compress_text(self.codec.as_ref(), &text, &self.minifier) {
            Ok(result) => {
                debug!(
                    file = %name,
                    original = self.files[at].size(),
                    compressed = result.len(),
                    "compressed"
                );
                self.results.insert(name.clone(), result);
                self.set_status(&name, ProgressStatus::Complete, on_progress);
                Ok(())
            }
            Err(e) => {
                warn!(file = %name, error = %e, "compression failed");
                self.set_status(&name, ProgressStatus::Failed, on_progress);
                Err(e)
            }
        }
    }

    fn set_status<F>(&mut self, name: &str, status: ProgressStatus, on_progress: &mut F)
    where
        F: FnMut(&str, ProgressStatus),
    {
        self.progress.insert(name.to_string(), status);
        on_progress(name, status);
    }

    pub fn summary(&self) -> SizeSummary {
        SizeSummary::new(
            self.files.len(),
            self.results.len(),
            self.files.iter().map(|f| f.size()).sum(),
            self.results.values().map(|r| r.len()).sum(),
        )
    }

    pub fn single(&self, name: &str) -> Result<Download<'_>> {
        package::single(&self.results, name)
    }

    pub fn bundle(&self) -> Result<Download<'static>> {
        package::bundle(&self.results, self.bundle_opts)
    }

    pub fn select(&mut self, name: &str) -> Result<()> {
        if self.file(name).is_none() {
            return Err(SqlzError::UnknownFile(name.to_string()));
        }
        self.selected = Some(name.to_string());
        Ok(())
    }

    pub fn selected(&self) -> Option<&SourceFile> {
        self.selected.as_deref().and_then(|n| self.file(n))
    }

    /// Reads the file now; nothing is cached between previews.
    pub fn preview(&self, name: &str) -> Result<Preview<'_>> {
        let file = self
            .file(name)
            .ok_or_else(|| SqlzError::UnknownFile(name.to_string()))?;
        let original = file.read_text()?;
        let minified = self.minifier.minify(&original);
        Ok(Preview {
            file,
            original,
            minified,
            result: self.results.get(name),
        })
    }
}

/// `dir/a.sql` -> `dir/a (n).sql`
fn numbered(name: &str, n: usize) -> String {
    let base = name.rfind('/').map_or(0, |i| i + 1);
    match name[base..].rfind('.') {
        Some(dot) if dot > 0 => {
            let at = base + dot;
            format!("{} ({n}){}", &name[..at], &name[at..])
        }
        _ => format!("{name} ({n})"),
    }
}
