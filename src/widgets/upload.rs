//! File intake with admission control and simulated upload progress.
//!
//! Files arrive in batches (a drop or a picker selection). A batch that would
//! push the list past the file limit is refused outright. Otherwise every file
//! is listed: the ones breaking the size or type rules are flagged as failed
//! straight away, the rest go through a sequential simulated upload before the
//! host's upload callback receives them.

use super::timer::TaskHandle;
use super::{generate_id, WidgetError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::*;
use regex::Regex;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use std::{fs, io};

/// Message attached to every batch entry when the upload callback fails.
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";

/// Message attached to files whose type is not on the allow-list.
pub const UNSUPPORTED_TYPE_MESSAGE: &str = "File type not supported";

const PROGRESS_INCREMENT: u8 = 10;
const DEFAULT_PROGRESS_STEP: Duration = Duration::from_millis(200);
const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_FILES: usize = 5;

pub type UploadFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type UploadCallback = Arc<dyn Fn(Vec<Arc<IncomingFile>>) -> UploadFuture + Send + Sync>;
type ChangeCallback = Arc<dyn Fn(&[UploadEntry]) + Send + Sync>;

/// A file handed to the widget by a drop or the picker.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub contents: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, contents: Vec<u8>) -> Self {
        IncomingFile {
            name: name.into(),
            mime_type: mime_type.into(),
            size: contents.len() as u64,
            contents,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    ///
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let contents = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(IncomingFile::new(name, mime_type, contents))
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Upload status of a listed file.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Uploading,
    Completed,
    Failed,
}

/// One row of the file list.
///
#[derive(Debug, Clone)]
pub struct UploadEntry {
    pub id: String,
    pub file: Arc<IncomingFile>,
    pub progress: u8,
    pub status: UploadStatus,
    pub preview: Option<String>,
    pub error: Option<String>,
}

/// Comma-separated list of MIME types, wildcard MIME types and extensions,
/// e.g. `image/*,.pdf,application/json`.
///
#[derive(Debug, Clone)]
pub struct AcceptPattern {
    source: String,
    extensions: Vec<String>,
    types: Vec<Regex>,
}

impl AcceptPattern {
    pub fn parse(pattern: &str) -> Result<Self, WidgetError> {
        let mut extensions = vec![];
        let mut types = vec![];
        for token in pattern.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token.starts_with('.') {
                extensions.push(token.to_lowercase());
                continue;
            }
            let expression = format!("^{}$", regex::escape(&token.to_lowercase()).replace(r"\*", ".*"));
            let regex = Regex::new(&expression).map_err(|e| WidgetError::InvalidAcceptPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            types.push(regex);
        }
        Ok(AcceptPattern {
            source: pattern.to_string(),
            extensions,
            types,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// An empty pattern accepts everything.
    ///
    pub fn matches(&self, file: &IncomingFile) -> bool {
        if self.extensions.is_empty() && self.types.is_empty() {
            return true;
        }
        let name = file.name.to_lowercase();
        let mime_type = file.mime_type.to_lowercase();
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
            || self.types.iter().any(|re| re.is_match(&mime_type))
    }
}

/// Widget configuration.
///
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub accept: Option<AcceptPattern>,
    pub multiple: bool,
    /// Maximum size of a single file in bytes
    pub max_file_size: u64,
    pub max_files: usize,
    /// Allowed MIME types; empty allows every type
    pub allowed_types: Vec<String>,
    /// Delay between 10% progress increments
    pub progress_step: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            accept: None,
            multiple: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            allowed_types: vec![],
            progress_step: DEFAULT_PROGRESS_STEP,
        }
    }
}

impl UploadConfig {
    /// Return the rejection message for a file, if any.
    ///
    pub fn validate(&self, file: &IncomingFile) -> Option<String> {
        if file.size > self.max_file_size {
            return Some(format!(
                "File size exceeds {}",
                format_file_size(self.max_file_size)
            ));
        }
        if !self.allowed_types.is_empty() && !self.allowed_types.iter().any(|t| *t == file.mime_type) {
            return Some(UNSUPPORTED_TYPE_MESSAGE.to_string());
        }
        None
    }
}

/// File intake widget.
///
pub struct FileIntake {
    config: UploadConfig,
    entries: Arc<Mutex<Vec<UploadEntry>>>,
    on_change: Option<ChangeCallback>,
    on_upload: Option<UploadCallback>,
    tasks: Vec<TaskHandle>,
}

impl FileIntake {
    pub fn new(config: UploadConfig) -> Self {
        FileIntake {
            config,
            entries: Arc::new(Mutex::new(vec![])),
            on_change: None,
            on_upload: None,
            tasks: vec![],
        }
    }

    /// Called with the full list whenever it changes.
    ///
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[UploadEntry]) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(callback));
        self
    }

    /// Performs the real upload once a batch finished its simulated progress.
    ///
    pub fn on_upload<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Vec<Arc<IncomingFile>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_upload = Some(Arc::new(move |files| Box::pin(callback(files)) as UploadFuture));
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Admit a batch of files. Returns the identifiers of the new entries, or
    /// [`WidgetError::TooManyFiles`] without touching the list when the batch
    /// does not fit.
    ///
    pub fn add_files(&mut self, files: Vec<IncomingFile>) -> Result<Vec<String>, WidgetError> {
        let mut files: Vec<IncomingFile> = match &self.config.accept {
            Some(accept) => files
                .into_iter()
                .filter(|file| {
                    let accepted = accept.matches(file);
                    if !accepted {
                        warn!("Ignoring '{}': not accepted by '{}'", file.name, accept.as_str());
                    }
                    accepted
                })
                .collect(),
            None => files,
        };
        if !self.config.multiple {
            files.truncate(1);
        }
        if files.is_empty() {
            return Ok(vec![]);
        }

        let existing = self.len();
        if existing + files.len() > self.config.max_files {
            warn!(
                "Rejected batch of {} files: {} already listed, limit {}",
                files.len(),
                existing,
                self.config.max_files
            );
            return Err(WidgetError::TooManyFiles {
                max: self.config.max_files,
            });
        }

        let batch: Vec<UploadEntry> = files
            .into_iter()
            .map(|file| {
                let error = self.config.validate(&file);
                let preview = if file.is_image() {
                    Some(preview_data_uri(&file))
                } else {
                    None
                };
                UploadEntry {
                    id: generate_id(),
                    status: if error.is_some() {
                        UploadStatus::Failed
                    } else {
                        UploadStatus::Uploading
                    },
                    file: Arc::new(file),
                    progress: 0,
                    preview,
                    error,
                }
            })
            .collect();

        let batch_ids: Vec<String> = batch.iter().map(|e| e.id.clone()).collect();
        let accepted: Vec<(String, Arc<IncomingFile>)> = batch
            .iter()
            .filter(|e| e.error.is_none())
            .map(|e| (e.id.clone(), Arc::clone(&e.file)))
            .collect();

        info!("Admitted {} files ({} accepted)", batch.len(), accepted.len());
        update_entries(&self.entries, &self.on_change, |entries| {
            entries.extend(batch);
            true
        });

        if !accepted.is_empty() {
            self.tasks.retain(|task| !task.is_finished());
            let task = TaskHandle::spawn(simulate_upload(
                Arc::clone(&self.entries),
                self.on_change.clone(),
                self.on_upload.clone(),
                self.config.progress_step,
                batch_ids.clone(),
                accepted,
            ))?;
            self.tasks.push(task);
        }

        Ok(batch_ids)
    }

    /// Remove an entry regardless of its status.
    ///
    pub fn remove(&mut self, id: &str) -> bool {
        update_entries(&self.entries, &self.on_change, |entries| {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            entries.len() != before
        })
    }

    pub fn clear(&mut self) {
        update_entries(&self.entries, &self.on_change, |entries| {
            let had_entries = !entries.is_empty();
            entries.clear();
            had_entries
        });
    }

    /// Snapshot of the file list.
    ///
    pub fn entries(&self) -> Vec<UploadEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn entry(&self, id: &str) -> Option<UploadEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_uploading(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Wait until every pending batch has finished uploading.
    ///
    pub async fn settle(&mut self) {
        for task in self.tasks.drain(..) {
            task.join().await;
        }
    }
}

/// Apply `change` to the list and notify the host when it reports a change.
///
fn update_entries(
    entries: &Mutex<Vec<UploadEntry>>,
    on_change: &Option<ChangeCallback>,
    change: impl FnOnce(&mut Vec<UploadEntry>) -> bool,
) -> bool {
    let (changed, snapshot) = {
        let mut guard = entries.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = change(&mut guard);
        let snapshot = if changed && on_change.is_some() {
            Some(guard.clone())
        } else {
            None
        };
        (changed, snapshot)
    };
    if let (Some(callback), Some(snapshot)) = (on_change, snapshot) {
        callback(&snapshot);
    }
    changed
}

fn set_entry(
    entries: &Mutex<Vec<UploadEntry>>,
    on_change: &Option<ChangeCallback>,
    id: &str,
    change: impl FnOnce(&mut UploadEntry),
) {
    update_entries(entries, on_change, |list| match list.iter_mut().find(|e| e.id == id) {
        Some(entry) => {
            change(entry);
            true
        }
        None => false,
    });
}

async fn simulate_upload(
    entries: Arc<Mutex<Vec<UploadEntry>>>,
    on_change: Option<ChangeCallback>,
    on_upload: Option<UploadCallback>,
    step: Duration,
    batch_ids: Vec<String>,
    accepted: Vec<(String, Arc<IncomingFile>)>,
) {
    for (id, file) in &accepted {
        debug!("Uploading '{}'...", file.name);
        let mut progress = 0;
        while progress < 100 {
            tokio::time::sleep(step).await;
            progress += PROGRESS_INCREMENT;
            set_entry(&entries, &on_change, id, |entry| entry.progress = progress);
        }
        set_entry(&entries, &on_change, id, |entry| {
            entry.status = UploadStatus::Completed;
        });
    }

    let Some(upload) = on_upload else {
        return;
    };
    let files = accepted.into_iter().map(|(_, file)| file).collect();
    if let Err(e) = upload(files).await {
        error!("Upload callback failed: {}", e);
        for id in &batch_ids {
            set_entry(&entries, &on_change, id, |entry| {
                entry.status = UploadStatus::Failed;
                entry.error = Some(UPLOAD_FAILED_MESSAGE.to_string());
            });
        }
    }
}

fn preview_data_uri(file: &IncomingFile) -> String {
    format!("data:{};base64,{}", file.mime_type, STANDARD.encode(&file.contents))
}

/// Human readable byte count, e.g. `1.5 KB`.
///
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn text_file(name: &str, size: usize) -> IncomingFile {
        IncomingFile::new(name, "text/plain", vec![b'a'; size])
    }

    fn fast_config() -> UploadConfig {
        UploadConfig {
            progress_step: Duration::from_millis(10),
            ..UploadConfig::default()
        }
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn test_accept_pattern_matching() {
        let accept = AcceptPattern::parse("image/*, .PDF ,application/json").unwrap();
        assert!(accept.matches(&IncomingFile::new("a.png", "image/png", vec![])));
        assert!(accept.matches(&IncomingFile::new("doc.pdf", "application/octet-stream", vec![])));
        assert!(accept.matches(&IncomingFile::new("data", "application/json", vec![])));
        assert!(!accept.matches(&IncomingFile::new("a.txt", "text/plain", vec![])));

        let everything = AcceptPattern::parse("").unwrap();
        assert!(everything.matches(&IncomingFile::new("a.txt", "text/plain", vec![])));
    }

    #[test]
    fn test_validate_size_and_type() {
        let config = UploadConfig {
            max_file_size: 1024,
            allowed_types: vec!["image/png".to_string()],
            ..UploadConfig::default()
        };
        let big = IncomingFile::new("big.png", "image/png", vec![0; 2048]);
        assert_eq!(config.validate(&big).as_deref(), Some("File size exceeds 1 KB"));

        let wrong = text_file("notes.txt", 10);
        assert_eq!(config.validate(&wrong).as_deref(), Some(UNSUPPORTED_TYPE_MESSAGE));

        let ok = IncomingFile::new("ok.png", "image/png", vec![0; 10]);
        assert_eq!(config.validate(&ok), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_over_limit_adds_nothing() {
        let config = UploadConfig {
            max_files: 3,
            ..fast_config()
        };
        let mut intake = FileIntake::new(config);
        intake
            .add_files(vec![text_file("a.txt", 1), text_file("b.txt", 1)])
            .unwrap();
        let before: Vec<String> = intake.entries().into_iter().map(|e| e.id).collect();

        let result = intake.add_files(vec![text_file("c.txt", 1), text_file("d.txt", 1)]);
        assert!(matches!(result, Err(WidgetError::TooManyFiles { max: 3 })));
        let after: Vec<String> = intake.entries().into_iter().map(|e| e.id).collect();
        assert_eq!(before, after);

        intake.add_files(vec![text_file("c.txt", 1)]).unwrap();
        assert_eq!(intake.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_files_listed_but_not_uploaded() {
        let uploaded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&uploaded);
        let config = UploadConfig {
            max_file_size: 100,
            ..fast_config()
        };
        let mut intake = FileIntake::new(config).on_upload(move |files| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock()
                    .unwrap()
                    .extend(files.iter().map(|f| f.name.clone()));
                Ok::<_, anyhow::Error>(())
            }
        });

        let ids = intake
            .add_files(vec![text_file("small.txt", 10), text_file("huge.txt", 1000)])
            .unwrap();
        let huge = intake.entry(&ids[1]).unwrap();
        assert_eq!(huge.status, UploadStatus::Failed);
        assert_eq!(huge.error.as_deref(), Some("File size exceeds 100 Bytes"));

        intake.settle().await;
        let small = intake.entry(&ids[0]).unwrap();
        assert_eq!(small.status, UploadStatus::Completed);
        assert_eq!(small.progress, 100);
        assert_eq!(intake.entry(&ids[1]).unwrap().progress, 0);
        assert_eq!(*uploaded.lock().unwrap(), vec!["small.txt".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_files_upload_sequentially() {
        let mut intake = FileIntake::new(UploadConfig {
            progress_step: Duration::from_millis(100),
            ..UploadConfig::default()
        });
        let ids = intake
            .add_files(vec![text_file("a.txt", 1), text_file("b.txt", 1)])
            .unwrap();

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert_eq!(intake.entry(&ids[0]).unwrap().progress, 50);
        assert_eq!(intake.entry(&ids[1]).unwrap().progress, 0);
        assert!(intake.is_uploading());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(intake.entry(&ids[0]).unwrap().status, UploadStatus::Completed);
        assert_eq!(intake.entry(&ids[1]).unwrap().progress, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_callback_overwrites_completed_status() {
        let mut intake = FileIntake::new(fast_config())
            .on_upload(|_| async { Err::<(), _>(anyhow!("storage unavailable")) });
        let ids = intake
            .add_files(vec![text_file("a.txt", 1), text_file("b.txt", 1)])
            .unwrap();

        intake.settle().await;
        for id in &ids {
            let entry = intake.entry(id).unwrap();
            assert_eq!(entry.status, UploadStatus::Failed);
            assert_eq!(entry.progress, 100);
            assert_eq!(entry.error.as_deref(), Some(UPLOAD_FAILED_MESSAGE));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_preview_and_single_mode() {
        let config = UploadConfig {
            multiple: false,
            ..fast_config()
        };
        let mut intake = FileIntake::new(config);
        let ids = intake
            .add_files(vec![
                IncomingFile::new("pixel.png", "image/png", vec![1, 2, 3]),
                text_file("ignored.txt", 1),
            ])
            .unwrap();

        assert_eq!(ids.len(), 1);
        let entry = intake.entry(&ids[0]).unwrap();
        assert_eq!(entry.preview.as_deref(), Some("data:image/png;base64,AQID"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_pattern_filters_batch() {
        let config = UploadConfig {
            accept: Some(AcceptPattern::parse("image/*").unwrap()),
            ..fast_config()
        };
        let mut intake = FileIntake::new(config);
        let ids = intake
            .add_files(vec![
                IncomingFile::new("a.jpg", "image/jpeg", vec![0]),
                text_file("b.txt", 1),
            ])
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert!(intake.entry(&ids[0]).unwrap().preview.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_and_change_notifications() {
        let changes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&changes);
        let mut intake = FileIntake::new(UploadConfig {
            max_file_size: 0,
            ..fast_config()
        })
        .on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let ids = intake.add_files(vec![text_file("a.txt", 5)]).unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 1);
        assert!(!intake.is_uploading());

        assert!(intake.remove(&ids[0]));
        assert!(!intake.remove(&ids[0]));
        assert!(intake.is_empty());
        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removal_during_upload() {
        let mut intake = FileIntake::new(fast_config());
        let ids = intake
            .add_files(vec![text_file("a.txt", 1), text_file("b.txt", 1)])
            .unwrap();
        tokio::time::sleep(Duration::from_millis(35)).await;
        assert!(intake.remove(&ids[0]));

        intake.settle().await;
        assert!(intake.entry(&ids[0]).is_none());
        assert_eq!(intake.entry(&ids[1]).unwrap().status, UploadStatus::Completed);
    }

    #[test]
    fn test_from_path_guesses_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, b"{}").unwrap();

        let file = IncomingFile::from_path(&path).unwrap();
        assert_eq!(file.name, "report.json");
        assert_eq!(file.mime_type, "application/json");
        assert_eq!(file.size, 2);
    }
}
