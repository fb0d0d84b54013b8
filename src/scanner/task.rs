//! Scanner Task
//!
//! One scan run over one repository. The walker streams commits from a blocking
//! thread, each new blob is chunked and its units are pushed to the run's batch
//! dispatcher, and a per-file task waits for the replies and settles the file in
//! the trackers and the result store.

use crate::chunker::chunk_reader;
use crate::core::retry::retry_async;
use crate::core::shutdown::{wait_for_shutdown, ShutdownCoordinator};
use crate::detection::DetectionClient;
use crate::dispatch::{BatchDispatcher, DispatchError, PendingUnit};
use crate::scanner::error::{ScanError, ScanResult};
use crate::scanner::ignore::IgnorePolicy;
use crate::scanner::report::ScanReport;
use crate::scanner::settings::ScanSettings;
use crate::scanner::types::{file_key, ScanResponse, ScanUnit, UnitMeta};
use crate::scanner::walker::{FileEntry, RepositoryWalker};
use crate::store::{ResultRecord, ResultStore};
use crate::tracker::{CommitOutcome, DocumentOutcome, FileOutcome, ScanState, Trackers};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// One commit as read by the walker
#[derive(Debug)]
pub struct WalkedCommit {
    pub commit: String,
    /// Blobs not yet seen in this run; an unreadable tree is an error
    pub files: ScanResult<Vec<FileEntry>>,
    /// Blob IDs in the tree that were seen earlier in the walk or already settled
    pub shared: Vec<String>,
}

/// Collaborators shared by every run of a manager
#[derive(Clone)]
pub struct ScanContext {
    pub settings: Arc<ScanSettings>,
    pub client: Arc<dyn DetectionClient>,
    pub trackers: Arc<Trackers>,
    pub store: Arc<dyn ResultStore>,
    pub ignore: Arc<IgnorePolicy>,
}

/// Scan run for a single repository
pub struct ScannerTask {
    /// scan-<repository_id>
    scanner_id: String,
    repository_id: String,
    repository_path: String,
    context: ScanContext,
}

#[derive(Debug)]
enum FileStatus {
    Scanned,
    Failed(String),
    Cancelled,
}

/// What a file task hands back to the run loop
#[derive(Debug)]
struct SettledFile {
    commit_id: String,
    object_id: String,
    path: String,
    unit_count: usize,
    /// Unit IDs with their dirty flag
    documents: Vec<(String, bool)>,
    records: Vec<ResultRecord>,
    status: FileStatus,
}

#[derive(Debug, Default)]
struct OpenCommit {
    file_count: usize,
    remaining: usize,
    failed: usize,
}

/// Commit progress for one run
///
/// A commit stays open until every blob in its tree that is still in flight has
/// settled, including blobs scanned on behalf of another commit.
#[derive(Debug, Default)]
struct CommitBook {
    open: HashMap<String, OpenCommit>,
    /// Blob ID to the commits waiting on it
    waiting: HashMap<String, Vec<String>>,
}

impl ScannerTask {
    pub fn new(
        scanner_id: impl Into<String>,
        repository_id: impl Into<String>,
        repository_path: impl Into<String>,
        context: ScanContext,
    ) -> Self {
        Self {
            scanner_id: scanner_id.into(),
            repository_id: repository_id.into(),
            repository_path: repository_path.into(),
            context,
        }
    }

    pub fn scanner_id(&self) -> &str {
        &self.scanner_id
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    /// Scan every commit `walker` yields
    ///
    /// A repository that is already settled in the trackers is not rescanned; the
    /// report comes back with `skipped` set. A cancelled run leaves the repository
    /// at `init` so a later run can pick it up again.
    pub async fn run(
        self,
        walker: Box<dyn RepositoryWalker>,
        shutdown: &ShutdownCoordinator,
    ) -> ScanResult<ScanReport> {
        let started = Instant::now();
        let trackers = self.context.trackers.clone();
        let mut report = ScanReport::new(&self.scanner_id, &self.repository_id, &self.repository_path);

        if trackers.repositories.should_skip(&self.repository_id)? {
            report.skipped = true;
            report.state = trackers
                .repositories
                .state(&self.repository_id)?
                .unwrap_or_default();
            log::info!(
                "{}: {} already {}, skipping",
                self.scanner_id,
                self.repository_path,
                report.state
            );
            report.counts = trackers.counts()?;
            report.duration = started.elapsed();
            return Ok(report);
        }

        log::info!("{}: scanning {}", self.scanner_id, self.repository_path);
        match self.execute(walker, shutdown, &mut report).await {
            Ok(()) => {
                let message = format!("{} findings", report.findings.len());
                report.state =
                    trackers
                        .repositories
                        .update(&self.repository_id, ScanState::Complete, &message)?;
            }
            Err(ScanError::Cancelled) => {
                log::info!("{}: scan cancelled", self.scanner_id);
                return Err(ScanError::Cancelled);
            }
            Err(e) => {
                log::error!("{}: scan failed: {}", self.scanner_id, e);
                trackers
                    .repositories
                    .update(&self.repository_id, ScanState::Error, &e.to_string())?;
                return Err(e);
            }
        }

        report.counts = trackers.counts()?;
        report.duration = started.elapsed();
        log::info!(
            "{}: finished in {:?}: {} commits, {} files, {} findings, {} errors",
            self.scanner_id,
            report.duration,
            report.commits.len(),
            report.files.len(),
            report.findings.len(),
            report.errors.len()
        );
        Ok(report)
    }

    async fn execute(
        &self,
        walker: Box<dyn RepositoryWalker>,
        shutdown: &ShutdownCoordinator,
        report: &mut ScanReport,
    ) -> ScanResult<()> {
        let settings = &self.context.settings;
        let mut shutdown_rx = shutdown.subscribe();
        if shutdown.is_shutdown_requested() {
            return Err(ScanError::Cancelled);
        }

        let (unit_tx, unit_rx) = mpsc::channel::<PendingUnit>(settings.channel_capacity);
        let (error_tx, mut error_rx) = mpsc::unbounded_channel::<DispatchError>();
        let dispatcher = BatchDispatcher::new(
            self.context.client.clone(),
            settings.batch_limit,
            settings.flush_interval,
        )?
        .with_context(self.scanner_id.clone())
        .with_error_channel(error_tx);
        let dispatch_handle = tokio::spawn(dispatcher.run(unit_rx, shutdown.subscribe()));

        let (commit_tx, mut commit_rx) = mpsc::channel::<WalkedCommit>(settings.channel_capacity);
        let walk = HistoryWalk {
            trackers: self.context.trackers.clone(),
            repository_id: self.repository_id.clone(),
            max_commits: settings.max_commits,
            shutdown: shutdown.clone(),
            label: self.scanner_id.clone(),
        };
        let walk_handle = tokio::task::spawn_blocking(move || walk.run(walker, commit_tx));

        let mut files: JoinSet<SettledFile> = JoinSet::new();
        let mut book = CommitBook::default();
        let mut walking = true;
        let mut cancelled = false;

        while walking || !files.is_empty() {
            tokio::select! {
                biased;

                _ = wait_for_shutdown(&mut shutdown_rx) => {
                    cancelled = true;
                    break;
                }

                Some(joined) = files.join_next(), if !files.is_empty() => {
                    let settled = joined.map_err(|e| ScanError::Io {
                        message: format!("File task failed: {}", e),
                    })?;
                    if matches!(settled.status, FileStatus::Cancelled) {
                        cancelled = true;
                        break;
                    }
                    self.settle_file(settled, &mut book, report)?;
                }

                received = commit_rx.recv(), if walking && files.len() < settings.channel_capacity => {
                    match received {
                        Some(walked) => self.start_commit(
                            walked,
                            &unit_tx,
                            shutdown,
                            &mut files,
                            &mut book,
                            report,
                        )?,
                        None => walking = false,
                    }
                }
            }
        }

        drop(commit_rx);
        drop(unit_tx);

        if cancelled {
            files.shutdown().await;
            let _ = dispatch_handle.await;
            let _ = walk_handle.await;
            return Err(ScanError::Cancelled);
        }

        let walked = walk_handle.await.map_err(|e| ScanError::Io {
            message: format!("Walker task failed: {}", e),
        })??;

        report.dispatch = match dispatch_handle.await {
            Ok(Ok(stats)) => stats,
            Ok(Err(DispatchError::Cancelled)) => return Err(ScanError::Cancelled),
            Ok(Err(e)) => return Err(e.into()),
            Err(e) => {
                return Err(ScanError::Io {
                    message: format!("Dispatcher task failed: {}", e),
                })
            }
        };

        while let Ok(error) = error_rx.try_recv() {
            report.errors.push(error.to_string());
        }

        log::debug!(
            "{}: walked {} commits, {} batches sent",
            self.scanner_id,
            walked,
            report.dispatch.batches_flushed
        );
        Ok(())
    }

    /// Gate a walked commit and spawn a task for each of its files that needs scanning
    fn start_commit(
        &self,
        walked: WalkedCommit,
        units: &mpsc::Sender<PendingUnit>,
        shutdown: &ShutdownCoordinator,
        files: &mut JoinSet<SettledFile>,
        book: &mut CommitBook,
        report: &mut ScanReport,
    ) -> ScanResult<()> {
        let trackers = &self.context.trackers;
        let WalkedCommit {
            commit,
            files: entries,
            shared,
        } = walked;

        if trackers.commits.should_skip(&commit)? {
            log::debug!("{}: commit {} already settled", self.scanner_id, commit);
            return Ok(());
        }

        let entries = match entries {
            Ok(entries) => entries,
            Err(e) => {
                let message = e.to_string();
                log::warn!("{}: commit {}: {}", self.scanner_id, commit, message);
                trackers.commits.update(&commit, ScanState::Error, &message)?;
                report.errors.push(format!("commit {}: {}", commit, message));
                if let Some(data) = trackers.commits.get(&commit)? {
                    report.commits.push(CommitOutcome { data, file_count: 0 });
                }
                return Ok(());
            }
        };

        let mut progress = OpenCommit {
            file_count: entries.len() + shared.len(),
            ..OpenCommit::default()
        };

        for file in entries {
            let key = file_key(&self.repository_id, &file.object_id);
            if trackers.files.should_skip(&key)? {
                self.share_blob(&commit, &file.object_id, &mut progress, book)?;
                continue;
            }
            if let Some(reason) = self.context.ignore.check(&file) {
                log::debug!("{}: ignoring {}: {}", self.scanner_id, file.path, reason);
                trackers.files.update(&key, ScanState::Ignore, &reason)?;
                self.push_file_outcome(report, &file.object_id, &file.path, &commit, 0, 0)?;
                continue;
            }

            progress.remaining += 1;
            book.waiting
                .entry(file.object_id.clone())
                .or_default()
                .push(commit.clone());
            files.spawn(scan_file(FileJob {
                scanner_id: self.scanner_id.clone(),
                repository_id: self.repository_id.clone(),
                commit_id: commit.clone(),
                file,
                context: self.context.clone(),
                units: units.clone(),
                shutdown: shutdown.clone(),
            }));
        }

        for object_id in &shared {
            self.share_blob(&commit, object_id, &mut progress, book)?;
        }

        if progress.remaining == 0 {
            self.close_commit(&commit, &progress, report)
        } else {
            book.open.insert(commit, progress);
            Ok(())
        }
    }

    /// Account for a blob this commit does not scan itself
    ///
    /// While another commit's task still has the blob in flight, this commit waits
    /// for it; otherwise the blob's settled state counts straight away.
    fn share_blob(
        &self,
        commit: &str,
        object_id: &str,
        progress: &mut OpenCommit,
        book: &mut CommitBook,
    ) -> ScanResult<()> {
        if let Some(waiters) = book.waiting.get_mut(object_id) {
            if !waiters.iter().any(|waiter| waiter == commit) {
                waiters.push(commit.to_string());
                progress.remaining += 1;
            }
            return Ok(());
        }
        let key = file_key(&self.repository_id, object_id);
        if self.context.trackers.files.state(&key)? == Some(ScanState::Error) {
            progress.failed += 1;
        }
        Ok(())
    }

    fn settle_file(
        &self,
        settled: SettledFile,
        book: &mut CommitBook,
        report: &mut ScanReport,
    ) -> ScanResult<()> {
        let trackers = &self.context.trackers;
        let failed = match &settled.status {
            FileStatus::Failed(message) => {
                report.errors.push(format!(
                    "{} ({}): {}",
                    settled.path, settled.object_id, message
                ));
                true
            }
            _ => false,
        };

        for (unit_id, dirty) in &settled.documents {
            if let Some(data) = trackers.documents.get(unit_id)? {
                report.documents.push(DocumentOutcome {
                    data,
                    object_id: settled.object_id.clone(),
                    dirty: *dirty,
                });
            }
        }
        self.push_file_outcome(
            report,
            &settled.object_id,
            &settled.path,
            &settled.commit_id,
            settled.unit_count,
            settled.records.len(),
        )?;
        report.findings.extend(settled.records);

        for commit in book.waiting.remove(&settled.object_id).unwrap_or_default() {
            let Some(progress) = book.open.get_mut(&commit) else {
                continue;
            };
            progress.remaining = progress.remaining.saturating_sub(1);
            if failed {
                progress.failed += 1;
            }
            if progress.remaining == 0 {
                if let Some(progress) = book.open.remove(&commit) {
                    self.close_commit(&commit, &progress, report)?;
                }
            }
        }
        Ok(())
    }

    fn close_commit(&self, commit: &str, progress: &OpenCommit, report: &mut ScanReport) -> ScanResult<()> {
        let trackers = &self.context.trackers;
        let (state, message) = if progress.failed > 0 {
            (
                ScanState::Error,
                format!("{} of {} files failed", progress.failed, progress.file_count),
            )
        } else {
            (ScanState::Complete, format!("{} files", progress.file_count))
        };
        trackers.commits.update(commit, state, &message)?;
        log::debug!("{}: commit {} {}: {}", self.scanner_id, commit, state, message);

        if let Some(data) = trackers.commits.get(commit)? {
            report.commits.push(CommitOutcome {
                data,
                file_count: progress.file_count,
            });
        }
        Ok(())
    }

    fn push_file_outcome(
        &self,
        report: &mut ScanReport,
        object_id: &str,
        path: &str,
        commit_id: &str,
        unit_count: usize,
        finding_count: usize,
    ) -> ScanResult<()> {
        let key = file_key(&self.repository_id, object_id);
        if let Some(data) = self.context.trackers.files.get(&key)? {
            report.files.push(FileOutcome {
                data,
                object_id: object_id.to_string(),
                path: path.to_string(),
                commit_id: commit_id.to_string(),
                unit_count,
                finding_count,
            });
        }
        Ok(())
    }
}

/// The blocking half of a run: reads commits and streams the blobs not seen yet
struct HistoryWalk {
    trackers: Arc<Trackers>,
    repository_id: String,
    max_commits: Option<usize>,
    shutdown: ShutdownCoordinator,
    label: String,
}

impl HistoryWalk {
    /// Returns the number of commits sent; stops early when shutdown is requested
    /// or the receiver goes away.
    fn run(self, walker: Box<dyn RepositoryWalker>, commits_tx: mpsc::Sender<WalkedCommit>) -> ScanResult<usize> {
        let mut commits = walker.commits()?;
        if let Some(limit) = self.max_commits {
            commits.truncate(limit);
        }
        log::debug!("{}: {} commits to walk", self.label, commits.len());

        let mut seen: HashSet<String> = HashSet::new();
        let mut sent = 0;
        for commit in commits {
            if self.shutdown.is_shutdown_requested() {
                break;
            }

            let walked = match self.read_commit(walker.as_ref(), &commit, &seen) {
                Ok((files, shared)) => {
                    seen.extend(files.iter().map(|file| file.object_id.clone()));
                    WalkedCommit {
                        commit,
                        files: Ok(files),
                        shared,
                    }
                }
                Err(e) => WalkedCommit {
                    commit,
                    files: Err(e),
                    shared: Vec::new(),
                },
            };

            if commits_tx.blocking_send(walked).is_err() {
                log::debug!("{}: commit receiver closed, stopping walk", self.label);
                break;
            }
            sent += 1;
        }
        Ok(sent)
    }

    /// Load the blobs of `commit` that are neither settled nor seen earlier in the walk
    ///
    /// The IDs of the blobs left out come back alongside, so the commit can still
    /// account for them.
    fn read_commit(
        &self,
        walker: &dyn RepositoryWalker,
        commit: &str,
        seen: &HashSet<String>,
    ) -> ScanResult<(Vec<FileEntry>, Vec<String>)> {
        let mut fresh = HashSet::new();
        let mut files = Vec::new();
        let mut shared = Vec::new();

        for entry in walker.tree(commit)? {
            let key = file_key(&self.repository_id, &entry.object_id);
            let settled = matches!(
                self.trackers.files.state(&key)?,
                Some(state) if state > ScanState::Init
            );
            if settled || seen.contains(&entry.object_id) || !fresh.insert(entry.object_id.clone()) {
                shared.push(entry.object_id);
                continue;
            }
            files.push(walker.blob(&entry)?);
        }
        Ok((files, shared))
    }
}

/// Everything a file task needs, owned so the task can outlive the run loop's borrow
struct FileJob {
    scanner_id: String,
    repository_id: String,
    commit_id: String,
    file: FileEntry,
    context: ScanContext,
    units: mpsc::Sender<PendingUnit>,
    shutdown: ShutdownCoordinator,
}

async fn scan_file(job: FileJob) -> SettledFile {
    let mut settled = SettledFile {
        commit_id: job.commit_id.clone(),
        object_id: job.file.object_id.clone(),
        path: job.file.path.clone(),
        unit_count: 0,
        documents: Vec::new(),
        records: Vec::new(),
        status: FileStatus::Scanned,
    };

    match job.scan(&mut settled).await {
        Ok(()) => {}
        Err(ScanError::Cancelled) => settled.status = FileStatus::Cancelled,
        Err(e) => {
            let message = e.to_string();
            log::warn!(
                "{}: {} ({}) failed: {}",
                job.scanner_id,
                settled.path,
                settled.object_id,
                message
            );
            if let Err(e) = job
                .context
                .trackers
                .files
                .update(&job.file_key(), ScanState::Error, &message)
            {
                log::error!("{}: {}", job.scanner_id, e);
            }
            settled.status = FileStatus::Failed(message);
        }
    }
    settled
}

impl FileJob {
    fn file_key(&self) -> String {
        file_key(&self.repository_id, &self.file.object_id)
    }

    async fn scan(&self, settled: &mut SettledFile) -> ScanResult<()> {
        let trackers = &self.context.trackers;
        let settings = &self.context.settings;

        let meta = UnitMeta::new(
            &self.repository_id,
            &self.commit_id,
            &self.file.object_id,
            &self.file.path,
        );
        let units = chunk_reader(self.file.reader(), &meta, settings.max_chunk_size)?;
        settled.unit_count = units.len();
        settled.documents = units.iter().map(|unit| (unit.id().to_string(), false)).collect();

        let operation = format!("{}: {}", self.scanner_id, self.file.path);
        let responses = retry_async(
            &operation,
            &settings.retry,
            |e: &ScanError| matches!(e, ScanError::Incomplete { .. }),
            || self.submit(&units),
        )
        .await?;

        let records: Vec<ResultRecord> = responses.iter().flat_map(ResultRecord::from_response).collect();
        let written = self.context.store.write(&records)?;

        for response in &responses {
            let message = if response.is_dirty() {
                format!("{} findings", response.results.len())
            } else {
                String::new()
            };
            trackers.documents.update(&response.id, ScanState::Complete, &message)?;
        }
        settled.documents = responses
            .iter()
            .map(|response| (response.id.clone(), response.is_dirty()))
            .collect();

        let message = format!(
            "{} units, {} findings ({} new)",
            units.len(),
            records.len(),
            written
        );
        trackers.files.update(&self.file_key(), ScanState::Complete, &message)?;
        settled.records = records;
        Ok(())
    }

    /// Submit every unit of the file and wait for all of the replies
    ///
    /// Units released without a result, or answered with a response for another
    /// unit, make the whole attempt [`ScanError::Incomplete`].
    async fn submit(&self, units: &[ScanUnit]) -> ScanResult<Vec<ScanResponse>> {
        let documents = &self.context.trackers.documents;
        let mut shutdown = self.shutdown.subscribe();
        if self.shutdown.is_shutdown_requested() {
            return Err(ScanError::Cancelled);
        }

        let mut waiting = Vec::with_capacity(units.len());
        for unit in units {
            let (pending, reply) = PendingUnit::new(unit.clone());
            documents.update(unit.id(), ScanState::Pending, "submitted")?;
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => return Err(ScanError::Cancelled),
                sent = self.units.send(pending) => {
                    sent.map_err(|_| ScanError::Dispatch(DispatchError::Cancelled))?
                }
            }
            waiting.push((unit.id(), reply));
        }

        let mut responses = Vec::with_capacity(units.len());
        let mut missing = 0;
        for (unit_id, reply) in waiting {
            let received = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => return Err(ScanError::Cancelled),
                received = reply => received,
            };
            match received {
                Ok(response) => match response.verify_for(unit_id) {
                    Ok(()) => responses.push(response),
                    Err(e) => {
                        log::warn!("{}: {}", self.scanner_id, e);
                        missing += 1;
                    }
                },
                Err(_) => {
                    documents.update(unit_id, ScanState::Pending, "released without result")?;
                    missing += 1;
                }
            }
        }

        if missing > 0 {
            return Err(ScanError::Incomplete {
                object_id: self.file.object_id.clone(),
                missing,
                total: units.len(),
            });
        }
        Ok(responses)
    }
}
