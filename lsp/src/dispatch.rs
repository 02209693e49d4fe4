//! Message dispatch and analysis sequencing.
//!
//! The [`Dispatcher`] is a synchronous state machine driven by one
//! coordinating task. Each inbound frame produces a [`Step`]: messages to
//! send, at most one blocking job to start, and whether to stop. Blocking
//! jobs run elsewhere and come back through [`Dispatcher::finish_reindex`]
//! or [`Dispatcher::finish_slow_path`].
//!
//! At most one slow run is in flight. A request for another while one runs
//! only marks a rerun; when the running job reports, its results go through
//! the epoch guards and one fresh run over the latest workspace starts.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, trace, warn};

use vigil_core::{DiagnosticsByFile, FileTable, SourceSnapshot, StateHashes, patch};
use vigil_types::{Epoch, FileId};

use crate::analysis::AnalysisEngine;
use crate::protocol::{
    DidChangeParams, DidOpenParams, FilesUpdatedSinceParams, Incoming, InitializeParams, Outgoing,
    ProtocolError, Response, WorkspaceRoot, error_codes, methods, parse_incoming, parse_params,
};
use crate::reindex::{IndexedFile, reindex};
use crate::reporter::ErrorReporter;
use crate::types::ServerConfig;

/// Text document sync kind: incremental.
const SYNC_INCREMENTAL: u8 = 2;

/// What the coordinator should do after one dispatcher call.
#[derive(Debug, Default)]
pub struct Step {
    pub outgoing: Vec<Outgoing>,
    pub reindex: Option<ReindexJob>,
    pub slow_path: Option<SlowPathJob>,
    pub exit: bool,
}

impl Step {
    fn respond(response: Response) -> Self {
        Self {
            outgoing: vec![Outgoing::Response(response)],
            ..Self::default()
        }
    }
}

/// The one-time walk of the workspace root requested by `initialized`.
#[derive(Debug)]
pub struct ReindexJob {
    root: PathBuf,
    config: ServerConfig,
}

impl ReindexJob {
    /// Walk and read the workspace. Blocking; call from a worker.
    #[must_use]
    pub fn run(self) -> ReindexResult {
        let files = reindex(&self.root, &self.config).unwrap_or_else(|e| {
            warn!("Workspace reindex failed: {e:#}");
            Vec::new()
        });
        ReindexResult { files }
    }
}

#[derive(Debug)]
pub struct ReindexResult {
    files: Vec<IndexedFile>,
}

/// A full analysis over a fixed set of snapshots, tagged with the epoch
/// that requested it.
#[derive(Debug)]
pub struct SlowPathJob {
    epoch: Epoch,
    files: Vec<(FileId, Arc<SourceSnapshot>)>,
}

impl SlowPathJob {
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    #[must_use]
    pub fn files(&self) -> &[(FileId, Arc<SourceSnapshot>)] {
        &self.files
    }

    /// Run the job. Blocking; call from a worker.
    #[must_use]
    pub fn run(self, engine: &dyn AnalysisEngine) -> SlowPathResult {
        debug!(epoch = %self.epoch, files = self.files.len(), "Slow path started");
        let diagnostics = engine.run_slow_path(&self.files);
        let mut hashes = StateHashes::new();
        for (id, snapshot) in &self.files {
            hashes.insert(*id, engine.state_hash(snapshot));
        }
        SlowPathResult {
            epoch: self.epoch,
            files: self.files,
            diagnostics,
            hashes,
        }
    }
}

#[derive(Debug)]
pub struct SlowPathResult {
    epoch: Epoch,
    files: Vec<(FileId, Arc<SourceSnapshot>)>,
    diagnostics: DiagnosticsByFile,
    hashes: StateHashes,
}

/// Per-workspace state, created by `initialize`.
struct Session {
    root: WorkspaceRoot,
    files: FileTable,
    reporter: ErrorReporter,
    hashes: StateHashes,
    epoch: Epoch,
    /// Set once `initialized` has requested the workspace walk.
    indexed: bool,
    reindexing: bool,
    /// Epoch of the slow run in flight.
    slow_running: Option<Epoch>,
    rerun: bool,
}

impl Session {
    fn is_idle(&self) -> bool {
        !self.reindexing && self.slow_running.is_none()
    }

    /// Start a slow run over the whole workspace, or queue one behind the
    /// run in flight.
    fn request_slow_path(&mut self) -> Option<SlowPathJob> {
        if let Some(running) = self.slow_running {
            debug!(%running, epoch = %self.epoch, "Slow path busy, rerun queued");
            self.rerun = true;
            return None;
        }
        self.slow_running = Some(self.epoch);
        Some(SlowPathJob {
            epoch: self.epoch,
            files: self.files.iter().map(|(id, s)| (id, Arc::clone(s))).collect(),
        })
    }

    fn publish(
        &mut self,
        epoch: Epoch,
        files: impl IntoIterator<Item = FileId>,
        diagnostics: &DiagnosticsByFile,
        out: &mut Vec<Outgoing>,
    ) {
        for id in files {
            let Some(current) = self.files.get(id) else {
                continue;
            };
            let found = diagnostics.get(&id).map_or(&[][..], Vec::as_slice);
            if let Some(params) = self
                .reporter
                .push_snapshot_diagnostics(epoch, id, current, found)
            {
                for diagnostic in found {
                    debug!("Publishing {}", diagnostic.render());
                }
                out.push(Outgoing::Publish(params));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Running,
    /// `shutdown` received; the response waits for slow work to drain.
    Draining,
    ShutDown,
}

pub struct Dispatcher {
    engine: Arc<dyn AnalysisEngine>,
    config: ServerConfig,
    session: Option<Session>,
    lifecycle: Lifecycle,
    pending_shutdown: Option<serde_json::Value>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(engine: Arc<dyn AnalysisEngine>, config: ServerConfig) -> Self {
        Self {
            engine,
            config,
            session: None,
            lifecycle: Lifecycle::Running,
            pending_shutdown: None,
        }
    }

    #[must_use]
    pub fn engine(&self) -> Arc<dyn AnalysisEngine> {
        Arc::clone(&self.engine)
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Current workspace epoch. `Epoch::NEVER` before `initialize`.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.session.as_ref().map_or(Epoch::NEVER, |s| s.epoch)
    }

    /// Current snapshot of a workspace-relative path.
    #[must_use]
    pub fn snapshot(&self, path: &str) -> Option<Arc<SourceSnapshot>> {
        let files = &self.session.as_ref()?.files;
        files.get(files.find(path)?).cloned()
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.lifecycle != Lifecycle::Running
    }

    pub fn handle_frame(&mut self, frame: &serde_json::Value) -> Step {
        match parse_incoming(frame) {
            Some(Incoming::Request {
                id,
                method,
                params,
                cancelled,
            }) => self.handle_request(id, &method, params, cancelled),
            Some(Incoming::Notification { method, params }) => {
                self.handle_notification(&method, params)
            }
            Some(Incoming::Response) => {
                trace!("Ignoring response frame");
                Step::default()
            }
            None => match frame.get("id") {
                Some(id) => Step::respond(Response::error(
                    id.clone(),
                    error_codes::INVALID_REQUEST,
                    "Not a JSON-RPC request or notification",
                )),
                None => {
                    trace!("Ignoring unclassifiable frame");
                    Step::default()
                }
            },
        }
    }

    fn handle_request(
        &mut self,
        id: serde_json::Value,
        method: &str,
        params: Option<serde_json::Value>,
        cancelled: bool,
    ) -> Step {
        debug!(%method, %id, "Request");
        if self.lifecycle != Lifecycle::Running {
            return Step::respond(Response::error(
                id,
                error_codes::INVALID_REQUEST,
                "Server is shutting down",
            ));
        }
        if cancelled {
            return Step::respond(Response::error(
                id,
                error_codes::REQUEST_CANCELLED,
                "Request was cancelled",
            ));
        }
        if method == methods::INITIALIZE {
            return self.initialize(id, params);
        }
        let Some(session) = self.session.as_mut() else {
            return Step::respond(Response::error(
                id,
                error_codes::SERVER_NOT_INITIALIZED,
                format!("Server not initialized: {method}"),
            ));
        };

        match method {
            methods::SHUTDOWN => {
                self.lifecycle = Lifecycle::Draining;
                if !session.is_idle() {
                    info!("Shutdown requested, draining background work");
                    self.pending_shutdown = Some(id);
                    return Step::default();
                }
                info!("Shutdown requested");
                self.lifecycle = Lifecycle::ShutDown;
                Step::respond(Response::ok(id, serde_json::Value::Null))
            }
            methods::FILES_UPDATED_SINCE => {
                match parse_params::<FilesUpdatedSinceParams>(method, params) {
                    Ok(FilesUpdatedSinceParams { epoch }) => {
                        let uris: Vec<String> = session
                            .reporter
                            .files_updated_since(Epoch::new(epoch))
                            .into_iter()
                            .filter_map(|file| session.files.get(file))
                            .map(|snapshot| session.root.to_remote(snapshot.path()))
                            .collect();
                        Step::respond(Response::ok(id, json!({ "uris": uris })))
                    }
                    Err(e) => invalid_params(id, &e),
                }
            }
            _ => Step::respond(Response::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Unknown method: {method}"),
            )),
        }
    }

    fn initialize(&mut self, id: serde_json::Value, params: Option<serde_json::Value>) -> Step {
        if self.session.is_some() {
            return Step::respond(Response::error(
                id,
                error_codes::INVALID_REQUEST,
                "Server already initialized",
            ));
        }
        let root = parse_params::<InitializeParams>(methods::INITIALIZE, params).and_then(|p| {
            let uri = p.root_uri.unwrap_or_default();
            WorkspaceRoot::from_uri(&uri)
        });
        let root = match root {
            Ok(root) => root,
            Err(e) => return invalid_params(id, &e),
        };
        info!(root = %root.uri(), "Initializing workspace");

        self.session = Some(Session {
            reporter: ErrorReporter::new(root.clone(), self.config.error_url_base.clone()),
            root,
            files: FileTable::new(),
            hashes: StateHashes::new(),
            epoch: Epoch::NEVER,
            indexed: false,
            reindexing: false,
            slow_running: None,
            rerun: false,
        });

        Step::respond(Response::ok(
            id,
            json!({
                "capabilities": {
                    "textDocumentSync": {
                        "openClose": true,
                        "change": SYNC_INCREMENTAL,
                    },
                },
                "serverInfo": {
                    "name": "vigil",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ))
    }

    fn handle_notification(&mut self, method: &str, params: Option<serde_json::Value>) -> Step {
        if method == methods::EXIT {
            info!("Exit");
            return Step {
                exit: true,
                ..Step::default()
            };
        }
        if self.lifecycle != Lifecycle::Running {
            debug!(%method, "Ignoring notification after shutdown");
            return Step::default();
        }
        let Some(session) = self.session.as_mut() else {
            debug!(%method, "Ignoring notification before initialize");
            return Step::default();
        };

        match method {
            methods::INITIALIZED => Self::initialized(session, &self.config),
            methods::DID_OPEN => match parse_params::<DidOpenParams>(method, params) {
                Ok(p) => {
                    let Some(path) = session.root.to_local(&p.text_document.uri) else {
                        debug!(uri = %p.text_document.uri, "Ignoring document outside workspace");
                        return Step::default();
                    };
                    let epoch = session.epoch.next();
                    session.epoch = epoch;
                    let id = session
                        .files
                        .upsert(SourceSnapshot::new(path, p.text_document.text, epoch));
                    self.analyze_changed(&[id])
                }
                Err(e) => {
                    warn!("{e}");
                    Step::default()
                }
            },
            methods::DID_CHANGE => match parse_params::<DidChangeParams>(method, params) {
                Ok(p) => {
                    let Some(path) = session.root.to_local(&p.text_document.uri) else {
                        debug!(uri = %p.text_document.uri, "Ignoring document outside workspace");
                        return Step::default();
                    };
                    let epoch = session.epoch.next();
                    let base = session.files.find(&path).and_then(|id| session.files.get(id));
                    let patched = patch::apply_changes(
                        base.map(|snapshot| snapshot.as_ref()),
                        &path,
                        &p.content_changes,
                        epoch,
                    );
                    match patched {
                        Ok(snapshot) => {
                            session.epoch = epoch;
                            let id = session.files.upsert(snapshot);
                            self.analyze_changed(&[id])
                        }
                        Err(e) => {
                            warn!(%path, "Rejected change: {e}");
                            Step::default()
                        }
                    }
                }
                Err(e) => {
                    warn!("{e}");
                    Step::default()
                }
            },
            _ => {
                trace!(%method, "Ignoring notification");
                Step::default()
            }
        }
    }

    /// Hand out the workspace walk. Only the first `initialized` counts.
    fn initialized(session: &mut Session, config: &ServerConfig) -> Step {
        if session.indexed {
            debug!("Ignoring repeated initialized");
            return Step::default();
        }
        session.indexed = true;
        session.reindexing = true;
        info!(root = %session.root.dir().display(), "Reindexing workspace");
        Step {
            reindex: Some(ReindexJob {
                root: session.root.dir().to_path_buf(),
                config: config.clone(),
            }),
            ..Step::default()
        }
    }

    /// Load the walked files and start the first full analysis.
    ///
    /// Paths the client opened while the walk ran keep their buffer text.
    pub fn finish_reindex(&mut self, result: ReindexResult) -> Step {
        let mut step = Step::default();
        let Some(session) = self.session.as_mut() else {
            return step;
        };
        session.reindexing = false;
        let epoch = session.epoch.next();
        session.epoch = epoch;
        for file in result.files {
            if session.files.find(&file.path).is_some() {
                debug!(path = %file.path, "Keeping open buffer over disk contents");
                continue;
            }
            session
                .files
                .upsert(SourceSnapshot::new(file.path, file.text, epoch));
        }
        info!(%epoch, files = session.files.len(), "Workspace indexed");
        step.slow_path = session.request_slow_path();
        step
    }

    /// Fast path over `changed`, falling back to the slow path.
    fn analyze_changed(&mut self, changed: &[FileId]) -> Step {
        let Some(session) = self.session.as_mut() else {
            return Step::default();
        };
        let epoch = session.epoch;
        let set: Vec<(FileId, Arc<SourceSnapshot>)> = changed
            .iter()
            .filter_map(|&id| Some((id, Arc::clone(session.files.get(id)?))))
            .collect();

        match self.engine.run_fast_path(&set, &session.hashes) {
            Ok(diagnostics) => {
                debug!(%epoch, files = set.len(), "Fast path");
                let mut step = Step::default();
                session.publish(epoch, changed.iter().copied(), &diagnostics, &mut step.outgoing);
                step
            }
            Err(infeasible) => {
                debug!(%epoch, "{infeasible}");
                Step {
                    slow_path: session.request_slow_path(),
                    ..Step::default()
                }
            }
        }
    }

    /// Merge a finished slow run back in.
    pub fn finish_slow_path(&mut self, result: SlowPathResult) -> Step {
        let mut step = Step::default();
        let Some(session) = self.session.as_mut() else {
            return step;
        };
        session.slow_running = None;
        debug!(epoch = %result.epoch, "Slow path finished");

        session.publish(
            result.epoch,
            result.files.iter().map(|(id, _)| *id),
            &result.diagnostics,
            &mut step.outgoing,
        );
        for (id, _) in &result.files {
            if let Some(hash) = result.hashes.get(*id) {
                session.hashes.insert(*id, hash);
            }
        }

        if std::mem::take(&mut session.rerun) {
            step.slow_path = session.request_slow_path();
        }
        if session.is_idle()
            && let Some(id) = self.pending_shutdown.take()
        {
            info!("Background work drained, shutting down");
            self.lifecycle = Lifecycle::ShutDown;
            step.outgoing
                .push(Outgoing::Response(Response::ok(id, serde_json::Value::Null)));
        }
        step
    }
}

fn invalid_params(id: serde_json::Value, error: &ProtocolError) -> Step {
    Step::respond(Response::error(
        id,
        error_codes::INVALID_PARAMS,
        error.to_string(),
    ))
}
