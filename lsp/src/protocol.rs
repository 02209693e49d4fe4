//! JSON-RPC message shapes: what the core reads and what it writes.

use std::path::{Component, Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use vigil_types::{ContentChange, DiagnosticSeverity, WirePosition};

pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const SERVER_NOT_INITIALIZED: i64 = -32002;
    pub const REQUEST_CANCELLED: i64 = -32800;
}

pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "initialized";
    pub const SHUTDOWN: &str = "shutdown";
    pub const EXIT: &str = "exit";
    pub const DID_OPEN: &str = "textDocument/didOpen";
    pub const DID_CHANGE: &str = "textDocument/didChange";
    pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";
    pub const FILES_UPDATED_SINCE: &str = "vigil/filesUpdatedSince";
}

/// Malformed payloads, rejected before they reach the core.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("{method}: missing params")]
    MissingParams { method: String },
    #[error("{method}: invalid params: {source}")]
    InvalidParams {
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid root URI: {uri}")]
    InvalidRootUri { uri: String },
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Incoming {
    Request {
        id: serde_json::Value,
        method: String,
        params: Option<serde_json::Value>,
        cancelled: bool,
    },
    Notification {
        method: String,
        params: Option<serde_json::Value>,
    },
    /// A response to something we sent. The core never sends requests.
    Response,
}

pub(crate) fn parse_incoming(frame: &serde_json::Value) -> Option<Incoming> {
    let id = frame.get("id").filter(|id| !id.is_null());
    let method = frame
        .get("method")
        .and_then(serde_json::Value::as_str)
        .map(String::from);
    let has_result_or_error = frame.get("result").is_some() || frame.get("error").is_some();

    match (id, method, has_result_or_error) {
        (Some(id), Some(method), _) => Some(Incoming::Request {
            id: id.clone(),
            method,
            params: frame.get("params").cloned(),
            cancelled: frame.get("cancelled").is_some(),
        }),
        (None, Some(method), _) => Some(Incoming::Notification {
            method,
            params: frame.get("params").cloned(),
        }),
        (Some(_), None, true) => Some(Incoming::Response),
        _ => None,
    }
}

pub(crate) fn parse_params<T: DeserializeOwned>(
    method: &str,
    params: Option<serde_json::Value>,
) -> Result<T, ProtocolError> {
    let params = params.ok_or_else(|| ProtocolError::MissingParams {
        method: method.to_string(),
    })?;
    serde_json::from_value(params).map_err(|source| ProtocolError::InvalidParams {
        method: method.to_string(),
        source,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeParams {
    pub root_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DidOpenParams {
    pub text_document: TextDocumentItem,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextDocumentItem {
    pub uri: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DidChangeParams {
    pub text_document: TextDocumentIdentifier,
    pub content_changes: Vec<ContentChange>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextDocumentIdentifier {
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilesUpdatedSinceParams {
    pub epoch: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    pub fn ok(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: serde_json::Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(ResponseError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification<'a, P> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: &'a P,
}

impl<'a, P: Serialize> Notification<'a, P> {
    pub fn new(method: &'static str, params: &'a P) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LspRange {
    pub start: WirePosition,
    pub end: WirePosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LspLocation {
    pub uri: String,
    pub range: LspRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedInformation {
    pub location: LspLocation,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LspTextEdit {
    pub range: LspRange,
    pub new_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LspFix {
    pub title: String,
    pub edit: LspTextEdit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LspDiagnostic {
    pub range: LspRange,
    pub severity: DiagnosticSeverity,
    pub code: u16,
    pub source: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<RelatedInformation>,
    /// Suggested fixes, for a code-action handler to pick up.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<LspFix>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishDiagnosticsParams {
    pub uri: String,
    pub diagnostics: Vec<LspDiagnostic>,
}

/// Everything the core asks the transport to send.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Response(Response),
    Publish(PublishDiagnosticsParams),
}

impl Outgoing {
    pub fn to_frame(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Response(response) => serde_json::to_value(response),
            Self::Publish(params) => serde_json::to_value(Notification::new(
                methods::PUBLISH_DIAGNOSTICS,
                params,
            )),
        }
    }
}

/// The workspace root, mapping client URIs to workspace-relative paths.
#[derive(Debug, Clone)]
pub struct WorkspaceRoot {
    uri: Url,
    dir: PathBuf,
}

impl WorkspaceRoot {
    pub fn from_uri(root_uri: &str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidRootUri {
            uri: root_uri.to_string(),
        };
        let uri = Url::parse(root_uri).map_err(|_| invalid())?;
        let dir = uri.to_file_path().map_err(|()| invalid())?;
        Ok(Self {
            uri,
            dir: normalize_path(&dir),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        self.uri.as_str()
    }

    /// Workspace-relative, `/`-separated path for `uri`, or `None` when the
    /// URI is not a file inside the root.
    #[must_use]
    pub fn to_local(&self, uri: &str) -> Option<String> {
        let path = Url::parse(uri).ok()?.to_file_path().ok()?;
        let relative = normalize_path(&path).strip_prefix(&self.dir).ok()?.to_path_buf();
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("/"))
    }

    /// Client URI for a workspace-relative path.
    #[must_use]
    pub fn to_remote(&self, local: &str) -> String {
        let path = local
            .split('/')
            .fold(self.dir.clone(), |acc, part| acc.join(part));
        match Url::from_file_path(&path) {
            Ok(url) => url.to_string(),
            Err(()) => format!("{}/{local}", self.uri.as_str().trim_end_matches('/')),
        }
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut out = Vec::new();
    for c in path.components() {
        match c {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out.iter().collect()
}
