//! Shared test utilities and fixtures
//!
//! A scripted client that talks to an in-process server over a duplex pipe.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use url::Url;

use vigil_lsp::codec::FrameReader;
use vigil_lsp::{DelimiterEngine, Dispatcher, EngineConfig, Exit, ServerConfig};

pub struct TestClient {
    reader: FrameReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    next_id: u64,
    server: JoinHandle<anyhow::Result<Exit>>,
}

impl TestClient {
    pub fn start(config: ServerConfig) -> Self {
        let (client, server) = tokio::io::duplex(256 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, client_write) = tokio::io::split(client);
        let engine = Arc::new(DelimiterEngine::new(&EngineConfig::default()));
        let dispatcher = Dispatcher::new(engine, config);
        Self {
            reader: FrameReader::new(client_read),
            writer: client_write,
            next_id: 1,
            server: tokio::spawn(vigil_lsp::run(server_read, server_write, dispatcher)),
        }
    }

    pub async fn send(&mut self, frame: Value) {
        let body = frame.to_string();
        let framed = format!("Content-Length: {}\r\n\r\n{body}", body.len());
        self.writer.write_all(framed.as_bytes()).await.unwrap();
    }

    pub async fn notify(&mut self, method: &str, params: Value) {
        self.send(json!({"jsonrpc": "2.0", "method": method, "params": params}))
            .await;
    }

    /// Send a request and wait for its response, skipping notifications.
    pub async fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        self.send(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await;
        loop {
            let frame = self.recv().await;
            if frame["id"] == id {
                return frame;
            }
        }
    }

    pub async fn recv(&mut self) -> Value {
        let body = tokio::time::timeout(Duration::from_secs(10), self.reader.read_frame())
            .await
            .expect("timed out waiting for a frame")
            .unwrap()
            .expect("stream ended");
        serde_json::from_slice(&body).unwrap()
    }

    /// Next `publishDiagnostics` params.
    pub async fn next_publish(&mut self) -> Value {
        loop {
            let frame = self.recv().await;
            if frame["method"] == "textDocument/publishDiagnostics" {
                return frame["params"].clone();
            }
        }
    }

    pub async fn initialize(&mut self, root: &Path) -> Value {
        let response = self
            .request("initialize", json!({"rootUri": file_uri(root)}))
            .await;
        assert!(response.get("error").is_none(), "initialize failed: {response}");
        self.notify("initialized", json!({})).await;
        response
    }

    pub async fn shutdown_and_exit(mut self) -> Exit {
        let response = self.request("shutdown", Value::Null).await;
        assert!(response["result"].is_null());
        self.notify("exit", Value::Null).await;
        self.server.await.unwrap().unwrap()
    }
}

pub fn file_uri(path: &Path) -> String {
    Url::from_file_path(path).unwrap().to_string()
}

pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}
