//! End-to-end sessions over the framed transport

use std::collections::BTreeMap;

use serde_json::{Value, json};

use vigil_lsp::{Exit, ServerConfig};

use crate::common::{TestClient, file_uri, write_file};

fn config_with_links() -> ServerConfig {
    ServerConfig {
        error_url_base: Some("https://errors.example/".to_string()),
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn workspace_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_file(root, ".gitignore", "generated/\n");
    write_file(root, "lib/a.rb", "def a\n  x(\nend\n");
    write_file(root, "lib/b.rb", "def b\nend\n");
    write_file(root, "lib/c.rb", "foo(]\n");
    write_file(root, "generated/skip.rb", "((((\n");
    write_file(root, "notes.txt", "((((\n");
    let uri = |rel: &str| file_uri(&root.join(rel));

    let mut client = TestClient::start(config_with_links());
    client.initialize(root).await;

    // Initial slow path: only files with errors are announced.
    let mut initial = BTreeMap::new();
    for _ in 0..2 {
        let params = client.next_publish().await;
        initial.insert(params["uri"].as_str().unwrap().to_string(), params);
    }
    assert_eq!(
        initial.keys().cloned().collect::<Vec<_>>(),
        vec![uri("lib/a.rb"), uri("lib/c.rb")]
    );

    let unclosed = &initial[&uri("lib/a.rb")]["diagnostics"][0];
    assert_eq!(unclosed["code"], 1002);
    assert_eq!(unclosed["severity"], 1);
    assert_eq!(unclosed["source"], "vigil");
    assert_eq!(unclosed["range"]["start"], json!({"line": 1, "character": 3}));

    let mismatched = &initial[&uri("lib/c.rb")]["diagnostics"][0];
    assert_eq!(mismatched["code"], 1003);
    let related = mismatched["relatedInformation"].as_array().unwrap();
    assert_eq!(related[0]["message"], "`(` opened here");
    assert_eq!(related[0]["location"]["uri"], uri("lib/c.rb").as_str());
    assert_eq!(related[1]["location"]["uri"], "https://errors.example/1003");
    assert_eq!(mismatched["data"][0]["edit"]["newText"], ")");

    // Epoch 2: fix c.rb in place. No declarations moved, so the fast path
    // answers and clears the file.
    client
        .notify(
            "textDocument/didChange",
            json!({
                "textDocument": {"uri": uri("lib/c.rb"), "version": 2},
                "contentChanges": [{
                    "range": {"start": {"line": 0, "character": 4}, "end": {"line": 0, "character": 5}},
                    "text": ")"
                }]
            }),
        )
        .await;
    let cleared = client.next_publish().await;
    assert_eq!(cleared["uri"], uri("lib/c.rb").as_str());
    assert_eq!(cleared["diagnostics"], json!([]));

    // Epoch 3: a file the server has never analysed goes through the slow
    // path, which re-announces a.rb and records every other file silently.
    client
        .notify(
            "textDocument/didOpen",
            json!({"textDocument": {"uri": uri("lib/d.rb"), "languageId": "ruby", "version": 1, "text": "class D\nend\n"}}),
        )
        .await;
    let republished = client.next_publish().await;
    assert_eq!(republished["uri"], uri("lib/a.rb").as_str());

    let since = client
        .request("vigil/filesUpdatedSince", json!({"epoch": 3}))
        .await;
    assert_eq!(
        since["result"]["uris"],
        json!([uri("lib/a.rb"), uri("lib/b.rb"), uri("lib/c.rb"), uri("lib/d.rb")])
    );

    assert_eq!(client.shutdown_and_exit().await, Exit::AfterShutdown);
}

#[tokio::test]
async fn protocol_errors_over_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    let mut client = TestClient::start(ServerConfig::default());

    let early = client
        .request("vigil/filesUpdatedSince", json!({"epoch": 0}))
        .await;
    assert_eq!(early["error"]["code"], -32002);

    client.initialize(dir.path()).await;

    let unknown = client.request("textDocument/hover", json!({})).await;
    assert_eq!(unknown["error"]["code"], -32601);

    client
        .send(json!({
            "jsonrpc": "2.0", "id": 99, "method": "vigil/filesUpdatedSince",
            "params": {"epoch": 0}, "cancelled": true
        }))
        .await;
    let cancelled = loop {
        let frame = client.recv().await;
        if frame["id"] == 99 {
            break frame;
        }
    };
    assert_eq!(cancelled["error"]["code"], -32800);

    let bad = client
        .request("vigil/filesUpdatedSince", json!({"epoch": -1}))
        .await;
    assert_eq!(bad["error"]["code"], -32602);

    assert_eq!(client.shutdown_and_exit().await, Exit::AfterShutdown);
}

#[tokio::test]
async fn edits_to_unknown_files_start_from_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut client = TestClient::start(ServerConfig::default());
    client.initialize(dir.path()).await;
    let uri = file_uri(&dir.path().join("fresh.rb"));

    client
        .notify(
            "textDocument/didChange",
            json!({
                "textDocument": {"uri": uri},
                "contentChanges": [{
                    "range": {"start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 0}},
                    "text": "call(1"
                }]
            }),
        )
        .await;
    let published = client.next_publish().await;
    assert_eq!(published["uri"], uri.as_str());
    assert_eq!(published["diagnostics"][0]["code"], Value::from(1002));

    assert_eq!(client.shutdown_and_exit().await, Exit::AfterShutdown);
}
