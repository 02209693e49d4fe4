//! Config file loading feeding a live server

use serde_json::json;

use vigil_config::VigilConfig;

use crate::common::{TestClient, file_uri, write_file};

#[test]
fn missing_sections_default() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "config.toml", "[server]\nmax_frame_bytes = 2048\n");
    let config = VigilConfig::load_from(&dir.path().join("config.toml")).unwrap();
    assert_eq!(config.server.max_frame_bytes, 2048);
    assert_eq!(config.server.file_extensions, vec!["rb", "rbi"]);
    assert_eq!(
        config.engine.declaration_keywords,
        vec!["def", "class", "module"]
    );
}

#[tokio::test]
async fn configured_extensions_drive_reindex() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "config.toml",
        "[server]\nfile_extensions = [\"rake\"]\n",
    );
    let config = VigilConfig::load_from(&dir.path().join("config.toml")).unwrap();

    let workspace = dir.path().join("ws");
    write_file(&workspace, "tasks.rake", "task(:x\n");
    write_file(&workspace, "ignored.rb", "oops(\n");

    let mut client = TestClient::start(config.server);
    client.initialize(&workspace).await;
    let published = client.next_publish().await;
    assert_eq!(
        published["uri"],
        file_uri(&workspace.join("tasks.rake")).as_str()
    );

    let since = client
        .request("vigil/filesUpdatedSince", json!({"epoch": 0}))
        .await;
    assert_eq!(since["result"]["uris"].as_array().unwrap().len(), 1);

    client.shutdown_and_exit().await;
}
