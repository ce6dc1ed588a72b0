#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end test over the Unix socket.
//!
//!   1. Start the service on a temp socket
//!   2. Connect as client and handshake
//!   3. List functions
//!   4. Remove a submission as a manager
//!   5. Hit a fatal error and an unknown method
//!   6. Query service status
//!   7. Shut down

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::Duration;

use lms_domain::{DataGenerator, InMemorySite};
use lms_external::{FeatureFlags, LangStrings};
use lms_ws_service::PROTOCOL_VERSION;
use lms_ws_service::service::WsService;
use pretty_assertions::assert_eq;
use serde_json::json;

/// Stateful client that keeps a single connection + buffered reader.
struct TestClient {
    writer: UnixStream,
    reader: BufReader<UnixStream>,
}

impl TestClient {
    fn connect(socket_path: &std::path::Path) -> Self {
        let stream = UnixStream::connect(socket_path).expect("Failed to connect to service");
        let writer = stream.try_clone().expect("clone stream");
        let reader = BufReader::new(stream);
        Self { writer, reader }
    }

    fn rpc(&mut self, msg: serde_json::Value) -> serde_json::Value {
        let mut bytes = serde_json::to_vec(&msg).expect("serialize");
        bytes.push(b'\n');
        self.writer.write_all(&bytes).expect("write");
        self.writer.flush().expect("flush");

        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response");
        serde_json::from_str(&line).unwrap_or_else(|e| panic!("parse response: {e}\nraw: {line}"))
    }

    fn handshake(&mut self) -> serde_json::Value {
        let resp = self.rpc(json!({
            "id": 0,
            "method": "hello",
            "params": {
                "protocol_version": PROTOCOL_VERSION,
                "client_version": "test-0.1.0"
            }
        }));
        assert!(resp.get("result").is_some(), "Hello should succeed: {resp}");
        resp
    }
}

struct Seeded {
    service: Arc<WsService>,
    token: String,
    assignid: i64,
    userid: i64,
}

fn seeded_service() -> Seeded {
    let site = Arc::new(InMemorySite::default());
    let g = DataGenerator::new(&site);
    let course = g.create_course();
    let cm = g.create_module("assign", course.id).unwrap();
    let assign = g.assign_instance(&cm).unwrap();
    let manager = g.create_and_enrol(&course, "manager").unwrap();
    let student = g.create_and_enrol(&course, "student").unwrap();
    g.add_submission(&assign, student.id);
    let token = g.create_token(manager.id).unwrap();

    let service = Arc::new(WsService::new(
        Arc::clone(&site),
        FeatureFlags::default(),
        Arc::new(LangStrings::english()),
    ));
    Seeded {
        service,
        token,
        assignid: assign.id,
        userid: student.id,
    }
}

/// Start the service in the background and return its shutdown switch.
async fn start_service(
    service: Arc<WsService>,
    socket_path: &std::path::Path,
) -> (
    tokio::sync::watch::Sender<bool>,
    tokio::task::JoinHandle<()>,
) {
    let listener = lms_ws_service::ipc::bind(socket_path).unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let handle = tokio::spawn(async move {
        lms_ws_service::ipc::serve(service, listener, shutdown_rx)
            .await
            .unwrap();
    });

    // Wait for socket to be ready
    for _ in 0..50 {
        if socket_path.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    (shutdown_tx, handle)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn walking_skeleton_e2e() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let socket_path = temp_dir.path().join("test-lms-ws.sock");
    let seeded = seeded_service();

    let (shutdown_tx, server_handle) =
        start_service(Arc::clone(&seeded.service), &socket_path).await;

    let mut client = TestClient::connect(&socket_path);

    // 1. Handshake
    let hello = client.handshake();
    assert_eq!(hello["result"]["protocol_version"], json!(PROTOCOL_VERSION));
    assert_eq!(
        hello["result"]["functions"],
        json!([
            "core_badges_get_external_badges",
            "core_badges_get_user_badge_by_hash",
            "mod_assign_remove_submission",
            "mod_assign_remove_submissions",
            "mod_chat_view_sessions"
        ])
    );

    // 2. Function descriptions
    let functions = client.rpc(json!({"id": 1, "method": "service.functions"}));
    let described = functions["result"]["functions"].as_array().unwrap();
    assert_eq!(described.len(), 5);
    let remove = described
        .iter()
        .find(|f| f["name"] == json!("mod_assign_remove_submission"))
        .unwrap();
    assert_eq!(remove["component"], json!("mod_assign"));
    assert_eq!(remove["output"]["keys"]["status"]["type"], json!("bool"));

    // 3. Remove a submission
    let removed = client.rpc(json!({
        "id": 2,
        "method": "mod_assign_remove_submission",
        "params": {
            "wstoken": seeded.token,
            "args": {"assignid": seeded.assignid, "userid": seeded.userid}
        }
    }));
    assert_eq!(removed["id"], json!(2));
    assert_eq!(removed["result"], json!({"status": true, "warnings": []}));

    // 4. Fatal error carries the error code
    let missing = client.rpc(json!({
        "id": 3,
        "method": "mod_assign_remove_submission",
        "params": {
            "wstoken": seeded.token,
            "args": {"assignid": 987654, "userid": seeded.userid}
        }
    }));
    assert_eq!(missing["error"]["code"], json!(404));
    assert_eq!(missing["error"]["data"]["errorcode"], json!("invalidrecord"));

    // 5. Unknown method and missing params
    let unknown = client.rpc(json!({"id": 4, "method": "core_course_get_courses"}));
    assert_eq!(unknown["error"]["code"], json!(-32601));
    let no_params = client.rpc(json!({"id": 5, "method": "mod_chat_view_sessions"}));
    assert_eq!(no_params["error"]["code"], json!(-32602));

    // 6. Service status
    let status = client.rpc(json!({"id": "status", "method": "service.status"}));
    let result = &status["result"];
    assert_eq!(result["calls_served"], json!(1));
    assert_eq!(result["calls_failed"], json!(1));
    assert_eq!(result["functions"], json!(5));

    // 7. Shutdown
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server_handle)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stale_socket_is_replaced() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let socket_path = temp_dir.path().join("stale.sock");
    std::fs::write(&socket_path, b"stale").unwrap();

    let seeded = seeded_service();
    let (shutdown_tx, server_handle) = start_service(seeded.service, &socket_path).await;

    let mut client = TestClient::connect(&socket_path);
    client.handshake();

    drop(shutdown_tx);
    tokio::time::timeout(Duration::from_secs(5), server_handle)
        .await
        .expect("server should stop when the shutdown sender drops")
        .unwrap();
}
