//! Global lookup lifecycle. Runs in its own test binary so the
//! "nothing created yet" state is observable.

use std::sync::Arc;

use authgate_api::{GuardConfig, GuardError, Method, USER_PATH};
use authgate_connectors::RecordingTransport;
use authgate_runtime::{create_guard_client, global_guard_client};
use serde_json::json;

#[tokio::test]
async fn lookup_fails_until_created_then_follows_latest() {
    assert!(matches!(
        global_guard_client(),
        Err(GuardError::NotInitialized)
    ));

    let first = create_guard_client(
        GuardConfig::with_base_url("/api"),
        Arc::new(RecordingTransport::new()),
    )
    .unwrap();
    assert!(global_guard_client().unwrap().same_client(&first));

    let transport = Arc::new(RecordingTransport::new());
    transport.ok(Method::Get, USER_PATH, json!({"id": 2, "roles": ["admin"]}));
    let second = create_guard_client(GuardConfig::with_base_url("/api"), transport).unwrap();

    let global = global_guard_client().unwrap();
    assert!(global.same_client(&second));
    assert!(!global.same_client(&first));

    global.fetch_user().await;
    assert!(second.is_authenticated());
    assert!(!first.is_authenticated());
}
