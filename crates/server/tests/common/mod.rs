//! Common test utilities for in-process API testing.
//!
//! The fixture wires the real router over a temporary SQLite database and an
//! in-memory object store, authenticating callers through gateway headers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use labflow_core::case::{CaseStore, FileLabel};
use labflow_core::testing::MockObjectStore;
use labflow_core::{
    create_audit_system, load_config_from_str, AuditStore, CaseLifecycle, CaseStatus, Identity,
    PriceTable, SqliteAuditStore, SqliteCaseStore, TransitionRequest,
};

/// Re-export fixtures for test convenience
pub use labflow_core::testing::fixtures;

pub const CLINIC_ID: &str = "clinic-1";
pub const DOCTOR_ID: &str = "doctor-1";

/// Labels every seeded production-ready case carries.
pub const PRODUCTION_FILES: [(FileLabel, &str); 4] = [
    (FileLabel::ConstructionInfo, "crown.constructionInfo"),
    (FileLabel::ModelTop, "upper.stl"),
    (FileLabel::ModelBottom, "lower.stl"),
    (FileLabel::RxPdf, "rx.pdf"),
];

/// In-process server with a real case store and a mock object store.
pub struct TestFixture {
    pub router: Router,
    pub cases: Arc<SqliteCaseStore>,
    pub objects: MockObjectStore,
    pub audit_store: Arc<SqliteAuditStore>,
    /// Seeds files and statuses directly, bypassing HTTP
    pub lifecycle: CaseLifecycle,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub bytes: Bytes,
}

impl TestFixture {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = load_config_from_str(&format!(
            r#"
[auth]
method = "header"

[server]
host = "127.0.0.1"
port = 8080

[database]
path = "{}"
"#,
            db_path.display()
        ))
        .expect("Failed to build config");

        let cases = Arc::new(SqliteCaseStore::new(&db_path).expect("Failed to open case store"));
        cases
            .insert_clinic(&fixtures::clinic(CLINIC_ID))
            .expect("Failed to insert clinic");
        let audit_store =
            Arc::new(SqliteAuditStore::new(&db_path).expect("Failed to create audit store"));
        let objects = MockObjectStore::new();

        let (audit_handle, audit_writer) =
            create_audit_system(audit_store.clone() as Arc<dyn AuditStore>, 100);
        tokio::spawn(audit_writer.run());

        let authenticator = Arc::from(
            labflow_core::create_authenticator(&config.auth).expect("Failed to create auth"),
        );

        let state = Arc::new(labflow_server::state::AppState::new(
            config,
            authenticator,
            audit_handle,
            audit_store.clone(),
            cases.clone(),
            Arc::new(objects.clone()),
            PriceTable::standard(),
        ));

        Self {
            router: labflow_server::api::create_router(state),
            lifecycle: CaseLifecycle::new(cases.clone(), PriceTable::standard()),
            cases,
            objects,
            audit_store,
            temp_dir,
        }
    }

    /// Insert a fresh `IN_DESIGN` case for the default doctor.
    pub fn new_case(&self) -> String {
        self.cases
            .insert_case(fixtures::case_request(CLINIC_ID, DOCTOR_ID))
            .expect("Failed to insert case")
            .id
    }

    /// Attach a file to a case and store its bytes.
    pub async fn attach(&self, case_id: &str, label: FileLabel, file_name: &str) -> String {
        let file = self
            .lifecycle
            .attach_file(&fixtures::lab(), fixtures::new_file(case_id, label, file_name))
            .await
            .expect("Failed to attach file");
        self.objects
            .insert(&file.key, format!("{} bytes", file_name).into_bytes())
            .await;
        file.key
    }

    /// A case with every production file attached, moved to `status`.
    pub async fn case_in(&self, status: CaseStatus) -> String {
        let id = self.new_case();
        for (label, name) in PRODUCTION_FILES {
            self.attach(&id, label, name).await;
        }

        let path: &[CaseStatus] = match status {
            CaseStatus::InDesign => &[],
            CaseStatus::ReadyForReview => &[CaseStatus::ReadyForReview],
            CaseStatus::Approved => &[CaseStatus::ReadyForReview, CaseStatus::Approved],
            CaseStatus::InMilling => &[
                CaseStatus::ReadyForReview,
                CaseStatus::Approved,
                CaseStatus::InMilling,
            ],
            other => panic!("case_in does not seed {:?}", other),
        };
        for to in path {
            self.lifecycle
                .request_transition(TransitionRequest {
                    case_id: id.clone(),
                    to: *to,
                    actor: fixtures::admin(),
                    note: None,
                    waive_fee: false,
                })
                .await
                .expect("Failed to seed status");
        }
        id
    }

    pub fn status_of(&self, case_id: &str) -> CaseStatus {
        self.cases
            .get_case(case_id)
            .expect("Failed to read case")
            .expect("Case missing")
            .status
    }

    pub async fn get(&self, path: &str, identity: &Identity) -> TestResponse {
        self.request("GET", path, Some(identity), None).await
    }

    pub async fn post(&self, path: &str, identity: &Identity, body: Value) -> TestResponse {
        self.request("POST", path, Some(identity), Some(body)).await
    }

    /// Send a request without identity headers.
    pub async fn get_anonymous(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        identity: Option<&Identity>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(identity) = identity {
            request_builder = request_builder
                .header("X-User-Id", &identity.user_id)
                .header("X-User-Role", identity.role.as_str());
            if let Some(ref clinic_id) = identity.clinic_id {
                request_builder = request_builder.header("X-Clinic-Id", clinic_id);
            }
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            bytes,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
