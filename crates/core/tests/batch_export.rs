//! Production batch integration tests.
//!
//! Cases live in a file-backed SQLite store and their files in a filesystem
//! object store, so archive assembly reads real objects from disk.

use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use labflow_core::{
    case::{CaseStore, FileLabel},
    storage::FsObjectStore,
    testing::fixtures,
    BatchExporter, CaseError, CaseLifecycle, CaseStatus, Money, ObjectStore, PriceTable,
    ShipRequest, ShippingBatchRecorder, SqliteCaseStore, TransitionRequest,
};

const CLINIC: &str = "clinic-1";

fn export_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
}

struct TestHarness {
    store: Arc<SqliteCaseStore>,
    objects: Arc<FsObjectStore>,
    lifecycle: Arc<CaseLifecycle>,
    exporter: BatchExporter,
    shipping: ShippingBatchRecorder,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteCaseStore::new(&temp_dir.path().join("cases.db"))
                .expect("Failed to create case store"),
        );
        store
            .insert_clinic(&fixtures::clinic(CLINIC))
            .expect("Failed to insert clinic");
        let objects = Arc::new(FsObjectStore::new(temp_dir.path().join("objects")));
        let lifecycle = Arc::new(CaseLifecycle::new(store.clone(), PriceTable::standard()));
        let exporter = BatchExporter::new(store.clone(), objects.clone(), lifecycle.clone(), 3);
        let shipping = ShippingBatchRecorder::new(store.clone());

        Self {
            store,
            objects,
            lifecycle,
            exporter,
            shipping,
            _temp_dir: temp_dir,
        }
    }

    /// Insert a case; `stored` controls whether each file's bytes are written.
    async fn case_with_files(&self, files: &[(FileLabel, &str, bool)]) -> String {
        let id = self
            .store
            .insert_case(fixtures::case_request(CLINIC, "doctor-1"))
            .expect("Failed to insert case")
            .id;

        for (label, name, stored) in files {
            let file = self
                .lifecycle
                .attach_file(&fixtures::lab(), fixtures::new_file(&id, *label, name))
                .await
                .expect("Failed to attach file");
            if *stored {
                self.objects
                    .put_object(name.as_bytes().to_vec(), &file.key, "application/octet-stream")
                    .await
                    .expect("Failed to store object");
            }
        }
        id
    }

    async fn approved_case(&self) -> String {
        let id = self
            .case_with_files(&[
                (FileLabel::ConstructionInfo, "crown.constructionInfo", true),
                (FileLabel::ModelTop, "upper.stl", true),
                (FileLabel::ModelBottom, "lower.stl", true),
            ])
            .await;
        self.lifecycle
            .request_transition(TransitionRequest {
                case_id: id.clone(),
                to: CaseStatus::Approved,
                actor: fixtures::admin(),
                note: None,
                waive_fee: false,
            })
            .await
            .expect("Failed to approve");
        id
    }

    fn status_of(&self, id: &str) -> CaseStatus {
        self.store.get_case(id).unwrap().unwrap().status
    }
}

fn zip_contents(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            (entry.name().to_string(), content)
        })
        .collect()
}

#[tokio::test]
async fn test_export_contains_only_cases_with_files() {
    let harness = TestHarness::new();

    // Five selected cases, two of them with production files
    let first = harness.approved_case().await;
    let second = harness
        .case_with_files(&[(FileLabel::RxPdf, "rx.pdf", true), (FileLabel::Scan, "scan.stl", true)])
        .await;
    let scans_only = harness
        .case_with_files(&[(FileLabel::Scan, "scan.stl", true)])
        .await;
    let attachments_only = harness
        .case_with_files(&[(FileLabel::Attachment, "photo.jpg", true)])
        .await;
    let empty = harness.case_with_files(&[]).await;

    let ids = vec![
        first.clone(),
        second.clone(),
        scans_only.clone(),
        attachments_only.clone(),
        empty.clone(),
    ];
    let outcome = harness
        .exporter
        .export(&ids, &fixtures::miller(), export_date())
        .await
        .unwrap();

    let archive = outcome.archive;
    assert_eq!(archive.file_name, "Download_03-07-2026.zip");
    assert!(archive.skipped.is_empty());

    let root = "Download_03-07-2026/LakeStreetDental55401/DoeJaneA2CrownZirconia";
    let names: BTreeSet<String> = zip_contents(&archive.bytes)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    let expected: BTreeSet<String> = [
        format!("{}/JD0042_File.constructionInfo", root),
        format!("{}/JD0042_ModelTop.stl", root),
        format!("{}/JD0042_ModelBottom.stl", root),
        // Same patient and product, so the second case lands in the same folder
        format!("{}/JD0042_RX.pdf", root),
    ]
    .into_iter()
    .collect();
    assert_eq!(names, expected);

    let included_cases: BTreeSet<&str> =
        archive.included.iter().map(|e| e.case_id.as_str()).collect();
    assert_eq!(
        included_cases,
        [first.as_str(), second.as_str()].into_iter().collect()
    );

    // Only the approved case moves to milling
    assert_eq!(outcome.released, vec![first.clone()]);
    assert_eq!(harness.status_of(&first), CaseStatus::InMilling);
    for id in [&second, &scans_only, &attachments_only, &empty] {
        assert_eq!(harness.status_of(id), CaseStatus::InDesign);
    }

    let events = harness.store.list_status_events(&first).unwrap();
    let release = events.last().unwrap();
    assert_eq!(release.from, CaseStatus::Approved);
    assert_eq!(release.to, CaseStatus::InMilling);
    assert_eq!(release.actor_id, "mill-1");
}

#[tokio::test]
async fn test_export_omits_missing_objects() {
    let harness = TestHarness::new();
    let id = harness
        .case_with_files(&[
            (FileLabel::ModelTop, "upper.stl", true),
            (FileLabel::ModelBottom, "lower.stl", false),
            (FileLabel::DesignOnly, "crown.stl", true),
        ])
        .await;

    let outcome = harness
        .exporter
        .export(&[id.clone()], &fixtures::admin(), export_date())
        .await
        .unwrap();

    let contents = zip_contents(&outcome.archive.bytes);
    assert_eq!(contents.len(), 2);
    assert!(contents
        .iter()
        .any(|(name, body)| name.ends_with("JD0042_ModelTop.stl") && body == "upper.stl"));
    assert!(contents
        .iter()
        .any(|(name, body)| name.ends_with("JD0042_Design.stl") && body == "crown.stl"));

    assert_eq!(outcome.archive.skipped.len(), 1);
    assert!(outcome.archive.skipped[0].path.ends_with("JD0042_ModelBottom.stl"));
}

#[tokio::test]
async fn test_export_with_every_object_missing_still_succeeds() {
    let harness = TestHarness::new();
    let id = harness
        .case_with_files(&[(FileLabel::ModelTop, "upper.stl", false)])
        .await;

    let outcome = harness
        .exporter
        .export(&[id.clone()], &fixtures::admin(), export_date())
        .await
        .unwrap();

    assert_eq!(outcome.archive.file_name, "Download_03-07-2026.zip");
    assert!(zip_contents(&outcome.archive.bytes).is_empty());
    assert!(outcome.archive.included.is_empty());
    assert_eq!(outcome.archive.skipped.len(), 1);
    assert!(outcome.archive.skipped[0].path.ends_with("JD0042_ModelTop.stl"));
    assert_eq!(harness.status_of(&id), CaseStatus::InDesign);
}

#[tokio::test]
async fn test_export_rejections_leave_cases_untouched() {
    let harness = TestHarness::new();
    let approved = harness.approved_case().await;

    let result = harness
        .exporter
        .export(&[approved.clone()], &fixtures::lab(), export_date())
        .await;
    assert!(matches!(result, Err(CaseError::Unauthorized(_))));

    let result = harness
        .exporter
        .export(
            &[approved.clone(), "ghost".to_string()],
            &fixtures::miller(),
            export_date(),
        )
        .await;
    match result {
        Err(CaseError::CasesNotFound(missing)) => assert_eq!(missing, vec!["ghost".to_string()]),
        other => panic!("expected CasesNotFound, got {:?}", other.err()),
    }

    let bare = harness
        .case_with_files(&[(FileLabel::Scan, "scan.stl", true)])
        .await;
    let result = harness
        .exporter
        .export(&[bare], &fixtures::miller(), export_date())
        .await;
    assert!(matches!(result, Err(CaseError::NoProductionFiles)));

    assert_eq!(harness.status_of(&approved), CaseStatus::Approved);
}

#[tokio::test]
async fn test_export_then_ship() {
    let harness = TestHarness::new();
    let first = harness.approved_case().await;
    let second = harness.approved_case().await;
    let late = harness.approved_case().await;

    harness
        .exporter
        .export(
            &[first.clone(), second.clone()],
            &fixtures::miller(),
            export_date(),
        )
        .await
        .unwrap();

    // One case still approved: the whole batch is refused
    let request = |ids: Vec<String>| ShipRequest {
        case_ids: ids,
        carrier: "UPS".to_string(),
        tracking_number: "1Z999AA1".to_string(),
        shipping_cost: Some(Money::from_cents(2200)),
        actor: fixtures::miller(),
    };
    match harness
        .shipping
        .ship(request(vec![first.clone(), late.clone(), second.clone()]))
        .await
    {
        Err(CaseError::ShippingRejected { case_ids }) => assert_eq!(case_ids, vec![late.clone()]),
        other => panic!("expected ShippingRejected, got {:?}", other),
    }
    assert_eq!(harness.status_of(&first), CaseStatus::InMilling);
    assert_eq!(harness.status_of(&second), CaseStatus::InMilling);

    let outcome = harness
        .shipping
        .ship(request(vec![first.clone(), second.clone()]))
        .await
        .unwrap();

    let batch = harness.shipping.batch(&outcome.batch_id).unwrap();
    assert_eq!(batch.case_ids.len(), 2);
    assert_eq!(batch.shipping_cost, Some(Money::from_cents(2200)));
    for id in [&first, &second] {
        let case = harness.store.get_case(id).unwrap().unwrap();
        assert_eq!(case.status, CaseStatus::Shipped);
        assert_eq!(case.shipment.unwrap().tracking_number, "1Z999AA1");
    }
    assert_eq!(harness.status_of(&late), CaseStatus::Approved);
}
