//! Testing utilities and mock implementations.
//!
//! Provides an in-memory object store and fixture builders so lifecycle,
//! export and shipping flows can be exercised without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use labflow_core::testing::{fixtures, MockObjectStore};
//!
//! let objects = MockObjectStore::new();
//! objects.insert("cases/c1/top.stl", b"solid".to_vec()).await;
//!
//! let store = SqliteCaseStore::in_memory()?;
//! store.insert_clinic(&fixtures::clinic("clinic-1"))?;
//! ```

mod mock_object_store;

pub use mock_object_store::{MockObjectStore, RecordedPut};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::auth::{ActorRole, Identity};
    use crate::case::{
        Address, Case, CaseFile, CaseStage, CaseStatus, Clinic, CreateCaseRequest, FileLabel,
        Material, NewCaseFile, Patient, ProductType,
    };
    use crate::money::Money;

    /// A clinic in Minneapolis.
    pub fn clinic(id: &str) -> Clinic {
        Clinic {
            id: id.to_string(),
            name: "Lake Street Dental".to_string(),
            address: Address {
                street: "1 Lake St".to_string(),
                city: "Minneapolis".to_string(),
                state: "MN".to_string(),
                zip_code: "55401".to_string(),
            },
        }
    }

    pub fn patient() -> Patient {
        Patient {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            alias: "JD-0042".to_string(),
        }
    }

    /// A single zirconia crown with no sales rep.
    pub fn case_request(clinic_id: &str, doctor_id: &str) -> CreateCaseRequest {
        CreateCaseRequest {
            clinic_id: clinic_id.to_string(),
            doctor_id: doctor_id.to_string(),
            designer_id: None,
            sales_rep_id: None,
            patient: patient(),
            shade: "A2".to_string(),
            product: ProductType::Crown,
            material: Material::Zirconia,
            units: 1,
            cost: Money::from_cents(6000),
        }
    }

    /// An in-memory case matching [`case_request`], for tests that skip the store.
    pub fn case(id: &str, clinic_id: &str, doctor_id: &str) -> Case {
        let request = case_request(clinic_id, doctor_id);
        let now = Utc::now();
        Case {
            id: id.to_string(),
            clinic_id: request.clinic_id,
            doctor_id: request.doctor_id,
            designer_id: None,
            sales_rep_id: None,
            patient: request.patient,
            shade: request.shade,
            product: request.product,
            material: request.material,
            units: request.units,
            status: CaseStatus::InDesign,
            stage: CaseStage::Design,
            cost: request.cost,
            shipment: None,
            created_at: now,
            updated_at: now,
            designed_at: None,
            milled_at: None,
            shipped_at: None,
        }
    }

    /// Storage key used for a fixture file.
    pub fn file_key(case_id: &str, label: FileLabel, file_name: &str) -> String {
        format!("cases/{}/{}/{}", case_id, label, file_name)
    }

    pub fn new_file(case_id: &str, label: FileLabel, file_name: &str) -> NewCaseFile {
        let kind = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string());
        NewCaseFile {
            case_id: case_id.to_string(),
            label,
            kind,
            key: file_key(case_id, label, file_name),
            file_name: file_name.to_string(),
            size_bytes: 1024,
        }
    }

    pub fn case_file(case_id: &str, label: FileLabel, file_name: &str) -> CaseFile {
        let file = new_file(case_id, label, file_name);
        CaseFile {
            id: format!("{}-{}", case_id, label),
            case_id: file.case_id,
            label: file.label,
            kind: file.kind,
            key: file.key,
            file_name: file.file_name,
            size_bytes: file.size_bytes,
            created_at: Utc::now(),
        }
    }

    fn identity(user_id: &str, role: ActorRole, clinic_id: Option<&str>) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            role,
            clinic_id: clinic_id.map(str::to_string),
            method: "test".to_string(),
        }
    }

    pub fn doctor(user_id: &str, clinic_id: &str) -> Identity {
        identity(user_id, ActorRole::Customer, Some(clinic_id))
    }

    pub fn lab() -> Identity {
        identity("lab-1", ActorRole::Lab, None)
    }

    pub fn miller() -> Identity {
        identity("mill-1", ActorRole::Milling, None)
    }

    pub fn admin() -> Identity {
        identity("admin-1", ActorRole::Admin, None)
    }
}
