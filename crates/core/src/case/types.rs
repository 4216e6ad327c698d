//! Core case data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Error returned when a boundary string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Implements `as_str`, `Display` and `FromStr` for a closed enum from one table.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(ParseEnumError::new($kind, other)),
                }
            }
        }
    };
}

// ============================================================================
// Status and stage
// ============================================================================

/// Fine-grained workflow state of a case.
///
/// ```text
/// InDesign <-> ReadyForReview -> ChangesRequested -> InDesign ...
///     |              |
///     +--------------+--> Approved -> InMilling -> Shipped -> Completed -> Delivered
///
/// Any non-terminal state can move to Cancelled.
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    InDesign,
    ReadyForReview,
    ChangesRequested,
    Approved,
    InMilling,
    Shipped,
    Completed,
    Delivered,
    Cancelled,
}

string_enum!(CaseStatus, "status", {
    InDesign => "IN_DESIGN",
    ReadyForReview => "READY_FOR_REVIEW",
    ChangesRequested => "CHANGES_REQUESTED",
    Approved => "APPROVED",
    InMilling => "IN_MILLING",
    Shipped => "SHIPPED",
    Completed => "COMPLETED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

impl CaseStatus {
    /// Stage a case lands in when it transitions to this status.
    ///
    /// Returns `None` for `Cancelled`: cancellation keeps whatever stage the
    /// case had reached.
    pub fn target_stage(&self) -> Option<CaseStage> {
        match self {
            CaseStatus::InMilling => Some(CaseStage::MillingGlazing),
            CaseStatus::Shipped => Some(CaseStage::Shipping),
            CaseStatus::Completed => Some(CaseStage::Completed),
            CaseStatus::Delivered => Some(CaseStage::Delivered),
            CaseStatus::Cancelled => None,
            CaseStatus::InDesign
            | CaseStatus::ReadyForReview
            | CaseStatus::ChangesRequested
            | CaseStatus::Approved => Some(CaseStage::Design),
        }
    }

    /// Whether physical production has started (milling or later).
    ///
    /// This is the single source for the "already produced" question; the
    /// stage column is derived from status and never consulted for it.
    pub fn is_produced(&self) -> bool {
        matches!(
            self,
            CaseStatus::InMilling | CaseStatus::Shipped | CaseStatus::Completed | CaseStatus::Delivered
        )
    }

    /// Whether the case has been approved at some point (or is past approval).
    pub fn is_approved_or_later(&self) -> bool {
        matches!(
            self,
            CaseStatus::Approved
                | CaseStatus::InMilling
                | CaseStatus::Shipped
                | CaseStatus::Completed
                | CaseStatus::Delivered
                | CaseStatus::Cancelled
        )
    }

    /// Terminal states accept no further transitions in normal flow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Cancelled | CaseStatus::Delivered)
    }
}

/// Coarse production phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStage {
    Design,
    MillingGlazing,
    Shipping,
    Completed,
    Delivered,
}

string_enum!(CaseStage, "stage", {
    Design => "DESIGN",
    MillingGlazing => "MILLING_GLAZING",
    Shipping => "SHIPPING",
    Completed => "COMPLETED",
    Delivered => "DELIVERED",
});

// ============================================================================
// Product and material
// ============================================================================

/// Restoration type ordered for a case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Crown,
    Bridge,
    Veneer,
    Inlay,
    Onlay,
    ImplantCrown,
    NightGuard,
    Denture,
}

string_enum!(ProductType, "product", {
    Crown => "crown",
    Bridge => "bridge",
    Veneer => "veneer",
    Inlay => "inlay",
    Onlay => "onlay",
    ImplantCrown => "implant_crown",
    NightGuard => "night_guard",
    Denture => "denture",
});

impl ProductType {
    /// CamelCase name used in export folder names.
    pub fn camel_case(&self) -> &'static str {
        match self {
            ProductType::Crown => "Crown",
            ProductType::Bridge => "Bridge",
            ProductType::Veneer => "Veneer",
            ProductType::Inlay => "Inlay",
            ProductType::Onlay => "Onlay",
            ProductType::ImplantCrown => "ImplantCrown",
            ProductType::NightGuard => "NightGuard",
            ProductType::Denture => "Denture",
        }
    }

    /// Single-material products don't carry the material in folder names.
    pub fn material_is_meaningful(&self) -> bool {
        !matches!(self, ProductType::NightGuard | ProductType::Denture)
    }
}

/// Restoration material.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Zirconia,
    Emax,
    Pmma,
    Composite,
}

string_enum!(Material, "material", {
    Zirconia => "zirconia",
    Emax => "emax",
    Pmma => "pmma",
    Composite => "composite",
});

impl Material {
    pub fn display_name(&self) -> &'static str {
        match self {
            Material::Zirconia => "Zirconia",
            Material::Emax => "EMax",
            Material::Pmma => "PMMA",
            Material::Composite => "Composite",
        }
    }
}

// ============================================================================
// Files
// ============================================================================

/// Fixed role of a stored case artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FileLabel {
    Scan,
    DesignOnly,
    DesignWithModel,
    ConstructionInfo,
    ModelTop,
    ModelBottom,
    RxPdf,
    Attachment,
}

string_enum!(FileLabel, "file label", {
    Scan => "scan",
    DesignOnly => "design_only",
    DesignWithModel => "design_with_model",
    ConstructionInfo => "construction_info",
    ModelTop => "model_top",
    ModelBottom => "model_bottom",
    RxPdf => "rx_pdf",
    Attachment => "attachment",
});

/// Labels that must all be present before a case can be approved.
pub const REQUIRED_FOR_APPROVAL: [FileLabel; 3] = [
    FileLabel::ConstructionInfo,
    FileLabel::ModelTop,
    FileLabel::ModelBottom,
];

impl FileLabel {
    /// Slot labels hold at most one live file; uploading retires the previous one.
    pub fn is_replace_slot(&self) -> bool {
        matches!(
            self,
            FileLabel::Scan
                | FileLabel::DesignOnly
                | FileLabel::DesignWithModel
                | FileLabel::ConstructionInfo
                | FileLabel::ModelTop
                | FileLabel::ModelBottom
        )
    }

    /// Files produced by the design step.
    pub fn is_design_output(&self) -> bool {
        matches!(
            self,
            FileLabel::DesignOnly
                | FileLabel::DesignWithModel
                | FileLabel::ConstructionInfo
                | FileLabel::ModelTop
                | FileLabel::ModelBottom
        )
    }

    /// Archive file name suffix, `None` for files that are not exported.
    pub fn export_suffix(&self) -> Option<&'static str> {
        match self {
            FileLabel::ModelTop => Some("_ModelTop"),
            FileLabel::ModelBottom => Some("_ModelBottom"),
            FileLabel::RxPdf => Some("_RX"),
            FileLabel::DesignOnly | FileLabel::DesignWithModel => Some("_Design"),
            FileLabel::ConstructionInfo => Some("_File"),
            FileLabel::Scan | FileLabel::Attachment => None,
        }
    }

    /// Whether manufacturing consumes this file.
    pub fn is_production_relevant(&self) -> bool {
        self.export_suffix().is_some()
    }
}

/// One stored artifact of a case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseFile {
    pub id: String,
    pub case_id: String,
    pub label: FileLabel,
    /// Format tag, e.g. "stl" or "pdf".
    pub kind: String,
    /// Object storage key.
    pub key: String,
    /// Original upload name.
    pub file_name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl CaseFile {
    /// Extension (without dot) taken from the original name, falling back to the kind.
    pub fn extension(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
            _ => &self.kind,
        }
    }
}

/// Request to store a new file in a case slot.
#[derive(Debug, Clone)]
pub struct NewCaseFile {
    pub case_id: String,
    pub label: FileLabel,
    pub kind: String,
    pub key: String,
    pub file_name: String,
    pub size_bytes: u64,
}

// ============================================================================
// Case
// ============================================================================

/// Patient identification carried on a case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub first_name: String,
    pub last_name: String,
    /// Chart alias used in exported file names.
    pub alias: String,
}

/// Carrier record written when a case ships as part of a batch.
///
/// Present only as a whole: a case either has every shipping field or none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shipment {
    pub batch_id: String,
    pub carrier: String,
    pub tracking_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Money>,
}

/// One production order for a patient restoration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    pub id: String,
    pub clinic_id: String,
    pub doctor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_rep_id: Option<String>,
    pub patient: Patient,
    pub shade: String,
    pub product: ProductType,
    pub material: Material,
    pub units: u32,
    pub status: CaseStatus,
    pub stage: CaseStage,
    pub cost: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment: Option<Shipment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
}

impl Case {
    pub fn has_sales_rep(&self) -> bool {
        self.sales_rep_id.is_some()
    }
}

/// Request to create a case (used by the case-creation workflow and tests).
#[derive(Debug, Clone)]
pub struct CreateCaseRequest {
    pub clinic_id: String,
    pub doctor_id: String,
    pub designer_id: Option<String>,
    pub sales_rep_id: Option<String>,
    pub patient: Patient,
    pub shade: String,
    pub product: ProductType,
    pub material: Material,
    pub units: u32,
    /// Quoted price of the order.
    pub cost: Money,
}

/// Append-only record of an accepted status transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusEvent {
    pub id: i64,
    pub case_id: String,
    pub from: CaseStatus,
    pub to: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

/// A status event before it has been assigned an id.
#[derive(Debug, Clone)]
pub struct NewStatusEvent {
    pub case_id: String,
    pub from: CaseStatus,
    pub to: CaseStatus,
    pub note: Option<String>,
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Clinic
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Ordering clinic; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Clinic {
    pub id: String,
    pub name: String,
    pub address: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in CaseStatus::ALL {
            assert_eq!(status.as_str().parse::<CaseStatus>().unwrap(), *status);
        }
        assert!("SHIPPING".parse::<CaseStatus>().is_err());
    }

    #[test]
    fn test_status_serde_uses_screaming_case() {
        let json = serde_json::to_string(&CaseStatus::ReadyForReview).unwrap();
        assert_eq!(json, "\"READY_FOR_REVIEW\"");
        let stage: CaseStage = serde_json::from_str("\"MILLING_GLAZING\"").unwrap();
        assert_eq!(stage, CaseStage::MillingGlazing);
    }

    #[test]
    fn test_target_stage() {
        assert_eq!(CaseStatus::InMilling.target_stage(), Some(CaseStage::MillingGlazing));
        assert_eq!(CaseStatus::Shipped.target_stage(), Some(CaseStage::Shipping));
        assert_eq!(CaseStatus::Completed.target_stage(), Some(CaseStage::Completed));
        assert_eq!(CaseStatus::Delivered.target_stage(), Some(CaseStage::Delivered));
        assert_eq!(CaseStatus::Approved.target_stage(), Some(CaseStage::Design));
        assert_eq!(CaseStatus::ChangesRequested.target_stage(), Some(CaseStage::Design));
        assert_eq!(CaseStatus::Cancelled.target_stage(), None);
    }

    #[test]
    fn test_is_produced() {
        assert!(!CaseStatus::Approved.is_produced());
        assert!(CaseStatus::InMilling.is_produced());
        assert!(CaseStatus::Delivered.is_produced());
        assert!(!CaseStatus::Cancelled.is_produced());
    }

    #[test]
    fn test_label_classification() {
        assert!(FileLabel::Scan.is_replace_slot());
        assert!(!FileLabel::RxPdf.is_replace_slot());
        assert!(!FileLabel::Attachment.is_replace_slot());
        assert!(!FileLabel::Scan.is_production_relevant());
        assert!(FileLabel::ConstructionInfo.is_production_relevant());
        assert_eq!(FileLabel::RxPdf.export_suffix(), Some("_RX"));
        assert!(FileLabel::ModelTop.is_design_output());
        assert!(!FileLabel::RxPdf.is_design_output());
    }

    #[test]
    fn test_file_extension_prefers_file_name() {
        let mut file = CaseFile {
            id: "f1".to_string(),
            case_id: "c1".to_string(),
            label: FileLabel::ModelTop,
            kind: "stl".to_string(),
            key: "cases/c1/top".to_string(),
            file_name: "upper.PLY".to_string(),
            size_bytes: 10,
            created_at: Utc::now(),
        };
        assert_eq!(file.extension(), "PLY");

        file.file_name = "noext".to_string();
        assert_eq!(file.extension(), "stl");

        file.file_name = ".hidden".to_string();
        assert_eq!(file.extension(), "stl");
    }

    #[test]
    fn test_product_material_naming() {
        assert_eq!(ProductType::ImplantCrown.camel_case(), "ImplantCrown");
        assert!(!ProductType::NightGuard.material_is_meaningful());
        assert!(ProductType::Crown.material_is_meaningful());
        assert_eq!(Material::Emax.display_name(), "EMax");
        assert_eq!("implant_crown".parse::<ProductType>().unwrap(), ProductType::ImplantCrown);
    }
}
