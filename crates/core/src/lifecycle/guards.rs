//! Transition rules.
//!
//! Pure functions over an already-loaded case and its files. They run inside
//! the repository transaction so they always see committed state.

use crate::auth::{ActorRole, Identity};
use crate::case::{Case, CaseError, CaseFile, CaseStage, CaseStatus, FileLabel, REQUIRED_FOR_APPROVAL};
use crate::money::Money;
use crate::pricing::{PriceTable, PricingError};

/// Targets a customer may request.
pub const CUSTOMER_TARGETS: [CaseStatus; 4] = [
    CaseStatus::Approved,
    CaseStatus::ChangesRequested,
    CaseStatus::Delivered,
    CaseStatus::Cancelled,
];

/// Whether the actor may see and act on this case at all.
///
/// Staff roles see every case; customers only their own or their clinic's.
pub fn ensure_access(case: &Case, actor: &Identity) -> Result<(), CaseError> {
    if actor.role != ActorRole::Customer {
        return Ok(());
    }

    let owns = actor.user_id == case.doctor_id
        || actor.clinic_id.as_deref() == Some(case.clinic_id.as_str());
    if owns {
        Ok(())
    } else {
        Err(CaseError::Forbidden(format!(
            "case {} does not belong to this customer",
            case.id
        )))
    }
}

fn reject(case: &Case, to: CaseStatus, reason: &str) -> CaseError {
    CaseError::InvalidTransition {
        case_id: case.id.clone(),
        from: case.status,
        to,
        reason: reason.to_string(),
    }
}

/// Check every rule for moving `case` to `to`.
pub fn check_transition(
    case: &Case,
    files: &[CaseFile],
    to: CaseStatus,
    actor: &Identity,
) -> Result<(), CaseError> {
    if actor.role == ActorRole::Customer && !CUSTOMER_TARGETS.contains(&to) {
        return Err(CaseError::Forbidden(format!(
            "customers cannot move a case to {}",
            to
        )));
    }
    ensure_access(case, actor)?;

    if case.status == to {
        return Err(reject(case, to, "case is already in that status"));
    }
    if case.status == CaseStatus::Cancelled {
        return Err(reject(case, to, "case is cancelled"));
    }
    if case.status == CaseStatus::Delivered && actor.role != ActorRole::Admin {
        return Err(reject(case, to, "case has already been delivered"));
    }

    if to == CaseStatus::Delivered && case.status != CaseStatus::Completed {
        return Err(reject(case, to, "must be Completed before Delivered"));
    }

    if to == CaseStatus::Approved {
        if case.status.is_approved_or_later() {
            return Err(reject(case, to, "case has already been approved"));
        }
        let missing = missing_required_files(files);
        if !missing.is_empty() {
            return Err(CaseError::MissingRequiredFiles { missing });
        }
    }

    Ok(())
}

/// Required approval labels with no live file, in fixed order.
pub fn missing_required_files(files: &[CaseFile]) -> Vec<FileLabel> {
    REQUIRED_FOR_APPROVAL
        .iter()
        .copied()
        .filter(|label| !files.iter().any(|f| f.label == *label))
        .collect()
}

/// Reject uploads a case can no longer accept.
///
/// A new scan is only accepted while the case is still in design.
pub fn ensure_upload_allowed(case: &Case, label: FileLabel) -> Result<(), CaseError> {
    if label == FileLabel::Scan && case.stage != CaseStage::Design {
        return Err(CaseError::UploadNotAllowed {
            label,
            stage: case.stage.to_string(),
        });
    }
    if case.status == CaseStatus::Cancelled {
        return Err(CaseError::UploadNotAllowed {
            label,
            stage: case.stage.to_string(),
        });
    }
    Ok(())
}

/// Fee charged when cancelling `case`.
///
/// Staff may waive it. Otherwise a produced case owes milling + design, a
/// case with design output owes design, anything else is free.
pub fn cancellation_fee(
    case: &Case,
    files: &[CaseFile],
    actor: &Identity,
    waive_fee: bool,
    pricing: &PriceTable,
) -> Result<Money, CaseError> {
    if waive_fee && actor.role.can_waive_fee() {
        return Ok(Money::ZERO);
    }

    let has_design_output = files.iter().any(|f| f.label.is_design_output());
    if !case.status.is_produced() && !has_design_output {
        return Ok(Money::ZERO);
    }

    let costs = pricing.costs(case.product, case.material, case.units, case.has_sales_rep())?;
    if case.status.is_produced() {
        Ok(costs.milling.checked_add(costs.design).map_err(PricingError::from)?)
    } else {
        Ok(costs.design)
    }
}
