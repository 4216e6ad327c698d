use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{error, info};

use super::archive::{Archive, ArchiveBuilder};
use super::selector::BatchSelector;
use crate::audit::{AuditEvent, AuditHandle};
use crate::auth::Identity;
use crate::case::{CaseError, CaseStore};
use crate::lifecycle::CaseLifecycle;
use crate::metrics;
use crate::storage::ObjectStore;

/// A produced archive and the cases it moved into milling.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub archive: Archive,
    pub released: Vec<String>,
}

/// Production batch download: select, pack, then hand approved cases to milling.
pub struct BatchExporter {
    selector: BatchSelector,
    builder: ArchiveBuilder,
    lifecycle: Arc<CaseLifecycle>,
    audit: Option<AuditHandle>,
}

impl BatchExporter {
    pub fn new(
        store: Arc<dyn CaseStore>,
        objects: Arc<dyn ObjectStore>,
        lifecycle: Arc<CaseLifecycle>,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            selector: BatchSelector::new(store),
            builder: ArchiveBuilder::new(objects, fetch_concurrency),
            lifecycle,
            audit: None,
        }
    }

    /// Set the audit handle for emitting events.
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Build the archive for `case_ids` dated `date`.
    ///
    /// Only milling and admin actors may pull production files. Once the
    /// archive is complete every selected `APPROVED` case moves to milling.
    pub async fn export(
        &self,
        case_ids: &[String],
        actor: &Identity,
        date: NaiveDate,
    ) -> Result<ExportOutcome, CaseError> {
        if !actor.role.can_run_production() {
            metrics::BATCH_EXPORTS_TOTAL
                .with_label_values(&["unauthorized"])
                .inc();
            return Err(CaseError::Unauthorized(format!(
                "role {} cannot download production batches",
                actor.role
            )));
        }

        let start = Instant::now();
        let result = self.run(case_ids, actor, date).await;
        let label = match &result {
            Ok(_) => "success",
            Err(CaseError::NoProductionFiles) => "no_files",
            Err(_) => "failed",
        };
        metrics::BATCH_EXPORTS_TOTAL.with_label_values(&[label]).inc();
        metrics::EXPORT_DURATION
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    async fn run(
        &self,
        case_ids: &[String],
        actor: &Identity,
        date: NaiveDate,
    ) -> Result<ExportOutcome, CaseError> {
        let plan = self.selector.select(case_ids, date)?;
        let archive = self.builder.build(&plan).await?;

        info!(
            archive = %archive.file_name,
            cases = plan.case_ids.len(),
            included = archive.included.len(),
            skipped = archive.skipped.len(),
            actor = %actor.user_id,
            "Batch archive built"
        );

        if let Some(ref audit) = self.audit {
            audit
                .emit(AuditEvent::BatchExported {
                    requested_by: actor.user_id.clone(),
                    case_ids: plan.case_ids.clone(),
                    archive_name: archive.file_name.clone(),
                    entries_included: archive.included.len() as u32,
                    entries_skipped: archive.skipped.len() as u32,
                })
                .await;
        }

        let released = match self.lifecycle.release_to_milling(&plan.case_ids, actor).await {
            Ok(released) => released,
            Err(e) => {
                error!(archive = %archive.file_name, error = %e, "Failed to release cases to milling");
                return Err(e);
            }
        };

        Ok(ExportOutcome { archive, released })
    }
}
