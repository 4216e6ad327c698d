use std::sync::Arc;

use labflow_core::{
    AuditHandle, AuditStore, Authenticator, BatchExporter, CaseLifecycle, CaseStore, Config,
    ObjectStore, PriceTable, SanitizedConfig, ShippingBatchRecorder,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    audit: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
    lifecycle: Arc<CaseLifecycle>,
    exporter: BatchExporter,
    shipping: ShippingBatchRecorder,
}

impl AppState {
    /// Wire the workflow services over one case store and one object store.
    ///
    /// Every service shares the audit handle.
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        audit: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        cases: Arc<dyn CaseStore>,
        objects: Arc<dyn ObjectStore>,
        pricing: PriceTable,
    ) -> Self {
        let lifecycle = Arc::new(
            CaseLifecycle::new(cases.clone(), pricing).with_audit(audit.clone()),
        );
        let exporter = BatchExporter::new(
            cases.clone(),
            objects,
            lifecycle.clone(),
            config.export.fetch_concurrency,
        )
        .with_audit(audit.clone());
        let shipping = ShippingBatchRecorder::new(cases).with_audit(audit.clone());

        Self {
            config,
            authenticator,
            audit,
            audit_store,
            lifecycle,
            exporter,
            shipping,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn lifecycle(&self) -> &CaseLifecycle {
        &self.lifecycle
    }

    pub fn exporter(&self) -> &BatchExporter {
        &self.exporter
    }

    pub fn shipping(&self) -> &ShippingBatchRecorder {
        &self.shipping
    }
}
