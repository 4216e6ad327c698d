pub mod audit;
pub mod auth;
pub mod batch;
pub mod case;
pub mod config;
pub mod lifecycle;
pub mod metrics;
pub mod money;
pub mod pricing;
pub mod shipping;
pub mod storage;
pub mod testing;

pub use audit::{
    create_audit_system, AuditEvent, AuditHandle, AuditPage, AuditQuery, AuditRecord,
    AuditStore, AuditWriter, SqliteAuditStore,
};
pub use auth::{
    create_authenticator, ActorRole, AuthError, AuthRequest, Authenticator, Identity,
};
pub use batch::{ArchiveBuilder, BatchExporter, BatchSelector, ExportOutcome, ExportPlan};
pub use case::{
    Case, CaseError, CaseFile, CaseStage, CaseStatus, CaseStore, ErrorKind, FileLabel,
    SqliteCaseStore, StatusEvent,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use lifecycle::{CaseLifecycle, TransitionOutcome, TransitionRequest};
pub use money::Money;
pub use pricing::{CostBreakdown, PriceTable, PricingError};
pub use shipping::{ShipOutcome, ShipRequest, ShippingBatch, ShippingBatchRecorder};
pub use storage::{create_object_store, ObjectStore, StorageError};
