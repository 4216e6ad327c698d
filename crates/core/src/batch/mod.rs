//! Production batch downloads.
//!
//! [`BatchSelector`] turns case ids into archive paths, [`ArchiveBuilder`]
//! fetches the objects and packs them, and [`BatchExporter`] ties both to the
//! milling handoff.

mod archive;
mod export;
mod selector;

pub use archive::{Archive, ArchiveBuilder, SkippedEntry};
pub use export::{BatchExporter, ExportOutcome};
pub(crate) use selector::dedupe_ids;
pub use selector::{
    case_folder, export_file_name, root_folder, routing_folder, sanitize, BatchSelector,
    ExportEntry, ExportPlan, CONSTRUCTION_INFO_EXTENSION,
};
