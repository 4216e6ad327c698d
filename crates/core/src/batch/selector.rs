//! Resolve selected cases into archive entries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::case::{Case, CaseError, CaseFile, CaseStore, Clinic, FileLabel, StoreError};

/// Extension forced onto construction info files regardless of their stored name.
pub const CONSTRUCTION_INFO_EXTENSION: &str = ".constructionInfo";

/// One file to place into the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    pub case_id: String,
    /// Object storage key.
    pub key: String,
    /// Full path inside the archive, root folder included.
    pub path: String,
}

/// Everything needed to assemble one production archive.
#[derive(Debug, Clone, Serialize)]
pub struct ExportPlan {
    pub root_folder: String,
    /// Selected case ids, deduplicated, in request order.
    pub case_ids: Vec<String>,
    pub entries: Vec<ExportEntry>,
}

impl ExportPlan {
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.root_folder)
    }
}

/// Keep ASCII letters and digits only.
pub fn sanitize(value: &str) -> String {
    value.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// `Download_{MM-DD-YYYY}`
pub fn root_folder(date: NaiveDate) -> String {
    format!("Download_{}", date.format("%m-%d-%Y"))
}

pub fn routing_folder(clinic: &Clinic) -> String {
    format!(
        "{}{}",
        sanitize(&clinic.name),
        sanitize(&clinic.address.zip_code)
    )
}

pub fn case_folder(case: &Case) -> String {
    let material = if case.product.material_is_meaningful() {
        case.material.display_name()
    } else {
        ""
    };
    sanitize(&format!(
        "{}{}{}{}{}",
        case.patient.last_name,
        case.patient.first_name,
        case.shade,
        case.product.camel_case(),
        material
    ))
}

/// Name stem shared by every exported file of a case.
///
/// Falls back to the patient's name when the alias has nothing printable.
fn file_stem(case: &Case) -> String {
    let alias = sanitize(&case.patient.alias);
    if alias.is_empty() {
        sanitize(&format!("{}{}", case.patient.last_name, case.patient.first_name))
    } else {
        alias
    }
}

fn extension(file: &CaseFile) -> String {
    if file.label == FileLabel::ConstructionInfo {
        return CONSTRUCTION_INFO_EXTENSION.to_string();
    }
    let ext = sanitize(file.extension());
    if ext.is_empty() {
        String::new()
    } else {
        format!(".{}", ext)
    }
}

/// Archive file name for a production-relevant file, `None` for the rest.
pub fn export_file_name(case: &Case, file: &CaseFile) -> Option<String> {
    let suffix = file.label.export_suffix()?;
    Some(format!("{}{}{}", file_stem(case), suffix, extension(file)))
}

/// Hands out unique archive paths, numbering repeats `_2`, `_3`, ...
#[derive(Default)]
struct PathAllocator {
    seen: HashMap<String, u32>,
}

impl PathAllocator {
    fn allocate(&mut self, dir: &str, name: &str) -> String {
        let path = format!("{}/{}", dir, name);
        let count = self.seen.entry(path.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            return path;
        }

        let (stem, ext) = match name.find('.') {
            Some(idx) => name.split_at(idx),
            None => (name, ""),
        };
        format!("{}/{}_{}{}", dir, stem, count, ext)
    }
}

/// Loads cases, clinics and files and lays them out as archive entries.
pub struct BatchSelector {
    store: Arc<dyn CaseStore>,
}

impl BatchSelector {
    pub fn new(store: Arc<dyn CaseStore>) -> Self {
        Self { store }
    }

    /// Build the export plan for `case_ids` dated `date`.
    pub fn select(&self, case_ids: &[String], date: NaiveDate) -> Result<ExportPlan, CaseError> {
        let ids = dedupe_ids(case_ids);
        if ids.is_empty() {
            return Err(CaseError::Validation(
                "at least one case id is required".to_string(),
            ));
        }

        let cases = self.store.get_cases_by_ids(&ids)?;
        if cases.len() != ids.len() {
            let found: HashSet<&str> = cases.iter().map(|c| c.id.as_str()).collect();
            let missing = ids
                .iter()
                .filter(|id| !found.contains(id.as_str()))
                .cloned()
                .collect();
            return Err(CaseError::CasesNotFound(missing));
        }

        let root = root_folder(date);
        let mut clinics: HashMap<String, Clinic> = HashMap::new();
        let mut paths = PathAllocator::default();
        let mut entries = Vec::new();

        for case in &cases {
            if !clinics.contains_key(&case.clinic_id) {
                let clinic = self.store.get_clinic(&case.clinic_id)?.ok_or_else(|| {
                    StoreError::Corrupt(format!(
                        "case {} references missing clinic {}",
                        case.id, case.clinic_id
                    ))
                })?;
                clinics.insert(case.clinic_id.clone(), clinic);
            }
            let clinic = &clinics[&case.clinic_id];

            let dir = format!("{}/{}/{}", root, routing_folder(clinic), case_folder(case));
            let files = self.store.list_files(&case.id)?;
            for file in &files {
                let Some(name) = export_file_name(case, file) else {
                    continue;
                };
                entries.push(ExportEntry {
                    case_id: case.id.clone(),
                    key: file.key.clone(),
                    path: paths.allocate(&dir, &name),
                });
            }
        }

        if entries.is_empty() {
            return Err(CaseError::NoProductionFiles);
        }

        debug!(
            cases = ids.len(),
            entries = entries.len(),
            root = %root,
            "Export plan built"
        );

        Ok(ExportPlan {
            root_folder: root,
            case_ids: ids,
            entries,
        })
    }
}

/// Drop blank and repeated ids, keeping first occurrences in order.
pub(crate) fn dedupe_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{Material, ProductType, SqliteCaseStore};
    use crate::testing::fixtures;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    #[test]
    fn test_sanitize_keeps_ascii_alphanumerics() {
        assert_eq!(sanitize("Lake St. Dental & Co"), "LakeStDentalCo");
        assert_eq!(sanitize("Zoë O'Neil-2"), "ZoONeil2");
        assert_eq!(sanitize("../../etc"), "etc");
    }

    #[test]
    fn test_root_folder_format() {
        assert_eq!(root_folder(date()), "Download_03-07-2026");
    }

    #[test]
    fn test_case_folder_blanks_single_material_products() {
        let mut case = fixtures::case("c1", "clinic-1", "doctor-1");
        assert_eq!(case_folder(&case), "DoeJaneA2CrownZirconia");

        case.product = ProductType::NightGuard;
        case.material = Material::Pmma;
        assert_eq!(case_folder(&case), "DoeJaneA2NightGuard");
    }

    #[test]
    fn test_export_file_names() {
        let case = fixtures::case("c1", "clinic-1", "doctor-1");

        let top = fixtures::case_file("c1", FileLabel::ModelTop, "upper.stl");
        assert_eq!(export_file_name(&case, &top).unwrap(), "JD0042_ModelTop.stl");

        let info = fixtures::case_file("c1", FileLabel::ConstructionInfo, "info.xml");
        assert_eq!(
            export_file_name(&case, &info).unwrap(),
            "JD0042_File.constructionInfo"
        );

        let scan = fixtures::case_file("c1", FileLabel::Scan, "scan.stl");
        assert!(export_file_name(&case, &scan).is_none());
    }

    #[test]
    fn test_alias_falls_back_to_name() {
        let mut case = fixtures::case("c1", "clinic-1", "doctor-1");
        case.patient.alias = "--".to_string();
        let rx = fixtures::case_file("c1", FileLabel::RxPdf, "rx.pdf");
        assert_eq!(export_file_name(&case, &rx).unwrap(), "DoeJane_RX.pdf");
    }

    #[test]
    fn test_path_collisions_are_numbered() {
        let mut paths = PathAllocator::default();
        assert_eq!(paths.allocate("d", "A_Design.stl"), "d/A_Design.stl");
        assert_eq!(paths.allocate("d", "A_Design.stl"), "d/A_Design_2.stl");
        assert_eq!(paths.allocate("d", "A_Design.stl"), "d/A_Design_3.stl");
        assert_eq!(paths.allocate("e", "A_Design.stl"), "e/A_Design.stl");
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let ids = vec![
            "b".to_string(),
            "a".to_string(),
            " b ".to_string(),
            "".to_string(),
        ];
        assert_eq!(dedupe_ids(&ids), vec!["b".to_string(), "a".to_string()]);
    }

    fn seeded() -> (Arc<SqliteCaseStore>, Case) {
        let store = Arc::new(SqliteCaseStore::in_memory().unwrap());
        store.insert_clinic(&fixtures::clinic("clinic-1")).unwrap();
        let case = store
            .insert_case(fixtures::case_request("clinic-1", "doctor-1"))
            .unwrap();
        (store, case)
    }

    #[test]
    fn test_select_builds_full_paths() {
        let (store, case) = seeded();
        store
            .replace_file(fixtures::new_file(&case.id, FileLabel::ModelTop, "upper.stl"))
            .unwrap();
        store
            .replace_file(fixtures::new_file(&case.id, FileLabel::Scan, "scan.stl"))
            .unwrap();

        let selector = BatchSelector::new(store);
        let plan = selector.select(&[case.id.clone()], date()).unwrap();

        assert_eq!(plan.archive_name(), "Download_03-07-2026.zip");
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(
            plan.entries[0].path,
            "Download_03-07-2026/LakeStreetDental55401/DoeJaneA2CrownZirconia/JD0042_ModelTop.stl"
        );
        assert_eq!(
            plan.entries[0].key,
            fixtures::file_key(&case.id, FileLabel::ModelTop, "upper.stl")
        );
    }

    #[test]
    fn test_select_without_production_files() {
        let (store, case) = seeded();
        store
            .replace_file(fixtures::new_file(&case.id, FileLabel::Scan, "scan.stl"))
            .unwrap();

        let selector = BatchSelector::new(store);
        let result = selector.select(&[case.id.clone()], date());
        assert!(matches!(result, Err(CaseError::NoProductionFiles)));
    }

    #[test]
    fn test_select_rejects_empty_and_unknown_ids() {
        let (store, case) = seeded();
        let selector = BatchSelector::new(store);

        assert!(matches!(
            selector.select(&[], date()),
            Err(CaseError::Validation(_))
        ));

        match selector.select(&[case.id.clone(), "ghost".to_string()], date()) {
            Err(CaseError::CasesNotFound(missing)) => assert_eq!(missing, vec!["ghost"]),
            other => panic!("expected CasesNotFound, got {:?}", other),
        }
    }
}
