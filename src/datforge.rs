pub mod prelude;
mod custom_error;
mod loaders;
mod mergers;
mod model;
mod normalizers;
mod reporters;
mod sqlbuilder;

use crate::prelude::*;

pub use crate::custom_error::cust_error::{ForgeError, ForgeResult};
pub use crate::loaders::xml_loader::{
    import_tree, parse_datfile, parse_datfile_str, ImportOptions, XmlNode,
};
pub use crate::mergers::merge::{hoist_header, merge_into, HoistOptions};
pub use crate::model::relational::{Column, ColumnType, Model, Row, Table, Value, KEY_SUFFIX};
pub use crate::normalizers::normalize::trim_strings;
pub use crate::reporters::provenance::ProvenanceCollector;
pub use crate::sqlbuilder::sqlbuild::SqlBuilder;

static DAT_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.+)\((?P<version>[^()]*)\)\s*$")
        .expect("Failed to compile dat filename regex")
});

/// Split a datfile stem on its last bracketed group, the convention being
/// `<name> (<file version>).dat`.
pub fn split_dat_filename(path: &Path) -> ForgeResult<(String, String)> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ForgeError::InvalidOperation {
            operation: "Split Filename".to_string(),
            reason: format!("Path has no usable file stem: {}", path.display()),
            suggestion: "Pass a path to a .dat file".to_string(),
        })?;

    let caps = DAT_NAME_PATTERN
        .captures(stem)
        .ok_or_else(|| ForgeError::InvalidOperation {
            operation: "Split Filename".to_string(),
            reason: format!("No '(file version)' suffix in '{}'", stem),
            suggestion: "Datfiles are named '<name> (<version>).dat'".to_string(),
        })?;

    Ok((caps["name"].trim().to_string(), caps["version"].trim().to_string()))
}

/// Lexically greatest 10-character subdirectory name, the local version
/// directory convention.
pub fn latest_local_version(root: &Path) -> ForgeResult<String> {
    let mut versions: Vec<String> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.len() == 10 {
                versions.push(name.to_string());
            }
        }
    }
    versions.sort();
    versions.pop().ok_or_else(|| ForgeError::InvalidOperation {
        operation: "Local Version".to_string(),
        reason: format!("No version directories under {}", root.display()),
        suggestion: "Run the download step first or pass VERSION explicitly".to_string(),
    })
}

/// All `.dat` files in a directory, in lexical filename order. The order is
/// part of the output contract: it determines final surrogate key values.
pub fn dat_files_in(dir: &Path) -> ForgeResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("dat") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Pipeline configuration, passed in at construction.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub import: ImportOptions,
    pub hoist: HoistOptions,
    /// When set, the category label and source filename are injected onto
    /// each file's root row before the header is hoisted.
    pub tag_root_rows: bool,
}

/// Folds datfiles into one cumulative relational model, one file at a time,
/// strictly in the order supplied by the caller.
///
/// Per file: parse XML, import the tree, trim strings, hoist the header,
/// record a provenance summary row, then merge into the cumulative model.
/// A malformed or misshapen file aborts the run; a partially merged dataset
/// could contain dangling foreign keys, so there is no partial-success mode.
pub struct DatIngest {
    options: IngestOptions,
    model: Model,
    report: ProvenanceCollector,
    files_loaded: usize,
}

impl DatIngest {
    pub fn new(options: IngestOptions) -> Self {
        Self {
            options,
            model: Model::new(),
            report: ProvenanceCollector::new(),
            files_loaded: 0,
        }
    }

    pub fn ingest_file(&mut self, category: &str, path: &Path) -> ForgeResult<()> {
        let (name, file_version) = split_dat_filename(path)?;
        let root = parse_datfile(path)?;
        self.ingest_document(category, &name, &file_version, &root, &path.display().to_string())
    }

    /// Same as `ingest_file` for an already parsed document. `origin` names
    /// the source in errors.
    pub fn ingest_document(
        &mut self,
        category: &str,
        name: &str,
        file_version: &str,
        root: &XmlNode,
        origin: &str,
    ) -> ForgeResult<()> {
        debug!("Importing {} '{}' from {}", category, name, origin);

        let mut model = import_tree(root, &self.options.import)?;
        trim_strings(&mut model);

        let extras = if self.options.tag_root_rows {
            vec![
                ("category".to_string(), category.to_string()),
                ("filename".to_string(), name.to_string()),
            ]
        } else {
            Vec::new()
        };
        hoist_header(&mut model, &self.options.hoist, &extras, origin)?;

        {
            let root_table = model.table(&self.options.hoist.root_table).ok_or_else(|| {
                ForgeError::Custom(format!(
                    "Root table '{}' vanished after hoist",
                    self.options.hoist.root_table
                ))
            })?;
            self.report.record(category, name, file_version, root_table)?;
        }

        merge_into(model, &mut self.model)?;
        self.files_loaded += 1;
        info!("Loaded {} '{}' ({})", category, name, file_version);
        Ok(())
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn report(&self) -> &ProvenanceCollector {
        &self.report
    }

    pub fn files_loaded(&self) -> usize {
        self.files_loaded
    }

    pub fn into_parts(self) -> (Model, ProvenanceCollector) {
        (self.model, self.report)
    }
}

/// Handler signature for registered dataset actions.
pub type ActionHandler = fn(&HashMap<String, String>) -> ForgeResult<i32>;

/// Explicit mapping from (dataset, action) to a statically known handler,
/// populated at startup and looked up directly. Dataset names are matched
/// case-insensitively (upper), actions in Title case.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<(String, String), ActionHandler>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dataset: &str, action: &str, handler: ActionHandler) {
        self.handlers
            .insert((dataset.to_uppercase(), title_case(action)), handler);
    }

    pub fn dispatch(
        &self,
        dataset: &str,
        action: &str,
        parameters: &HashMap<String, String>,
    ) -> ForgeResult<i32> {
        let key = (dataset.to_uppercase(), title_case(action));
        let handler = self.handlers.get(&key).ok_or_else(|| ForgeError::InvalidOperation {
            operation: "Dispatch".to_string(),
            reason: format!("No handler registered for \"{}\", \"{}\"", key.0, key.1),
            suggestion: "Check the DATA and ACTION parameters".to_string(),
        })?;
        handler(parameters)
    }
}

fn title_case(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
