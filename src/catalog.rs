//! Catálogo de flujos en disco.
//!
//! Cada archivo `*.yaml`, `*.yml` o `*.json` del directorio es un flujo cuyo
//! flow ID es el nombre del archivo sin extensión. Los flujos se registran
//! como descriptores perezosos: el archivo se lee y valida en su primer uso.

use std::fs;
use std::path::{Path, PathBuf};

use pageflow_core::{ContinuationServer, FlowSource};

use crate::errors::AppError;

const FLOW_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub flow_id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct FlowCatalog {
    entries: Vec<CatalogEntry>,
}

impl FlowCatalog {
    pub fn scan(dir: &Path) -> Result<Self, AppError> {
        let mut entries: Vec<CatalogEntry> = Vec::new();
        for item in fs::read_dir(dir)? {
            let path = item?.path();
            if !path.is_file() || !has_flow_extension(&path) {
                continue;
            }
            let Some(flow_id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                log::warn!("skipping flow file with a non UTF-8 name: {}", path.display());
                continue;
            };
            if let Some(existing) = entries.iter().find(|e| e.flow_id == flow_id) {
                return Err(AppError::Config(format!("flujo '{flow_id}' duplicado: {} y {}",
                                                    existing.path.display(),
                                                    path.display())));
            }
            entries.push(CatalogEntry { flow_id, path });
        }
        entries.sort_by(|a, b| a.flow_id.cmp(&b.flow_id));
        log::debug!("found {} flow(s) in {}", entries.len(), dir.display());
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn flow_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.flow_id.as_str()).collect()
    }

    pub fn get(&self, flow_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.flow_id == flow_id)
    }

    /// Registra todos los flujos en el servidor; `exclusive` decide la
    /// exclusividad de cada flow ID.
    pub fn register<F>(&self, server: &mut ContinuationServer, exclusive: F) -> Result<usize, AppError>
        where F: Fn(&str) -> bool
    {
        for entry in &self.entries {
            server.add_page_flow(&entry.flow_id,
                                 FlowSource::File(entry.path.clone()),
                                 exclusive(&entry.flow_id))?;
        }
        Ok(self.entries.len())
    }
}

fn has_flow_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FLOW_EXTENSIONS.iter().any(|ext| ext.eq_ignore_ascii_case(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pageflow_core::{ActionRegistry, ServerConfig};

    const FLOW: &str = "firstState: A\nviewState:\n  - name: A\n    view: a\n";

    #[test]
    fn scans_flow_files_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Beta.yml"), FLOW).unwrap();
        fs::write(dir.path().join("Alpha.yaml"), FLOW).unwrap();
        fs::write(dir.path().join("Gamma.json"), r#"{"firstState":"A","viewState":[{"name":"A","view":"a"}]}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.yaml")).unwrap();

        let catalog = FlowCatalog::scan(dir.path()).unwrap();
        assert_eq!(catalog.flow_ids(), vec!["Alpha", "Beta", "Gamma"]);
        assert!(catalog.get("notes").is_none());
    }

    #[test]
    fn duplicate_flow_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Alpha.yaml"), FLOW).unwrap();
        fs::write(dir.path().join("Alpha.json"), "{}").unwrap();
        assert!(matches!(FlowCatalog::scan(dir.path()), Err(AppError::Config(_))));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(FlowCatalog::scan(&dir.path().join("nope")), Err(AppError::Io(_))));
    }

    #[test]
    fn registers_lazily_with_exclusivity() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Alpha.yaml"), FLOW).unwrap();
        fs::write(dir.path().join("Broken.yaml"), "firstState: [").unwrap();
        let catalog = FlowCatalog::scan(dir.path()).unwrap();

        let mut server = ContinuationServer::new(Arc::new(ActionRegistry::new()), ServerConfig::new());
        assert_eq!(catalog.register(&mut server, |id| id == "Alpha").unwrap(), 2);
        assert!(server.repository().is_exclusive("Alpha"));
        assert!(!server.repository().is_exclusive("Broken"));
        assert!(server.repository().definition("Alpha").unwrap().is_some());
        assert!(server.repository().definition("Broken").is_err());
    }
}
