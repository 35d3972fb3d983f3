//! Almacén del blob de sesión en un archivo.
//!
//! El guardado es atómico: se escribe un archivo temporal con nombre único
//! junto al destino y luego se renombra encima.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use pageflow_core::ContinuationServer;
use tempfile::NamedTempFile;

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` si todavía no hay sesión guardada.
    pub fn load(&self) -> Result<Option<Vec<u8>>, AppError> {
        match fs::read(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, blob: &[u8]) -> Result<(), AppError> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(blob)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        log::debug!("session saved to {} ({} bytes)", self.path.display(), blob.len());
        Ok(())
    }

    /// Borra la sesión guardada. No falla si no existía.
    pub fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Restaura la sesión guardada (si hay) en el servidor.
    pub fn restore_into(&self, server: &mut ContinuationServer) -> Result<bool, AppError> {
        match self.load()? {
            Some(blob) => {
                server.restore_session(&blob)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn save_from(&self, server: &ContinuationServer) -> Result<(), AppError> {
        self.save(&server.export_session()?)
    }
}
