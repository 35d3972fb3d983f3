//! Configuración del host.
//! Carga variables de entorno (.env) una sola vez y las traduce a `AppConfig`.
//!
//! | Variable                      | Default                  |
//! |-------------------------------|--------------------------|
//! | `PAGEFLOW_FLOW_DIR`           | `flows`                  |
//! | `PAGEFLOW_SESSION_FILE`       | `.pageflow-session.json` |
//! | `PAGEFLOW_GC_EXPIRATION_SECS` | sin recolector           |
//! | `PAGEFLOW_EXCLUSIVE_FLOWS`    | ninguno (lista con comas) |

use std::env;
use std::path::PathBuf;

use chrono::Duration;
use dotenvy::dotenv;
use once_cell::sync::Lazy;
use pageflow_core::ServerConfig;

use crate::errors::AppError;

pub const DEFAULT_FLOW_DIR: &str = "flows";
pub const DEFAULT_SESSION_FILE: &str = ".pageflow-session.json";

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Forzar carga temprana de .env.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directorio con las definiciones `*.yaml`, `*.yml`, `*.json`.
    pub flow_dir: PathBuf,
    /// Archivo donde se guarda el blob de sesión entre invocaciones.
    pub session_file: PathBuf,
    /// Ventana de expiración del recolector; `None` lo desactiva.
    pub gc_expiration_secs: Option<i64>,
    pub exclusive_flows: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { flow_dir: PathBuf::from(DEFAULT_FLOW_DIR),
               session_file: PathBuf::from(DEFAULT_SESSION_FILE),
               gc_expiration_secs: None,
               exclusive_flows: Vec::new() }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        init_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero leyendo de `lookup` (tests, otros hosts).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
        where F: Fn(&str) -> Option<String>
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let gc_expiration_secs = match non_empty("PAGEFLOW_GC_EXPIRATION_SECS") {
            None => None,
            Some(raw) => {
                let secs: i64 = raw.trim()
                                   .parse()
                                   .map_err(|_| AppError::Config(format!("PAGEFLOW_GC_EXPIRATION_SECS='{raw}' no es un entero")))?;
                if secs <= 0 {
                    return Err(AppError::Config(format!("PAGEFLOW_GC_EXPIRATION_SECS debe ser positivo, es {secs}")));
                }
                Some(secs)
            }
        };
        let exclusive_flows: Vec<String> = non_empty("PAGEFLOW_EXCLUSIVE_FLOWS")
            .map(|raw| {
                raw.split(',')
                   .map(str::trim)
                   .filter(|id| !id.is_empty())
                   .map(String::from)
                   .collect()
            })
            .unwrap_or_default();

        Ok(Self { flow_dir: non_empty("PAGEFLOW_FLOW_DIR").map(PathBuf::from).unwrap_or(defaults.flow_dir),
                  session_file: non_empty("PAGEFLOW_SESSION_FILE").map(PathBuf::from)
                                                                  .unwrap_or(defaults.session_file),
                  gc_expiration_secs,
                  exclusive_flows })
    }

    pub fn is_exclusive(&self, flow_id: &str) -> bool {
        self.exclusive_flows.iter().any(|id| id == flow_id)
    }

    pub fn server_config(&self) -> ServerConfig {
        match self.gc_expiration_secs {
            Some(secs) => ServerConfig::new().with_gc_expiration(Duration::seconds(secs)),
            None => ServerConfig::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.server_config().gc_expiration().is_none());
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup(&[("PAGEFLOW_FLOW_DIR", "/srv/flows"),
                                                     ("PAGEFLOW_SESSION_FILE", "/tmp/s.json"),
                                                     ("PAGEFLOW_GC_EXPIRATION_SECS", "90"),
                                                     ("PAGEFLOW_EXCLUSIVE_FLOWS", "Counter, Registration,,")])).unwrap();
        assert_eq!(config.flow_dir, PathBuf::from("/srv/flows"));
        assert_eq!(config.session_file, PathBuf::from("/tmp/s.json"));
        assert_eq!(config.gc_expiration_secs, Some(90));
        assert_eq!(config.exclusive_flows, vec!["Counter".to_string(), "Registration".to_string()]);
        assert!(config.is_exclusive("Counter"));
        assert!(!config.is_exclusive("SecondCounter"));
        assert_eq!(config.server_config().gc_expiration(), Some(Duration::seconds(90)));
    }

    #[test]
    fn rejects_bad_expiration() {
        assert!(matches!(AppConfig::from_lookup(lookup(&[("PAGEFLOW_GC_EXPIRATION_SECS", "soon")])),
                         Err(AppError::Config(_))));
        assert!(matches!(AppConfig::from_lookup(lookup(&[("PAGEFLOW_GC_EXPIRATION_SECS", "0")])),
                         Err(AppError::Config(_))));
    }
}
