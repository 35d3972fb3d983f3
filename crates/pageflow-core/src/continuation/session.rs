//! Blob de sesión: todo lo que debe sobrevivir entre activaciones.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::ContinuationError;
use crate::gc::GcMarkers;
use crate::instance::PageFlowInstance;
use crate::repository::RepositorySnapshot;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub instances: Vec<PageFlowInstance>,
    /// flow ID -> instance ID de los flujos exclusivos.
    pub exclusive: HashMap<String, String>,
    #[serde(default)]
    pub markers: GcMarkers,
}

impl SessionState {
    pub fn from_parts(snapshot: RepositorySnapshot, markers: GcMarkers) -> Self {
        Self { instances: snapshot.instances,
               exclusive: snapshot.exclusive_instances,
               markers }
    }

    pub fn into_parts(self) -> (RepositorySnapshot, GcMarkers) {
        (RepositorySnapshot { instances: self.instances,
                              exclusive_instances: self.exclusive },
         self.markers)
    }

    pub fn to_blob(&self) -> Result<Vec<u8>, ContinuationError> {
        serde_json::to_vec(self).map_err(|e| ContinuationError::InvalidSession(e.to_string()))
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self, ContinuationError> {
        serde_json::from_slice(blob).map_err(|e| ContinuationError::InvalidSession(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_session_round_trips() {
        let blob = SessionState::default().to_blob().unwrap();
        let state = SessionState::from_blob(&blob).unwrap();
        assert!(state.instances.is_empty());
        assert!(state.markers.is_empty());
    }

    #[test]
    fn garbage_blob_is_an_invalid_session() {
        assert!(matches!(SessionState::from_blob(b"{not json"), Err(ContinuationError::InvalidSession(_))));
    }
}
