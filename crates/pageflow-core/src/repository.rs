//! Repositorio de instancias de page-flows.
//!
//! Guarda:
//! - la configuración de flujos (`flow ID -> fuente de la definición +
//!   exclusividad`), con la definición generada perezosamente y cacheada;
//! - las instancias vivas por ID (ticket);
//! - el índice de exclusividad `flow ID -> instance ID` (como mucho una
//!   entrada por flujo exclusivo).
//!
//! Invariante: toda entrada del índice de exclusividad apunta a una instancia
//! del mapa principal. Sólo `add`, `remove`, `remove_disabled`, `disable` y
//! `restore` mutan instancias o índice.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::definition::{PageFlowDefinition, RawFlowDefinition};
use crate::errors::PageFlowError;
use crate::generator::PageFlowGenerator;
use crate::instance::PageFlowInstance;
use crate::ticket::generate_ticket;

/// De dónde sale la definición de un flujo.
#[derive(Debug, Clone)]
pub enum FlowSource {
    /// Definición ya generada.
    Definition(Arc<PageFlowDefinition>),
    /// Forma cruda; se genera en el primer uso.
    Raw(RawFlowDefinition),
    /// Archivo YAML/JSON; se lee y genera en el primer uso.
    File(PathBuf),
}

#[derive(Debug)]
struct FlowEntry {
    source: FlowSource,
    exclusive: bool,
    cache: OnceCell<Arc<PageFlowDefinition>>,
}

impl FlowEntry {
    fn definition(&self, flow_id: &str) -> Result<Arc<PageFlowDefinition>, PageFlowError> {
        self.cache
            .get_or_try_init(|| match &self.source {
                FlowSource::Definition(def) => Ok(Arc::clone(def)),
                FlowSource::Raw(raw) => PageFlowGenerator::new(flow_id).generate(raw).map(Arc::new),
                FlowSource::File(path) => {
                    let raw = RawFlowDefinition::from_path(flow_id, path)?;
                    PageFlowGenerator::new(flow_id).generate(&raw).map(Arc::new)
                }
            })
            .map(Arc::clone)
    }
}

/// Forma serializable del repositorio (instancias + índice de exclusividad).
/// La configuración de flujos no viaja: la registra el host en cada arranque.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    pub instances: Vec<PageFlowInstance>,
    pub exclusive_instances: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct PageFlowInstanceRepository {
    flows: HashMap<String, FlowEntry>,
    instances: HashMap<String, PageFlowInstance>,
    exclusive_instances: HashMap<String, String>,
}

impl PageFlowInstanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra (o reemplaza) la fuente de definición de un flujo.
    pub fn add_page_flow(&mut self, flow_id: &str, source: FlowSource, exclusive: bool) -> Result<(), PageFlowError> {
        if flow_id.trim().is_empty() {
            return Err(PageFlowError::InvalidDefinition { flow_id: flow_id.to_string(),
                                                          reason: "flow ID must not be empty".into() });
        }
        if let FlowSource::Definition(def) = &source {
            if def.flow_id != flow_id {
                return Err(PageFlowError::InvalidDefinition { flow_id: flow_id.to_string(),
                                                              reason: format!("definition belongs to flow '{}'",
                                                                              def.flow_id) });
            }
        }
        log::debug!("registered flow '{flow_id}' (exclusive: {exclusive})");
        self.flows.insert(flow_id.to_string(),
                          FlowEntry { source,
                                      exclusive,
                                      cache: OnceCell::new() });
        Ok(())
    }

    pub fn has_page_flow(&self, flow_id: &str) -> bool {
        self.flows.contains_key(flow_id)
    }

    pub fn page_flow_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.flows.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Definición del flujo; `Ok(None)` si el flujo no está registrado.
    pub fn definition(&self, flow_id: &str) -> Result<Option<Arc<PageFlowDefinition>>, PageFlowError> {
        self.flows
            .get(flow_id)
            .map(|entry| entry.definition(flow_id))
            .transpose()
    }

    pub fn is_exclusive(&self, flow_id: &str) -> bool {
        self.flows.get(flow_id).is_some_and(|e| e.exclusive)
    }

    pub fn check_page_flow_is_exclusive(&self, instance: &PageFlowInstance) -> bool {
        self.is_exclusive(instance.flow_id())
    }

    pub fn find_by_id(&self, instance_id: &str) -> Option<&PageFlowInstance> {
        self.instances.get(instance_id)
    }

    pub fn find_by_id_mut(&mut self, instance_id: &str) -> Option<&mut PageFlowInstance> {
        self.instances.get_mut(instance_id)
    }

    /// Instancia que ocupa el slot de un flujo exclusivo. Siempre `None` para
    /// flujos no exclusivos.
    pub fn find_by_page_flow_id(&self, flow_id: &str) -> Option<&PageFlowInstance> {
        if !self.is_exclusive(flow_id) {
            return None;
        }
        self.exclusive_instances
            .get(flow_id)
            .and_then(|id| self.instances.get(id))
    }

    /// Inserta la instancia. Si su flujo es exclusivo, primero desaloja a la
    /// instancia que ocupaba el slot (que se devuelve) y luego lo reclama.
    pub fn add(&mut self, instance: PageFlowInstance) -> Option<PageFlowInstance> {
        let mut evicted = None;
        if self.check_page_flow_is_exclusive(&instance) {
            if let Some(old_id) = self.exclusive_instances.remove(instance.flow_id()) {
                evicted = self.instances.remove(&old_id);
                if evicted.is_some() {
                    log::warn!("exclusive flow '{}': instance '{old_id}' evicted by '{}'",
                               instance.flow_id(),
                               instance.id());
                }
            }
            self.exclusive_instances
                .insert(instance.flow_id().to_string(), instance.id().to_string());
        }
        log::info!("instance '{}' of flow '{}' added", instance.id(), instance.flow_id());
        self.instances.insert(instance.id().to_string(), instance);
        evicted
    }

    pub fn remove(&mut self, instance_id: &str) -> Option<PageFlowInstance> {
        let instance = self.instances.remove(instance_id)?;
        if self.exclusive_instances.get(instance.flow_id()).map(String::as_str) == Some(instance_id) {
            self.exclusive_instances.remove(instance.flow_id());
        }
        log::info!("instance '{instance_id}' of flow '{}' removed", instance.flow_id());
        Some(instance)
    }

    /// Hook de expiración del recolector: deja la instancia como lápida
    /// (`Disabled`) sin sacarla del repositorio.
    pub fn disable(&mut self, instance_id: &str) -> bool {
        match self.instances.get_mut(instance_id) {
            Some(instance) => {
                instance.disable();
                log::info!("instance '{instance_id}' disabled");
                true
            }
            None => false,
        }
    }

    /// Borra la instancia sólo si es una lápida.
    pub fn remove_disabled(&mut self, instance_id: &str) -> bool {
        if !self.instances.get(instance_id).is_some_and(PageFlowInstance::is_disabled) {
            return false;
        }
        self.remove(instance_id).is_some()
    }

    /// Nuevo ticket que no colisiona con ninguna instancia registrada.
    pub fn generate_instance_id(&self) -> String {
        self.generate_instance_id_with(generate_ticket)
    }

    pub(crate) fn generate_instance_id_with<F>(&self, mut next: F) -> String
        where F: FnMut() -> String
    {
        loop {
            let candidate = next();
            if !self.instances.contains_key(&candidate) {
                return candidate;
            }
            log::debug!("instance ID collision, retrying");
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instance_ids(&self) -> Vec<&str> {
        self.instances.keys().map(String::as_str).collect()
    }

    pub fn snapshot(&self) -> RepositorySnapshot {
        RepositorySnapshot { instances: self.instances.values().cloned().collect(),
                             exclusive_instances: self.exclusive_instances.clone() }
    }

    /// Reemplaza instancias e índice por los de `snapshot`. Las instancias
    /// cuya definición coincide (por hash) con la registrada pasan a
    /// compartirla; si difiere se conserva la propia y se avisa.
    pub fn restore(&mut self, snapshot: RepositorySnapshot) {
        self.instances.clear();
        for mut instance in snapshot.instances {
            self.rebind(&mut instance);
            self.instances.insert(instance.id().to_string(), instance);
        }
        self.exclusive_instances = snapshot.exclusive_instances
                                           .into_iter()
                                           .filter(|(_, id)| self.instances.contains_key(id))
                                           .collect();
    }

    fn rebind(&self, instance: &mut PageFlowInstance) {
        let registered = match self.definition(instance.flow_id()) {
            Ok(Some(def)) => def,
            Ok(None) => return,
            Err(e) => {
                log::warn!("cannot load definition of flow '{}' while restoring: {e}", instance.flow_id());
                return;
            }
        };
        let id = instance.id().to_string();
        if let Some(flow) = instance.page_flow_mut() {
            if flow.definition().definition_hash == registered.definition_hash {
                flow.rebind_definition(registered);
            } else {
                log::warn!("instance '{id}' was built from a different revision of flow '{}'",
                           registered.flow_id);
            }
        }
    }
}
