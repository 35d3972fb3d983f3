use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Almacén de atributos con alcance de instancia.
///
/// Es el único estado de aplicación que sobrevive entre activaciones (el
/// payload es de la petición). Los valores son JSON para que la instancia
/// pueda serializarse dentro del blob de sesión.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    values: BTreeMap<String, Value>,
}

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Lectura tipada; `None` si el atributo no existe o no deserializa.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.values.get(name).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}
