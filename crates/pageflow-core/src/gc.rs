//! Recolector de instancias abandonadas (mark & sweep por tiempo).
//!
//! Entre dos activaciones no hay ninguna señal de "instancia destruida": el
//! usuario simplemente deja de volver. Por eso el recolector trabaja en dos
//! fases:
//!
//! 1. `mark()` al inicio de cada activación condena los marcadores que no se
//!    tocaron durante más de la ventana de expiración.
//! 2. `sweep()` al final de la activación invoca el hook de expiración una
//!    única vez por marcador condenado.
//!
//! Un marcador condenado no se resucita con `update()`: reanudar un ticket
//! expirado debe fallar, no reiniciar el reloj.
//!
//! La lápida que deja el barrido vive una ventana más; pasada esa segunda
//! ventana `reclaim()` la retira junto con su marcador.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{system_clock, Clock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcMarker {
    pub last_touched: DateTime<Utc>,
    pub should_sweep: bool,
    pub swept: bool,
}

/// Tabla de marcadores; es lo que viaja en el blob de sesión.
pub type GcMarkers = HashMap<String, GcMarker>;

#[derive(Debug, Clone)]
pub struct GarbageCollector {
    expiration: Duration,
    markers: GcMarkers,
    clock: Arc<dyn Clock>,
}

impl GarbageCollector {
    pub fn new(expiration: Duration) -> Self {
        Self::with_clock(expiration, system_clock())
    }

    pub fn with_clock(expiration: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { expiration,
               markers: GcMarkers::new(),
               clock }
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Condena los marcadores no barridos cuya inactividad supera la ventana.
    pub fn mark(&mut self) {
        let now = self.clock.now();
        for (id, marker) in self.markers.iter_mut().filter(|(_, m)| !m.swept) {
            let should_sweep = now - marker.last_touched > self.expiration;
            if should_sweep && !marker.should_sweep {
                log::debug!("gc: instance '{id}' idle since {}, marked for sweeping", marker.last_touched);
            }
            marker.should_sweep = should_sweep;
        }
    }

    /// Registra que la instancia se usó ahora, salvo que ya esté condenada.
    pub fn update(&mut self, instance_id: &str) {
        let now = self.clock.now();
        match self.markers.get_mut(instance_id) {
            Some(marker) if marker.should_sweep => {
                log::debug!("gc: instance '{instance_id}' is already marked, touch ignored");
            }
            Some(marker) => marker.last_touched = now,
            None => {
                self.markers.insert(instance_id.to_string(),
                                    GcMarker { last_touched: now,
                                               should_sweep: false,
                                               swept: false });
            }
        }
    }

    pub fn is_marked(&self, instance_id: &str) -> bool {
        self.markers.get(instance_id).is_some_and(|m| m.should_sweep)
    }

    /// Invoca `on_expire` una sola vez por cada marcador condenado y aún no
    /// barrido. Idempotente.
    pub fn sweep<F>(&mut self, mut on_expire: F)
        where F: FnMut(&str)
    {
        for (id, marker) in self.markers.iter_mut() {
            if marker.should_sweep && !marker.swept {
                log::info!("gc: sweeping expired instance '{id}'");
                on_expire(id.as_str());
                marker.swept = true;
            }
        }
    }

    /// Retira los marcadores barridos que llevan otra ventana más sin uso e
    /// invoca `on_reclaim` por cada uno para que se borre su lápida.
    pub fn reclaim<F>(&mut self, mut on_reclaim: F)
        where F: FnMut(&str)
    {
        let now = self.clock.now();
        let grace = self.expiration + self.expiration;
        self.markers.retain(|id, marker| {
                        let stale = marker.swept && now - marker.last_touched > grace;
                        if stale {
                            log::info!("gc: reclaiming tombstone of instance '{id}'");
                            on_reclaim(id.as_str());
                        }
                        !stale
                    });
    }

    /// Olvida el marcador de una instancia que terminó normalmente.
    pub fn forget(&mut self, instance_id: &str) -> Option<GcMarker> {
        self.markers.remove(instance_id)
    }

    pub fn marker(&self, instance_id: &str) -> Option<&GcMarker> {
        self.markers.get(instance_id)
    }

    pub fn markers(&self) -> &GcMarkers {
        &self.markers
    }

    pub fn restore_markers(&mut self, markers: GcMarkers) {
        self.markers = markers;
    }
}
