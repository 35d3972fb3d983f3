//! Constantes del motor de page-flows.
//!
//! Agrupa los nombres de estados y eventos que el motor cablea por su cuenta
//! (pseudo estados `initial`/`final` y los eventos internos de la máquina).
//! Un autor de flujos no puede usarlos en sus definiciones: el generador los
//! rechaza (ver `generator::PageFlowGenerator`).

/// Pseudo estado previo al primer estado del flujo.
pub const STATE_INITIAL: &str = "initial";
/// Pseudo estado terminal. Una vez alcanzado no hay transiciones legales.
pub const STATE_FINAL: &str = "final";

pub const EVENT_ENTRY: &str = "entry";
pub const EVENT_EXIT: &str = "exit";
/// Evento de la transición implícita `initial -> firstState`.
pub const EVENT_START: &str = "start";
/// Evento de la transición implícita `lastState -> final`.
pub const EVENT_END: &str = "end";
pub const EVENT_DO: &str = "do";

pub const RESERVED_STATES: [&str; 2] = [STATE_INITIAL, STATE_FINAL];
pub const RESERVED_EVENTS: [&str; 5] = [EVENT_ENTRY, EVENT_EXIT, EVENT_START, EVENT_END, EVENT_DO];

/// Sufijo de la clase de acciones por defecto de un flujo: las acciones sin
/// `class` explícita se resuelven contra `<FlowID>Action`.
pub const DEFAULT_ACTION_CLASS_SUFFIX: &str = "Action";

/// Bytes aleatorios de un ticket de instancia (antes de codificar en base64).
pub const INSTANCE_ID_BYTES: usize = 24;

/// Máximo de eventos encadenados (encolados por acciones) que se procesan en
/// una sola activación antes de abortarla.
pub const MAX_CHAINED_EVENTS: usize = 1024;

/// Versión lógica del motor. Forma parte del hash de definición para que un
/// cambio incompatible del motor invalide los hashes previos.
pub const ENGINE_VERSION: &str = "PF1.0";

pub fn is_reserved_state(name: &str) -> bool {
    RESERVED_STATES.contains(&name)
}

pub fn is_reserved_event(name: &str) -> bool {
    RESERVED_EVENTS.contains(&name)
}
