//! Instancia en ejecución de una definición (la máquina de estados) y su
//! almacén de atributos.

mod attributes;
mod page_flow;

pub use attributes::Attributes;
pub use page_flow::PageFlow;
