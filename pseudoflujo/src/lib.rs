//! Spanish-keyword pseudocode: parsing into an instruction tree
//! ([`ir::Programa`]), step-wise interpretation that reports what happens as
//! [`runtime::Evento`]s, and read-only views (reports, flowchart model).

pub mod error;
pub mod ir;
pub mod parser;
pub mod runtime;
pub mod span;
pub mod views;

pub use error::Error;
pub use ir::{Configuracion, Instruccion, Programa, Ruta, TipoInstruccion};
pub use parser::parse;
pub use runtime::{Evento, Interpreter, Paso, Value};
