pub mod ast;
pub mod configuracion;
pub mod estilo;
pub mod programa;

pub use ast::{BinaryOperator, Expression, UnaryOperator};
pub use configuracion::{Categoria, Configuracion, TipoConfiguracion, ValorConfiguracion};
pub use estilo::Estilo;
pub use programa::{Instruccion, MAX_NESTING, Programa, Ruta, TipoInstruccion};
