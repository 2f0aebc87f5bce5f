pub mod expression;
pub mod lexer;
pub mod parser;

mod directive;

use log::debug;

use crate::error::Error;
use crate::ir::Programa;

/// Source text to a validated [`Programa`].
pub fn parse(source: &str) -> Result<Programa, Error> {
    let tokens = lexer::tokenize(source)?;
    debug!("{} tokens", tokens.len());
    let (instrucciones, configuraciones) = parser::parse_tokens(&tokens)?;
    debug!(
        "{} top-level instructions, {} configurations",
        instrucciones.len(),
        configuraciones.len()
    );
    Ok(Programa::new(instrucciones, configuraciones)?)
}
