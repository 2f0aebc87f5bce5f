use super::{Formato, View};
use crate::error::Error;
use crate::ir::Programa;

/// The program itself: source text or the serialized tree.
pub struct ArbolView;

impl View for ArbolView {
    fn render(&mut self, programa: &Programa, formato: Formato) -> Result<String, Error> {
        Ok(match formato {
            Formato::Texto => programa.to_string(),
            Formato::Json => serde_json::to_string_pretty(programa)?,
        })
    }
}
