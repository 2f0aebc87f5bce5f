use std::collections::BTreeMap;

use serde::Serialize;

use super::configuracion::{Configuracion, TipoConfiguracion, ValorConfiguracion};
use super::programa::TipoInstruccion;

pub const DEFAULT_COLOR: &str = "DEFAULT";
pub const DEFAULT_LETRA: &str = "ARIAL";
pub const DEFAULT_TAM_LETRA: f64 = 14.0;

/// Effective presentation of one instruction once its configurations are
/// folded in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estilo {
    pub color: String,
    pub color_texto: String,
    pub figura: Option<[f64; 3]>,
    pub letra: String,
    pub tam_letra: f64,
    /// Values of unknown kinds, by kind name.
    pub otros: BTreeMap<String, String>,
}

impl Default for Estilo {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR.to_string(),
            color_texto: DEFAULT_COLOR.to_string(),
            figura: None,
            letra: DEFAULT_LETRA.to_string(),
            tam_letra: DEFAULT_TAM_LETRA,
            otros: BTreeMap::new(),
        }
    }
}

impl Estilo {
    /// Folds `configuraciones` in order over the defaults, skipping the ones
    /// aimed at another instruction family.
    pub fn resolve<'a>(
        configuraciones: impl IntoIterator<Item = &'a Configuracion>,
        tipo: TipoInstruccion,
    ) -> Self {
        let mut estilo = Self::default();
        for config in configuraciones {
            if config.tipo.applies_to(tipo) {
                estilo.apply(config);
            }
        }
        estilo
    }

    pub fn apply(&mut self, config: &Configuracion) {
        match (&config.tipo, &config.valor) {
            (TipoConfiguracion::Color(_), ValorConfiguracion::ColorHex(hex)) => {
                self.color = hex.clone();
            }
            (TipoConfiguracion::ColorTexto(_), ValorConfiguracion::ColorHex(hex)) => {
                self.color_texto = hex.clone();
            }
            (TipoConfiguracion::Figura(_), ValorConfiguracion::Triple(triple)) => {
                self.figura = Some(*triple);
            }
            (TipoConfiguracion::LetraSize(_), ValorConfiguracion::Tamano(size)) => {
                self.tam_letra = *size;
            }
            (TipoConfiguracion::Letra(_), ValorConfiguracion::Fuente(name)) => {
                self.letra = name.clone();
            }
            (tipo, valor) => {
                self.otros.insert(tipo.name(), valor.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Categoria;

    fn color(categoria: Categoria, hex: &str) -> Configuracion {
        Configuracion::new(
            TipoConfiguracion::Color(categoria),
            ValorConfiguracion::ColorHex(hex.to_string()),
            "",
        )
    }

    #[test]
    fn later_configurations_override_earlier_ones() {
        let configs = [color(Categoria::Si, "HFF0000"), color(Categoria::Si, "H00FF00")];
        let estilo = Estilo::resolve(&configs, TipoInstruccion::Si);
        assert_eq!(estilo.color, "H00FF00");
    }

    #[test]
    fn other_families_are_ignored() {
        let configs = [color(Categoria::Mientras, "HFF0000")];
        let estilo = Estilo::resolve(&configs, TipoInstruccion::Asignar);
        assert_eq!(estilo, Estilo::default());
    }
}
