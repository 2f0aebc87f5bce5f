use std::fmt;

use serde::Serialize;

use super::ast::{format_decimal, quote_text};
use super::programa::TipoInstruccion;
use crate::parser::lexer::TokenKind;

/// Instruction family a configuration kind is aimed at (`COLOR_SI`,
/// `COLOR_MIENTRAS`, `COLOR_BLOQUE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Categoria {
    Si,
    Mientras,
    Bloque,
}

impl Categoria {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Si => "SI",
            Self::Mientras => "MIENTRAS",
            Self::Bloque => "BLOQUE",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "SI" => Some(Self::Si),
            "MIENTRAS" => Some(Self::Mientras),
            "BLOQUE" => Some(Self::Bloque),
            _ => None,
        }
    }

    pub fn of(tipo: TipoInstruccion) -> Self {
        match tipo {
            TipoInstruccion::Si => Self::Si,
            TipoInstruccion::Mientras => Self::Mientras,
            TipoInstruccion::Asignar | TipoInstruccion::Mostrar | TipoInstruccion::Leer => {
                Self::Bloque
            }
        }
    }
}

/// Configuration kind. Unrecognised names are kept in `Desconocido` so newer
/// renderers can still read them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TipoConfiguracion {
    Color(Categoria),
    ColorTexto(Categoria),
    Figura(Categoria),
    LetraSize(Categoria),
    Letra(Categoria),
    Desconocido(String),
}

// Longer prefixes first: COLOR_TEXTO_ before COLOR_, LETRA_SIZE_ before LETRA_.
const PREFIXES: [(&str, fn(Categoria) -> TipoConfiguracion); 5] = [
    ("COLOR_TEXTO_", TipoConfiguracion::ColorTexto),
    ("COLOR_", TipoConfiguracion::Color),
    ("FIGURA_", TipoConfiguracion::Figura),
    ("LETRA_SIZE_", TipoConfiguracion::LetraSize),
    ("LETRA_", TipoConfiguracion::Letra),
];

impl TipoConfiguracion {
    pub fn from_name(name: &str) -> Self {
        for (prefix, build) in PREFIXES {
            if let Some(suffix) = name.strip_prefix(prefix)
                && let Some(categoria) = Categoria::from_suffix(suffix)
            {
                return build(categoria);
            }
        }
        Self::Desconocido(name.to_string())
    }

    pub fn name(&self) -> String {
        let (prefix, categoria) = match self {
            Self::Color(c) => ("COLOR_", c),
            Self::ColorTexto(c) => ("COLOR_TEXTO_", c),
            Self::Figura(c) => ("FIGURA_", c),
            Self::LetraSize(c) => ("LETRA_SIZE_", c),
            Self::Letra(c) => ("LETRA_", c),
            Self::Desconocido(name) => return name.clone(),
        };
        format!("{prefix}{}", categoria.suffix())
    }

    pub fn categoria(&self) -> Option<Categoria> {
        match self {
            Self::Color(c)
            | Self::ColorTexto(c)
            | Self::Figura(c)
            | Self::LetraSize(c)
            | Self::Letra(c) => Some(*c),
            Self::Desconocido(_) => None,
        }
    }

    /// Whether this kind styles instructions of `tipo`. Unknown kinds apply
    /// to every instruction.
    pub fn applies_to(&self, tipo: TipoInstruccion) -> bool {
        self.categoria().is_none_or(|c| c == Categoria::of(tipo))
    }

    /// Whether `valor` has the shape this kind demands.
    pub fn accepts(&self, valor: &ValorConfiguracion) -> bool {
        matches!(
            (self, valor),
            (Self::Color(_) | Self::ColorTexto(_), ValorConfiguracion::ColorHex(_))
                | (Self::Figura(_), ValorConfiguracion::Triple(_))
                | (Self::LetraSize(_), ValorConfiguracion::Tamano(_))
                | (Self::Letra(_), ValorConfiguracion::Fuente(_))
                | (Self::Desconocido(_), ValorConfiguracion::Texto(_))
        )
    }
}

impl fmt::Display for TipoConfiguracion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ValorConfiguracion {
    /// HFF0000
    ColorHex(String),
    /// 12,45,1 (meaning is up to the renderer)
    Triple([f64; 3]),
    /// 18
    Tamano(f64),
    /// ARIAL
    Fuente(String),
    /// Raw source text of the value of an unknown kind.
    Texto(String),
}

/// `H` followed by six hexadecimal digits.
pub fn is_hex_color(text: &str) -> bool {
    text.strip_prefix('H')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Reads back as a single identifier token, so it can be written unquoted.
fn is_plain_word(text: &str) -> bool {
    text.starts_with(|c: char| c.is_alphabetic())
        && text.chars().all(|c| c.is_alphanumeric() || c == '_')
        && TokenKind::keyword(text).is_none()
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format_decimal(value)
    }
}

impl fmt::Display for ValorConfiguracion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColorHex(hex) => write!(f, "{hex}"),
            Self::Triple([a, b, c]) => write!(
                f,
                "{},{},{}",
                format_number(*a),
                format_number(*b),
                format_number(*c)
            ),
            Self::Tamano(size) => write!(f, "{}", format_number(*size)),
            Self::Fuente(name) if is_plain_word(name) => write!(f, "{name}"),
            Self::Fuente(name) => write!(f, "{}", quote_text(name)),
            Self::Texto(raw) => write!(f, "{raw}"),
        }
    }
}

/// Presentation directive: `#CONFIG <tipo> <valor> [indice]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuracion {
    pub tipo: TipoConfiguracion,
    pub valor: ValorConfiguracion,
    /// Dotted instruction path (`2`, `3.1`); empty for a global setting.
    pub indice: String,
    pub linea: usize,
}

impl Configuracion {
    pub fn new(tipo: TipoConfiguracion, valor: ValorConfiguracion, indice: impl Into<String>) -> Self {
        Self {
            tipo,
            valor,
            indice: indice.into(),
            linea: 0,
        }
    }

    pub fn is_global(&self) -> bool {
        self.indice.is_empty()
    }
}

impl fmt::Display for Configuracion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#CONFIG {} {}", self.tipo, self.valor)?;
        if !self.is_global() {
            write!(f, " {}", self.indice)?;
        }
        Ok(())
    }
}
