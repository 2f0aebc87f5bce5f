use std::fmt;

use log::warn;
use serde::{Serialize, Serializer};

use super::ast::Expression;
use super::configuracion::Configuracion;
use super::estilo::Estilo;
use crate::error::{ValidationError, ValidationErrorKind};

/// Deepest allowed nesting of SI/MIENTRAS blocks, and of parentheses and
/// unary operators inside one expression. The parser and [`Programa::new`]
/// reject anything deeper.
pub const MAX_NESTING: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TipoInstruccion {
    Asignar,
    Si,
    Mientras,
    Mostrar,
    Leer,
}

impl TipoInstruccion {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asignar => "ASIGNAR",
            Self::Si => "SI",
            Self::Mientras => "MIENTRAS",
            Self::Mostrar => "MOSTRAR",
            Self::Leer => "LEER",
        }
    }

    pub fn has_block(&self) -> bool {
        matches!(self, Self::Si | Self::Mientras)
    }
}

impl fmt::Display for TipoInstruccion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// 1-based dotted path to an instruction: `2` is the second top-level
/// instruction, `2.1` the first one inside its block. Instructions of a SINO
/// block continue the numbering after the SI block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ruta(Vec<usize>);

impl Ruta {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn parse(text: &str) -> Option<Self> {
        let segments = text
            .split('.')
            .map(|segment| match segment.parse::<usize>() {
                Ok(n) if n > 0 && segment.chars().all(|c| c.is_ascii_digit()) => Some(n),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self(segments))
    }

    pub fn child(&self, position: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(position);
        Self(segments)
    }

    pub fn segments(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for Ruta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .0
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(".");
        f.pad(&text)
    }
}

impl Serialize for Ruta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruccion {
    pub tipo: TipoInstruccion,
    /// ASIGNAR/LEER: variable name. SI/MIENTRAS: condition text.
    /// MOSTRAR: value text.
    pub argumento: String,
    /// Parsed form of `argumento` for SI, MIENTRAS and MOSTRAR.
    pub argumento_expr: Option<Expression>,
    /// Right-hand side of ASIGNAR.
    pub expresion: Option<Expression>,
    pub bloque: Option<Vec<Instruccion>>,
    pub bloque_sino: Option<Vec<Instruccion>>,
    pub linea: usize,
}

impl Instruccion {
    fn bare(tipo: TipoInstruccion, argumento: String, linea: usize) -> Self {
        Self {
            tipo,
            argumento,
            argumento_expr: None,
            expresion: None,
            bloque: None,
            bloque_sino: None,
            linea,
        }
    }

    pub fn asignar(variable: impl Into<String>, expresion: Expression, linea: usize) -> Self {
        Self {
            expresion: Some(expresion),
            ..Self::bare(TipoInstruccion::Asignar, variable.into(), linea)
        }
    }

    pub fn si(
        condicion: Expression,
        bloque: Vec<Instruccion>,
        bloque_sino: Option<Vec<Instruccion>>,
        linea: usize,
    ) -> Self {
        Self {
            argumento_expr: Some(condicion.clone()),
            bloque: Some(bloque),
            bloque_sino,
            ..Self::bare(TipoInstruccion::Si, condicion.to_string(), linea)
        }
    }

    pub fn mientras(condicion: Expression, bloque: Vec<Instruccion>, linea: usize) -> Self {
        Self {
            argumento_expr: Some(condicion.clone()),
            bloque: Some(bloque),
            ..Self::bare(TipoInstruccion::Mientras, condicion.to_string(), linea)
        }
    }

    pub fn mostrar(valor: Expression, linea: usize) -> Self {
        Self {
            argumento_expr: Some(valor.clone()),
            ..Self::bare(TipoInstruccion::Mostrar, valor.to_string(), linea)
        }
    }

    pub fn leer(variable: impl Into<String>, linea: usize) -> Self {
        Self::bare(TipoInstruccion::Leer, variable.into(), linea)
    }

    /// Same kind, arguments and block shape, ignoring source lines.
    pub fn same_shape(&self, other: &Instruccion) -> bool {
        self.tipo == other.tipo
            && self.argumento == other.argumento
            && self.argumento_expr == other.argumento_expr
            && self.expresion == other.expresion
            && same_block(self.bloque.as_deref(), other.bloque.as_deref())
            && same_block(self.bloque_sino.as_deref(), other.bloque_sino.as_deref())
    }

    fn write_source(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self.tipo {
            TipoInstruccion::Asignar => {
                write!(f, "{indent}{} = ", self.argumento)?;
                match &self.expresion {
                    Some(expr) => writeln!(f, "{expr}"),
                    None => writeln!(f),
                }
            }
            TipoInstruccion::Mostrar => writeln!(f, "{indent}MOSTRAR {}", self.argumento),
            TipoInstruccion::Leer => writeln!(f, "{indent}LEER {}", self.argumento),
            TipoInstruccion::Si => {
                writeln!(f, "{indent}SI {}", self.argumento)?;
                write_block(f, self.bloque.as_deref(), depth + 1)?;
                if let Some(sino) = &self.bloque_sino {
                    writeln!(f, "{indent}SINO")?;
                    write_block(f, Some(sino.as_slice()), depth + 1)?;
                }
                writeln!(f, "{indent}FINSI")
            }
            TipoInstruccion::Mientras => {
                writeln!(f, "{indent}MIENTRAS {}", self.argumento)?;
                write_block(f, self.bloque.as_deref(), depth + 1)?;
                writeln!(f, "{indent}FINMIENTRAS")
            }
        }
    }
}

fn same_block(a: Option<&[Instruccion]>, b: Option<&[Instruccion]>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_shape(y)),
        _ => false,
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, bloque: Option<&[Instruccion]>, depth: usize) -> fmt::Result {
    for instruccion in bloque.unwrap_or_default() {
        instruccion.write_source(f, depth)?;
    }
    Ok(())
}

impl fmt::Display for Instruccion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_source(f, 0)
    }
}

/// A parsed and validated program. Only [`Programa::new`] builds one, so the
/// structural invariants always hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Programa {
    instrucciones: Vec<Instruccion>,
    configuraciones: Vec<Configuracion>,
    #[serde(skip)]
    objetivos: Vec<Option<Ruta>>,
}

impl Programa {
    pub fn new(
        instrucciones: Vec<Instruccion>,
        configuraciones: Vec<Configuracion>,
    ) -> Result<Self, ValidationError> {
        validate_sequence(&instrucciones, &Ruta::root(), 0, 0)?;

        let mut objetivos = Vec::with_capacity(configuraciones.len());
        for (i, config) in configuraciones.iter().enumerate() {
            let fail = |kind| ValidationError {
                kind,
                location: format!("#CONFIG {}", i + 1),
                line: config.linea,
            };
            if !config.tipo.accepts(&config.valor) {
                return Err(fail(ValidationErrorKind::ValueMismatch {
                    tipo: config.tipo.name(),
                    valor: config.valor.to_string(),
                }));
            }
            if config.is_global() {
                objetivos.push(None);
                continue;
            }
            let ruta = Ruta::parse(&config.indice).ok_or_else(|| {
                fail(ValidationErrorKind::InvalidIndex {
                    indice: config.indice.clone(),
                })
            })?;
            if find(&instrucciones, ruta.segments()).is_none() {
                warn!(
                    "{} (line {}) targets {ruta}, which is not an instruction",
                    config.tipo, config.linea
                );
            }
            objetivos.push(Some(ruta));
        }

        Ok(Self {
            instrucciones,
            configuraciones,
            objetivos,
        })
    }

    pub fn instrucciones(&self) -> &[Instruccion] {
        &self.instrucciones
    }

    pub fn configuraciones(&self) -> &[Configuracion] {
        &self.configuraciones
    }

    pub fn instruccion(&self, ruta: &Ruta) -> Option<&Instruccion> {
        find(&self.instrucciones, ruta.segments())
    }

    /// Configurations with an empty `indice`, in source order.
    pub fn globales(&self) -> impl Iterator<Item = &Configuracion> {
        self.configuraciones
            .iter()
            .zip(&self.objetivos)
            .filter(|(_, objetivo)| objetivo.is_none())
            .map(|(config, _)| config)
    }

    /// Configurations aimed at `ruta`, in source order.
    pub fn dirigidas_a<'a>(&'a self, ruta: &'a Ruta) -> impl Iterator<Item = &'a Configuracion> {
        self.configuraciones
            .iter()
            .zip(&self.objetivos)
            .filter(move |(_, objetivo)| objetivo.as_ref() == Some(ruta))
            .map(|(config, _)| config)
    }

    /// Style of the instruction at `ruta`: defaults, then globals, then the
    /// configurations aimed at it.
    pub fn estilo(&self, ruta: &Ruta, tipo: TipoInstruccion) -> Estilo {
        Estilo::resolve(self.globales().chain(self.dirigidas_a(ruta)), tipo)
    }

    pub fn same_shape(&self, other: &Programa) -> bool {
        same_block(Some(self.instrucciones.as_slice()), Some(other.instrucciones.as_slice()))
            && self.configuraciones.len() == other.configuraciones.len()
            && self
                .configuraciones
                .iter()
                .zip(&other.configuraciones)
                .all(|(a, b)| a.tipo == b.tipo && a.valor == b.valor && a.indice == b.indice)
    }
}

fn find<'a>(instrucciones: &'a [Instruccion], segments: &[usize]) -> Option<&'a Instruccion> {
    let (&first, rest) = segments.split_first()?;
    let instruccion = instrucciones.get(first.checked_sub(1)?)?;
    if rest.is_empty() {
        return Some(instruccion);
    }
    let (&position, deeper) = rest.split_first()?;
    let bloque = instruccion.bloque.as_deref().unwrap_or_default();
    if position <= bloque.len() {
        let mut path = vec![position];
        path.extend_from_slice(deeper);
        return find(bloque, &path);
    }
    let sino = instruccion.bloque_sino.as_deref()?;
    let mut path = vec![position - bloque.len()];
    path.extend_from_slice(deeper);
    find(sino, &path)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(char::is_alphabetic) && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn validate_sequence(
    instrucciones: &[Instruccion],
    prefijo: &Ruta,
    offset: usize,
    depth: usize,
) -> Result<(), ValidationError> {
    for (i, instruccion) in instrucciones.iter().enumerate() {
        let ruta = prefijo.child(offset + i + 1);
        let fail = |kind| ValidationError {
            kind,
            location: ruta.to_string(),
            line: instruccion.linea,
        };
        let tipo = instruccion.tipo;

        match (tipo.has_block(), &instruccion.bloque) {
            (true, None) => return Err(fail(ValidationErrorKind::MissingBlock { tipo })),
            (false, Some(_)) => return Err(fail(ValidationErrorKind::UnexpectedBlock { tipo })),
            _ => {}
        }
        if instruccion.bloque_sino.is_some() && tipo != TipoInstruccion::Si {
            return Err(fail(ValidationErrorKind::UnexpectedElseBlock { tipo }));
        }

        match tipo {
            TipoInstruccion::Asignar | TipoInstruccion::Leer => {
                if !is_identifier(&instruccion.argumento) {
                    return Err(fail(ValidationErrorKind::InvalidTarget {
                        name: instruccion.argumento.clone(),
                    }));
                }
            }
            TipoInstruccion::Si | TipoInstruccion::Mientras | TipoInstruccion::Mostrar => {
                let Some(expr) = &instruccion.argumento_expr else {
                    return Err(fail(ValidationErrorKind::MissingExpression { tipo }));
                };
                let rendered = expr.to_string();
                if instruccion.argumento != rendered {
                    return Err(fail(ValidationErrorKind::ArgumentMismatch {
                        argumento: instruccion.argumento.clone(),
                        expresion: rendered,
                    }));
                }
            }
        }
        match (tipo, &instruccion.expresion) {
            (TipoInstruccion::Asignar, None) => {
                return Err(fail(ValidationErrorKind::MissingExpression { tipo }));
            }
            (TipoInstruccion::Asignar, Some(_)) | (_, None) => {}
            (_, Some(_)) => return Err(fail(ValidationErrorKind::UnexpectedExpression { tipo })),
        }

        let Some(bloque) = instruccion.bloque.as_deref() else {
            continue;
        };
        if depth == MAX_NESTING {
            return Err(fail(ValidationErrorKind::TooDeep { limit: MAX_NESTING }));
        }
        validate_sequence(bloque, &ruta, 0, depth + 1)?;
        if let Some(sino) = &instruccion.bloque_sino {
            validate_sequence(sino, &ruta, bloque.len(), depth + 1)?;
        }
    }
    Ok(())
}

impl fmt::Display for Programa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for config in &self.configuraciones {
            writeln!(f, "{config}")?;
        }
        write_block(f, Some(self.instrucciones.as_slice()), 0)
    }
}
