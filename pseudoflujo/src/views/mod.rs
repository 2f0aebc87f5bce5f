pub mod arbol;
pub mod diagrama;
pub mod reportes;

use crate::error::Error;
use crate::ir::Programa;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formato {
    Texto,
    Json,
}

/// A read-only rendering of a parsed program.
pub trait View {
    fn render(&mut self, programa: &Programa, formato: Formato) -> Result<String, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewType {
    Arbol,
    Reportes,
    Diagrama,
}

impl ViewType {
    pub fn all() -> Vec<Self> {
        vec![Self::Arbol, Self::Reportes, Self::Diagrama]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Arbol => "arbol",
            Self::Reportes => "reportes",
            Self::Diagrama => "diagrama",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Arbol => "Instruction tree, printed back as source",
            Self::Reportes => "Arithmetic operators and control structures",
            Self::Diagrama => "Flowchart nodes with their resolved style",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|view| view.name() == name)
    }

    pub fn create(&self) -> Box<dyn View> {
        match self {
            Self::Arbol => Box::new(arbol::ArbolView),
            Self::Reportes => Box::new(reportes::ReportesView),
            Self::Diagrama => Box::new(diagrama::DiagramaView),
        }
    }
}
