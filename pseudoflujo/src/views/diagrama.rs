use std::fmt::{self, Write};

use serde::Serialize;

use super::{Formato, View};
use crate::error::Error;
use crate::ir::estilo::DEFAULT_COLOR;
use crate::ir::{Estilo, Instruccion, Programa, Ruta, TipoInstruccion};

const SEPARACION_VERTICAL: f64 = 90.0;
const ANCHO: f64 = 240.0;
const ALTO: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Figura {
    Rombo,
    Rectangulo,
    Paralelogramo,
}

impl Figura {
    fn of(tipo: TipoInstruccion) -> Self {
        match tipo {
            TipoInstruccion::Si | TipoInstruccion::Mientras => Self::Rombo,
            TipoInstruccion::Asignar => Self::Rectangulo,
            TipoInstruccion::Mostrar | TipoInstruccion::Leer => Self::Paralelogramo,
        }
    }
}

impl fmt::Display for Figura {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rombo => "ROMBO",
            Self::Rectangulo => "RECTANGULO",
            Self::Paralelogramo => "PARALELOGRAMO",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nodo {
    /// 1-based, in traversal order.
    pub indice: usize,
    pub ruta: Ruta,
    pub texto: String,
    pub figura: Figura,
    pub x: f64,
    pub y: f64,
    pub ancho: f64,
    pub alto: f64,
    pub estilo: Estilo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conexion {
    pub id: String,
    pub origen: usize,
    pub destino: usize,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagramaDeFlujo {
    pub nodos: Vec<Nodo>,
    pub conexiones: Vec<Conexion>,
}

impl DiagramaDeFlujo {
    fn conectar(&mut self, origen: usize, destino: usize) {
        let id = format!("c{}", self.conexiones.len() + 1);
        self.conexiones.push(Conexion {
            id,
            origen,
            destino,
            color: DEFAULT_COLOR.to_string(),
        });
    }
}

/// Lays out one node per instruction, top to bottom, and chains them.
pub struct DiagramaBuilder<'p> {
    programa: &'p Programa,
    diagrama: DiagramaDeFlujo,
}

impl<'p> DiagramaBuilder<'p> {
    pub fn new(programa: &'p Programa) -> Self {
        Self {
            programa,
            diagrama: DiagramaDeFlujo::default(),
        }
    }

    pub fn build(mut self) -> DiagramaDeFlujo {
        let programa = self.programa;
        self.agregar(programa.instrucciones(), &Ruta::root(), 0);
        for destino in 2..=self.diagrama.nodos.len() {
            self.diagrama.conectar(destino - 1, destino);
        }
        self.diagrama
    }

    fn agregar(&mut self, instrucciones: &'p [Instruccion], prefijo: &Ruta, desplazamiento: usize) {
        for (i, instruccion) in instrucciones.iter().enumerate() {
            let ruta = prefijo.child(desplazamiento + i + 1);
            self.nodo(instruccion, ruta.clone());

            let bloque = instruccion.bloque.as_deref().unwrap_or_default();
            self.agregar(bloque, &ruta, 0);
            if let Some(sino) = &instruccion.bloque_sino {
                self.agregar(sino, &ruta, bloque.len());
            }
        }
    }

    fn nodo(&mut self, instruccion: &Instruccion, ruta: Ruta) {
        let indice = self.diagrama.nodos.len() + 1;
        let estilo = self.programa.estilo(&ruta, instruccion.tipo);
        self.diagrama.nodos.push(Nodo {
            indice,
            texto: texto(instruccion),
            figura: Figura::of(instruccion.tipo),
            x: 0.0,
            y: indice as f64 * SEPARACION_VERTICAL,
            ancho: ANCHO,
            alto: ALTO,
            estilo,
            ruta,
        });
    }
}

fn texto(instruccion: &Instruccion) -> String {
    match (instruccion.tipo, &instruccion.expresion) {
        (TipoInstruccion::Asignar, Some(expresion)) => {
            format!("ASIGNACION {} = {expresion}", instruccion.argumento)
        }
        (TipoInstruccion::Asignar, None) => format!("ASIGNACION {}", instruccion.argumento),
        (TipoInstruccion::Si | TipoInstruccion::Mientras, _) => {
            format!("{} ({})", instruccion.tipo, instruccion.argumento)
        }
        (TipoInstruccion::Mostrar | TipoInstruccion::Leer, _) => {
            format!("{} {}", instruccion.tipo, instruccion.argumento)
        }
    }
}

pub struct DiagramaView;

impl View for DiagramaView {
    fn render(&mut self, programa: &Programa, formato: Formato) -> Result<String, Error> {
        let diagrama = DiagramaBuilder::new(programa).build();
        if formato == Formato::Json {
            return Ok(serde_json::to_string_pretty(&diagrama)?);
        }

        let mut out = String::new();
        writeln!(out, "Nodes:")?;
        for nodo in &diagrama.nodos {
            writeln!(
                out,
                "  #{:<3} {:<8} {:<13} y={:<5} color={} color_texto={} letra={} {}",
                nodo.indice,
                nodo.ruta,
                nodo.figura,
                nodo.y,
                nodo.estilo.color,
                nodo.estilo.color_texto,
                nodo.estilo.letra,
                nodo.estilo.tam_letra
            )?;
            writeln!(out, "        {}", nodo.texto)?;
        }
        writeln!(out, "Connections:")?;
        for conexion in &diagrama.conexiones {
            writeln!(out, "  {}: #{} -> #{}", conexion.id, conexion.origen, conexion.destino)?;
        }
        Ok(out)
    }
}
