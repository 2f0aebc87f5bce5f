use std::fmt::Write;

use serde::Serialize;

use super::{Formato, View};
use crate::error::Error;
use crate::ir::{Instruccion, Programa, TipoInstruccion};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperadorOcurrencia {
    pub operador: &'static str,
    pub linea: usize,
    /// 1-based position in `ocurrencia`.
    pub columna: usize,
    pub ocurrencia: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstructuraControl {
    pub objeto: &'static str,
    pub linea: usize,
    pub condicion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reportes {
    pub operadores: Vec<OperadorOcurrencia>,
    pub estructuras: Vec<EstructuraControl>,
}

/// Collects arithmetic operators of assignments and conditions, and every
/// SI/MIENTRAS, in program order.
pub fn construir_reportes(instrucciones: &[Instruccion]) -> Reportes {
    let mut reportes = Reportes::default();
    recolectar(instrucciones, &mut reportes);
    reportes
}

fn recolectar(instrucciones: &[Instruccion], reportes: &mut Reportes) {
    for instruccion in instrucciones {
        match instruccion.tipo {
            TipoInstruccion::Si | TipoInstruccion::Mientras => {
                reportes.estructuras.push(EstructuraControl {
                    objeto: instruccion.tipo.keyword(),
                    linea: instruccion.linea,
                    condicion: instruccion.argumento.clone(),
                });
                scan_operadores(&instruccion.argumento, instruccion.linea, &mut reportes.operadores);
                for bloque in [&instruccion.bloque, &instruccion.bloque_sino].into_iter().flatten() {
                    recolectar(bloque, reportes);
                }
            }
            TipoInstruccion::Asignar => {
                if let Some(expresion) = &instruccion.expresion {
                    scan_operadores(&expresion.to_string(), instruccion.linea, &mut reportes.operadores);
                }
            }
            TipoInstruccion::Mostrar | TipoInstruccion::Leer => {}
        }
    }
}

fn scan_operadores(texto: &str, linea: usize, operadores: &mut Vec<OperadorOcurrencia>) {
    let mut in_text = false;
    for (i, ch) in texto.chars().enumerate() {
        let operador = match ch {
            '"' => {
                // a doubled quote toggles twice and stays inside
                in_text = !in_text;
                continue;
            }
            _ if in_text => continue,
            '+' => "Suma",
            '-' => "Resta",
            '*' => "Multiplicacion",
            '/' => "Division",
            _ => continue,
        };
        operadores.push(OperadorOcurrencia {
            operador,
            linea,
            columna: i + 1,
            ocurrencia: texto.to_string(),
        });
    }
}

pub struct ReportesView;

impl View for ReportesView {
    fn render(&mut self, programa: &Programa, formato: Formato) -> Result<String, Error> {
        let reportes = construir_reportes(programa.instrucciones());
        if formato == Formato::Json {
            return Ok(serde_json::to_string_pretty(&reportes)?);
        }

        let mut out = String::new();
        writeln!(out, "Operators:")?;
        for op in &reportes.operadores {
            writeln!(
                out,
                "  {:<15} line {:>3}, column {:>3}  {}",
                op.operador, op.linea, op.columna, op.ocurrencia
            )?;
        }
        writeln!(out, "Control structures:")?;
        for estructura in &reportes.estructuras {
            writeln!(
                out,
                "  {:<15} line {:>3}  {}",
                estructura.objeto, estructura.linea, estructura.condicion
            )?;
        }
        Ok(out)
    }
}
