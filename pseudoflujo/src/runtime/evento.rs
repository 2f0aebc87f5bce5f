use std::fmt;

use serde::Serialize;

use super::value::Value;
use crate::ir::{Configuracion, Ruta};

/// Something a renderer can react to, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Evento {
    StatementEntered(Ruta),
    ConfigurationApplied(Configuracion),
    OutputProduced(Value),
    InputRequested(String),
    VariableChanged(String, Value),
}

impl fmt::Display for Evento {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evento::StatementEntered(ruta) => write!(f, "enter   {ruta}"),
            Evento::ConfigurationApplied(config) => write!(f, "config  {config}"),
            Evento::OutputProduced(value) => write!(f, "output  {value}"),
            Evento::InputRequested(variable) => write!(f, "input   {variable}"),
            Evento::VariableChanged(variable, value) => write!(f, "set     {variable} = {value}"),
        }
    }
}

/// Receiver of execution events.
pub trait EventSink {
    fn emit(&mut self, evento: Evento);
}

impl EventSink for Vec<Evento> {
    fn emit(&mut self, evento: Evento) {
        self.push(evento);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, evento: Evento) {
        (**self).emit(evento);
    }
}

/// Adapts a closure into an [`EventSink`].
pub struct FnSink<F>(pub F);

impl<F: FnMut(Evento)> EventSink for FnSink<F> {
    fn emit(&mut self, evento: Evento) {
        (self.0)(evento);
    }
}
