use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace};

use super::environment::Environment;
use super::evaluator::evaluate;
use super::evento::{EventSink, Evento};
use super::value::Value;
use crate::error::{EvalError, RuntimeError};
use crate::ir::{Estilo, Expression, Instruccion, Programa, Ruta, TipoInstruccion};

/// Shared stop flag. Clones observe the same flag, so another thread can
/// stop a running interpreter.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Estado {
    Listo,
    EsperandoEntrada(String),
    Terminado,
    Cancelado,
    Fallido,
}

impl Estado {
    fn describe(&self) -> &'static str {
        match self {
            Estado::Listo => "ready",
            Estado::EsperandoEntrada(_) => "waiting for input",
            Estado::Terminado => "finished",
            Estado::Cancelado => "cancelled",
            Estado::Fallido => "failed",
        }
    }
}

/// Why [`Interpreter::run`] returned control.
#[derive(Debug, Clone, PartialEq)]
pub enum Paso {
    Terminado,
    /// A LEER is waiting; answer it with [`Interpreter::provide_input`].
    EsperandoEntrada(String),
}

/// One instruction sequence being walked.
struct Frame<'p> {
    instrucciones: &'p [Instruccion],
    siguiente: usize,
    /// Path of the instruction owning this block (root for the program).
    prefijo: Ruta,
    /// Numbering offset, non-zero for SINO blocks.
    desplazamiento: usize,
    /// MIENTRAS whose body this is; its condition is checked again on exit.
    bucle: Option<&'p Instruccion>,
}

/// Walks a [`Programa`] with an explicit frame stack, reporting what happens
/// to an [`EventSink`].
pub struct Interpreter<'p, S: EventSink> {
    programa: &'p Programa,
    entorno: Environment,
    sink: S,
    frames: Vec<Frame<'p>>,
    estado: Estado,
    iniciado: bool,
    cancel: CancelToken,
    actual: Option<(Ruta, Estilo)>,
}

impl<'p, S: EventSink> Interpreter<'p, S> {
    pub fn new(programa: &'p Programa, sink: S) -> Self {
        Self {
            programa,
            entorno: Environment::new(),
            sink,
            frames: vec![Frame {
                instrucciones: programa.instrucciones(),
                siguiente: 0,
                prefijo: Ruta::root(),
                desplazamiento: 0,
                bucle: None,
            }],
            estado: Estado::Listo,
            iniciado: false,
            cancel: CancelToken::new(),
            actual: None,
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn estado(&self) -> &Estado {
        &self.estado
    }

    pub fn entorno(&self) -> &Environment {
        &self.entorno
    }

    /// Path and resolved style of the instruction entered last.
    pub fn estilo_actual(&self) -> Option<(&Ruta, &Estilo)> {
        self.actual.as_ref().map(|(ruta, estilo)| (ruta, estilo))
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs until the program ends or a LEER needs a value.
    pub fn run(&mut self) -> Result<Paso, RuntimeError> {
        match &self.estado {
            Estado::Listo => {}
            Estado::EsperandoEntrada(variable) => {
                return Err(RuntimeError::AwaitingInput {
                    variable: variable.clone(),
                });
            }
            other => {
                return Err(RuntimeError::NotRunnable {
                    state: other.describe(),
                });
            }
        }

        if !self.iniciado {
            self.iniciado = true;
            debug!("starting execution");
            let programa = self.programa;
            for config in programa.globales() {
                self.sink.emit(Evento::ConfigurationApplied(config.clone()));
            }
        }

        loop {
            match self.step() {
                Ok(None) => continue,
                Ok(Some(paso)) => return Ok(paso),
                Err(err) => {
                    self.estado = match err {
                        RuntimeError::Cancelled { .. } => Estado::Cancelado,
                        _ => Estado::Fallido,
                    };
                    debug!("execution stopped: {err}");
                    return Err(err);
                }
            }
        }
    }

    /// Answers the pending LEER. Call [`Interpreter::run`] afterwards to go on.
    pub fn provide_input(&mut self, variable: &str, raw: &str) -> Result<(), RuntimeError> {
        let Estado::EsperandoEntrada(expected) = &self.estado else {
            return Err(RuntimeError::NotWaitingForInput);
        };
        if expected != variable {
            return Err(RuntimeError::UnexpectedInput {
                expected: expected.clone(),
                found: variable.to_string(),
            });
        }

        let value = Value::from_input(raw);
        trace!("LEER {variable} <- {value}");
        self.entorno.set(variable, value.clone());
        self.sink
            .emit(Evento::VariableChanged(variable.to_string(), value));
        self.estado = Estado::Listo;
        Ok(())
    }

    fn check_cancel(&self, ruta: &Ruta) -> Result<(), RuntimeError> {
        if self.cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled { ruta: ruta.clone() });
        }
        Ok(())
    }

    fn step(&mut self) -> Result<Option<Paso>, RuntimeError> {
        let Some(frame) = self.frames.last() else {
            self.estado = Estado::Terminado;
            debug!("execution finished");
            return Ok(Some(Paso::Terminado));
        };

        if frame.siguiente >= frame.instrucciones.len() {
            let (bucle, ruta) = (frame.bucle, frame.prefijo.clone());
            self.frames.pop();
            if let Some(mientras) = bucle {
                self.check_cancel(&ruta)?;
                self.execute(mientras, ruta)?;
            }
            return Ok(None);
        }

        let instrucciones = frame.instrucciones;
        let index = frame.siguiente;
        let ruta = frame.prefijo.child(frame.desplazamiento + index + 1);
        self.check_cancel(&ruta)?;

        if let Some(frame) = self.frames.last_mut() {
            frame.siguiente += 1;
        }
        self.execute(&instrucciones[index], ruta)
    }

    /// Applies the configurations aimed at `ruta` and announces the entry.
    fn enter(&mut self, instruccion: &Instruccion, ruta: &Ruta) {
        let tipo = instruccion.tipo;
        let programa = self.programa;
        for config in programa.dirigidas_a(ruta) {
            if config.tipo.applies_to(tipo) {
                self.sink.emit(Evento::ConfigurationApplied(config.clone()));
            } else {
                debug!("{config} does not style {tipo} at {ruta}");
            }
        }
        trace!("{ruta}: {tipo} {}", instruccion.argumento);
        self.actual = Some((ruta.clone(), programa.estilo(ruta, tipo)));
        self.sink.emit(Evento::StatementEntered(ruta.clone()));
    }

    fn execute(&mut self, instruccion: &'p Instruccion, ruta: Ruta) -> Result<Option<Paso>, RuntimeError> {
        self.enter(instruccion, &ruta);

        match instruccion.tipo {
            TipoInstruccion::Asignar => {
                let expression = required(instruccion.expresion.as_ref(), instruccion, &ruta)?;
                let value = self.eval(expression, instruccion, &ruta)?;
                self.entorno.set(instruccion.argumento.as_str(), value.clone());
                self.sink
                    .emit(Evento::VariableChanged(instruccion.argumento.clone(), value));
            }
            TipoInstruccion::Mostrar => {
                let expression = required(instruccion.argumento_expr.as_ref(), instruccion, &ruta)?;
                let value = self.eval(expression, instruccion, &ruta)?;
                self.sink.emit(Evento::OutputProduced(value));
            }
            TipoInstruccion::Leer => {
                let variable = instruccion.argumento.clone();
                self.sink.emit(Evento::InputRequested(variable.clone()));
                self.estado = Estado::EsperandoEntrada(variable.clone());
                return Ok(Some(Paso::EsperandoEntrada(variable)));
            }
            TipoInstruccion::Si => {
                let bloque = required(instruccion.bloque.as_deref(), instruccion, &ruta)?;
                if self.condition(instruccion, &ruta)? {
                    self.push(bloque, ruta, 0, None);
                } else if let Some(sino) = instruccion.bloque_sino.as_deref() {
                    self.push(sino, ruta, bloque.len(), None);
                }
            }
            TipoInstruccion::Mientras => {
                let bloque = required(instruccion.bloque.as_deref(), instruccion, &ruta)?;
                if self.condition(instruccion, &ruta)? {
                    self.push(bloque, ruta, 0, Some(instruccion));
                }
            }
        }
        Ok(None)
    }

    fn push(
        &mut self,
        instrucciones: &'p [Instruccion],
        prefijo: Ruta,
        desplazamiento: usize,
        bucle: Option<&'p Instruccion>,
    ) {
        self.frames.push(Frame {
            instrucciones,
            siguiente: 0,
            prefijo,
            desplazamiento,
            bucle,
        });
    }

    fn eval(&self, expression: &Expression, instruccion: &Instruccion, ruta: &Ruta) -> Result<Value, RuntimeError> {
        evaluate(expression, &self.entorno).map_err(|source| RuntimeError::Eval {
            ruta: ruta.clone(),
            line: instruccion.linea,
            source,
        })
    }

    fn condition(&self, instruccion: &Instruccion, ruta: &Ruta) -> Result<bool, RuntimeError> {
        let expression = required(instruccion.argumento_expr.as_ref(), instruccion, ruta)?;
        match self.eval(expression, instruccion, ruta)? {
            Value::Boolean(b) => Ok(b),
            other => Err(RuntimeError::Eval {
                ruta: ruta.clone(),
                line: instruccion.linea,
                source: EvalError::TypeMismatch {
                    operator: instruccion.tipo.keyword().to_string(),
                    left: other.type_name(),
                    right: None,
                },
            }),
        }
    }
}

fn required<'a, T: ?Sized>(part: Option<&'a T>, instruccion: &Instruccion, ruta: &Ruta) -> Result<&'a T, RuntimeError> {
    part.ok_or_else(|| RuntimeError::MalformedInstruction {
        ruta: ruta.clone(),
        tipo: instruccion.tipo,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Categoria, Configuracion, TipoConfiguracion, ValorConfiguracion};
    use crate::parser::parse;
    use crate::runtime::evento::FnSink;

    fn ruta(text: &str) -> Ruta {
        Ruta::parse(text).unwrap()
    }

    fn run_to_end(source: &str) -> (Vec<Evento>, Environment) {
        let programa = parse(source).unwrap();
        let mut interpreter = Interpreter::new(&programa, Vec::<Evento>::new());
        assert_eq!(interpreter.run(), Ok(Paso::Terminado));
        let entorno = interpreter.entorno().clone();
        (interpreter.into_sink(), entorno)
    }

    fn outputs(eventos: &[Evento]) -> Vec<Value> {
        eventos
            .iter()
            .filter_map(|evento| match evento {
                Evento::OutputProduced(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    fn entered(eventos: &[Evento]) -> Vec<String> {
        eventos
            .iter()
            .filter_map(|evento| match evento {
                Evento::StatementEntered(ruta) => Some(ruta.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn assignment_then_si_scenario() {
        let (eventos, entorno) = run_to_end("x = 5\nSI x > 3\n  MOSTRAR x\nFINSI");
        assert_eq!(
            eventos,
            vec![
                Evento::StatementEntered(ruta("1")),
                Evento::VariableChanged("x".into(), Value::Integer(5)),
                Evento::StatementEntered(ruta("2")),
                Evento::StatementEntered(ruta("2.1")),
                Evento::OutputProduced(Value::Integer(5)),
            ]
        );
        assert_eq!(entorno.get("x"), Ok(&Value::Integer(5)));
    }

    #[test]
    fn false_si_skips_its_block_and_takes_sino() {
        let (eventos, _) = run_to_end("SI 1 > 2\n  MOSTRAR 1\nSINO\n  MOSTRAR 2\nFINSI\nMOSTRAR 3");
        assert_eq!(outputs(&eventos), vec![Value::Integer(2), Value::Integer(3)]);
        assert_eq!(entered(&eventos), ["1", "1.2", "2"]);

        let (eventos, _) = run_to_end("SI FALSO\n  MOSTRAR 1\nFINSI");
        assert!(outputs(&eventos).is_empty());
    }

    #[test]
    fn false_si_leaves_the_environment_alone() {
        let (eventos, entorno) = run_to_end("x = 1\nSI FALSO\n  x = 2\n  y = 3\n  LEER z\nFINSI");
        assert_eq!(
            eventos,
            vec![
                Evento::StatementEntered(ruta("1")),
                Evento::VariableChanged("x".into(), Value::Integer(1)),
                Evento::StatementEntered(ruta("2")),
            ]
        );
        assert_eq!(entorno.get("x"), Ok(&Value::Integer(1)));
        assert_eq!(entorno.get("y"), Err(EvalError::UndefinedVariable("y".into())));
        assert_eq!(entorno.get("z"), Err(EvalError::UndefinedVariable("z".into())));

        // the SINO runs instead, and only its assignments land
        let (eventos, entorno) = run_to_end("x = 1\nSI x > 5\n  x = 2\nSINO\n  y = 3\nFINSI");
        let changed: Vec<_> = eventos
            .iter()
            .filter_map(|evento| match evento {
                Evento::VariableChanged(name, value) => Some((name.as_str(), value.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(changed, [("x", Value::Integer(1)), ("y", Value::Integer(3))]);
        assert_eq!(entorno.get("x"), Ok(&Value::Integer(1)));
    }

    #[test]
    fn mientras_checks_condition_each_round() {
        let (eventos, entorno) = run_to_end("i = 0\nMIENTRAS i < 3\n  MOSTRAR i\n  i = i + 1\nFINMIENTRAS");
        assert_eq!(
            outputs(&eventos),
            vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)]
        );
        assert_eq!(entorno.get("i"), Ok(&Value::Integer(3)));
        // four condition checks for three rounds
        assert_eq!(entered(&eventos).iter().filter(|r| *r == "2").count(), 4);
    }

    #[test]
    fn mientras_initially_false_runs_zero_times() {
        let (eventos, _) = run_to_end("MIENTRAS FALSO\n  MOSTRAR 1\nFINMIENTRAS\nMOSTRAR 2");
        assert_eq!(outputs(&eventos), vec![Value::Integer(2)]);
        assert_eq!(entered(&eventos), ["1", "2"]);
    }

    #[test]
    fn nested_loops() {
        let source = "\
i = 0
total = 0
MIENTRAS i < 3
  j = 0
  MIENTRAS j < i
    total = total + 1
    j = j + 1
  FINMIENTRAS
  i = i + 1
FINMIENTRAS
MOSTRAR total
";
        let (eventos, _) = run_to_end(source);
        assert_eq!(outputs(&eventos), vec![Value::Integer(3)]);
    }

    #[test]
    fn runtime_error_keeps_completed_state() {
        let programa = parse("x = 1\ny = x / 0\nz = 3").unwrap();
        let mut interpreter = Interpreter::new(&programa, Vec::<Evento>::new());
        let err = interpreter.run().unwrap_err();
        assert_eq!(
            err,
            RuntimeError::Eval {
                ruta: ruta("2"),
                line: 2,
                source: EvalError::DivisionByZero
            }
        );
        assert_eq!(interpreter.estado(), &Estado::Fallido);
        assert_eq!(interpreter.entorno().get("x"), Ok(&Value::Integer(1)));
        assert!(interpreter.entorno().get("y").is_err());
        assert_eq!(
            interpreter.run(),
            Err(RuntimeError::NotRunnable { state: "failed" })
        );
    }

    #[test]
    fn undefined_variable_in_mostrar() {
        let programa = parse("MOSTRAR y").unwrap();
        let mut interpreter = Interpreter::new(&programa, Vec::<Evento>::new());
        assert!(matches!(
            interpreter.run(),
            Err(RuntimeError::Eval {
                source: EvalError::UndefinedVariable(ref name),
                ..
            }) if name == "y"
        ));
    }

    #[test]
    fn conditions_must_be_boolean() {
        let programa = parse("SI 1\nFINSI").unwrap();
        let mut interpreter = Interpreter::new(&programa, Vec::<Evento>::new());
        assert!(matches!(
            interpreter.run(),
            Err(RuntimeError::Eval {
                source: EvalError::TypeMismatch { left: "ENTERO", right: None, .. },
                ..
            })
        ));
    }

    #[test]
    fn leer_suspends_until_input_arrives() {
        let programa = parse("LEER n\nMOSTRAR n * 2").unwrap();
        let mut interpreter = Interpreter::new(&programa, Vec::<Evento>::new());

        assert_eq!(interpreter.run(), Ok(Paso::EsperandoEntrada("n".into())));
        assert_eq!(interpreter.sink().last(), Some(&Evento::InputRequested("n".into())));
        assert_eq!(
            interpreter.run(),
            Err(RuntimeError::AwaitingInput { variable: "n".into() })
        );
        assert_eq!(
            interpreter.provide_input("m", "4"),
            Err(RuntimeError::UnexpectedInput {
                expected: "n".into(),
                found: "m".into()
            })
        );
        interpreter.provide_input("n", "21").unwrap();
        assert_eq!(interpreter.run(), Ok(Paso::Terminado));
        assert_eq!(
            interpreter.provide_input("n", "1"),
            Err(RuntimeError::NotWaitingForInput)
        );

        assert_eq!(
            interpreter.into_sink(),
            vec![
                Evento::StatementEntered(ruta("1")),
                Evento::InputRequested("n".into()),
                Evento::VariableChanged("n".into(), Value::Integer(21)),
                Evento::StatementEntered(ruta("2")),
                Evento::OutputProduced(Value::Integer(42)),
            ]
        );
    }

    #[test]
    fn globals_once_then_targeted_before_their_instruction() {
        let source = "\
#CONFIG COLOR_SI H00FF00
#CONFIG COLOR_SI HFF0000 2
x = 1
SI x = 1
  MOSTRAR x
FINSI
SI x = 2
FINSI
";
        let programa = parse(source).unwrap();
        let mut interpreter = Interpreter::new(&programa, Vec::<Evento>::new());
        interpreter.run().unwrap();
        let eventos = interpreter.into_sink();

        let global = Configuracion {
            linea: 1,
            ..Configuracion::new(
                TipoConfiguracion::Color(Categoria::Si),
                ValorConfiguracion::ColorHex("H00FF00".into()),
                "",
            )
        };
        let targeted = Configuracion {
            linea: 2,
            ..Configuracion::new(
                TipoConfiguracion::Color(Categoria::Si),
                ValorConfiguracion::ColorHex("HFF0000".into()),
                "2",
            )
        };
        assert_eq!(eventos[0], Evento::ConfigurationApplied(global));
        assert_eq!(eventos[1], Evento::StatementEntered(ruta("1")));
        let applied: Vec<_> = eventos
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Evento::ConfigurationApplied(_)))
            .collect();
        assert_eq!(applied.len(), 2);
        let (at, evento) = applied[1];
        assert_eq!(evento, &Evento::ConfigurationApplied(targeted));
        assert_eq!(eventos[at + 1], Evento::StatementEntered(ruta("2")));

        assert_eq!(programa.estilo(&ruta("2"), TipoInstruccion::Si).color, "HFF0000");
        assert_eq!(programa.estilo(&ruta("3"), TipoInstruccion::Si).color, "H00FF00");
        assert_eq!(programa.estilo(&ruta("2.1"), TipoInstruccion::Mostrar).color, "DEFAULT");
    }

    #[test]
    fn current_style_follows_execution() {
        let programa = parse("#CONFIG LETRA_SIZE_BLOQUE 20 1\nx = 1\nMOSTRAR x").unwrap();
        let mut interpreter = Interpreter::new(&programa, Vec::<Evento>::new());
        assert!(interpreter.estilo_actual().is_none());
        interpreter.run().unwrap();
        let (ruta_actual, estilo) = interpreter.estilo_actual().unwrap();
        assert_eq!(ruta_actual, &ruta("2"));
        assert_eq!(estilo.tam_letra, 14.0);
    }

    #[test]
    fn cancelled_before_start() {
        let programa = parse("x = 1").unwrap();
        let mut interpreter = Interpreter::new(&programa, Vec::<Evento>::new());
        interpreter.cancel_token().cancel();
        assert_eq!(
            interpreter.run(),
            Err(RuntimeError::Cancelled { ruta: ruta("1") })
        );
        assert_eq!(interpreter.estado(), &Estado::Cancelado);
        assert!(interpreter.entorno().is_empty());
    }

    #[test]
    fn cancellation_stops_an_endless_loop() {
        let programa = parse("i = 0\nMIENTRAS VERDADERO\n  i = i + 1\n  MOSTRAR i\nFINMIENTRAS").unwrap();
        let token = CancelToken::new();
        let trigger = token.clone();
        let mut shown = 0;
        let sink = FnSink(|evento: Evento| {
            if let Evento::OutputProduced(_) = evento {
                shown += 1;
                if shown == 5 {
                    trigger.cancel();
                }
            }
        });
        let mut interpreter = Interpreter::new(&programa, sink).with_cancel_token(token);
        assert_eq!(
            interpreter.run(),
            Err(RuntimeError::Cancelled { ruta: ruta("2") })
        );
        assert_eq!(interpreter.entorno().get("i"), Ok(&Value::Integer(5)));
    }

    #[test]
    fn finished_interpreter_cannot_run_again() {
        let programa = parse("x = 1").unwrap();
        let mut interpreter = Interpreter::new(&programa, Vec::<Evento>::new());
        assert_eq!(interpreter.run(), Ok(Paso::Terminado));
        assert_eq!(
            interpreter.run(),
            Err(RuntimeError::NotRunnable { state: "finished" })
        );
    }
}
