pub mod environment;
pub mod evaluator;
pub mod evento;
pub mod interpreter;
pub mod value;

pub use environment::Environment;
pub use evaluator::evaluate;
pub use evento::{EventSink, Evento, FnSink};
pub use interpreter::{CancelToken, Estado, Interpreter, Paso};
pub use value::Value;

use crate::error::RuntimeError;
use crate::ir::Programa;

/// Runs `programa` to the end, answering each LEER with the next item of
/// `inputs`, and returns every event produced.
pub fn run_with_inputs<I>(programa: &Programa, inputs: I) -> Result<Vec<Evento>, RuntimeError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut inputs = inputs.into_iter();
    let mut interpreter = Interpreter::new(programa, Vec::<Evento>::new());
    loop {
        match interpreter.run()? {
            Paso::Terminado => return Ok(interpreter.into_sink()),
            Paso::EsperandoEntrada(variable) => {
                let Some(raw) = inputs.next() else {
                    return Err(RuntimeError::InputExhausted { variable });
                };
                interpreter.provide_input(&variable, raw.as_ref())?;
            }
        }
    }
}
