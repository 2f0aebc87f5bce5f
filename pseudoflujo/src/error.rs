use thiserror::Error;

use crate::ir::{Ruta, TipoInstruccion};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("Lexer error at line {line}, column {column}: unexpected character '{found}'")]
    UnexpectedChar {
        line: usize,
        column: usize,
        found: char,
    },

    #[error("Lexer error at line {line}, column {column}: unterminated string literal")]
    UnterminatedString { line: usize, column: usize },

    #[error("Lexer error at line {line}, column {column}: invalid number '{lexeme}'")]
    InvalidNumber {
        line: usize,
        column: usize,
        lexeme: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Syntax error at line {line}, column {column}: expected {expected}, found {found}")]
    Unexpected {
        line: usize,
        column: usize,
        expected: String,
        found: String,
    },

    #[error("Syntax error: {block} block opened at line {line} is never closed, expected {terminator}")]
    UnterminatedBlock {
        line: usize,
        block: &'static str,
        terminator: &'static str,
    },

    #[error("Invalid configuration at line {line}: {message}")]
    InvalidConfiguration { line: usize, message: String },

    #[error("Syntax error at line {line}: nesting deeper than {limit} levels")]
    TooDeep { line: usize, limit: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid program at {location} (line {line}): {kind}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Instruction path (`2.1`) or configuration label (`#CONFIG 3`).
    pub location: String,
    pub line: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    #[error("{tipo} must not carry a block")]
    UnexpectedBlock { tipo: TipoInstruccion },

    #[error("{tipo} requires a block")]
    MissingBlock { tipo: TipoInstruccion },

    #[error("only SI may carry a SINO block")]
    UnexpectedElseBlock { tipo: TipoInstruccion },

    #[error("{tipo} requires an expression")]
    MissingExpression { tipo: TipoInstruccion },

    #[error("argument '{argumento}' does not match its expression '{expresion}'")]
    ArgumentMismatch { argumento: String, expresion: String },

    #[error("{tipo} must not carry an assignment expression")]
    UnexpectedExpression { tipo: TipoInstruccion },

    #[error("'{name}' is not a valid variable name")]
    InvalidTarget { name: String },

    #[error("index '{indice}' is not a dotted path of positive integers")]
    InvalidIndex { indice: String },

    #[error("value '{valor}' does not fit configuration kind {tipo}")]
    ValueMismatch { tipo: String, valor: String },

    #[error("blocks nest deeper than {limit} levels")]
    TooDeep { limit: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("type mismatch: '{operator}' cannot be applied to {}", describe_operands(.left, .right))]
    TypeMismatch {
        operator: String,
        left: &'static str,
        /// `None` for unary operators and conditions.
        right: Option<&'static str>,
    },

    #[error("integer overflow in '{operator}'")]
    Overflow { operator: String },
}

fn describe_operands(left: &str, right: &Option<&'static str>) -> String {
    match right {
        Some(right) => format!("{left} and {right}"),
        None => left.to_string(),
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Execution cancelled before instruction {ruta}")]
    Cancelled { ruta: Ruta },

    #[error("Error in instruction {ruta} (line {line}): {source}")]
    Eval {
        ruta: Ruta,
        line: usize,
        #[source]
        source: EvalError,
    },

    #[error("Instruction {ruta} ({tipo}) is malformed")]
    MalformedInstruction { ruta: Ruta, tipo: TipoInstruccion },

    #[error("Input given for '{found}', but LEER is waiting for '{expected}'")]
    UnexpectedInput { expected: String, found: String },

    #[error("No LEER instruction is waiting for input")]
    NotWaitingForInput,

    #[error("Execution is suspended until a value for '{variable}' is supplied")]
    AwaitingInput { variable: String },

    #[error("No input left for LEER {variable}")]
    InputExhausted { variable: String },

    #[error("Execution cannot continue: interpreter is {state}")]
    NotRunnable { state: &'static str },
}

/// Umbrella error for the whole pipeline, from source text to execution.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Formatting error: {source}")]
    FmtError {
        #[from]
        source: std::fmt::Error,
    },
}
