use std::fs;
use std::io::{self, BufRead, Write};

use clap::{ArgAction, Parser, Subcommand};
use log::debug;

use pseudoflujo::error::RuntimeError;
use pseudoflujo::parser::{self, lexer};
use pseudoflujo::runtime::{Evento, FnSink, Interpreter, Paso};
use pseudoflujo::views::{Formato, ViewType};

#[derive(Parser)]
#[command(name = "pseudoflujo")]
#[command(about = "Pseudocode interpreter with flowchart and report views", version)]
struct Cli {
    /// Log more (-v debug, -vv trace). RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream
    Tokens {
        /// Source file
        file: String,
    },

    /// Parse and validate, then print the program back
    Parse {
        /// Source file
        file: String,

        /// Print the instruction tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute a program
    Run {
        /// Source file
        file: String,

        /// Answers for LEER, in order. Stdin is read once they run out
        #[arg(short, long = "input")]
        inputs: Vec<String>,

        /// Print every event, not only MOSTRAR output
        #[arg(long)]
        events: bool,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Render one of the program views
    Analyze {
        /// Source file
        file: String,

        /// View name, see `views`
        #[arg(long, default_value = "arbol")]
        view: String,

        #[arg(long)]
        json: bool,
    },

    /// List available views
    Views,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn print_event(evento: &Evento, events: bool, json: bool) {
    if json {
        match serde_json::to_string(evento) {
            Ok(line) => println!("{line}"),
            Err(e) => log::error!("cannot serialize event: {e}"),
        }
    } else if events {
        println!("{evento}");
    } else if let Evento::OutputProduced(value) = evento {
        println!("{value}");
    }
}

fn read_stdin_line(variable: &str) -> Result<Option<String>, io::Error> {
    eprint!("{variable}? ");
    io::stderr().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn run(file: &str, inputs: Vec<String>, events: bool, json: bool) -> Result<(), pseudoflujo::Error> {
    let source = fs::read_to_string(file)?;
    let programa = parser::parse(&source)?;

    let sink = FnSink(|evento: Evento| print_event(&evento, events, json));
    let mut interpreter = Interpreter::new(&programa, sink);
    let mut inputs = inputs.into_iter();

    loop {
        match interpreter.run()? {
            Paso::Terminado => break,
            Paso::EsperandoEntrada(variable) => {
                let raw = match inputs.next() {
                    Some(raw) => raw,
                    None => read_stdin_line(&variable)?
                        .ok_or_else(|| RuntimeError::InputExhausted {
                            variable: variable.clone(),
                        })?,
                };
                interpreter.provide_input(&variable, &raw)?;
            }
        }
    }

    debug!("final environment: {:?}", interpreter.entorno().variables());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Tokens { file } => {
            let source = fs::read_to_string(&file)?;
            for token in lexer::tokenize(&source)? {
                println!("{:<7} {:?}", token.span.to_string(), token.kind);
            }
        }
        Commands::Parse { file, json } => {
            let source = fs::read_to_string(&file)?;
            let programa = parser::parse(&source)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&programa)?);
            } else {
                print!("{programa}");
            }
        }
        Commands::Run {
            file,
            inputs,
            events,
            json,
        } => run(&file, inputs, events, json)?,
        Commands::Analyze { file, view, json } => {
            let Some(view_type) = ViewType::from_name(&view) else {
                eprintln!("Unknown view: {view}");
                std::process::exit(2);
            };
            let source = fs::read_to_string(&file)?;
            let programa = parser::parse(&source)?;
            let formato = if json { Formato::Json } else { Formato::Texto };
            let output = view_type.create().render(&programa, formato)?;
            println!("{}", output.trim_end());
        }
        Commands::Views => {
            println!("Available views:");
            for view in ViewType::all() {
                println!("  {:10} - {}", view.name(), view.description());
            }
        }
    }

    Ok(())
}
