use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use sic::{EnvId, Interpreter};

/// Sic: a small Lisp with closures and user-defined macros.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Script to run; `.sictest` scripts run in test mode. Starts the REPL
    /// when omitted.
    script: Option<PathBuf>,

    /// Extra arguments, visible to the script through `argv`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn run_repl(interp: &mut Interpreter, root: EnvId) -> anyhow::Result<()> {
    let mut rl = rustyline::DefaultEditor::new().context("failed to create line editor")?;
    println!("Sic v{}. Ctrl-D to exit.", env!("CARGO_PKG_VERSION"));

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                run_line(interp, root, &line);
            }
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(err) => return Err(err).context("reading input"),
        }
    }
    Ok(())
}

/// Evaluate the first expression on the line and show the result.
fn run_line(interp: &mut Interpreter, root: EnvId, line: &str) {
    let result = interp
        .read_str(line)
        .and_then(|expr| expr.map(|e| interp.eval(e, root)).transpose());
    match result {
        Ok(Some(val)) if !val.is_nil() => println!("{}", interp.render(val, Some(root))),
        Ok(_) => {}
        Err(err) => println!("ERROR: {err}"),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut interp = Interpreter::new();

    match args.script {
        Some(script) => {
            let program = std::env::args().next().unwrap_or_else(|| "sic".to_string());
            let mut argv = vec![program, script.display().to_string()];
            argv.extend(args.args);
            let code = sic::run_script(&mut interp, &script, &argv);
            std::process::exit(code);
        }
        None => {
            let root = interp.new_root_context();
            run_repl(&mut interp, root)
        }
    }
}
