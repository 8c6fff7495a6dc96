use atty::Stream;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use automata::{
    convert, ConversionTag, Halt, Machine, MachineError, MachineKind, MachineLoader, Step,
    MAX_EXECUTION_STEPS, SAMPLES,
};

#[derive(Parser)]
#[clap(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Print reports as JSON
    #[clap(long, global = true)]
    json: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a description and print its diagnostics
    Parse {
        /// The machine kind: dfa, nfa, dca, dpda, 1tm, tm or mtm
        kind: MachineKind,
        /// The description file
        file: PathBuf,
    },
    /// Run a machine on one or more inputs
    Run {
        kind: MachineKind,
        file: PathBuf,

        /// An input word; read from stdin line by line when omitted
        #[clap(short, long)]
        input: Vec<String>,

        /// Print each step of the execution
        #[clap(short, long)]
        trace: bool,

        /// The maximum number of steps per input
        #[clap(long, default_value_t = MAX_EXECUTION_STEPS)]
        limit: usize,
    },
    /// Convert a machine and print the resulting description
    Convert {
        /// A conversion tag such as nfa-dfa or mtm-tm
        tag: ConversionTag,
        /// The source description file
        from: PathBuf,

        /// Write the result to this file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// List the bundled sample machines
    Samples,
}

#[derive(Serialize)]
struct ParseReport {
    errors: Vec<automata::Diagnostic>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct RunReport {
    input: String,
    outcome: String,
    state: Option<String>,
    tracks: Vec<String>,
}

#[derive(Serialize)]
struct SampleReport {
    name: &'static str,
    kind: MachineKind,
    summary: &'static str,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Parse { kind, file } => parse(kind, &file, cli.json),
        Command::Run {
            kind,
            file,
            input,
            trace,
            limit,
        } => run(kind, &file, input, trace, limit, cli.json),
        Command::Convert { tag, from, output } => convert_file(tag, &from, output.as_deref()),
        Command::Samples => {
            samples(cli.json);
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn read(path: &Path) -> Result<String, MachineError> {
    fs::read_to_string(path)
        .map_err(|e| MachineError::File(format!("Failed to read file {}: {}", path.display(), e)))
}

/// Prints every diagnostic. Returns whether the description is free of fatal errors.
fn parse(kind: MachineKind, file: &Path, json: bool) -> Result<bool, MachineError> {
    let text = read(file)?;
    let mut machine = Machine::new(kind);
    let verdict = machine.parse(&text);

    if json {
        let report = ParseReport {
            errors: verdict.errors().to_vec(),
            warnings: verdict.warnings().to_vec(),
        };
        print_json(&report)?;
    } else {
        for warning in verdict.warnings() {
            println!("warning: {warning}");
        }
        for error in verdict.errors() {
            println!("error: {}", error.message);
        }
        if !verdict.has_errors() {
            println!("{}: {} transitions", file.display(), machine.table().len());
        }
    }
    Ok(!verdict.has_errors())
}

fn run(
    kind: MachineKind,
    file: &Path,
    mut inputs: Vec<String>,
    trace: bool,
    limit: usize,
    json: bool,
) -> Result<bool, MachineError> {
    let (mut machine, warnings) = MachineLoader::load_machine(kind, file)?;
    for warning in &warnings {
        eprintln!("warning: {warning}");
    }

    if inputs.is_empty() {
        if atty::is(Stream::Stdin) {
            inputs.push(String::new());
        } else {
            for line in io::stdin().lock().lines() {
                let line = line.map_err(|e| MachineError::File(format!("stdin: {e}")))?;
                inputs.push(line.trim_end().to_string());
            }
        }
    }

    let mut reports = Vec::with_capacity(inputs.len());
    for input in inputs {
        machine.init(&input);
        let outcome = if trace {
            run_traced(&mut machine, limit)
        } else {
            machine.run_with_limit(limit)
        };
        let outcome = match outcome {
            Ok(Halt::Accept) => "accept".to_string(),
            Ok(_) => "reject".to_string(),
            Err(e) => e.to_string(),
        };
        reports.push(RunReport {
            input,
            outcome,
            state: machine.current_state(),
            tracks: (0..machine.tapes()).map(|t| machine.track(t)).collect(),
        });
    }

    if json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            println!(
                "{:?}: {} in state {}",
                report.input,
                report.outcome,
                report.state.as_deref().unwrap_or("-")
            );
            for track in &report.tracks {
                println!("  {track}");
            }
        }
    }
    Ok(true)
}

fn run_traced(machine: &mut Machine, limit: usize) -> Result<Halt, MachineError> {
    let print_state = |step: usize, machine: &Machine| {
        let tracks = (0..machine.tapes())
            .map(|t| machine.track(t))
            .collect::<Vec<String>>()
            .join(", ");
        println!(
            "Step: {}, State: {}, Tracks: [{}]",
            step,
            machine.current_state().unwrap_or_default(),
            tracks
        );
    };

    print_state(0, machine);
    for step in 1..=limit {
        match machine.step() {
            Step::Continue => print_state(step, machine),
            Step::Halt(Halt::Err(e)) => return Err(e),
            Step::Halt(halt) => {
                print_state(step, machine);
                return Ok(halt);
            }
        }
    }
    Err(MachineError::StepLimit(limit))
}

fn convert_file(tag: ConversionTag, from: &Path, output: Option<&Path>) -> Result<bool, MachineError> {
    let (machine, _) = MachineLoader::load_machine(tag.source(), from)?;
    let converted = convert(&machine, tag)?;
    let text = converted.to_string();

    match output {
        Some(path) => fs::write(path, text).map_err(|e| {
            MachineError::File(format!("Failed to write file {}: {}", path.display(), e))
        })?,
        None => print!("{text}"),
    }
    Ok(true)
}

fn samples(json: bool) {
    let reports: Vec<SampleReport> = SAMPLES
        .iter()
        .map(|sample| SampleReport {
            name: sample.name,
            kind: sample.kind,
            summary: sample.summary(),
        })
        .collect();

    if json {
        if let Err(e) = print_json(&reports) {
            eprintln!("Error: {e}");
        }
        return;
    }
    for report in reports {
        println!("{:<10} {:<5} {}", report.name, report.kind, report.summary);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), MachineError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| MachineError::File(format!("Failed to serialize report: {e}")))?;
    println!("{text}");
    Ok(())
}
