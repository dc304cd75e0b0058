use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;
use tur_engine::{
    render, symbols, AbortCause, Constraint, Machine, MachineEvent, MultiConstraint, Outcome,
    ProgramManager, ProgramState, RunStatus, StepLimitConstraint, TimeLimitConstraint,
    DEFAULT_STEP_LIMIT,
};

type Event = MachineEvent<ProgramState, char>;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  tur-engine --program binary-increment --input 1011
  tur-engine --program endless --time-limit-ms 50
  tur-engine --program busy-beaver-2 --debug")]
struct Cli {
    /// The built-in program to execute
    #[clap(short, long, env = "TUR_PROGRAM", default_value = "binary-increment")]
    program: String,

    /// The input for the first tape, `_` marks a blank. Defaults to the program's sample input
    #[clap(short, long)]
    input: Option<String>,

    /// Abort once more than this many steps were taken
    #[clap(long, env = "TUR_STEP_LIMIT", default_value_t = DEFAULT_STEP_LIMIT)]
    step_limit: u64,

    /// Abort once the run takes longer than this many milliseconds
    #[clap(long, env = "TUR_TIME_LIMIT_MS")]
    time_limit_ms: Option<u64>,

    /// Step manually and print each configuration
    #[clap(short = 'd', long)]
    debug: bool,

    /// Print the final outcome as JSON
    #[clap(long)]
    json: bool,

    /// List the built-in programs and exit
    #[clap(short, long)]
    list: bool,

    /// Log engine activity
    #[clap(short, long)]
    verbose: bool,

    /// Only log errors
    #[clap(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn constraint(&self) -> Result<Arc<dyn Constraint<ProgramState, char>>> {
        let step_limit: Arc<dyn Constraint<ProgramState, char>> =
            Arc::new(StepLimitConstraint::new(self.step_limit)?);

        let Some(millis) = self.time_limit_ms else {
            return Ok(step_limit);
        };

        let time_limit: Arc<dyn Constraint<ProgramState, char>> =
            Arc::new(TimeLimitConstraint::new(Duration::from_millis(millis))?);

        Ok(Arc::new(MultiConstraint::new(vec![step_limit, time_limit])?))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    if cli.list {
        for info in ProgramManager::list() {
            println!("{:<18} {}", info.name, info.description);
        }
        return Ok(());
    }

    let program = ProgramManager::get_program_by_name(&cli.program)?;
    let input = cli.input.as_deref().unwrap_or(program.sample_input);
    let constraint = cli.constraint()?;

    debug!(program = program.name, input, "program_loaded");

    let machine = Arc::new(Machine::new(program.table));

    let outcome = if cli.debug {
        run_manual(&machine, input, constraint)?
    } else {
        run_automatic(&machine, input, constraint).await?
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(())
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Drives the machine one step at a time, printing every configuration.
fn run_manual(
    machine: &Machine<ProgramState, char>,
    input: &str,
    constraint: Arc<dyn Constraint<ProgramState, char>>,
) -> Result<Outcome<ProgramState, char>> {
    let (tx, rx) = mpsc::channel();
    machine.subscribe(move |event: &Event| {
        let outcome = match event {
            MachineEvent::Stepped(_) => return,
            MachineEvent::Terminated(report) => Outcome::Terminated(report.clone()),
            MachineEvent::Aborted { report, cause } => Outcome::Aborted {
                report: report.clone(),
                cause: cause.clone(),
            },
        };
        let _ = tx.send(outcome);
    });

    machine.start_manual(symbols(input), Some(constraint))?;

    if let Some(status) = machine.status() {
        print_status(&status);
    }
    while machine.step()? {
        if let Some(status) = machine.status() {
            print_status(&status);
        }
    }

    rx.try_recv()
        .context("Machine stopped without a terminal notification")
}

/// Runs the machine on a background task; Ctrl-C requests an abort.
async fn run_automatic(
    machine: &Arc<Machine<ProgramState, char>>,
    input: &str,
    constraint: Arc<dyn Constraint<ProgramState, char>>,
) -> Result<Outcome<ProgramState, char>> {
    let handle = machine
        .start_automatic_async(symbols(input), Some(constraint))
        .await?;

    let interrupted = Arc::clone(machine);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupted.request_abortion();
        }
    });

    Ok(handle.wait().await?)
}

fn print_status(status: &RunStatus<ProgramState, char>) {
    let tapes = status
        .tapes
        .iter()
        .map(|tape| render(tape))
        .collect::<Vec<String>>()
        .join(", ");

    println!(
        "Step: {}, State: {}, Tapes: [{}], Heads: {:?}",
        status.step_count, status.configuration.state, tapes, status.heads
    );
}

fn print_outcome(outcome: &Outcome<ProgramState, char>) {
    let report = outcome.report();

    match outcome.cause() {
        None => println!("\nMachine halted in {}.", report.state),
        Some(AbortCause::Requested) => println!("\nMachine aborted on request."),
        Some(AbortCause::Violation(violation)) => println!("\nMachine aborted: {}", violation),
        Some(AbortCause::Fault(fault)) => println!("\nMachine error: {}", fault),
    }

    println!("Steps: {}, Duration: {:?}", report.step_count, report.duration);
    println!("{}", render(report.result()));
}
