use clap::Parser;
use pdiman::error::PdiResult;
use program::{
    EraseOptions, FuseOptions, ProgramOptions, handle_erase, handle_fuses, handle_programming,
};

mod program;

#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
struct Cli {
    /// Log every frame sent to the programmer
    #[clap(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
enum Command {
    /// Erase the target, write a firmware image and optional fuses
    #[command(name = "program", alias = "p")]
    Program(ProgramOptions),

    /// Erase the target chip
    #[command(name = "erase")]
    Erase(EraseOptions),

    /// Write fuses without touching flash
    #[command(name = "fuse")]
    Fuse(FuseOptions),
}

fn main() -> PdiResult<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::TRACE
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Command::Program(opts) => handle_programming(opts)?,
        Command::Erase(opts) => handle_erase(opts)?,
        Command::Fuse(opts) => handle_fuses(opts)?,
    }

    Ok(())
}
