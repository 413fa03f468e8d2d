use clap::Parser;
use fxsim::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
