use std::process::ExitCode;

fn main() -> ExitCode {
    fleetops_cli::run()
}
