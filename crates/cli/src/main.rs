use std::process::ExitCode;

fn main() -> ExitCode {
    warboard_cli::run()
}
