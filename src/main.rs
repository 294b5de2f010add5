use std::process::ExitCode;

fn main() -> ExitCode {
    classlink_cli::run_cli()
}
