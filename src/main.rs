use std::process::ExitCode;

fn main() -> ExitCode {
    capstan::run_cli()
}
