use std::process::ExitCode;

fn main() -> ExitCode {
    tripchat_cli::run()
}
