use std::process::ExitCode;

fn main() -> ExitCode {
    grub_cli::run()
}
