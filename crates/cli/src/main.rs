use std::process::ExitCode;

fn main() -> ExitCode {
    suggestbox_cli::run()
}
