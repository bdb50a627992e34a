use std::process::ExitCode;

fn main() -> ExitCode {
    vuramp::entry::run()
}
