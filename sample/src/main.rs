use std::process::ExitCode;

fn main() -> ExitCode {
    // exit statuses are 8 bits wide
    ExitCode::from(sample::run() as u8)
}
