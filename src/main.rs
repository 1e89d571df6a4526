use std::process::ExitCode;

fn main() -> ExitCode {
    match market_tracker_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
