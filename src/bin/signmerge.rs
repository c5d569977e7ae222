use std::process::ExitCode;

fn main() -> ExitCode {
    match signmerge::app::run_reconcile(std::env::args().skip(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
