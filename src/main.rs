use std::process::exit;

fn main() {
    if let Err(e) = capworks::core::logging::init_stderr("warn") {
        eprintln!("logger init failed: {}", e);
    }
    if let Err(e) = capworks::cli::run() {
        eprintln!("error: {:#}", e);
        exit(1);
    }
}
