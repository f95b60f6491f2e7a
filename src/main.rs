use clap::Parser;
use merge_dispatch::{cli, logging};

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    let guard = match logging::init(&args) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("[WARNING] logging disabled: {:#}", err);
            None
        }
    };

    let code = match cli::run(args).await {
        Ok(code) => code,
        Err(err) => cli::report_failure(err),
    };

    // Flush the file sink before exiting; process::exit skips destructors.
    drop(guard);
    std::process::exit(code);
}
