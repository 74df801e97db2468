use clap::Parser;
use govee_monitor::app::{Options, RealScanner, run_with_io};
use log::LevelFilter;
use std::panic::{self, PanicHookInfo};

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Clean exit codes for process managers (systemd, Telegraf execd) that
    // monitor exit status.
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if options.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .format_timestamp_secs()
        .init();

    let mut stdout = std::io::stdout().lock();
    match run_with_io(options, &RealScanner, &mut stdout).await {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            eprintln!("error: {why}");
            std::process::exit(EXIT_ERROR);
        }
    }
}
