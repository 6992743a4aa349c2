#[cfg(feature = "cli")]
use colored::Colorize;
#[cfg(feature = "cli")]
use getcerts::cli::run_cli;
#[cfg(feature = "cli")]
use getcerts::Error;

#[cfg(feature = "cli")]
fn main() {
    match run_cli() {
        Ok(()) => {}
        // clap prints usage and picks the exit code (0 for --help, 2 otherwise)
        Err(Error::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature to be enabled.");
    eprintln!("Build with: cargo build --features cli");
    std::process::exit(1);
}
