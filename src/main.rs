use clap::Parser;

mod cli;
mod core;

fn main() {
    env_logger::init();

    let parsed = cli::Cli::parse();
    if let Err(err) = cli::execute(parsed.command) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
