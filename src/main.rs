use clap::Parser;
use std::io::{self, IsTerminal};
use vitae::cli::{Config, Runner, die, error_message};

fn main() {
    let config = Config::parse();

    env_logger::Builder::new()
        .filter_level(config.verbosity().log_level_filter())
        .init();

    if let Err(err) = Runner::new(config).run() {
        die(1, &error_message(&err, io::stderr().is_terminal()));
    }
}
