#[macro_use]
extern crate log;

use aural_render::engine;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Renders impulse responses for virtual acoustic scenes by ray tracing,
/// and auralizes anechoic audio with them.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Options {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full render: trace, convolve and write every listener's WAV output.
    Render {
        /// Scene container file.
        path: String,
    },

    /// Derived quantities from a reduced render.
    Calc {
        /// The quantity to calculate; only `T60` is understood.
        quantity: String,

        /// Scene container file.
        path: String,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let options = Options::parse();
    let result = match &options.command {
        Command::Render { path } => engine::render(path),
        Command::Calc { quantity, path } if quantity.eq_ignore_ascii_case("t60") => {
            engine::calc_t60(path).map(|report| {
                println!("T60_ear   : {:.9}s", report.ear);
                println!("T60_sabine: {:.9}s", report.sabine);
                println!("T60_eyring: {:.9}s", report.eyring);
            })
        }
        Command::Calc { quantity, .. } => {
            eprintln!("Unknown quantity '{quantity}'; try 'calc T60 <path>'");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            println!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
