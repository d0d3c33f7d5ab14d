//! # Topoblock Entry Point
//!
//! Calls into the library's `run()`, which sets up logging and builds a block
//! world from the raster named on the command line.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --release -- heightmap.png config.json world.json
//! ```

use std::process::ExitCode;

fn main() -> ExitCode {
    topoblock::run()
}
