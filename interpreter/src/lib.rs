use std::sync::Once;

pub mod error;
pub mod interpreter;
pub mod parser;
pub mod printer;
pub mod runner;

pub(crate) mod ast;
mod callable;
pub(crate) mod env;
mod limits;
mod value;

pub use error::Error;
pub use interpreter::Interpreter;
pub use parser::{Parser, StmtStream};
pub use printer::AstPrinter;
pub use runner::*;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output. Safe to call multiple times.
/// Enable with `RUST_LOG=preter=debug` or `RUST_LOG=preter=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set, program output stays untouched otherwise
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}
