mod error;
mod report;
mod scanner;
mod token;

pub use error::*;
pub use report::*;
pub use scanner::*;
pub use token::*;
