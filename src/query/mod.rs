// Free-text query interpreter

pub mod filter;
pub mod lexer;
pub mod matchers;

// Public API re-exports
pub use filter::{Interpreter, QueryFilter, YearRange};
pub use lexer::{tokenize, Token};
