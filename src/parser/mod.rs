// Key expression parser

pub mod lexer;
pub mod template;

// Public API re-exports
pub use template::{parse_key_spec, KeyTemplate, Segment};
