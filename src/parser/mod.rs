// Binding DSL parser module

pub mod ast;
pub mod field;
pub mod lexer;
pub mod pipeline;

// Public API re-exports
pub use ast::Command;
pub use pipeline::{parse_binding, parse_pipeline};
