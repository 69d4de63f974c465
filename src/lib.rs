pub mod ast;
pub mod config;
pub mod executor;
pub mod history;
pub mod lexer;
pub mod parser;
pub mod prompt;
