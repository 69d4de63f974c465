mod lexer;
mod token;

pub use lexer::{Lexer, LexOutput};
pub use token::{Token, TokenKind};
