#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Pipe,           // |
    AndIf,          // &&
    OrIf,           // ||
    Semicolon,      // ;
    Amp,            // &
    RedirectIn,     // <
    RedirectOut,    // >
    RedirectAppend, // >>
    Heredoc,        // <<
    Newline,
    Eof,
    Error,
}

impl TokenKind {
    /// Tokens that end a simple command and cannot start an operator merge.
    pub fn is_list_stop(self) -> bool {
        matches!(
            self,
            TokenKind::Semicolon | TokenKind::Amp | TokenKind::Newline | TokenKind::Eof | TokenKind::Error
        )
    }

    pub fn is_redirect(self) -> bool {
        matches!(
            self,
            TokenKind::RedirectIn | TokenKind::RedirectOut | TokenKind::RedirectAppend | TokenKind::Heredoc
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,      // byte offset into the input
    pub text: String,    // Word only, already unquoted
    pub message: String, // Error only
}

impl Token {
    pub fn op(kind: TokenKind, pos: usize) -> Self {
        Token { kind, pos, text: String::new(), message: String::new() }
    }

    pub fn word(text: String, pos: usize) -> Self {
        Token { kind: TokenKind::Word, pos, text, message: String::new() }
    }

    pub fn error(message: &str, pos: usize) -> Self {
        Token { kind: TokenKind::Error, pos, text: String::new(), message: message.to_string() }
    }
}
