use super::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InSingleQuote,
    InDoubleQuote,
    EscapeNormal,
    EscapeDoubleQuote,
}

/// Result of a full scan. `ok` is false iff an Error token was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub ok: bool,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    state: State,
    buf: Vec<u8>,
    word_start: Option<usize>,
    tokens: Vec<Token>,
    ok: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.as_bytes(),
            state: State::Normal,
            buf: Vec::new(),
            word_start: None,
            tokens: Vec::with_capacity(input.len() / 2 + 8),
            ok: true,
        }
    }

    /// Shorthand for `Lexer::new(input).tokenize()`.
    pub fn lex(input: &str) -> LexOutput {
        Lexer::new(input).tokenize()
    }

    /// Single left-to-right pass. Never fails: problems become an Error token
    /// so the parser can still point at them.
    pub fn tokenize(mut self) -> LexOutput {
        let n = self.input.len();
        let mut i = 0;

        while i < n {
            let b = self.input[i];
            match self.state {
                State::Normal => i += self.scan_normal(i, b),
                State::InSingleQuote => {
                    if b == b'\'' {
                        self.state = State::Normal;
                    } else {
                        self.buf.push(b);
                    }
                    i += 1;
                }
                State::InDoubleQuote => {
                    match b {
                        b'"' => self.state = State::Normal,
                        b'\\' => self.state = State::EscapeDoubleQuote,
                        _ => self.buf.push(b),
                    }
                    i += 1;
                }
                State::EscapeNormal => {
                    self.buf.push(b);
                    self.state = State::Normal;
                    i += 1;
                }
                State::EscapeDoubleQuote => {
                    self.buf.push(b);
                    self.state = State::InDoubleQuote;
                    i += 1;
                }
            }
        }

        match self.state {
            State::InSingleQuote => self.error(n, "unterminated single quote"),
            State::InDoubleQuote => self.error(n, "unterminated double quote"),
            State::EscapeNormal | State::EscapeDoubleQuote => self.error(n, "dangling escape"),
            State::Normal => self.flush_word(),
        }
        self.tokens.push(Token::op(TokenKind::Eof, n));

        LexOutput { tokens: self.tokens, ok: self.ok }
    }

    // Returns the number of bytes consumed.
    fn scan_normal(&mut self, i: usize, b: u8) -> usize {
        match b {
            b'\n' => {
                self.flush_word();
                self.tokens.push(Token::op(TokenKind::Newline, i));
                1
            }
            b' ' | b'\t' | b'\r' => {
                self.flush_word();
                1
            }
            b'\'' => {
                self.start_word(i);
                self.state = State::InSingleQuote;
                1
            }
            b'"' => {
                self.start_word(i);
                self.state = State::InDoubleQuote;
                1
            }
            b'\\' => {
                self.start_word(i);
                self.state = State::EscapeNormal;
                1
            }
            b'&' => self.operator(i, b'&', TokenKind::AndIf, TokenKind::Amp),
            b'|' => self.operator(i, b'|', TokenKind::OrIf, TokenKind::Pipe),
            b'>' => self.operator(i, b'>', TokenKind::RedirectAppend, TokenKind::RedirectOut),
            b'<' => self.operator(i, b'<', TokenKind::Heredoc, TokenKind::RedirectIn),
            b';' => {
                self.flush_word();
                self.tokens.push(Token::op(TokenKind::Semicolon, i));
                1
            }
            _ => {
                // Continuation bytes of multi-byte text are never ASCII, so they
                // always land here.
                self.start_word(i);
                self.buf.push(b);
                1
            }
        }
    }

    // Maximal munch: a doubled operator byte wins over the single form.
    fn operator(&mut self, i: usize, second: u8, double: TokenKind, single: TokenKind) -> usize {
        self.flush_word();
        if self.input.get(i + 1) == Some(&second) {
            self.tokens.push(Token::op(double, i));
            2
        } else {
            self.tokens.push(Token::op(single, i));
            1
        }
    }

    fn start_word(&mut self, i: usize) {
        if self.word_start.is_none() {
            self.word_start = Some(i);
        }
    }

    fn flush_word(&mut self) {
        if let Some(start) = self.word_start.take() {
            let text = String::from_utf8_lossy(&self.buf).into_owned();
            self.buf.clear();
            self.tokens.push(Token::word(text, start));
        }
    }

    fn error(&mut self, pos: usize, message: &str) {
        self.flush_word();
        self.ok = false;
        self.tokens.push(Token::error(message, pos));
    }
}
