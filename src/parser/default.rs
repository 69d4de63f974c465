use crate::ast::{Arena, AstNode, Command, ListItem, Logical, LogicalOp, NodeId, Pipeline, Redirect, RedirectKind};
use crate::lexer::{Token, TokenKind};
use super::{ParseError, ParseResult};

const PIPE_LOGICAL_MSG: &str = "cannot pipeline a logical expression (grouping not implemented)";

/// (left, right) binding powers; only `|`, `&&` and `||` are infix operators.
fn binding_power(kind: TokenKind) -> Option<(u8, u8)> {
    match kind {
        TokenKind::Pipe => Some((70, 71)),
        TokenKind::AndIf | TokenKind::OrIf => Some((50, 51)),
        _ => None,
    }
}

fn redirect_kind(kind: TokenKind) -> Option<RedirectKind> {
    match kind {
        TokenKind::RedirectIn => Some(RedirectKind::In),
        TokenKind::RedirectOut => Some(RedirectKind::OutTrunc),
        TokenKind::RedirectAppend => Some(RedirectKind::OutAppend),
        TokenKind::Heredoc => Some(RedirectKind::Heredoc),
        _ => None,
    }
}

fn lexical_error(tok: &Token) -> ParseError {
    ParseError::new(tok.pos, tok.message.clone())
}

/// Precedence-climbing parser over a token stream terminated by `Eof`.
pub struct DefaultParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    arena: Arena,
    eof: Token,
}

impl<'a> DefaultParser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let end = tokens.last().map(|t| t.pos).unwrap_or(0);
        Self {
            tokens,
            pos: 0,
            arena: Arena::new(),
            eof: Token::op(TokenKind::Eof, end),
        }
    }

    // A stream missing its terminator behaves as if it had one.
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn next(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn parse(mut self) -> ParseResult {
        let mut items = Vec::new();
        let error = self.parse_list(&mut items).err();
        ParseResult {
            arena: self.arena,
            sequence: crate::ast::Sequence { items },
            error,
        }
    }

    fn parse_list(&mut self, items: &mut Vec<ListItem>) -> Result<(), ParseError> {
        loop {
            let tok = self.peek();
            match tok.kind {
                TokenKind::Eof => return Ok(()),
                TokenKind::Error => return Err(lexical_error(tok)),
                TokenKind::Newline | TokenKind::Semicolon => {
                    self.pos += 1;
                    continue;
                }
                TokenKind::Amp => {
                    return Err(ParseError::new(
                        tok.pos,
                        "background operator requires a command before '&'",
                    ));
                }
                _ => {}
            }

            let node = self.parse_expr(0)?;
            let background = self.consume(TokenKind::Amp);
            items.push(ListItem { node, background });

            let tok = self.peek();
            match tok.kind {
                TokenKind::Semicolon | TokenKind::Newline => self.pos += 1,
                TokenKind::Eof => return Ok(()),
                TokenKind::Error => return Err(lexical_error(tok)),
                _ => {
                    return Err(ParseError::new(tok.pos, "expected ';', '&', newline, or end"));
                }
            }
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_simple_command()?;

        loop {
            let op = self.peek();
            let Some((lbp, rbp)) = binding_power(op.kind) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            let op = self.next();
            let rhs = self.parse_expr(rbp)?;

            lhs = match op.kind {
                TokenKind::Pipe => self.merge_pipe(lhs, rhs, op.pos)?,
                TokenKind::AndIf => self.arena.add(AstNode::Logical(Logical { op: LogicalOp::AndIf, lhs, rhs })),
                _ => self.arena.add(AstNode::Logical(Logical { op: LogicalOp::OrIf, lhs, rhs })),
            };
        }

        Ok(lhs)
    }

    // Flattens both sides into one pipeline; a logical operand is rejected
    // because there is no grouping syntax to disambiguate it.
    fn merge_pipe(&mut self, lhs: NodeId, rhs: NodeId, op_pos: usize) -> Result<NodeId, ParseError> {
        let mut cmds = self.pipeline_stages(lhs, op_pos)?;
        cmds.extend(self.pipeline_stages(rhs, op_pos)?);
        Ok(self.arena.add(AstNode::Pipeline(Pipeline { cmds })))
    }

    fn pipeline_stages(&self, id: NodeId, op_pos: usize) -> Result<Vec<Command>, ParseError> {
        match self.arena.get(id) {
            Some(AstNode::Command(cmd)) => Ok(vec![cmd.clone()]),
            Some(AstNode::Pipeline(p)) => Ok(p.cmds.clone()),
            Some(AstNode::Logical(_)) => Err(ParseError::new(op_pos, PIPE_LOGICAL_MSG)),
            None => Err(ParseError::new(op_pos, format!("dangling node reference {}", id))),
        }
    }

    fn parse_simple_command(&mut self) -> Result<NodeId, ParseError> {
        let mut cmd = Command::default();

        loop {
            let tok = self.peek();
            match tok.kind {
                TokenKind::Word => {
                    let word = self.next();
                    cmd.argv.push(word.text);
                }
                TokenKind::Error => return Err(lexical_error(tok)),
                kind if kind.is_redirect() => self.parse_redirect(&mut cmd)?,
                _ => break,
            }
        }

        if cmd.argv.is_empty() {
            return Err(ParseError::new(self.peek().pos, "expected command word"));
        }
        Ok(self.arena.add(AstNode::Command(cmd)))
    }

    fn parse_redirect(&mut self, cmd: &mut Command) -> Result<(), ParseError> {
        let op = self.next();
        let Some(kind) = redirect_kind(op.kind) else {
            return Err(ParseError::new(op.pos, "expected redirection operator"));
        };

        let tok = self.peek();
        match tok.kind {
            TokenKind::Word => {
                let target = self.next().text;
                cmd.redirs.push(Redirect { kind, target });
                Ok(())
            }
            TokenKind::Error => Err(lexical_error(tok)),
            _ => Err(ParseError::new(tok.pos, "redirection missing target word")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Sequence;
    use crate::lexer::Lexer;
    use crate::parser::parse_line;

    fn cmd(argv: &[&str]) -> Command {
        Command {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            redirs: vec![],
        }
    }

    fn lex_and_parse(src: &str) -> ParseResult {
        let result = parse_line(src);
        assert!(result.is_ok(), "unexpected error for {:?}: {:?}", src, result.error);
        result
    }

    fn error_of(src: &str) -> ParseError {
        match parse_line(src).error {
            Some(e) => e,
            None => panic!("expected a parse error for {:?}", src),
        }
    }

    fn single(result: &ParseResult) -> &AstNode {
        assert_eq!(result.sequence.len(), 1);
        result.arena.get(result.sequence.items[0].node).expect("statement node")
    }

    fn assert_refs_valid(result: &ParseResult) {
        for item in &result.sequence.items {
            assert!(result.arena.get(item.node).is_some());
        }
        for (_, node) in result.arena.iter() {
            if let AstNode::Logical(l) = node {
                assert!(result.arena.get(l.lhs).is_some());
                assert!(result.arena.get(l.rhs).is_some());
            }
        }
    }

    #[test]
    fn test_simple_command() {
        let result = lex_and_parse("echo hello");
        assert_eq!(single(&result), &AstNode::Command(cmd(&["echo", "hello"])));
        assert!(!result.sequence.items[0].background);
    }

    #[test]
    fn test_multistage_pipeline_is_flat() {
        let result = lex_and_parse("a | b | c");
        assert_eq!(
            single(&result),
            &AstNode::Pipeline(Pipeline { cmds: vec![cmd(&["a"]), cmd(&["b"]), cmd(&["c"])] })
        );
        let pipelines = result
            .arena
            .iter()
            .filter(|(_, n)| matches!(n, AstNode::Pipeline(_)))
            .count();
        // The intermediate (a|b) plus the merged result; neither contains the other.
        assert!(pipelines <= 2);
        assert_refs_valid(&result);
    }

    #[test]
    fn test_pipe_binds_tighter_than_and() {
        let result = lex_and_parse("a | b && c");
        let AstNode::Logical(l) = single(&result) else {
            panic!("expected logical root");
        };
        assert_eq!(l.op, LogicalOp::AndIf);
        assert_eq!(
            result.arena.get(l.lhs),
            Some(&AstNode::Pipeline(Pipeline { cmds: vec![cmd(&["a"]), cmd(&["b"])] }))
        );
        assert_eq!(result.arena.get(l.rhs), Some(&AstNode::Command(cmd(&["c"]))));
    }

    #[test]
    fn test_pipe_after_and_binds_adjacent_operands() {
        let result = lex_and_parse("a && b | c");
        let AstNode::Logical(l) = single(&result) else {
            panic!("expected logical root");
        };
        assert_eq!(l.op, LogicalOp::AndIf);
        assert_eq!(result.arena.get(l.lhs), Some(&AstNode::Command(cmd(&["a"]))));
        assert_eq!(
            result.arena.get(l.rhs),
            Some(&AstNode::Pipeline(Pipeline { cmds: vec![cmd(&["b"]), cmd(&["c"])] }))
        );
    }

    #[test]
    fn test_logical_is_left_associative() {
        let result = lex_and_parse("a && b || c");
        let AstNode::Logical(outer) = single(&result) else {
            panic!("expected logical root");
        };
        assert_eq!(outer.op, LogicalOp::OrIf);
        assert_eq!(result.arena.get(outer.rhs), Some(&AstNode::Command(cmd(&["c"]))));
        let Some(AstNode::Logical(inner)) = result.arena.get(outer.lhs) else {
            panic!("expected nested logical");
        };
        assert_eq!(inner.op, LogicalOp::AndIf);
        assert_eq!(result.arena.get(inner.lhs), Some(&AstNode::Command(cmd(&["a"]))));
        assert_eq!(result.arena.get(inner.rhs), Some(&AstNode::Command(cmd(&["b"]))));
        assert_refs_valid(&result);
    }

    #[test]
    fn test_redirects_keep_order() {
        let result = lex_and_parse("cat < in.txt > out.txt >> log arg");
        let AstNode::Command(c) = single(&result) else {
            panic!("expected command");
        };
        assert_eq!(c.argv, vec!["cat", "arg"]);
        assert_eq!(
            c.redirs,
            vec![
                Redirect { kind: RedirectKind::In, target: "in.txt".to_string() },
                Redirect { kind: RedirectKind::OutTrunc, target: "out.txt".to_string() },
                Redirect { kind: RedirectKind::OutAppend, target: "log".to_string() },
            ]
        );
    }

    #[test]
    fn test_heredoc_is_accepted_by_parser() {
        let result = lex_and_parse("cat << EOF");
        let AstNode::Command(c) = single(&result) else {
            panic!("expected command");
        };
        assert_eq!(c.redirs, vec![Redirect { kind: RedirectKind::Heredoc, target: "EOF".to_string() }]);
    }

    #[test]
    fn test_sequence_and_background() {
        let result = lex_and_parse("sleep 1 &; echo a; echo b &\necho c");
        let flags: Vec<bool> = result.sequence.items.iter().map(|i| i.background).collect();
        assert_eq!(flags, vec![true, false, true, false]);
        let names: Vec<&str> = result
            .sequence
            .items
            .iter()
            .map(|i| match result.arena.get(i.node) {
                Some(AstNode::Command(c)) => c.argv[0].as_str(),
                _ => "?",
            })
            .collect();
        assert_eq!(names, vec!["sleep", "echo", "echo", "echo"]);
    }

    #[test]
    fn test_blank_lines_and_semicolons_produce_nothing() {
        for src in ["", "   ", ";", ";;\n;", "\n\n"] {
            let result = lex_and_parse(src);
            assert_eq!(result.sequence, Sequence::default(), "{:?}", src);
        }
        assert_eq!(lex_and_parse("; ls ;\n\n").sequence.len(), 1);
    }

    #[test]
    fn test_lone_ampersand() {
        let err = error_of("& ls");
        assert_eq!(err, ParseError::new(0, "background operator requires a command before '&'"));
        assert_eq!(error_of("ls; &").message, "background operator requires a command before '&'");
    }

    #[test]
    fn test_redirect_missing_target() {
        assert_eq!(error_of("ls >"), ParseError::new(4, "redirection missing target word"));
        assert_eq!(error_of("ls > | wc").message, "redirection missing target word");
    }

    #[test]
    fn test_missing_command_word() {
        assert_eq!(error_of("| wc"), ParseError::new(0, "expected command word"));
        assert_eq!(error_of("ls &&").message, "expected command word");
        assert_eq!(error_of("ls | ; wc").message, "expected command word");
        assert_eq!(error_of("> out").message, "expected command word");
    }

    #[test]
    fn test_double_ampersand_after_background() {
        assert_eq!(
            error_of("ls & &"),
            ParseError::new(5, "expected ';', '&', newline, or end")
        );
    }

    #[test]
    fn test_background_needs_terminator() {
        let result = parse_line("sleep 1 & echo a");
        assert_eq!(result.error, Some(ParseError::new(10, "expected ';', '&', newline, or end")));
        assert_eq!(result.sequence.len(), 1);
        assert!(result.sequence.items[0].background);
    }

    #[test]
    fn test_error_token_surfaces_message() {
        assert_eq!(error_of("echo \"abc"), ParseError::new(9, "unterminated double quote"));
        assert_eq!(error_of("ls > \\").message, "dangling escape");
    }

    #[test]
    fn test_error_keeps_usable_arena() {
        let result = parse_line("echo ok; ls >");
        assert!(result.error.is_some());
        assert_eq!(result.sequence.len(), 1);
        assert_refs_valid(&result);
    }

    #[test]
    fn test_pipe_of_logical_is_rejected() {
        let tokens = Lexer::lex("a b c").tokens;
        let mut parser = DefaultParser::new(&tokens);
        let a = parser.arena.add(AstNode::Command(cmd(&["a"])));
        let b = parser.arena.add(AstNode::Command(cmd(&["b"])));
        let logical = parser.arena.add(AstNode::Logical(Logical { op: LogicalOp::OrIf, lhs: a, rhs: b }));
        let c = parser.arena.add(AstNode::Command(cmd(&["c"])));

        assert_eq!(parser.merge_pipe(logical, c, 7), Err(ParseError::new(7, PIPE_LOGICAL_MSG)));
        assert_eq!(parser.merge_pipe(c, logical, 7), Err(ParseError::new(7, PIPE_LOGICAL_MSG)));
    }

    #[test]
    fn test_merge_pipe_flattens_both_sides() {
        let tokens = Lexer::lex("").tokens;
        let mut parser = DefaultParser::new(&tokens);
        let left = parser.arena.add(AstNode::Pipeline(Pipeline { cmds: vec![cmd(&["a"]), cmd(&["b"])] }));
        let right = parser.arena.add(AstNode::Pipeline(Pipeline { cmds: vec![cmd(&["c"]), cmd(&["d"])] }));
        let merged = parser.merge_pipe(left, right, 0).expect("merge");
        assert_eq!(
            parser.arena.get(merged),
            Some(&AstNode::Pipeline(Pipeline {
                cmds: vec![cmd(&["a"]), cmd(&["b"]), cmd(&["c"]), cmd(&["d"])]
            }))
        );
    }

    #[test]
    fn test_references_valid_for_mixed_input() {
        let result = lex_and_parse("a | b && c || d | e | f & g; h && i\nj");
        assert_eq!(result.sequence.len(), 4);
        assert_refs_valid(&result);
    }
}
