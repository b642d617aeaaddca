use logos::Logos;
use thiserror::Error;

#[derive(Logos, PartialEq, Eq, Hash, Clone, Copy, derive_more::Display, Debug)]
#[logos(skip r"\p{Pattern_White_Space}+|--[^\n]*\n?")]
pub enum TokenKind {
    /// `λ`, or its ASCII stand-in `\`
    #[token("λ")]
    #[token("\\")]
    #[display(fmt = "λ")]
    Lambda,
    #[token("let")]
    #[display(fmt = "let")]
    Let,
    #[token(":=")]
    #[display(fmt = ":=")]
    ColonEq,
    #[token("in")]
    #[display(fmt = "in")]
    In,
    #[token("->")]
    #[display(fmt = "->")]
    RArrow,
    #[token("(")]
    #[display(fmt = "(")]
    LParen,
    #[token(")")]
    #[display(fmt = ")")]
    RParen,
    /// `λ` is itself a letter, so it only counts as one after the first
    /// character.
    #[regex(r"[\p{ID_Start}--λ]\p{ID_Continue}*'*")]
    #[display(fmt = "identifier")]
    Ident,
    #[regex("[0-9]+")]
    #[display(fmt = "natural number")]
    Natural,
    /// Never produced by the scanner; appended once the input is exhausted.
    #[display(fmt = "end of input")]
    Eof,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact text consumed for this token; empty for `Eof`.
    pub lexeme: String,
    /// Offset of the first character, counted in code points.
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "{}", self.kind),
            _ => f.write_str(&self.lexeme),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Error, Debug)]
#[error("{message} (at position {position})")]
pub struct LexError {
    pub position: usize,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, LexError>;

/// Split `input` into tokens. The returned stream always ends with exactly one
/// `Eof` token positioned at the length of the input.
pub fn lex(input: &str) -> Result<Vec<Token>> {
    let mut scanner = TokenKind::lexer(input);
    let mut positions = Positions::new(input);
    let mut tokens = vec![];
    while let Some(kind) = scanner.next() {
        let span = scanner.span();
        let position = positions.at(span.start);
        match kind {
            Ok(kind) => tokens.push(Token::new(kind, scanner.slice(), position)),
            Err(()) => return Err(invalid_token(&input[span.start..], position)),
        }
    }
    tokens.push(Token::new(TokenKind::Eof, "", positions.at(input.len())));
    Ok(tokens)
}

fn invalid_token(rest: &str, position: usize) -> LexError {
    let message = match rest.chars().next() {
        Some('-') => "got invalid token -, expected -> or --".to_string(),
        Some(':') => "got invalid token :, expected :=".to_string(),
        Some(c) => format!("got invalid token {c}"),
        None => "unexpected end of input".to_string(),
    };
    LexError { position, message }
}

/// Converts the byte offsets reported by the scanner into code point offsets.
/// Offsets must be queried in increasing order.
struct Positions<'a> {
    input: &'a str,
    byte: usize,
    position: usize,
}

impl<'a> Positions<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            byte: 0,
            position: 0,
        }
    }

    fn at(&mut self, byte: usize) -> usize {
        self.position += self.input[self.byte..byte].chars().count();
        self.byte = byte;
        self.position
    }
}

#[cfg(test)]
mod test {
    use super::{TokenKind::*, *};

    fn kinds(s: &str) -> Vec<TokenKind> {
        lex(s).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            lex("x").unwrap(),
            vec![Token::new(Ident, "x", 0), Token::new(Eof, "", 1)]
        );
        assert_eq!(
            lex("foo").unwrap(),
            vec![Token::new(Ident, "foo", 0), Token::new(Eof, "", 3)]
        );
        assert_eq!(
            lex("α").unwrap(),
            vec![Token::new(Ident, "α", 0), Token::new(Eof, "", 1)]
        );
        assert_eq!(
            lex("x'' y'").unwrap(),
            vec![
                Token::new(Ident, "x''", 0),
                Token::new(Ident, "y'", 4),
                Token::new(Eof, "", 6)
            ]
        );
        assert_eq!(kinds("let in lets inx"), vec![Let, In, Ident, Ident, Eof]);
    }

    #[test]
    fn test_natural() {
        assert_eq!(
            lex("1729").unwrap(),
            vec![Token::new(Natural, "1729", 0), Token::new(Eof, "", 4)]
        );
        assert_eq!(kinds("2x"), vec![Natural, Ident, Eof]);
    }

    #[test]
    fn test_let() {
        assert_eq!(
            lex("let id := \\x -> x in id t").unwrap(),
            vec![
                Token::new(Let, "let", 0),
                Token::new(Ident, "id", 4),
                Token::new(ColonEq, ":=", 7),
                Token::new(Lambda, "\\", 10),
                Token::new(Ident, "x", 11),
                Token::new(RArrow, "->", 13),
                Token::new(Ident, "x", 16),
                Token::new(In, "in", 18),
                Token::new(Ident, "id", 21),
                Token::new(Ident, "t", 24),
                Token::new(Eof, "", 25),
            ]
        );
    }

    #[test]
    fn test_abstraction() {
        assert_eq!(
            lex("(λx -> x) t").unwrap(),
            vec![
                Token::new(LParen, "(", 0),
                Token::new(Lambda, "λ", 1),
                Token::new(Ident, "x", 2),
                Token::new(RArrow, "->", 4),
                Token::new(Ident, "x", 7),
                Token::new(RParen, ")", 8),
                Token::new(Ident, "t", 10),
                Token::new(Eof, "", 11),
            ]
        );
    }

    #[test]
    fn test_whitespace_and_comments() {
        assert_eq!(lex(" ").unwrap(), vec![Token::new(Eof, "", 1)]);
        assert_eq!(lex("\t").unwrap(), vec![Token::new(Eof, "", 1)]);
        assert_eq!(lex("\r\n").unwrap(), vec![Token::new(Eof, "", 2)]);
        assert_eq!(
            lex("-- informative comment").unwrap(),
            vec![Token::new(Eof, "", 22)]
        );
        assert_eq!(
            lex("x -- c\ny").unwrap(),
            vec![
                Token::new(Ident, "x", 0),
                Token::new(Ident, "y", 7),
                Token::new(Eof, "", 8)
            ]
        );
    }

    #[test]
    fn test_unicode_whitespace() {
        assert_eq!(
            lex("x\u{85}y\u{200E}\u{2028}z").unwrap(),
            vec![
                Token::new(Ident, "x", 0),
                Token::new(Ident, "y", 2),
                Token::new(Ident, "z", 5),
                Token::new(Eof, "", 6)
            ]
        );
        assert_eq!(
            lex("\u{200F}\u{2029}\u{B}").unwrap(),
            vec![Token::new(Eof, "", 3)]
        );
        // Zero width space and no-break space are not pattern whitespace.
        let e = lex("x\u{200B}y").unwrap_err();
        assert_eq!(e.position, 1);
        assert_eq!(e.message, "got invalid token \u{200B}");
        assert_eq!(lex("\u{A0}").unwrap_err().position, 0);
    }

    #[test]
    fn test_positions_count_code_points() {
        assert_eq!(
            lex("𝑥 λy -> y").unwrap(),
            vec![
                Token::new(Ident, "𝑥", 0),
                Token::new(Lambda, "λ", 2),
                Token::new(Ident, "y", 3),
                Token::new(RArrow, "->", 5),
                Token::new(Ident, "y", 8),
                Token::new(Eof, "", 9),
            ]
        );
        assert_eq!(
            lex("aλb \u{037A}").unwrap(),
            vec![
                Token::new(Ident, "aλb", 0),
                Token::new(Ident, "\u{037A}", 4),
                Token::new(Eof, "", 5),
            ]
        );
    }

    #[test]
    fn test_errors() {
        let e = lex("x - y").unwrap_err();
        assert_eq!(e.position, 2);
        assert!(e.message.contains("->"));

        let e = lex("x :").unwrap_err();
        assert_eq!(e.position, 2);
        assert!(e.message.contains(":="));

        let e = lex("λx -> #").unwrap_err();
        assert_eq!(e.position, 6);
        assert_eq!(e.to_string(), "got invalid token # (at position 6)");
    }
}
