use std::ops::{Deref, DerefMut};

use thiserror::Error;

use crate::{
    lexer::{self, LexError, Token, TokenKind},
    term::{Name, Term, TermRef},
    MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE,
};

/// Literals beyond this are rejected instead of building a huge numeral.
pub const MAX_NATURAL: usize = 65_535;

#[derive(PartialEq, Eq, Clone, Error, Debug)]
#[error("{message} (at position {position})")]
pub struct SyntaxError {
    pub position: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            ParseError::Lex(e) => e.position,
            ParseError::Syntax(e) => e.position,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Lex(e) => &e.message,
            ParseError::Syntax(e) => &e.message,
        }
    }
}

type Result<T> = std::result::Result<T, SyntaxError>;

// term        ::= abstraction | let_expr | application
// abstraction ::= LAMBDA IDENT+ RARROW term
// let_expr    ::= LET IDENT COLONEQ term IN term
// application ::= atom atom*
// atom        ::= IDENT | NATURAL | LPAREN term RPAREN
//
// Multivariate abstractions, `let` and natural numbers are desugared on the
// fly, and variables are resolved against the binders in scope.
pub fn parse(input: &str) -> std::result::Result<TermRef, ParseError> {
    let tokens = lexer::lex(input)?;
    Ok(Parser::new(&tokens).parse()?)
}

/// Whether `input` stops somewhere a term cannot end: inside brackets, or
/// right after `λ`, `->`, `let`, `:=` or `in`. Input that does not lex is
/// never waiting for more.
pub fn needs_more_input(input: &str) -> bool {
    use TokenKind::*;
    let Ok(tokens) = lexer::lex(input) else {
        return false;
    };
    let open = tokens.iter().fold(0isize, |open, token| match token.kind {
        LParen => open + 1,
        RParen => open - 1,
        _ => open,
    });
    let last = tokens.iter().rev().nth(1).map(|token| token.kind);
    open > 0 || matches!(last, Some(Lambda | RArrow | Let | ColonEq | In))
}

struct Parser<'t> {
    /// Always terminated by an `Eof` token.
    tokens: &'t [Token],
    index: usize,
    /// Names bound by the enclosing abstractions, innermost last.
    scope: Vec<Name>,
}

/// Keeps names in scope while the parser is borrowed through it and drops
/// them again on every exit path.
struct Binding<'p, 't> {
    parser: &'p mut Parser<'t>,
    count: usize,
}

impl<'t> Deref for Binding<'_, 't> {
    type Target = Parser<'t>;
    fn deref(&self) -> &Self::Target {
        &*self.parser
    }
}

impl<'t> DerefMut for Binding<'_, 't> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.parser
    }
}

impl Drop for Binding<'_, '_> {
    fn drop(&mut self) {
        let len = self.parser.scope.len() - self.count;
        self.parser.scope.truncate(len);
    }
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            index: 0,
            scope: vec![],
        }
    }

    fn parse(mut self) -> Result<TermRef> {
        if self.peek().kind == TokenKind::Eof {
            return Err(SyntaxError::new(
                self.peek().position,
                "unexpected end of input, a term was expected",
            ));
        }
        let term = self.term()?;
        self.expect(TokenKind::Eof, "end of input was expected")?;
        debug_assert!(self.scope.is_empty());
        Ok(term)
    }

    fn bind<'p>(&'p mut self, names: &[Name]) -> Binding<'p, 't> {
        self.scope.extend(names.iter().cloned());
        Binding {
            parser: self,
            count: names.len(),
        }
    }

    fn term(&mut self) -> Result<TermRef> {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
            match self.peek().kind {
                TokenKind::Lambda => self.abstraction(),
                TokenKind::Let => self.let_expr(),
                _ => self.application(),
            }
        })
    }

    fn abstraction(&mut self) -> Result<TermRef> {
        self.expect(TokenKind::Lambda, "a λ was expected")?;
        let mut names = vec![self.ident()?];
        while self.peek().kind == TokenKind::Ident {
            names.push(self.ident()?);
        }
        self.expect(TokenKind::RArrow, "a -> was expected")?;
        let body = self.bind(&names).term()?;
        Ok(names
            .into_iter()
            .rev()
            .fold(body, |body, name| Term::Abs(name, body).into()))
    }

    fn let_expr(&mut self) -> Result<TermRef> {
        self.expect(TokenKind::Let, "a let was expected")?;
        let name = self.ident()?;
        self.expect(TokenKind::ColonEq, "a := was expected")?;
        let value = self.term()?;
        self.expect(TokenKind::In, "an in was expected")?;
        let body = self.bind(std::slice::from_ref(&name)).term()?;
        Ok(Term::app(Term::Abs(name, body), value).into())
    }

    fn application(&mut self) -> Result<TermRef> {
        let mut lhs = self.atom()?;
        while matches!(
            self.peek().kind,
            TokenKind::Ident | TokenKind::Natural | TokenKind::LParen
        ) {
            let rhs = self.atom()?;
            lhs = Term::App(lhs, rhs).into();
        }
        Ok(lhs)
    }

    fn atom(&mut self) -> Result<TermRef> {
        match self.peek().kind {
            TokenKind::Ident => self.variable(),
            TokenKind::Natural => self.natural(),
            TokenKind::LParen => {
                self.advance();
                let term = self.term()?;
                self.expect(TokenKind::RParen, "a ) was expected")?;
                Ok(term)
            }
            _ => Err(self.unexpected("a term was expected")),
        }
    }

    fn variable(&mut self) -> Result<TermRef> {
        let name = self.ident()?;
        let term = match self.scope.iter().rev().position(|bound| *bound == name) {
            Some(index) => Term::BoundVar(index),
            None => Term::FreeVar(name),
        };
        Ok(term.into())
    }

    fn natural(&mut self) -> Result<TermRef> {
        let token = self.expect(TokenKind::Natural, "a natural number was expected")?;
        let too_large = || {
            SyntaxError::new(
                token.position,
                format!(
                    "the natural number {} is too large, at most {MAX_NATURAL} is supported",
                    token.lexeme
                ),
            )
        };
        let n = token.lexeme.parse::<usize>().map_err(|_| too_large())?;
        if n > MAX_NATURAL {
            return Err(too_large());
        }
        Ok(Term::church(n).into())
    }

    fn ident(&mut self) -> Result<Name> {
        let token = self.expect(TokenKind::Ident, "an identifier was expected")?;
        Ok(token.lexeme.as_str().into())
    }

    fn expect(&mut self, kind: TokenKind, expectation: &str) -> Result<&'t Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expectation))
        }
    }

    fn unexpected(&self, expectation: &str) -> SyntaxError {
        let token = self.peek();
        SyntaxError::new(token.position, format!("{expectation}, got {token}"))
    }

    fn peek(&self) -> &'t Token {
        &self.tokens[self.index]
    }

    fn advance(&mut self) -> &'t Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.index += 1;
        }
        token
    }
}
