use std::fmt;

use crate::term::{Index, Name, Term, TermRef, TermVisitor};

/// Prints terms in the surface syntax accepted by the parser.
///
/// Nested abstractions share one `λx y ->` header and only the brackets that
/// left-associative application needs are kept. A binder whose hint is
/// already bound further out, or equals a free variable, gets apostrophes
/// appended so that reparsing yields the same term.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = Printer {
            f,
            names: vec![],
            free: self.free_vars(),
        };
        self.accept(&mut printer)
    }
}

struct Printer<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
    /// Names chosen for the enclosing binders, innermost last.
    names: Vec<Name>,
    free: Vec<Name>,
}

impl Printer<'_, '_> {
    fn fresh(&self, hint: &Name) -> Name {
        let mut name = hint.to_string();
        while self
            .names
            .iter()
            .chain(self.free.iter())
            .any(|taken| **taken == *name)
        {
            name.push('\'');
        }
        name.into()
    }

    fn bracketed(&mut self, term: &TermRef, bracket: bool) -> fmt::Result {
        if bracket {
            self.f.write_str("(")?;
            term.accept(self)?;
            self.f.write_str(")")
        } else {
            term.accept(self)
        }
    }
}

impl TermVisitor<fmt::Result> for Printer<'_, '_> {
    fn visit_free_var(&mut self, name: &Name) -> fmt::Result {
        self.f.write_str(name)
    }

    fn visit_bound_var(&mut self, index: Index) -> fmt::Result {
        match self.names.iter().rev().nth(index) {
            Some(name) => self.f.write_str(name),
            None => write!(self.f, "#{index}"),
        }
    }

    fn visit_abs(&mut self, hint: &Name, body: &TermRef) -> fmt::Result {
        let depth = self.names.len();
        let (mut hint, mut body) = (hint, body);
        self.f.write_str("λ")?;
        loop {
            let name = self.fresh(hint);
            if self.names.len() > depth {
                self.f.write_str(" ")?;
            }
            self.f.write_str(&name)?;
            self.names.push(name);
            match body.as_ref() {
                Term::Abs(inner, rest) => (hint, body) = (inner, rest),
                _ => break,
            }
        }
        self.f.write_str(" -> ")?;
        let result = body.accept(self);
        self.names.truncate(depth);
        result
    }

    fn visit_app(&mut self, lhs: &TermRef, rhs: &TermRef) -> fmt::Result {
        self.bracketed(lhs, matches!(lhs.as_ref(), Term::Abs(..)))?;
        self.f.write_str(" ")?;
        self.bracketed(rhs, matches!(rhs.as_ref(), Term::Abs(..) | Term::App(..)))
    }
}
