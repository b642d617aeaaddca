use std::{fmt, rc::Rc};

use crate::{MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE};

pub type Name = Rc<str>;
pub type Index = usize;
pub type TermRef = Rc<Term>;

/// A λ-term in the locally nameless representation: bound variables are de
/// Bruijn indices and free variables keep their surface names.
///
/// Terms are never mutated once built, so subterms are shared freely through
/// [`TermRef`].
///
/// Numerals make terms tens of thousands of levels deep, so every walk either
/// grows the stack or, like `Drop`, runs iteratively.
#[derive(Clone)]
pub enum Term {
    /// `x`, with no enclosing binder
    FreeVar(Name),
    /// Number of binders between the occurrence and its own binder.
    BoundVar(Index),
    /// `λx -> t`. The name is a display hint only.
    Abs(Name, TermRef),
    /// `t t`
    App(TermRef, TermRef),
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        use Term::*;
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || match (self, other) {
            (FreeVar(x), FreeVar(y)) => x == y,
            (BoundVar(i), BoundVar(j)) => i == j,
            (Abs(_, lhs), Abs(_, rhs)) => Rc::ptr_eq(lhs, rhs) || lhs == rhs,
            (App(lhs1, rhs1), App(lhs2, rhs2)) => {
                (Rc::ptr_eq(lhs1, lhs2) || lhs1 == lhs2) && (Rc::ptr_eq(rhs1, rhs2) || rhs1 == rhs2)
            }
            _ => false,
        })
    }
}
impl Eq for Term {}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || match self {
            Term::FreeVar(name) => f.debug_tuple("FreeVar").field(name).finish(),
            Term::BoundVar(index) => f.debug_tuple("BoundVar").field(index).finish(),
            Term::Abs(hint, body) => f.debug_tuple("Abs").field(hint).field(body).finish(),
            Term::App(lhs, rhs) => f.debug_tuple("App").field(lhs).field(rhs).finish(),
        })
    }
}

impl Drop for Term {
    fn drop(&mut self) {
        let mut pending = vec![];
        detach_children(self, &mut pending);
        while let Some(term) = pending.pop() {
            // Shared subterms are still alive elsewhere and only lose a count.
            if let Ok(mut term) = Rc::try_unwrap(term) {
                detach_children(&mut term, &mut pending);
            }
        }
    }
}

/// Move the inner children of `term` to `pending`, leaving leaves in their
/// place, so that dropping `term` itself does not recurse.
fn detach_children(term: &mut Term, pending: &mut Vec<TermRef>) {
    let mut detach = |child: &mut TermRef| {
        if !child.is_leaf() {
            pending.push(std::mem::replace(child, Rc::new(Term::BoundVar(0))));
        }
    };
    match term {
        Term::FreeVar(_) | Term::BoundVar(_) => {}
        Term::Abs(_, body) => detach(body),
        Term::App(lhs, rhs) => {
            detach(lhs);
            detach(rhs);
        }
    }
}

pub trait TermVisitor<T> {
    fn visit_free_var(&mut self, name: &Name) -> T;
    fn visit_bound_var(&mut self, index: Index) -> T;
    fn visit_abs(&mut self, hint: &Name, body: &TermRef) -> T;
    fn visit_app(&mut self, lhs: &TermRef, rhs: &TermRef) -> T;
}

impl Term {
    pub fn free(name: impl Into<Name>) -> Self {
        Term::FreeVar(name.into())
    }

    pub fn bound(index: Index) -> Self {
        Term::BoundVar(index)
    }

    pub fn abs(hint: impl Into<Name>, body: impl Into<TermRef>) -> Self {
        Term::Abs(hint.into(), body.into())
    }

    pub fn app(lhs: impl Into<TermRef>, rhs: impl Into<TermRef>) -> Self {
        Term::App(lhs.into(), rhs.into())
    }

    /// The Church numeral `λf x -> f (f (… (f x)))` with `n` applications of `f`.
    pub fn church(n: usize) -> Self {
        let mut body = Term::bound(0);
        for _ in 0..n {
            body = Term::app(Term::bound(1), body);
        }
        Term::abs("f", Term::abs("x", body))
    }

    /// Dispatch to `visitor`. Visitors recurse through `accept`, which grows
    /// the stack as needed.
    pub fn accept<T>(&self, visitor: &mut impl TermVisitor<T>) -> T {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || match self {
            Term::FreeVar(name) => visitor.visit_free_var(name),
            Term::BoundVar(index) => visitor.visit_bound_var(*index),
            Term::Abs(hint, body) => visitor.visit_abs(hint, body),
            Term::App(lhs, rhs) => visitor.visit_app(lhs, rhs),
        })
    }

    fn is_leaf(&self) -> bool {
        matches!(self, Term::FreeVar(_) | Term::BoundVar(_))
    }

    /// For `(λx -> t) s`, the abstraction body `t` and the argument `s`.
    pub fn redex(&self) -> Option<(&TermRef, &TermRef)> {
        match self {
            Term::App(lhs, rhs) => match lhs.as_ref() {
                Term::Abs(_, body) => Some((body, rhs)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Names of the free variables in order of first occurrence.
    pub fn free_vars(&self) -> Vec<Name> {
        struct V(Vec<Name>);
        impl TermVisitor<()> for V {
            fn visit_free_var(&mut self, name: &Name) {
                if !self.0.contains(name) {
                    self.0.push(name.clone());
                }
            }

            fn visit_bound_var(&mut self, _: Index) {}

            fn visit_abs(&mut self, _: &Name, body: &TermRef) {
                body.accept(self)
            }

            fn visit_app(&mut self, lhs: &TermRef, rhs: &TermRef) {
                lhs.accept(self);
                rhs.accept(self);
            }
        }
        let mut v = V(vec![]);
        self.accept(&mut v);
        v.0
    }

    /// Whether every bound variable refers to an enclosing abstraction.
    pub fn is_well_formed(&self) -> bool {
        struct V {
            depth: usize,
        }
        impl TermVisitor<bool> for V {
            fn visit_free_var(&mut self, _: &Name) -> bool {
                true
            }

            fn visit_bound_var(&mut self, index: Index) -> bool {
                index < self.depth
            }

            fn visit_abs(&mut self, _: &Name, body: &TermRef) -> bool {
                self.depth += 1;
                let result = body.accept(self);
                self.depth -= 1;
                result
            }

            fn visit_app(&mut self, lhs: &TermRef, rhs: &TermRef) -> bool {
                lhs.accept(self) && rhs.accept(self)
            }
        }
        self.accept(&mut V { depth: 0 })
    }
}
