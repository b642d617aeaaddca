use std::cmp::Ordering;

use crate::{
    term::{Index, Term, TermRef},
    MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE,
};

/// Default number of contractions performed before a term is considered to
/// diverge.
pub const DEFAULT_MAX_STEPS: usize = 1000;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct EvalConfig {
    pub max_steps: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Outcome {
    /// The last term of the trace is in normal form.
    Normal,
    /// The step bound was reached while the last term still had a redex.
    Diverged,
}

#[derive(Clone, Debug)]
pub struct Evaluation {
    trace: Vec<TermRef>,
    outcome: Outcome,
}

impl Evaluation {
    /// Every term visited, starting with the input. Never empty.
    pub fn trace(&self) -> &[TermRef] {
        &self.trace
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_normal(&self) -> bool {
        self.outcome == Outcome::Normal
    }

    /// Number of contractions performed.
    pub fn steps(&self) -> usize {
        self.trace.len() - 1
    }

    /// The normal form, or the last term reached before giving up.
    pub fn result(&self) -> &TermRef {
        &self.trace[self.trace.len() - 1]
    }
}

/// Shift the loose bound variables (those with index `>= cutoff`) up by `amount`.
fn lift(term: &TermRef, cutoff: Index, amount: Index) -> TermRef {
    if amount == 0 {
        return term.clone();
    }
    stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || match term.as_ref() {
        Term::BoundVar(i) if *i >= cutoff => Term::bound(i + amount).into(),
        Term::BoundVar(_) | Term::FreeVar(_) => term.clone(),
        Term::Abs(hint, body) => Term::Abs(hint.clone(), lift(body, cutoff + 1, amount)).into(),
        Term::App(lhs, rhs) => {
            Term::App(lift(lhs, cutoff, amount), lift(rhs, cutoff, amount)).into()
        }
    })
}

/// Open `scope`, the body of an abstraction, by replacing the variable bound
/// by that abstraction with `image`.
///
/// Free variables are names and bound variables are indices, so nothing can be
/// captured and no renaming happens. Loose variables of `image` are lifted
/// over the binders they are moved under, and variables of `scope` that point
/// past the removed binder are lowered by one, keeping the result well formed
/// when the redex itself sits under binders.
pub fn instantiate(image: &TermRef, scope: &TermRef) -> TermRef {
    instantiate_at(image, scope, 0)
}

fn instantiate_at(image: &TermRef, scope: &TermRef, depth: Index) -> TermRef {
    stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || match scope.as_ref() {
        Term::BoundVar(i) => match i.cmp(&depth) {
            Ordering::Equal => lift(image, 0, depth),
            Ordering::Greater => Term::bound(i - 1).into(),
            Ordering::Less => scope.clone(),
        },
        Term::FreeVar(_) => scope.clone(),
        Term::Abs(hint, body) => {
            Term::Abs(hint.clone(), instantiate_at(image, body, depth + 1)).into()
        }
        Term::App(lhs, rhs) => Term::App(
            instantiate_at(image, lhs, depth),
            instantiate_at(image, rhs, depth),
        )
        .into(),
    })
}

/// Contract the leftmost-outermost redex of `term`, or return `None` if the
/// term is already in normal form.
pub fn step(term: &TermRef) -> Option<TermRef> {
    stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || step_impl(term))
}

fn step_impl(term: &TermRef) -> Option<TermRef> {
    if let Some((scope, image)) = term.redex() {
        return Some(instantiate(image, scope));
    }
    match term.as_ref() {
        Term::FreeVar(_) | Term::BoundVar(_) => None,
        Term::Abs(hint, body) => step(body).map(|body| Term::Abs(hint.clone(), body).into()),
        Term::App(lhs, rhs) => {
            if let Some(lhs) = step(lhs) {
                return Some(Term::App(lhs, rhs.clone()).into());
            }
            step(rhs).map(|rhs| Term::App(lhs.clone(), rhs).into())
        }
    }
}

pub fn evaluate(term: TermRef) -> Evaluation {
    evaluate_with(term, &EvalConfig::default())
}

/// Reduce `term` in normal order, recording every intermediate term, until it
/// reaches a normal form or `config.max_steps` contractions have been made.
pub fn evaluate_with(term: TermRef, config: &EvalConfig) -> Evaluation {
    let mut trace = vec![term.clone()];
    let mut current = term;
    while let Some(next) = step(&current) {
        if trace.len() > config.max_steps {
            log::debug!(
                "no normal form within {} steps, giving up",
                config.max_steps
            );
            return Evaluation {
                trace,
                outcome: Outcome::Diverged,
            };
        }
        log::trace!("step {}: {}", trace.len(), next);
        trace.push(next.clone());
        current = next;
    }
    log::debug!("normal form reached after {} steps", trace.len() - 1);
    Evaluation {
        trace,
        outcome: Outcome::Normal,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::{parse, MAX_NATURAL};

    macro_rules! free {
        ($x:expr) => {
            TermRef::new(Term::free($x))
        };
    }
    macro_rules! bound {
        ($n:expr) => {
            TermRef::new(Term::bound($n))
        };
    }
    macro_rules! lambda {
        ($x:expr, $body:expr) => {
            TermRef::new(Term::abs($x, $body))
        };
    }
    macro_rules! apply {
        ($lhs:expr, $rhs:expr) => {
            TermRef::new(Term::app($lhs, $rhs))
        };
    }

    fn normalize(s: &str) -> TermRef {
        let evaluation = evaluate(parse(s).unwrap());
        assert!(evaluation.is_normal());
        assert!(evaluation.trace().iter().all(|t| t.is_well_formed()));
        evaluation.result().clone()
    }

    #[test]
    fn test_instantiate() {
        let s = parse("\\a b c -> a b c k").unwrap();
        let t = parse("\\x y -> x y s").unwrap();
        let Term::Abs(_, body) = t.as_ref() else {
            panic!("not an abstraction: {t:?}")
        };
        assert_eq!(
            instantiate(&s, body),
            lambda!("y", apply!(apply!(s.clone(), bound!(0)), free!("s")))
        );
    }

    #[test]
    fn test_instantiate_lifts_open_images() {
        // Under one binder, `1` in the scope is the opened variable.
        let scope = lambda!("y", apply!(bound!(1), bound!(0)));
        assert_eq!(
            instantiate(&bound!(0), &scope),
            lambda!("y", apply!(bound!(1), bound!(0)))
        );
        // A variable pointing past the opened binder moves one binder closer.
        assert_eq!(instantiate(&free!("a"), &bound!(1)), bound!(0));
    }

    #[test]
    fn test_step() {
        let t = parse("(\\x -> x) t").unwrap();
        assert_eq!(step(&t), Some(free!("t")));
        assert_eq!(step(&free!("t")), None);
        assert_eq!(step(&parse("\\x -> x y").unwrap()), None);
    }

    #[test]
    fn test_identity_applied_to_identity() {
        let s = parse("\\x -> x").unwrap();
        let t = parse("\\y -> y").unwrap();
        assert_eq!(step(&apply!(s, t.clone())), Some(t));
    }

    #[test]
    fn test_leftmost_outermost() {
        let id = lambda!("x", bound!(0));
        let t = apply!(
            apply!(id.clone(), free!("a")),
            apply!(id.clone(), free!("b"))
        );
        assert_eq!(
            step(&t),
            Some(apply!(free!("a"), apply!(id, free!("b"))))
        );
    }

    #[test]
    fn test_reduce_under_binders() {
        let t = parse("\\x -> (\\f x -> f (f x)) x").unwrap();
        assert_eq!(
            step(&t),
            Some(lambda!(
                "x",
                lambda!("x", apply!(bound!(1), apply!(bound!(1), bound!(0))))
            ))
        );
        assert_eq!(
            normalize("\\y -> (\\x -> y) a"),
            lambda!("y", bound!(0))
        );
    }

    #[test]
    fn test_evaluate() {
        assert_eq!(normalize("(\\x -> x) t"), parse("t").unwrap());
        assert_eq!(
            normalize("(\\x -> x) ((\\x -> x) (\\z -> (\\x -> x) z))"),
            parse("\\z -> z").unwrap()
        );
        // Only halts under normal order.
        assert_eq!(
            normalize("(\\x -> z) ((\\w -> w w w) (\\w -> w w w))"),
            free!("z")
        );
        assert_eq!(
            normalize("(\\f x -> f (f x)) (\\f x -> f (f x))"),
            parse("\\f x -> f (f (f (f x)))").unwrap()
        );
        assert_eq!(normalize("2 f x"), parse("f (f x)").unwrap());
        assert_eq!(
            normalize("let plus := \\m n f x -> m f (n f x) in plus 2 3"),
            parse("5").unwrap()
        );
    }

    #[test]
    fn test_trace() {
        let evaluation = evaluate(parse("(\\x -> x) ((\\y -> y) z)").unwrap());
        assert_eq!(
            evaluation.trace(),
            &[
                parse("(\\x -> x) ((\\y -> y) z)").unwrap(),
                parse("(\\y -> y) z").unwrap(),
                parse("z").unwrap(),
            ]
        );
        assert_eq!(evaluation.steps(), 2);
        assert_eq!(evaluation.outcome(), Outcome::Normal);

        let evaluation = evaluate(parse("x").unwrap());
        assert_eq!(evaluation.trace().len(), 1);
        assert!(evaluation.is_normal());
    }

    #[test]
    fn test_divergence() {
        let omega = parse("(\\x -> x x) (\\x -> x x)").unwrap();
        let evaluation = evaluate_with(omega.clone(), &EvalConfig { max_steps: 10 });
        assert_eq!(evaluation.outcome(), Outcome::Diverged);
        assert_eq!(evaluation.steps(), 10);
        assert!(evaluation.trace().iter().all(|t| *t == omega));

        let growing = parse("(\\x -> x x x) (\\x -> x x x)").unwrap();
        let evaluation = evaluate(growing);
        assert_eq!(evaluation.outcome(), Outcome::Diverged);
        assert_eq!(evaluation.steps(), DEFAULT_MAX_STEPS);

        let evaluation = evaluate_with(
            parse("(\\x -> x) y").unwrap(),
            &EvalConfig { max_steps: 0 },
        );
        assert_eq!(evaluation.outcome(), Outcome::Diverged);
        assert_eq!(evaluation.steps(), 0);
    }

    #[test]
    fn test_deep_terms() {
        let numeral = parse(&MAX_NATURAL.to_string()).unwrap();
        assert_eq!(*numeral, Term::church(MAX_NATURAL));
        assert!(numeral.is_well_formed());
        let printed = numeral.to_string();
        assert!(printed.starts_with("λf x -> f (f (f"));
        assert_eq!(parse(&printed).unwrap(), numeral);
        drop(numeral);

        let evaluation = evaluate(parse(&format!("{MAX_NATURAL} f x")).unwrap());
        assert!(evaluation.is_normal());
        assert_eq!(evaluation.steps(), 2);
        let result = evaluation.result().to_string();
        assert_eq!(result.matches('f').count(), MAX_NATURAL);
        assert!(result.ends_with("(f x))"));
        drop(evaluation);

        let binders = format!("{}x", "λx -> ".repeat(10_000));
        let term = parse(&binders).unwrap();
        assert!(term.is_well_formed());
        let evaluation = evaluate(term);
        assert!(evaluation.is_normal());
        assert_eq!(evaluation.steps(), 0);
        drop(evaluation);

        // Each contraction peels one `(λx -> x a)` and leaves an `a` behind.
        let nested = format!("{}y{}", "(λx -> x a) (".repeat(10_000), ")".repeat(10_000));
        let evaluation = evaluate_with(parse(&nested).unwrap(), &EvalConfig { max_steps: 10 });
        assert_eq!(evaluation.outcome(), Outcome::Diverged);
        let result = evaluation.result().to_string();
        assert!(result.starts_with("(λx -> x a) ((λx -> x a) ("));
        assert!(result.ends_with(&format!("y{}{}", ")".repeat(9_989), " a".repeat(10))));
    }
}
