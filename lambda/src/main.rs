use anyhow::Result;
use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use lambda::{
    lexer,
    parser::{self, ParseError},
    reducer::{self, EvalConfig, Outcome},
};
use util::repl;

fn build_report(e: &ParseError) -> Report {
    let position = e.position();
    let kind = match e {
        ParseError::Lex(_) => "Lexical error",
        ParseError::Syntax(_) => "Syntax error",
    };
    Report::build(ReportKind::Error, (), position)
        .with_message(format!("{kind}: {}", e.message()))
        .with_label(
            Label::new(position..position + 1)
                .with_message(format!("{}", e.message().fg(Color::Red)))
                .with_color(Color::Red),
        )
        .finish()
}

/// Split `:command rest` into its parts. Plain input is an evaluation.
fn split_command(input: &str) -> (&str, &str) {
    match input.strip_prefix(':') {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped.split_once(char::is_whitespace).unwrap_or((stripped, ""))
        }
        None => ("", input),
    }
}

type CommandResult<'a> = Result<(), (&'a str, ParseError)>;

#[derive(Default)]
struct Repl {
    config: EvalConfig,
}
impl Repl {
    fn tokenize(input: &str) -> CommandResult {
        let tokens = lexer::lex(input).map_err(|e| (input, e.into()))?;
        for token in tokens {
            println!("{:>4}  {:<16}{}", token.position, token.kind.to_string(), token.lexeme);
        }
        Ok(())
    }

    fn parse(input: &str) -> CommandResult {
        let term = parser::parse(input).map_err(|e| (input, e))?;
        println!("{term:?}");
        println!("{term}");
        Ok(())
    }

    fn step(input: &str) -> CommandResult {
        let term = parser::parse(input).map_err(|e| (input, e))?;
        match reducer::step(&term) {
            Some(next) => println!("{next}"),
            None => println!("{term}  (normal form)"),
        }
        Ok(())
    }

    fn evaluate<'i>(&self, input: &'i str) -> CommandResult<'i> {
        let term = parser::parse(input).map_err(|e| (input, e))?;
        let evaluation = reducer::evaluate_with(term, &self.config);
        for (i, term) in evaluation.trace().iter().enumerate() {
            println!("{i:>4}  {term}");
        }
        self.report_outcome(evaluation.outcome(), evaluation.steps());
        Ok(())
    }

    fn normalize<'i>(&self, input: &'i str) -> CommandResult<'i> {
        let term = parser::parse(input).map_err(|e| (input, e))?;
        let evaluation = reducer::evaluate_with(term, &self.config);
        println!("{}", evaluation.result());
        self.report_outcome(evaluation.outcome(), evaluation.steps());
        Ok(())
    }

    fn report_outcome(&self, outcome: Outcome, steps: usize) {
        match outcome {
            Outcome::Normal => println!("-- normal form after {steps} steps"),
            Outcome::Diverged => println!(
                "-- {}",
                format!("did not terminate within {} steps", self.config.max_steps)
                    .fg(Color::Yellow)
            ),
        }
    }

    fn limit(&mut self, input: &str) {
        let input = input.trim();
        if input.is_empty() {
            println!("{}", self.config.max_steps);
            return;
        }
        match input.parse::<usize>() {
            Ok(max_steps) => {
                log::info!("step bound changed to {max_steps}");
                self.config.max_steps = max_steps;
            }
            Err(e) => eprintln!("Invalid step bound {input:?}: {e}"),
        }
    }

    fn show_help() {
        println!(
            "{}",
            r#"
term                -- same as :evaluate term
:tokenize   term    -- show tokenized term
:parse      term    -- show parsed term
:step       term    -- perform a single reduction step
:evaluate   term    -- show every step of the reduction
:normal     term    -- show the normal form only
:limit      [n]     -- show or set the maximum number of steps
:help               -- show this message

Input continues on the next line while a bracket is open or it ends in
λ, ->, let, := or in. Ctrl-C discards a partial input.
        "#
            .trim()
        );
    }

    fn handle_repl_input<'i>(&mut self, input: &'i str) -> CommandResult<'i> {
        let (cmd, input) = split_command(input);
        match cmd {
            "to" | "tokenize" => Self::tokenize(input)?,
            "p" | "parse" => Self::parse(input)?,
            "s" | "step" => Self::step(input)?,
            "" | "e" | "eval" | "evaluate" => self.evaluate(input)?,
            "n" | "normal" => self.normalize(input)?,
            "l" | "limit" => self.limit(input),
            "h" | "help" => Self::show_help(),
            _ => {
                eprintln!("Unknown command {cmd}");
                Self::show_help();
            }
        }
        Ok(())
    }
}
impl repl::Repl for Repl {
    type Error = anyhow::Error;
    const HISTORY: Option<&'static str> = Some("/tmp/lambda.history");
    const PROMPT: &'static str = "λ> ";
    fn is_complete(&self, input: &str) -> bool {
        let (_, term) = split_command(input);
        !parser::needs_more_input(term)
    }
    fn evaluate(&mut self, input: String) -> Result<(), Self::Error> {
        if input.trim().is_empty() {
            return Ok(());
        }
        if let Err((input, e)) = self.handle_repl_input(&input) {
            build_report(&e).eprint(Source::from(input))?;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();
    println!("Hi, this is an untyped lambda calculus REPL. :h to show help");
    println!();
    repl::start_repl(Repl::default())?;
    Ok(())
}
