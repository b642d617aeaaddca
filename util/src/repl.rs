use rustyline::{error::ReadlineError, Editor};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error<E> {
    #[error(transparent)]
    Readline(ReadlineError),
    #[error("Eval failed: {0:?}")]
    EvalError(E),
}

/// A line-oriented interpreter driven by [`start_repl`].
pub trait Repl {
    type Error: std::fmt::Debug;
    const HISTORY: Option<&'static str> = None;
    const PROMPT: &'static str = ">> ";
    /// Shown while the lines read so far do not form a complete input.
    const CONTINUATION_PROMPT: &'static str = ".. ";

    /// Whether `input` can be evaluated as it stands, or more lines should be
    /// read and appended to it first.
    fn is_complete(&self, _input: &str) -> bool {
        true
    }

    fn evaluate(&mut self, input: String) -> Result<(), Self::Error>;
}

/// Read inputs until end of file, accumulating lines while the interpreter
/// reports the input as incomplete. Interrupting a partial input discards it;
/// interrupting at the prompt exits.
pub fn start_repl<R: Repl>(mut repl: R) -> Result<(), Error<R::Error>> {
    let mut editor = Editor::<()>::new();
    if let Some(history) = R::HISTORY {
        if let Err(e) = editor.load_history(history) {
            log::debug!("no history loaded from {history}: {e}");
        }
    }
    let mut pending: Option<String> = None;
    loop {
        let prompt = match pending {
            Some(_) => R::CONTINUATION_PROMPT,
            None => R::PROMPT,
        };
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) if pending.is_some() => {
                log::debug!("discarding partial input");
                pending = None;
                continue;
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("Bye!");
                break Ok(());
            }
            Err(e) => break Err(Error::Readline(e)),
        };
        let input = match pending.take() {
            Some(mut input) => {
                input.push('\n');
                input.push_str(&line);
                input
            }
            None => line,
        };
        if !repl.is_complete(&input) {
            pending = Some(input);
            continue;
        }
        editor.add_history_entry(input.as_str());
        repl.evaluate(input).map_err(Error::EvalError)?;
        if let Some(history) = R::HISTORY {
            editor.save_history(history).map_err(Error::Readline)?;
        }
    }
}
