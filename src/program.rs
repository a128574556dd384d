//! Program loading - turns editor output into an action list
//!
//! Two source shapes are accepted:
//! - the generated program text, one `robot.<method>(<args>);` call per line
//!   with `for (let i = 0; i < N; i++) { ... }` repeat blocks
//! - a JSON array of `{"method": "...", "params": [...]}` objects

use roverlink_shared::limits::{MAX_PROGRAM_ACTIONS, MAX_REPEAT_COUNT};
use roverlink_shared::{Action, ActionKind, Param};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a program
#[derive(Error, Debug)]
pub enum ProgramError {
    #[error("line {line}: unknown robot method {method:?}")]
    UnknownMethod { line: usize, method: String },

    #[error("line {line}: unbalanced block")]
    UnbalancedBlock { line: usize },

    #[error("line {line}: unsupported expression {text:?}")]
    UnsupportedExpression { line: usize, text: String },

    #[error("line {line}: repeat count {count} is outside 0..={max}", max = MAX_REPEAT_COUNT)]
    RepeatOutOfRange { line: usize, count: f64 },

    #[error("line {line}: program unrolls to more than {max} actions", max = MAX_PROGRAM_ACTIONS)]
    TooLong { line: usize },

    #[error("line {line}: cannot parse {text:?}")]
    Syntax { line: usize, text: String },

    #[error("invalid JSON program: {0}")]
    Json(#[from] serde_json::Error),
}

/// A trimmed, non-empty source line with its 1-based number
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    text: &'a str,
}

/// Load a program, picking JSON when the text is an array
pub fn load_program(source: &str) -> Result<Vec<Action>, ProgramError> {
    let actions = if source.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<Action>>(source)?
    } else {
        parse_program(source)?
    };
    debug!("Loaded program: {} action(s)", actions.len());
    Ok(actions)
}

/// Parse generated program text into a flat action list
///
/// Repeat blocks are unrolled, so the result is exactly the queue the engine
/// will execute.
pub fn parse_program(source: &str) -> Result<Vec<Action>, ProgramError> {
    let lines: Vec<Line<'_>> = source
        .lines()
        .enumerate()
        .map(|(i, text)| Line {
            number: i + 1,
            text: text.trim(),
        })
        .filter(|line| !line.text.is_empty() && !line.text.starts_with("//"))
        .collect();

    let mut pos = 0;
    parse_block(&lines, &mut pos, None)
}

/// Parse lines until the block opened on `opened_at` closes
fn parse_block(
    lines: &[Line<'_>],
    pos: &mut usize,
    opened_at: Option<usize>,
) -> Result<Vec<Action>, ProgramError> {
    let mut actions = Vec::new();

    while let Some(line) = lines.get(*pos).copied() {
        *pos += 1;

        if line.text == "}" {
            return match opened_at {
                Some(_) => Ok(actions),
                None => Err(ProgramError::UnbalancedBlock { line: line.number }),
            };
        }

        if line.text.contains("robot.read") {
            return Err(ProgramError::UnsupportedExpression {
                line: line.number,
                text: line.text.to_string(),
            });
        }

        if line.text.starts_with("for") {
            let bound = parse_repeat(line.text).ok_or_else(|| ProgramError::Syntax {
                line: line.number,
                text: line.text.to_string(),
            })?;
            if bound > MAX_REPEAT_COUNT as f64 {
                return Err(ProgramError::RepeatOutOfRange {
                    line: line.number,
                    count: bound,
                });
            }
            let times = bound.max(0.0).ceil() as usize;

            let body = parse_block(lines, pos, Some(line.number))?;
            let unrolled = body
                .len()
                .checked_mul(times)
                .and_then(|n| n.checked_add(actions.len()));
            if !unrolled.is_some_and(|n| n <= MAX_PROGRAM_ACTIONS) {
                return Err(ProgramError::TooLong { line: line.number });
            }
            for _ in 0..times {
                actions.extend(body.iter().cloned());
            }
            continue;
        }

        if actions.len() >= MAX_PROGRAM_ACTIONS {
            return Err(ProgramError::TooLong { line: line.number });
        }
        actions.push(parse_call(line)?);
    }

    match opened_at {
        Some(line) => Err(ProgramError::UnbalancedBlock { line }),
        None => Ok(actions),
    }
}

/// Loop bound `N` of `for (let i = 0; i < N; i++) {`
fn parse_repeat(text: &str) -> Option<f64> {
    let header = text.strip_suffix('{')?.trim_end();
    let inner = header
        .strip_prefix("for")?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')?;

    let mut clauses = inner.split(';');
    let _init = clauses.next()?;
    let condition = clauses.next()?;
    let _step = clauses.next()?;

    let (_, bound) = condition.split_once('<')?;
    let bound: f64 = bound.trim().parse().ok()?;
    bound.is_finite().then_some(bound)
}

/// Parse one `robot.<method>(<args>);` statement
fn parse_call(line: Line<'_>) -> Result<Action, ProgramError> {
    let syntax = || ProgramError::Syntax {
        line: line.number,
        text: line.text.to_string(),
    };

    let call = line.text.strip_prefix("robot.").ok_or_else(syntax)?;
    let call = call.strip_suffix(';').unwrap_or(call).trim_end();
    let (method, rest) = call.split_once('(').ok_or_else(syntax)?;
    let args = rest.strip_suffix(')').ok_or_else(syntax)?;

    let method = method.trim();
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(syntax());
    }

    let kind = ActionKind::from_method(method).ok_or_else(|| ProgramError::UnknownMethod {
        line: line.number,
        method: method.to_string(),
    })?;

    Ok(Action::new(kind, parse_args(args)))
}

/// Split on commas that are not inside a quoted string
fn split_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in args.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&args[start..]);
    parts
}

fn parse_args(args: &str) -> Vec<Param> {
    if args.trim().is_empty() {
        return Vec::new();
    }

    split_args(args)
        .into_iter()
        .map(|arg| {
            let arg = arg.trim();
            if let Some(text) = arg
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
            {
                return Param::from(text);
            }
            match arg.parse::<f64>() {
                Ok(n) => Param::Number(n),
                Err(_) => Param::from(arg),
            }
        })
        .collect()
}
