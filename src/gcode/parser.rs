//! Line-oriented G-code ingestion.
//!
//! Turns one text line such as `G1 X10 Y5.5 F100 S40` into a [`Command`].
//! `G` lines become motion commands; any other command letter (`M`, `T`, ...)
//! becomes a modifier. The parameter words the scheduler understands are
//! `X Y Z F S`; line numbers (`N`) and trailing checksums (`*nn`) are skipped.

use crate::gcode::command::Command;
use crate::motion::queue::{CommandQueue, QueueError};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("line {line}: missing command word")]
    MissingCommand { line: usize },
    #[error("line {line}: invalid value '{value}' for word {letter}")]
    InvalidNumber { line: usize, letter: char, value: String },
    #[error("line {line}: unknown word '{letter}'")]
    UnknownWord { line: usize, letter: char },
    #[error("line {line}: more than one command word")]
    DuplicateCommand { line: usize },
    #[error("line {line}: G{code} arc moves are not supported")]
    UnsupportedArc { line: usize, code: u32 },
    #[error("line {line}: not valid UTF-8")]
    InvalidEncoding { line: usize },
}

/// Parse one line. Blank lines and comment-only lines yield `Ok(None)`.
pub fn parse_line(src: &str, line: usize) -> Result<Option<Command>, ParseError> {
    let text = strip_comments(src);
    let text = match text.find('*') {
        Some(pos) => &text[..pos],
        None => text.as_str(),
    };

    let mut words = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        if !c.is_ascii_alphabetic() {
            return Err(ParseError::UnknownWord { line, letter: c });
        }
        let value_start = start + c.len_utf8();
        let mut value_end = value_start;
        while let Some(&(idx, v)) = chars.peek() {
            if v.is_ascii_digit() || v == '.' || v == '-' || v == '+' {
                value_end = idx + v.len_utf8();
                chars.next();
            } else if v.is_whitespace() && value_end == value_start {
                // Tolerate "X 10"
                chars.next();
            } else {
                break;
            }
        }
        let value = text[value_start..value_end].trim();
        words.push((c.to_ascii_uppercase(), value));
    }

    if words.is_empty() {
        return Ok(None);
    }

    let mut command: Option<Command> = None;
    for (letter, value) in words {
        match letter {
            'N' => {}
            'X' | 'Y' | 'Z' | 'F' | 'S' => {
                let cmd = command
                    .as_mut()
                    .ok_or(ParseError::MissingCommand { line })?;
                match letter {
                    'X' => cmd.x = Some(parse_number(line, letter, value)?),
                    'Y' => cmd.y = Some(parse_number(line, letter, value)?),
                    'Z' => cmd.z = Some(parse_number(line, letter, value)?),
                    'F' => cmd.feedrate = Some(parse_number(line, letter, value)?),
                    _ => {
                        let power: f64 = parse_number(line, letter, value)?;
                        if power < 0.0 {
                            return Err(ParseError::InvalidNumber {
                                line,
                                letter,
                                value: value.to_string(),
                            });
                        }
                        cmd.power = Some(power.round() as u32);
                    }
                }
            }
            // Any other letter is a command word
            _ if command.is_none() => {
                let code: u32 = parse_number(line, letter, value)?;
                if letter == 'G' && (code == 2 || code == 3) {
                    return Err(ParseError::UnsupportedArc { line, code });
                }
                command = Some(Command::from_word(letter, code));
            }
            'G' | 'M' | 'T' => return Err(ParseError::DuplicateCommand { line }),
            other => return Err(ParseError::UnknownWord { line, letter: other }),
        }
    }

    match command {
        Some(cmd) => Ok(Some(cmd)),
        // Only a line number
        None => Ok(None),
    }
}

fn strip_comments(src: &str) -> String {
    let src = match src.find(';') {
        Some(pos) => &src[..pos],
        None => src,
    };
    let mut out = String::with_capacity(src.len());
    let mut depth = 0usize;
    for c in src.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn parse_number<T: std::str::FromStr>(line: usize, letter: char, value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidNumber {
        line,
        letter,
        value: value.to_string(),
    })
}

/// Feeds parsed lines from an async reader into a [`CommandQueue`].
///
/// A command the queue rejects is held and offered again on the next poll,
/// so a full queue slows ingestion down instead of losing lines.
pub struct GCodeReader<R> {
    reader: R,
    buf: Vec<u8>,
    pending: Option<Command>,
    line_number: usize,
    exhausted: bool,
    parse_errors: u64,
}

impl<R: AsyncBufRead + Unpin> GCodeReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pending: None,
            line_number: 0,
            exhausted: false,
            parse_errors: 0,
        }
    }

    /// Try to move one command into `queue`. Returns `Ok(true)` if a command
    /// was accepted.
    pub async fn poll(&mut self, queue: &mut CommandQueue) -> std::io::Result<bool> {
        let cmd = match self.pending.take() {
            Some(cmd) => cmd,
            None => match self.next_command().await? {
                Some(cmd) => cmd,
                None => return Ok(false),
            },
        };
        match queue.enqueue(cmd) {
            Ok(()) => Ok(true),
            Err(QueueError::Full(cmd)) => {
                self.pending = Some(cmd);
                Ok(false)
            }
        }
    }

    async fn next_command(&mut self) -> std::io::Result<Option<Command>> {
        while !self.exhausted {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                self.exhausted = true;
                break;
            }
            self.line_number += 1;
            let parsed = match std::str::from_utf8(&self.buf) {
                Ok(text) => parse_line(text.trim_end_matches(['\n', '\r']), self.line_number),
                Err(_) => Err(ParseError::InvalidEncoding {
                    line: self.line_number,
                }),
            };
            match parsed {
                Ok(Some(cmd)) => {
                    tracing::trace!("Parsed {}: {}", self.line_number, cmd);
                    return Ok(Some(cmd));
                }
                Ok(None) => {}
                Err(e) => {
                    self.parse_errors += 1;
                    tracing::warn!("Skipping line: {}", e);
                }
            }
        }
        Ok(None)
    }

    /// True once the input is consumed and nothing is waiting for queue space.
    pub fn is_done(&self) -> bool {
        self.exhausted && self.pending.is_none()
    }

    pub fn parse_errors(&self) -> u64 {
        self.parse_errors
    }

    pub fn lines_read(&self) -> usize {
        self.line_number
    }
}
