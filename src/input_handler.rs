use std::io::{self, BufRead, Write};

use crate::error::{MoodError, MoodResult};

pub const MOOD_QUESTION: &str = "How are you feeling today?";

/// Ask for the user's mood and read one line back.
///
/// Whitespace-only input and EOF both count as empty input.
pub fn read_mood<R: BufRead, W: Write>(reader: &mut R, writer: &mut W) -> MoodResult<String> {
    write!(writer, "{} ", MOOD_QUESTION)?;
    writer.flush()?;

    let mut line = String::new();
    reader.read_line(&mut line)?;

    normalize_mood(&line)
}

/// Stream the mood question is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionTarget {
    Stdout,
    Stderr,
}

impl QuestionTarget {
    /// Stdout is reserved for the reply when it is machine-read (`--json`)
    /// or when the mood is piped in.
    pub fn for_session(json_output: bool, stdin_is_terminal: bool) -> Self {
        if json_output || !stdin_is_terminal {
            QuestionTarget::Stderr
        } else {
            QuestionTarget::Stdout
        }
    }

    pub fn writer(self) -> Box<dyn Write> {
        match self {
            QuestionTarget::Stdout => Box::new(io::stdout()),
            QuestionTarget::Stderr => Box::new(io::stderr()),
        }
    }
}

/// Trim a mood given on the command line or stdin.
pub fn normalize_mood(text: &str) -> MoodResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MoodError::EmptyInput);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    #[test]
    fn test_reads_first_line() {
        let mut input = Cursor::new("I'm feeling anxious today\nignored\n");
        let mut output = Vec::new();

        let mood = read_mood(&mut input, &mut output).unwrap();
        assert_eq!(mood, "I'm feeling anxious today");
        assert_eq!(String::from_utf8(output).unwrap(), "How are you feeling today? ");
    }

    #[test]
    fn test_blank_line_is_empty_input() {
        let mut input = Cursor::new("   \n");
        let mut output = Vec::new();
        assert_matches!(read_mood(&mut input, &mut output), Err(MoodError::EmptyInput));
    }

    #[test]
    fn test_eof_is_empty_input() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        assert_matches!(read_mood(&mut input, &mut output), Err(MoodError::EmptyInput));
    }

    #[test]
    fn test_windows_line_ending() {
        let mut input = Cursor::new("tired\r\n");
        let mut output = Vec::new();
        assert_eq!(read_mood(&mut input, &mut output).unwrap(), "tired");
    }

    #[test]
    fn test_question_target() {
        assert_eq!(QuestionTarget::for_session(false, true), QuestionTarget::Stdout);
        assert_eq!(QuestionTarget::for_session(true, true), QuestionTarget::Stderr);
        assert_eq!(QuestionTarget::for_session(false, false), QuestionTarget::Stderr);
        assert_eq!(QuestionTarget::for_session(true, false), QuestionTarget::Stderr);
    }

    #[test]
    fn test_piped_json_session_reads_mood() {
        let mut input = Cursor::new("sad\n");
        let mut side_stream = Vec::new();

        assert_eq!(QuestionTarget::for_session(true, false), QuestionTarget::Stderr);
        assert_eq!(read_mood(&mut input, &mut side_stream).unwrap(), "sad");
        assert_eq!(String::from_utf8(side_stream).unwrap(), "How are you feeling today? ");
    }
}
