use crate::error::ShellError;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Result as IoResult, Write};
use std::path::Path;
use std::rc::Rc;

/// Longest line, in bytes, handed to the tokenizer in one piece.
///
/// Matches a 255-byte line buffer with room for a terminator. Longer input lines are
/// delivered as several consecutive pieces, each processed as its own command line.
pub const MAX_LINE_LEN: usize = 254;

/// Prompt shown before each read in interactive mode.
pub const PROMPT: &str = "msh> ";

/// One piece of input, at most [`MAX_LINE_LEN`] bytes, usually ending with `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine(String);

impl RawLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Where command lines come from.
pub trait LineSource {
    /// Read the next line. `Ok(None)` means the input is exhausted.
    fn read_line(&mut self) -> Result<Option<RawLine>, ShellError>;
}

/// Line source over any buffered reader: batch files, or a standard input that is not
/// a terminal.
///
/// Reads through the next newline or [`MAX_LINE_LEN`] bytes, whichever comes first.
/// A multi-byte character never straddles two pieces.
pub struct BufferedSource<R> {
    reader: R,
    prompt: Option<(String, Box<dyn Write>)>,
    carry: Vec<u8>,
}

impl<R: BufRead> BufferedSource<R> {
    /// Create a source that reads silently from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            prompt: None,
            carry: Vec::new(),
        }
    }

    /// Write `prompt` to `out` before every read.
    pub fn with_prompt(mut self, prompt: impl Into<String>, out: Box<dyn Write>) -> Self {
        self.prompt = Some((prompt.into(), out));
        self
    }

    fn read_bounded(&mut self) -> IoResult<Vec<u8>> {
        // The carry never holds a newline: it is a partial character or an interrupted read.
        let mut line = std::mem::take(&mut self.carry);
        while line.len() < MAX_LINE_LEN {
            let available = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.carry = line;
                    return Err(e);
                }
            };
            if available.is_empty() {
                return Ok(line);
            }

            let room = MAX_LINE_LEN - line.len();
            let window = &available[..available.len().min(room)];
            if let Some(pos) = window.iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&window[..=pos]);
                self.reader.consume(pos + 1);
                return Ok(line);
            }
            let taken = window.len();
            line.extend_from_slice(window);
            self.reader.consume(taken);
        }

        // Full piece without a newline: keep a trailing partial character for the next read.
        if let Err(e) = std::str::from_utf8(&line) {
            if e.error_len().is_none() && e.valid_up_to() > 0 {
                self.carry = line.split_off(e.valid_up_to());
            }
        }
        Ok(line)
    }
}

impl BufferedSource<BufReader<File>> {
    /// Open a batch file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ShellError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ShellError::BatchFileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LineSource for BufferedSource<R> {
    fn read_line(&mut self) -> Result<Option<RawLine>, ShellError> {
        if let Some((prompt, out)) = &mut self.prompt {
            // A prompt that cannot be shown does not stop the shell.
            let _ = out.write_all(prompt.as_bytes());
            let _ = out.flush();
        }
        let bytes = self.read_bounded().map_err(ShellError::LineRead)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(RawLine::from_bytes(&bytes)))
    }
}

/// Interactive line editor on a terminal, with in-memory history.
///
/// An over-long entry is handed out in several pieces; the prompt is written again
/// before each extra piece, as [`BufferedSource`] does before every read.
pub struct Terminal {
    editor: DefaultEditor,
    prompt: String,
    pending: PendingPieces,
}

/// Remaining pieces of an entry that did not fit in one line.
#[derive(Debug, Default)]
struct PendingPieces {
    queue: VecDeque<RawLine>,
}

impl PendingPieces {
    /// Next piece, with `prompt` written to `out` first.
    fn pop_with_prompt(&mut self, prompt: &str, out: &mut dyn Write) -> Option<RawLine> {
        let piece = self.queue.pop_front()?;
        let _ = out.write_all(prompt.as_bytes());
        let _ = out.flush();
        Some(piece)
    }
}

impl Terminal {
    pub fn new(prompt: impl Into<String>) -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            prompt: prompt.into(),
            pending: PendingPieces::default(),
        })
    }
}

impl LineSource for Terminal {
    fn read_line(&mut self) -> Result<Option<RawLine>, ShellError> {
        if let Some(piece) = self
            .pending
            .pop_with_prompt(&self.prompt, &mut io::stdout())
        {
            return Ok(Some(piece));
        }

        match self.editor.readline(&self.prompt) {
            Ok(mut line) => {
                if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                    tracing::debug!(error = %err, "history entry dropped");
                }
                line.push('\n');
                let mut pieces = split_bounded(&line).into_iter();
                let first = pieces.next();
                self.pending.queue.extend(pieces);
                Ok(first)
            }
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(err)) => Err(ShellError::LineRead(err)),
            Err(ReadlineError::Interrupted) => Err(ShellError::LineRead(io::Error::new(
                io::ErrorKind::Interrupted,
                "interrupted",
            ))),
            Err(err) => Err(ShellError::LineRead(io::Error::other(err.to_string()))),
        }
    }
}

/// Cut `text` into pieces of at most [`MAX_LINE_LEN`] bytes on character boundaries.
pub fn split_bounded(text: &str) -> Vec<RawLine> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        if idx + ch.len_utf8() - start > MAX_LINE_LEN {
            pieces.push(RawLine(text[start..idx].to_string()));
            start = idx;
        }
    }
    if start < text.len() {
        pieces.push(RawLine(text[start..].to_string()));
    }
    pieces
}

/// Memory-backed writer for capturing output in tests and embedders.
#[derive(Default)]
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer together with a handle to the bytes it collects.
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.buf.clone();
        (mw, rc)
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(source: &mut dyn LineSource) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = source.read_line().unwrap() {
            lines.push(line.as_str().to_string());
        }
        lines
    }

    #[test]
    fn test_reads_line_by_line() {
        let mut source = BufferedSource::new(Cursor::new("ls -l\n\npwd\n"));
        assert_eq!(read_all(&mut source), vec!["ls -l\n", "\n", "pwd\n"]);
    }

    #[test]
    fn test_last_line_without_newline() {
        let mut source = BufferedSource::new(Cursor::new("echo hi\nexit"));
        assert_eq!(read_all(&mut source), vec!["echo hi\n", "exit"]);
    }

    #[test]
    fn test_empty_input_is_end() {
        let mut source = BufferedSource::new(Cursor::new(""));
        assert!(source.read_line().unwrap().is_none());
    }

    #[test]
    fn test_long_line_is_split() {
        let long = format!("{}\n", "a".repeat(300));
        let mut source = BufferedSource::new(Cursor::new(long));
        let lines = read_all(&mut source);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), MAX_LINE_LEN);
        assert_eq!(lines[1], format!("{}\n", "a".repeat(300 - MAX_LINE_LEN)));
    }

    #[test]
    fn test_split_keeps_characters_whole() {
        // 253 ASCII bytes followed by a two-byte character that does not fit.
        let text = format!("{}é\n", "a".repeat(253));
        let mut source = BufferedSource::new(Cursor::new(text.clone()));
        let lines = read_all(&mut source);
        assert_eq!(lines, vec!["a".repeat(253), "é\n".to_string()]);
        assert_eq!(
            split_bounded(&text),
            vec![RawLine("a".repeat(253)), RawLine("é\n".to_string())]
        );
    }

    #[test]
    fn test_split_bounded_short_line() {
        assert_eq!(split_bounded("ls\n"), vec![RawLine("ls\n".to_string())]);
        assert!(split_bounded("").is_empty());
    }

    #[test]
    fn test_prompt_before_every_read() {
        let (out, handle) = MemWriter::with_handle();
        let mut source =
            BufferedSource::new(Cursor::new("pwd\n")).with_prompt(PROMPT, Box::new(out));
        assert_eq!(read_all(&mut source), vec!["pwd\n"]);
        assert_eq!(String::from_utf8(handle.borrow().clone()).unwrap(), "msh> msh> ");
    }

    #[test]
    fn test_missing_batch_file() {
        let res = BufferedSource::open("/no/such/batch/file");
        assert!(matches!(res, Err(ShellError::BatchFileOpen { .. })));
    }

    #[test]
    fn test_pending_pieces_repeat_the_prompt() {
        let mut pending = PendingPieces::default();
        let long = format!("echo {}\n", "x".repeat(300));
        pending.queue.extend(split_bounded(&long).into_iter().skip(1));

        let mut out = Vec::new();
        let piece = pending.pop_with_prompt(PROMPT, &mut out).unwrap();
        assert_eq!(piece.as_str(), format!("{}\n", "x".repeat(305 - MAX_LINE_LEN)));
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "msh> ");

        assert!(pending.pop_with_prompt(PROMPT, &mut out).is_none());
        assert_eq!(String::from_utf8(out).unwrap(), "msh> ");
    }
}
