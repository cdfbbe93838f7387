//! Line-oriented input sources and the stack that swaps between them.
//!
//! The active source is the top of an [`InputStack`]. A running script pushes
//! its file with [`InputStack::push`] and gets back an [`InputFrame`] guard;
//! dropping the guard (normal return, error, or task cancellation) pops the
//! file and makes the previous source active again.

use crate::error::InputError;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::pin::Pin;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

pub type InputFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, InputError>> + Send + 'a>>;

pub trait LineSource: Send {
    /// `Ok(None)` at end of input.
    fn next_line(&mut self) -> InputFuture<'_, Option<String>>;

    /// Probes for more data without consuming it.
    fn has_more(&mut self) -> InputFuture<'_, bool>;

    fn name(&self) -> &str;

    /// Interactive sources get prompts; file sources run silently.
    fn is_interactive(&self) -> bool {
        false
    }
}

pub struct ReaderSource<R> {
    name: String,
    reader: R,
    peeked: Option<String>,
    broken: Option<String>,
    interactive: bool,
}

impl<R> ReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            peeked: None,
            broken: None,
            interactive: false,
        }
    }

    #[must_use]
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    async fn fill(&mut self) -> Result<Option<String>, InputError> {
        if let Some(reason) = &self.broken {
            return Err(InputError::Unusable(format!("{}: {reason}", self.name)));
        }
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf).await {
            Ok(0) => Ok(None),
            Ok(_) => match String::from_utf8(buf) {
                Ok(line) => Ok(Some(line.trim_end_matches(['\n', '\r']).to_string())),
                Err(err) => Err(self.mark_broken(err.to_string())),
            },
            Err(err) => Err(self.mark_broken(err.to_string())),
        }
    }

    fn mark_broken(&mut self, reason: String) -> InputError {
        let error = InputError::Unusable(format!("{}: {reason}", self.name));
        self.broken = Some(reason);
        error
    }
}

impl ReaderSource<BufReader<tokio::io::Stdin>> {
    #[must_use]
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin())).interactive(true)
    }
}

impl ReaderSource<std::io::Cursor<Vec<u8>>> {
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, std::io::Cursor::new(text.into().into_bytes()))
    }
}

impl ReaderSource<BufReader<tokio::fs::File>> {
    /// # Errors
    /// Returns the I/O error if the file cannot be opened.
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

impl<R> LineSource for ReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn next_line(&mut self) -> InputFuture<'_, Option<String>> {
        Box::pin(async move {
            if let Some(line) = self.peeked.take() {
                return Ok(Some(line));
            }
            self.fill().await
        })
    }

    fn has_more(&mut self) -> InputFuture<'_, bool> {
        Box::pin(async move {
            if self.peeked.is_some() {
                return Ok(true);
            }
            let next = self.fill().await?;
            let more = next.is_some();
            self.peeked = next;
            Ok(more)
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// Active input sources, innermost last.
#[derive(Default)]
pub struct InputStack {
    sources: Vec<Box<dyn LineSource>>,
}

impl InputStack {
    #[must_use]
    pub fn new(base: Box<dyn LineSource>) -> Self {
        Self {
            sources: vec![base],
        }
    }

    /// No operator behind it: scripts run here cannot fall back to anything.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn current_name(&self) -> Option<&str> {
        self.sources.last().map(|source| source.name())
    }

    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.sources
            .last()
            .is_some_and(|source| source.is_interactive())
    }

    /// Makes `source` the active input until the returned frame is dropped.
    pub fn push(&mut self, source: Box<dyn LineSource>) -> InputFrame<'_> {
        self.sources.push(source);
        let depth = self.sources.len();
        InputFrame { stack: self, depth }
    }

    /// Reads from the active source.
    ///
    /// # Errors
    /// Returns `InputError::Exhausted` when no source is active, or the source's failure.
    pub async fn read_line(&mut self) -> Result<Option<String>, InputError> {
        match self.sources.last_mut() {
            Some(source) => source.next_line().await,
            None => Err(InputError::Exhausted("no input source".to_string())),
        }
    }

    /// Whether the active source still has data. `Ok(false)` is a clean end of input.
    ///
    /// # Errors
    /// Returns `InputError::Exhausted` when no source is active, or the source's failure.
    pub async fn probe(&mut self) -> Result<bool, InputError> {
        match self.sources.last_mut() {
            Some(source) => source.has_more().await,
            None => Err(InputError::Exhausted("no input source".to_string())),
        }
    }
}

/// Guard returned by [`InputStack::push`]; pops the pushed source on drop.
pub struct InputFrame<'a> {
    stack: &'a mut InputStack,
    depth: usize,
}

impl Deref for InputFrame<'_> {
    type Target = InputStack;

    fn deref(&self) -> &Self::Target {
        &*self.stack
    }
}

impl DerefMut for InputFrame<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.stack
    }
}

impl Drop for InputFrame<'_> {
    fn drop(&mut self) {
        self.stack.sources.truncate(self.depth.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::{InputStack, LineSource, ReaderSource};
    use crate::error::InputError;

    fn text(name: &str, body: &str) -> Box<dyn LineSource> {
        Box::new(ReaderSource::from_text(name, body))
    }

    #[tokio::test]
    async fn reads_lines_without_terminators() {
        let mut source = ReaderSource::from_text("t", "show\r\nadd {}\n");
        assert_eq!(source.next_line().await, Ok(Some("show".to_string())));
        assert_eq!(source.next_line().await, Ok(Some("add {}".to_string())));
        assert_eq!(source.next_line().await, Ok(None));
    }

    #[tokio::test]
    async fn probing_does_not_consume() {
        let mut source = ReaderSource::from_text("t", "info\n");
        assert_eq!(source.has_more().await, Ok(true));
        assert_eq!(source.next_line().await, Ok(Some("info".to_string())));
        assert_eq!(source.has_more().await, Ok(false));
    }

    #[tokio::test]
    async fn invalid_utf8_makes_source_unusable_for_good() {
        let mut source = ReaderSource::new("bin", std::io::Cursor::new(vec![0xff, 0xfe, b'\n']));
        assert!(matches!(source.next_line().await, Err(InputError::Unusable(_))));
        assert!(matches!(source.has_more().await, Err(InputError::Unusable(_))));
    }

    #[tokio::test]
    async fn dropping_a_frame_restores_previous_source() {
        let mut stack = InputStack::new(text("operator", "show\n"));
        {
            let mut frame = stack.push(text("script.txt", "info\n"));
            assert_eq!(frame.current_name(), Some("script.txt"));
            assert_eq!(frame.read_line().await, Ok(Some("info".to_string())));
        }
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.current_name(), Some("operator"));
        assert_eq!(stack.read_line().await, Ok(Some("show".to_string())));
    }

    #[tokio::test]
    async fn empty_stack_is_exhausted() {
        let mut stack = InputStack::empty();
        assert!(matches!(stack.read_line().await, Err(InputError::Exhausted(_))));
        assert!(matches!(stack.probe().await, Err(InputError::Exhausted(_))));
    }

    #[tokio::test]
    async fn probing_tells_end_of_input_from_a_broken_source() {
        let mut finished = InputStack::new(text("done.txt", ""));
        assert_eq!(finished.probe().await, Ok(false));

        let mut broken = InputStack::new(Box::new(ReaderSource::new(
            "bin",
            std::io::Cursor::new(vec![0xff, b'\n']),
        )));
        assert!(matches!(broken.probe().await, Err(InputError::Unusable(_))));
    }
}
