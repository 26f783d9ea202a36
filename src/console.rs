//! Text streams the menu reads from and writes to.
//!
//! A [`Console`] bundles one line-oriented input source with an output writer
//! (rendered menus, prompts) and an error writer (validation and status
//! messages). It is a cheap, cloneable handle so that menu callbacks can prompt
//! for values on the same streams as the menu that invoked them.
//!
//! ## Interruption
//!
//! [`Console::stdio`] reads standard input on a dedicated thread and forwards
//! each line over a channel. A second thread watches for Ctrl-C and feeds the
//! same channel, so a prompt blocked on user input unwinds with
//! [`InputError::Interrupted`] instead of being killed mid-render. Long-running
//! callbacks poll the shared [`Interrupt`] handle instead; an interruption
//! consumed there is not delivered again to the next prompt.

use crate::error::InputError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A source of user input, one line at a time.
pub trait LineSource: Send {
    /// Read the next line without its trailing newline.
    fn read_line(&mut self) -> Result<String, InputError>;
}

/// Events delivered to a [`StdinSource`].
#[derive(Debug)]
pub enum InputEvent {
    /// A line without its newline.
    Line(String),
    /// Standard input was closed.
    Eof,
    /// Ctrl-C was pressed.
    Interrupt,
    /// Reading standard input failed.
    Failed(io::Error),
}

/// Shared interruption flag, usually set from a Ctrl-C handler.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    pending: Arc<AtomicBool>,
    notify: Option<mpsc::UnboundedSender<InputEvent>>,
}

impl Interrupt {
    /// A flag with no input channel attached.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_notifier(notify: mpsc::UnboundedSender<InputEvent>) -> Self {
        Self {
            pending: Arc::new(AtomicBool::new(false)),
            notify: Some(notify),
        }
    }

    /// Raise the interruption and wake a blocked prompt.
    pub fn trigger(&self) {
        self.pending.store(true, Ordering::SeqCst);
        if let Some(notify) = &self.notify {
            // The reader is gone once input is exhausted; nothing left to wake.
            let _ = notify.send(InputEvent::Interrupt);
        }
    }

    /// Consume a pending interruption, returning whether there was one.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }

    /// Whether an interruption is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Standard input forwarded from a reader thread.
pub struct StdinSource {
    events: mpsc::UnboundedReceiver<InputEvent>,
    interrupt: Interrupt,
    exhausted: bool,
}

impl StdinSource {
    /// Start the stdin reader and Ctrl-C watcher threads.
    pub fn spawn() -> io::Result<(Self, Interrupt)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let interrupt = Interrupt::with_notifier(tx.clone());

        std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || forward_stdin(tx))?;
        spawn_ctrl_c_watcher(interrupt.clone())?;

        let source = Self {
            events: rx,
            interrupt: interrupt.clone(),
            exhausted: false,
        };
        Ok((source, interrupt))
    }
}

impl LineSource for StdinSource {
    fn read_line(&mut self) -> Result<String, InputError> {
        if self.exhausted {
            return Err(InputError::Exhausted);
        }
        loop {
            match self.events.blocking_recv() {
                Some(InputEvent::Line(line)) => return Ok(line),
                Some(InputEvent::Interrupt) => {
                    if self.interrupt.take() {
                        return Err(InputError::Interrupted);
                    }
                    // Already handled by whoever polled the flag first.
                    debug!("Ignoring stale interrupt event");
                }
                Some(InputEvent::Failed(err)) => {
                    self.exhausted = true;
                    return Err(InputError::Io(err));
                }
                Some(InputEvent::Eof) | None => {
                    self.exhausted = true;
                    return Err(InputError::Exhausted);
                }
            }
        }
    }
}

fn forward_stdin(tx: mpsc::UnboundedSender<InputEvent>) {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    loop {
        let mut line = String::new();
        let event = match reader.read_line(&mut line) {
            Ok(0) => InputEvent::Eof,
            Ok(_) => InputEvent::Line(strip_newline(line)),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => InputEvent::Failed(err),
        };
        let last = !matches!(event, InputEvent::Line(_));
        if tx.send(event).is_err() || last {
            break;
        }
    }
}

fn spawn_ctrl_c_watcher(interrupt: Interrupt) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::Builder::new()
        .name("ctrl-c-watcher".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        warn!("Ctrl-C handler unavailable: {}", err);
                        break;
                    }
                    debug!("Ctrl-C received");
                    interrupt.trigger();
                }
            });
        })?;
    Ok(())
}

fn strip_newline(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

/// One scripted step of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedLine {
    /// Delivered as typed input.
    Line(String),
    /// Delivered as ^C.
    Interrupt,
}

/// Pre-recorded input; reports exhaustion once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<ScriptedLine>,
}

impl ScriptedInput {
    /// A script of plain lines.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines
                .into_iter()
                .map(|line| ScriptedLine::Line(line.into()))
                .collect(),
        }
    }

    /// Queue an interruption after the lines already scripted.
    pub fn then_interrupt(mut self) -> Self {
        self.lines.push_back(ScriptedLine::Interrupt);
        self
    }

    /// Queue another line after the steps already scripted.
    pub fn then_line(mut self, line: impl Into<String>) -> Self {
        self.lines.push_back(ScriptedLine::Line(line.into()));
        self
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self) -> Result<String, InputError> {
        match self.lines.pop_front() {
            Some(ScriptedLine::Line(line)) => Ok(line),
            Some(ScriptedLine::Interrupt) => Err(InputError::Interrupted),
            None => Err(InputError::Exhausted),
        }
    }
}

/// An in-memory writer whose contents can be read back from a clone.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Streams {
    input: Box<dyn LineSource>,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

/// Cloneable handle to the input, output and error streams.
#[derive(Clone)]
pub struct Console {
    streams: Arc<Mutex<Streams>>,
}

impl Console {
    /// Bundle an input source with output and error writers.
    pub fn new(
        input: impl LineSource + 'static,
        out: impl Write + Send + 'static,
        err: impl Write + Send + 'static,
    ) -> Self {
        Self {
            streams: Arc::new(Mutex::new(Streams {
                input: Box::new(input),
                out: Box::new(out),
                err: Box::new(err),
            })),
        }
    }

    /// Console on the process's standard streams, with Ctrl-C wired to the prompt.
    pub fn stdio() -> io::Result<(Self, Interrupt)> {
        let (source, interrupt) = StdinSource::spawn()?;
        Ok((Self::new(source, io::stdout(), io::stderr()), interrupt))
    }

    /// Console driven by a script, capturing output and errors for inspection.
    pub fn scripted(input: ScriptedInput) -> (Self, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        (Self::new(input, out.clone(), err.clone()), out, err)
    }

    /// Write to the output stream and flush.
    pub fn write_out(&self, text: &str) -> io::Result<()> {
        let mut streams = self.streams.lock();
        streams.out.write_all(text.as_bytes())?;
        streams.out.flush()
    }

    /// Write to the error stream and flush.
    pub fn write_err(&self, text: &str) -> io::Result<()> {
        let mut streams = self.streams.lock();
        streams.err.write_all(text.as_bytes())?;
        streams.err.flush()
    }

    /// Show `prompt` on the output stream and read one line of input.
    pub fn prompt(&self, prompt: &str) -> Result<String, InputError> {
        let mut streams = self.streams.lock();
        streams.out.write_all(prompt.as_bytes())?;
        streams.out.flush()?;
        streams.input.read_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input_reports_exhaustion() {
        let mut input = ScriptedInput::new(["1"]).then_interrupt();
        assert_eq!(input.remaining(), 2);
        assert_eq!(input.read_line().unwrap(), "1");
        assert_eq!(input.remaining(), 1);
        assert!(matches!(input.read_line(), Err(InputError::Interrupted)));
        assert!(matches!(input.read_line(), Err(InputError::Exhausted)));
    }

    #[test]
    fn test_prompt_writes_to_output_stream() {
        let (console, out, err) = Console::scripted(ScriptedInput::new(["x"]));
        assert_eq!(console.prompt("$ ").unwrap(), "x");
        console.write_err("oops\n").unwrap();
        assert_eq!(out.contents(), "$ ");
        assert_eq!(err.contents(), "oops\n");
    }

    #[test]
    fn test_interrupt_is_consumed_once() {
        let interrupt = Interrupt::new();
        interrupt.trigger();
        assert!(interrupt.is_pending());
        assert!(interrupt.take());
        assert!(!interrupt.take());
    }

    #[test]
    fn test_stale_interrupt_event_is_skipped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let interrupt = Interrupt::with_notifier(tx.clone());
        let mut source = StdinSource {
            events: rx,
            interrupt: interrupt.clone(),
            exhausted: false,
        };

        interrupt.trigger();
        assert!(interrupt.take());
        tx.send(InputEvent::Line("2".to_string())).unwrap();
        tx.send(InputEvent::Eof).unwrap();

        assert_eq!(source.read_line().unwrap(), "2");
        assert!(matches!(source.read_line(), Err(InputError::Exhausted)));
        assert!(matches!(source.read_line(), Err(InputError::Exhausted)));
    }

    #[test]
    fn test_pending_interrupt_unblocks_reader() {
        let (tx, rx) = mpsc::unbounded_channel();
        let interrupt = Interrupt::with_notifier(tx);
        let mut source = StdinSource {
            events: rx,
            interrupt: interrupt.clone(),
            exhausted: false,
        };

        interrupt.trigger();
        assert!(matches!(source.read_line(), Err(InputError::Interrupted)));
        assert!(!interrupt.is_pending());
    }

    #[test]
    fn test_strip_newline_handles_crlf() {
        assert_eq!(strip_newline("ab\r\n".to_string()), "ab");
        assert_eq!(strip_newline("ab\n".to_string()), "ab");
        assert_eq!(strip_newline("ab".to_string()), "ab");
    }
}
