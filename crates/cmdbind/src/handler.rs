//! Result handlers.
//!
//! A [`ResultsHandler`] receives everything about a finished call: the
//! arguments descriptor, the argument values, the function's results and its
//! error. Handlers run in registration order; see
//! [`FuncDispatcher::call_with_results_handlers`](crate::FuncDispatcher::call_with_results_handlers).
//!
//! The handlers provided here print or log results. When the call failed
//! they write nothing and hand the call error back; the dispatcher reports
//! it once. When printing, objects and arrays are rendered as indented
//! JSON, strings as they are and other values in their plain form.
//!
//! ```rust,ignore
//! let buf = SharedBuffer::new();
//! let func = ArgsDef::of::<GetArgs>()?
//!     .string_args_func(get_user, vec![println_to(buf.clone())])?;
//! ```

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::Level;

use crate::arg::ArgValue;
use crate::args::ArgsDef;
use crate::error::{CallError, Error};
use crate::result::ResultValue;
use crate::serialize::{serialize_results, OutputFormat};

/// Post-call consumer of a function's results.
pub trait ResultsHandler: Send + Sync {
    fn handle_results(
        &self,
        def: &ArgsDef,
        args: &[ArgValue],
        results: &[ResultValue],
        call_error: Option<&CallError>,
    ) -> Result<(), Error>;
}

impl<F> ResultsHandler for F
where
    F: Fn(&ArgsDef, &[ArgValue], &[ResultValue], Option<&CallError>) -> Result<(), Error>
        + Send
        + Sync,
{
    fn handle_results(
        &self,
        def: &ArgsDef,
        args: &[ArgValue],
        results: &[ResultValue],
        call_error: Option<&CallError>,
    ) -> Result<(), Error> {
        self(def, args, results, call_error)
    }
}

/// Handlers are shared between the closures that use them.
pub type SharedHandler = Arc<dyn ResultsHandler>;

/// Wraps a closure as a [`SharedHandler`].
pub fn handler_fn<F>(f: F) -> SharedHandler
where
    F: Fn(&ArgsDef, &[ArgValue], &[ResultValue], Option<&CallError>) -> Result<(), Error>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

// =============================================================================
// Rendering
// =============================================================================

struct Rendered {
    text: String,
    is_string: bool,
}

fn render(result: &ResultValue) -> Result<Rendered, Error> {
    let json = result.to_json().map_err(Error::handler)?;
    Ok(match json {
        Value::Object(_) | Value::Array(_) => Rendered {
            text: serde_json::to_string_pretty(&json).map_err(Error::handler)?,
            is_string: true,
        },
        Value::String(text) => Rendered {
            text,
            is_string: true,
        },
        Value::Null => Rendered {
            text: "<nil>".into(),
            is_string: false,
        },
        other => Rendered {
            text: other.to_string(),
            is_string: false,
        },
    })
}

/// Renders results the way the print handlers do, one string per result.
pub fn render_results(results: &[ResultValue]) -> Result<Vec<String>, Error> {
    results
        .iter()
        .map(|r| render(r).map(|rendered| rendered.text))
        .collect()
}

/// Joins results, separating two adjacent operands with a space only when
/// neither of them is a string.
fn join_print(rendered: &[Rendered]) -> String {
    let mut out = String::new();
    for (i, r) in rendered.iter().enumerate() {
        if i > 0 && !r.is_string && !rendered[i - 1].is_string {
            out.push(' ');
        }
        out.push_str(&r.text);
    }
    out
}

fn join_println(rendered: &[Rendered]) -> String {
    let mut out = rendered
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    out.push('\n');
    out
}

fn rendered_results(results: &[ResultValue]) -> Result<Vec<Rendered>, Error> {
    results.iter().map(render).collect()
}

// =============================================================================
// Writers
// =============================================================================

/// A writer that can be shared between handlers and read back later.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedBuffer").field(&self.contents()).finish()
    }
}

struct WriterHandler<W, R> {
    writer: Mutex<W>,
    render: R,
}

impl<W, R> ResultsHandler for WriterHandler<W, R>
where
    W: Write + Send,
    R: Fn(&[ResultValue]) -> Result<Option<String>, Error> + Send + Sync,
{
    fn handle_results(
        &self,
        _def: &ArgsDef,
        _args: &[ArgValue],
        results: &[ResultValue],
        call_error: Option<&CallError>,
    ) -> Result<(), Error> {
        if let Some(err) = call_error {
            return Err(Error::Call(err.clone()));
        }
        let Some(text) = (self.render)(results)? else {
            return Ok(());
        };
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(text.as_bytes()).map_err(Error::handler)?;
        writer.flush().map_err(Error::handler)
    }
}

fn writer_handler<W, R>(writer: W, render: R) -> SharedHandler
where
    W: Write + Send + 'static,
    R: Fn(&[ResultValue]) -> Result<Option<String>, Error> + Send + Sync + 'static,
{
    Arc::new(WriterHandler {
        writer: Mutex::new(writer),
        render,
    })
}

/// Prints results to `writer` without separators or trailing newline.
pub fn print_to<W: Write + Send + 'static>(writer: W) -> SharedHandler {
    writer_handler(writer, |results| {
        if results.is_empty() {
            return Ok(None);
        }
        Ok(Some(join_print(&rendered_results(results)?)))
    })
}

/// Prints results to `writer` separated by spaces, followed by a newline.
pub fn println_to<W: Write + Send + 'static>(writer: W) -> SharedHandler {
    writer_handler(writer, |results| {
        if results.is_empty() {
            return Ok(None);
        }
        Ok(Some(join_println(&rendered_results(results)?)))
    })
}

/// Like [`println_to`], with `prefix` in front of the results.
pub fn println_with_prefix<W: Write + Send + 'static>(
    prefix: impl Into<String>,
    writer: W,
) -> SharedHandler {
    let prefix = prefix.into();
    writer_handler(writer, move |results| {
        if results.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!(
            "{prefix}{}",
            join_println(&rendered_results(results)?)
        )))
    })
}

/// [`print_to`] standard output.
pub fn print() -> SharedHandler {
    print_to(io::stdout())
}

/// [`println_to`] standard output.
pub fn println() -> SharedHandler {
    println_to(io::stdout())
}

/// Writes results to `writer` serialized in `format`.
///
/// A single result is serialized on its own, several results as a list.
pub fn format_to<W: Write + Send + 'static>(writer: W, format: OutputFormat) -> SharedHandler {
    writer_handler(writer, move |results| {
        if results.is_empty() {
            return Ok(None);
        }
        let serialized = serialize_results(results, format).map_err(Error::handler)?;
        Ok(Some(if serialized.ends_with('\n') {
            serialized
        } else {
            serialized + "\n"
        }))
    })
}

/// Prints a fixed line of text after every successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintlnText(pub String);

impl PrintlnText {
    pub fn new(text: impl Into<String>) -> Self {
        PrintlnText(text.into())
    }

    /// Prints the text to `writer` instead of standard output.
    pub fn to<W: Write + Send + 'static>(&self, writer: W) -> SharedHandler {
        let line = format!("{}\n", self.0);
        writer_handler(writer, move |_| Ok(Some(line.clone())))
    }
}

impl ResultsHandler for PrintlnText {
    fn handle_results(
        &self,
        _def: &ArgsDef,
        _args: &[ArgValue],
        _results: &[ResultValue],
        call_error: Option<&CallError>,
    ) -> Result<(), Error> {
        if let Some(err) = call_error {
            return Err(Error::Call(err.clone()));
        }
        let mut out = io::stdout().lock();
        writeln!(out, "{}", self.0).map_err(Error::handler)
    }
}

// =============================================================================
// Logging
// =============================================================================

struct LogHandler {
    level: Level,
}

impl ResultsHandler for LogHandler {
    fn handle_results(
        &self,
        def: &ArgsDef,
        _args: &[ArgValue],
        results: &[ResultValue],
        call_error: Option<&CallError>,
    ) -> Result<(), Error> {
        if let Some(err) = call_error {
            return Err(Error::Call(err.clone()));
        }
        if results.is_empty() {
            return Ok(());
        }
        let text = render_results(results)?.join(" ");
        let args = def.outer_type().name();
        if self.level == Level::ERROR {
            tracing::error!(%args, "{text}");
        } else if self.level == Level::WARN {
            tracing::warn!(%args, "{text}");
        } else if self.level == Level::INFO {
            tracing::info!(%args, "{text}");
        } else if self.level == Level::DEBUG {
            tracing::debug!(%args, "{text}");
        } else {
            tracing::trace!(%args, "{text}");
        }
        Ok(())
    }
}

/// Emits results as `tracing` events at `level`.
pub fn log_to(level: Level) -> SharedHandler {
    Arc::new(LogHandler { level })
}
