//! Command tables keyed by command name.
//!
//! A [`StringArgsDispatcher`] maps command names to functions called with
//! positional string arguments, the shape of a command line after the
//! program name. The empty name [`DEFAULT`] is the default command.
//!
//! ```rust,ignore
//! let mut commands = StringArgsDispatcher::new();
//! commands.add_command("greet", "Greets somebody", ArgsDef::of::<GreetArgs>()?, greet, vec![println()])?;
//! commands.dispatch_combined(&Context::new(), &["greet", "World"])?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::args::ArgsDef;
use crate::context::Context;
use crate::error::{BuildError, Error};
use crate::funcs::StringArgsFunc;
use crate::function::Function;
use crate::handler::SharedHandler;

/// Name of the default command.
pub const DEFAULT: &str = "";

const SHELL_METACHARACTERS: &str = "'\"`|&;<>()$\\*?[]#~{}!";

/// Receives every command a table dispatches.
pub trait CommandLogger: Send + Sync {
    fn log_command(&self, command: &str, args: &[String]);
}

/// Logs dispatched commands as `tracing` info events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl CommandLogger for TracingLogger {
    fn log_command(&self, command: &str, args: &[String]) {
        tracing::info!(command, ?args, "command");
    }
}

/// Checks that a non-default command name can be typed on a shell
/// without quoting.
pub fn validate_command_name(name: &str) -> Result<(), BuildError> {
    let invalid = |reason: String| {
        Err(BuildError::InvalidCommandName {
            name: name.to_string(),
            reason,
        })
    };
    if name.is_empty() {
        return invalid("empty name".into());
    }
    for c in name.chars() {
        if c.is_whitespace() {
            return invalid("contains whitespace".into());
        }
        if c.is_control() {
            return invalid(format!("contains control character {c:?}"));
        }
        if SHELL_METACHARACTERS.contains(c) {
            return invalid(format!("contains shell metacharacter {c:?}"));
        }
    }
    Ok(())
}

/// One registered command.
#[derive(Debug, Clone)]
pub struct StringArgsCommand {
    command: String,
    description: String,
    func: StringArgsFunc,
}

impl StringArgsCommand {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn args(&self) -> &Arc<ArgsDef> {
        self.func.args_def()
    }

    pub fn func(&self) -> &StringArgsFunc {
        &self.func
    }

    pub(crate) fn write_usage<W: Write + ?Sized>(
        &self,
        w: &mut W,
        app_name: &str,
        group: Option<&str>,
    ) -> io::Result<()> {
        let args = self.args().to_string();
        let line: Vec<&str> = [app_name]
            .into_iter()
            .chain(group)
            .chain([self.command.as_str(), args.as_str()])
            .filter(|part| !part.is_empty())
            .collect();
        writeln!(w, "  {}", line.join(" "))?;

        if !self.description.is_empty() {
            writeln!(w, "      {}", self.description)?;
        }
        let def = self.args();
        if def.has_descriptions() {
            for field in def.args() {
                writeln!(
                    w,
                    "          <{}:{}> {}",
                    field.name(),
                    field.arg_type(),
                    field.description()
                )?;
            }
        }
        writeln!(w)
    }
}

/// Flat command table.
#[derive(Clone, Default)]
pub struct StringArgsDispatcher {
    commands: BTreeMap<String, StringArgsCommand>,
    loggers: Vec<Arc<dyn CommandLogger>>,
}

impl StringArgsDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifies the loggers of every dispatched command.
    pub fn with_loggers(mut self, loggers: Vec<Arc<dyn CommandLogger>>) -> Self {
        self.loggers = loggers;
        self
    }

    pub(crate) fn loggers(&self) -> &[Arc<dyn CommandLogger>] {
        &self.loggers
    }

    /// Registers `func` under `command`.
    ///
    /// Fails for invalid or already registered names and for functions
    /// whose parameters don't match `args`.
    pub fn add_command<F, M>(
        &mut self,
        command: &str,
        description: &str,
        args: Arc<ArgsDef>,
        func: F,
        handlers: Vec<SharedHandler>,
    ) -> Result<(), BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        if command != DEFAULT {
            validate_command_name(command)?;
        }
        if self.commands.contains_key(command) {
            return Err(BuildError::DuplicateCommand {
                name: command.to_string(),
            });
        }
        let func = args.string_args_func(func, handlers)?;
        self.commands.insert(
            command.to_string(),
            StringArgsCommand {
                command: command.to_string(),
                description: description.to_string(),
                func,
            },
        );
        Ok(())
    }

    pub fn must_add_command<F, M>(
        &mut self,
        command: &str,
        description: &str,
        args: Arc<ArgsDef>,
        func: F,
        handlers: Vec<SharedHandler>,
    ) where
        F: Function<M>,
        M: 'static,
    {
        if let Err(err) = self.add_command(command, description, args, func, handlers) {
            panic!("command {command:?}: {err}");
        }
    }

    pub fn add_default_command<F, M>(
        &mut self,
        description: &str,
        args: Arc<ArgsDef>,
        func: F,
        handlers: Vec<SharedHandler>,
    ) -> Result<(), BuildError>
    where
        F: Function<M>,
        M: 'static,
    {
        self.add_command(DEFAULT, description, args, func, handlers)
    }

    pub fn must_add_default_command<F, M>(
        &mut self,
        description: &str,
        args: Arc<ArgsDef>,
        func: F,
        handlers: Vec<SharedHandler>,
    ) where
        F: Function<M>,
        M: 'static,
    {
        if let Err(err) = self.add_default_command(description, args, func, handlers) {
            panic!("default command: {err}");
        }
    }

    pub fn has_command(&self, command: &str) -> bool {
        self.commands.contains_key(command)
    }

    pub fn has_default_command(&self) -> bool {
        self.has_command(DEFAULT)
    }

    pub fn command(&self, command: &str) -> Option<&StringArgsCommand> {
        self.commands.get(command)
    }

    /// Registered commands ordered by name, the default command first.
    pub fn commands(&self) -> impl Iterator<Item = &StringArgsCommand> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn dispatch<S: AsRef<str>>(
        &self,
        ctx: &Context,
        command: &str,
        args: &[S],
    ) -> Result<(), Error> {
        let Some(cmd) = self.commands.get(command) else {
            warn!(command, "command not found");
            return Err(Error::CommandNotFound {
                command: command.to_string(),
            });
        };

        debug!(command, num_args = args.len(), "dispatching command");
        if !self.loggers.is_empty() {
            let logged: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
            for logger in &self.loggers {
                logger.log_command(command, &logged);
            }
        }
        cmd.func.call(ctx, args)
    }

    pub fn must_dispatch<S: AsRef<str>>(&self, ctx: &Context, command: &str, args: &[S]) {
        if let Err(err) = self.dispatch(ctx, command, args) {
            panic!("command {command:?}: {err}");
        }
    }

    pub fn dispatch_default_command(&self, ctx: &Context) -> Result<(), Error> {
        self.dispatch::<&str>(ctx, DEFAULT, &[])
    }

    pub fn must_dispatch_default_command(&self, ctx: &Context) {
        if let Err(err) = self.dispatch_default_command(ctx) {
            panic!("default command: {err}");
        }
    }

    /// Dispatches `words[0]` with the remaining words as arguments, or the
    /// default command when `words` is empty.
    pub fn dispatch_combined<S: AsRef<str>>(&self, ctx: &Context, words: &[S]) -> Result<(), Error> {
        match words.split_first() {
            None => self.dispatch_default_command(ctx),
            Some((command, args)) => self.dispatch(ctx, command.as_ref(), args),
        }
    }

    pub fn must_dispatch_combined<S: AsRef<str>>(&self, ctx: &Context, words: &[S]) {
        if let Err(err) = self.dispatch_combined(ctx, words) {
            panic!("{err}");
        }
    }

    /// Writes one usage block per command, ordered by name.
    pub fn print_commands<W: Write + ?Sized>(&self, app_name: &str, w: &mut W) -> io::Result<()> {
        for cmd in self.commands() {
            cmd.write_usage(w, app_name, None)?;
        }
        Ok(())
    }

    /// Writes a `Commands:` section followed by a `Flags:` heading, or
    /// nothing when the table is empty.
    pub fn print_commands_usage_intro<W: Write + ?Sized>(
        &self,
        app_name: &str,
        w: &mut W,
    ) -> io::Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        writeln!(w, "Commands:")?;
        self.print_commands(app_name, w)?;
        writeln!(w, "Flags:")
    }
}

impl fmt::Debug for StringArgsDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringArgsDispatcher")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("loggers", &self.loggers.len())
            .finish()
    }
}
