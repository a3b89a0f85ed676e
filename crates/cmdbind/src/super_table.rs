//! Two-level command tables: `app <group> <command> args...`.
//!
//! Each group (super command) owns a [`StringArgsDispatcher`]. The group
//! named [`DEFAULT`] holds commands invoked without a group, and a group's
//! default command runs when only the group name is given.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::args::ArgsDef;
use crate::context::Context;
use crate::error::{BuildError, Error};
use crate::function::Function;
use crate::handler::SharedHandler;
use crate::table::{validate_command_name, CommandLogger, StringArgsDispatcher, DEFAULT};

#[derive(Clone, Default)]
pub struct SuperStringArgsDispatcher {
    groups: BTreeMap<String, StringArgsDispatcher>,
    loggers: Vec<Arc<dyn CommandLogger>>,
}

impl SuperStringArgsDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loggers are handed to every group added afterwards.
    pub fn with_loggers(mut self, loggers: Vec<Arc<dyn CommandLogger>>) -> Self {
        self.loggers = loggers;
        self
    }

    /// Adds a group and returns its table for registering commands.
    pub fn add_super_command(
        &mut self,
        super_command: &str,
    ) -> Result<&mut StringArgsDispatcher, BuildError> {
        if super_command != DEFAULT {
            validate_command_name(super_command)?;
        }
        if self.groups.contains_key(super_command) {
            return Err(BuildError::DuplicateCommand {
                name: super_command.to_string(),
            });
        }
        let table = StringArgsDispatcher::new().with_loggers(self.loggers.clone());
        Ok(self.groups.entry(super_command.to_string()).or_insert(table))
    }

    pub fn must_add_super_command(&mut self, super_command: &str) -> &mut StringArgsDispatcher {
        match self.add_super_command(super_command) {
            Ok(table) => table,
            Err(err) => panic!("super command {super_command:?}: {err}"),
        }
    }

    /// Adds the default group holding only the default command.
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
        self.add_super_command(DEFAULT)?
            .add_default_command(description, args, func, handlers)
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

    pub fn super_command(&self, super_command: &str) -> Option<&StringArgsDispatcher> {
        self.groups.get(super_command)
    }

    /// Returns true if the group exists and has a default command.
    pub fn has_command(&self, super_command: &str) -> bool {
        self.groups
            .get(super_command)
            .is_some_and(StringArgsDispatcher::has_default_command)
    }

    pub fn has_sub_command(&self, super_command: &str, command: &str) -> bool {
        self.groups
            .get(super_command)
            .is_some_and(|table| table.has_command(command))
    }

    pub fn dispatch<S: AsRef<str>>(
        &self,
        ctx: &Context,
        super_command: &str,
        command: &str,
        args: &[S],
    ) -> Result<(), Error> {
        let Some(table) = self.groups.get(super_command) else {
            warn!(super_command, "super command not found");
            return Err(Error::SuperCommandNotFound {
                command: super_command.to_string(),
            });
        };
        debug!(super_command, command, "dispatching to group");
        table.dispatch(ctx, command, args)
    }

    pub fn must_dispatch<S: AsRef<str>>(
        &self,
        ctx: &Context,
        super_command: &str,
        command: &str,
        args: &[S],
    ) {
        if let Err(err) = self.dispatch(ctx, super_command, command, args) {
            panic!("command {super_command:?} {command:?}: {err}");
        }
    }

    pub fn dispatch_default_command(&self, ctx: &Context) -> Result<(), Error> {
        self.dispatch::<&str>(ctx, DEFAULT, DEFAULT, &[])
    }

    pub fn must_dispatch_default_command(&self, ctx: &Context) {
        if let Err(err) = self.dispatch_default_command(ctx) {
            panic!("default command: {err}");
        }
    }

    /// Splits command line words into group, command and arguments.
    ///
    /// No words select the default command of the default group, one word
    /// the default command of that group. With more words the remaining
    /// words are arguments of the group's default command if it has one,
    /// otherwise the second word names the command.
    pub fn split_command_and_args<'a, S: AsRef<str>>(
        &self,
        words: &'a [S],
    ) -> (&'a str, &'a str, &'a [S]) {
        match words {
            [] => (DEFAULT, DEFAULT, &[]),
            [group] => (group.as_ref(), DEFAULT, &[]),
            [group, rest @ ..] if self.has_command(group.as_ref()) => {
                (group.as_ref(), DEFAULT, rest)
            }
            [group, command, rest @ ..] => (group.as_ref(), command.as_ref(), rest),
        }
    }

    /// Dispatches a whole command line, see
    /// [`split_command_and_args`](Self::split_command_and_args).
    pub fn dispatch_combined_command_and_args<S: AsRef<str>>(
        &self,
        ctx: &Context,
        words: &[S],
    ) -> Result<(), Error> {
        let (super_command, command, args) = self.split_command_and_args(words);
        self.dispatch(ctx, super_command, command, args)
    }

    pub fn must_dispatch_combined_command_and_args<S: AsRef<str>>(
        &self,
        ctx: &Context,
        words: &[S],
    ) {
        if let Err(err) = self.dispatch_combined_command_and_args(ctx, words) {
            panic!("{err}");
        }
    }

    /// Writes one usage block per command, ordered by group and command.
    pub fn print_commands<W: Write + ?Sized>(&self, app_name: &str, w: &mut W) -> io::Result<()> {
        for (group, table) in &self.groups {
            for cmd in table.commands() {
                cmd.write_usage(w, app_name, Some(group.as_str()))?;
            }
        }
        Ok(())
    }

    /// Writes a `Commands:` section followed by a `Flags:` heading, or
    /// nothing when no group was added.
    pub fn print_commands_usage_intro<W: Write + ?Sized>(
        &self,
        app_name: &str,
        w: &mut W,
    ) -> io::Result<()> {
        if self.groups.is_empty() {
            return Ok(());
        }
        writeln!(w, "Commands:")?;
        self.print_commands(app_name, w)?;
        writeln!(w, "Flags:")
    }
}

impl fmt::Debug for SuperStringArgsDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperStringArgsDispatcher")
            .field("groups", &self.groups)
            .field("loggers", &self.loggers.len())
            .finish()
    }
}
