//! Plain functions as commands.
//!
//! `cmdbind` calls ordinary Rust functions with arguments that arrive as
//! text: a command line, a query string, a form or a JSON body. The names
//! and types of the arguments are declared once in an arguments struct,
//! and the function is checked against it when it is bound, not when it is
//! called.
//!
//! # Features
//!
//! - **Arguments structs**: `#[derive(Args)]` turns tagged fields into an
//!   ordered, named and typed argument list ([`ArgsDef`])
//! - **Conversion**: strings and JSON into integers, floats, booleans,
//!   durations, timestamps, paths, vectors, arrays, options and JSON types
//! - **Four input formats**: positional strings, strings by name, typed
//!   values by name, JSON arrays and objects
//! - **Result handlers**: print, log or serialize results (JSON, YAML, XML,
//!   CSV) after each call
//! - **Command tables**: flat and two-level tables with usage output
//!
//! # Example
//!
//! ```rust,ignore
//! use cmdbind::{println, Args, ArgsDef, Context, StringArgsDispatcher};
//!
//! #[derive(Args, Default)]
//! struct GreetArgs {
//!     #[arg(description = "Who to greet")]
//!     name: String,
//!     #[arg]
//!     times: u8,
//! }
//!
//! fn greet(name: String, times: u8) -> String {
//!     vec![format!("Hello {name}!"); times as usize].join(" ")
//! }
//!
//! let mut commands = StringArgsDispatcher::new();
//! commands.add_command("greet", "Greets somebody", ArgsDef::of::<GreetArgs>()?, greet, vec![println()])?;
//! commands.dispatch_combined(&Context::new(), &["greet", "World", "2"])?;
//! ```
//!
//! # Function shapes
//!
//! Any `Fn` with up to eight parameters can be bound. A leading [`Context`]
//! parameter receives the invocation context and [`Callback`] parameters
//! receive an empty callback; every other parameter must match the
//! argument at the same position. A function returning `Result<T, E>` has
//! an error result: `Err` becomes the call error that handlers see and the
//! caller receives.

// Lets the derive macro's `::cmdbind` paths resolve inside this crate's tests.
extern crate self as cmdbind;

mod adapters;
mod arg;
mod args;
mod context;
mod convert;
mod dispatcher;
mod error;
mod funcs;
mod function;
mod handler;
mod result;
mod serialize;
mod super_table;
mod table;

pub use arg::{json_type_mismatch, Arg, ArgSlot, ArgType, ArgValue, Callback, Json, RawBytes};

pub use args::{ArgField, Args, ArgsDef, NoArgs};

pub use context::{Context, Extensions};

pub use convert::{
    parse_bool, parse_date, parse_duration, parse_fixed_offset, parse_naive_date_time,
    parse_utc, slice_literal_fields, DATE_FORMATS, NAIVE_DATE_TIME_FORMATS, TIME_FORMATS,
};

pub use dispatcher::FuncDispatcher;

pub use error::{BuildError, CallError, ConvertError, Error};

pub use funcs::{
    JsonArgsFunc, JsonArgsResultValuesFunc, MapArgsFunc, MapArgsResultValuesFunc,
    StringArgsFunc, StringArgsResultValuesFunc, StringMapArgsFunc, StringMapArgsResultValuesFunc,
};

pub use function::{CallResult, Fallible, Function, ParamInfo, Plain};

pub use handler::{
    format_to, handler_fn, log_to, print, print_to, println, println_to, println_with_prefix,
    render_results, PrintlnText, ResultsHandler, SharedBuffer, SharedHandler,
};

pub use result::ResultValue;

pub use serialize::{
    serialize_results, OutputFormat, SerializeError, CSV_VALUE_COLUMN, XML_RESULTS_ROOT,
    XML_RESULT_ELEMENT,
};

pub use super_table::SuperStringArgsDispatcher;

pub use table::{
    validate_command_name, CommandLogger, StringArgsCommand, StringArgsDispatcher,
    TracingLogger, DEFAULT,
};

pub use cmdbind_macros::Args;

#[doc(hidden)]
pub mod __private {
    pub use crate::arg::{assign_json_str, assign_json_value, assign_parsed, assign_scalar_json};
    pub use serde_json::Value;
}
