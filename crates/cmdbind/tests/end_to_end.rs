//! End-to-end scenarios: derived arguments structs, bound functions,
//! result handlers and command tables working together.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cmdbind::{
    format_to, print_to, println_to, Args, ArgsDef, BuildError, Callback, Context, Error,
    OutputFormat, SharedBuffer, StringArgsDispatcher, SuperStringArgsDispatcher,
};
use serde::Serialize;

#[derive(Args, Default)]
struct TestCommandArgs {
    #[arg(name = "int0")]
    int0: i32,
    #[arg(name = "str1")]
    str1: String,
    #[arg(name = "bool2")]
    bool2: bool,
}

type Observed = Arc<Mutex<Option<(i32, String, bool)>>>;

fn recorder(
    observed: &Observed,
) -> impl Fn(i32, String, bool) -> anyhow::Result<()> + Send + Sync + 'static {
    let observed = Arc::clone(observed);
    move |int0, str1, bool2| {
        *observed.lock().unwrap() = Some((int0, str1, bool2));
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ResultStruct {
    result_code: i32,
    result_message: String,
}

fn not_found() -> anyhow::Result<ResultStruct> {
    Ok(ResultStruct {
        result_code: 404,
        result_message: "not found".into(),
    })
}

// =============================================================================
// Binding
// =============================================================================

#[test]
fn test_positional_strings_reach_function() {
    let observed = Observed::default();
    let func = ArgsDef::of::<TestCommandArgs>()
        .unwrap()
        .string_args_func(recorder(&observed), vec![])
        .unwrap();

    func.call(&Context::new(), &["123", "Hello World!", "true"])
        .unwrap();
    assert_eq!(
        *observed.lock().unwrap(),
        Some((123, "Hello World!".to_string(), true))
    );
}

#[test]
fn test_partial_positional_strings() {
    let observed = Observed::default();
    let func = ArgsDef::of::<TestCommandArgs>()
        .unwrap()
        .string_args_func(recorder(&observed), vec![])
        .unwrap();

    func.call(&Context::new(), &["123"]).unwrap();
    assert_eq!(*observed.lock().unwrap(), Some((123, String::new(), false)));
}

#[test]
fn test_named_strings_reach_function() {
    let observed = Observed::default();
    let func = ArgsDef::of::<TestCommandArgs>()
        .unwrap()
        .string_map_args_func(recorder(&observed), vec![])
        .unwrap();

    let args: HashMap<String, String> = [
        ("int0", "123"),
        ("str1", "Hello World!"),
        ("bool2", "true"),
        ("verbose", "yes"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    func.call(&Context::new(), &args).unwrap();
    assert_eq!(
        *observed.lock().unwrap(),
        Some((123, "Hello World!".to_string(), true))
    );
}

#[test]
fn test_json_reaches_function() {
    let observed = Observed::default();
    let func = ArgsDef::of::<TestCommandArgs>()
        .unwrap()
        .json_args_func(recorder(&observed), vec![])
        .unwrap();

    func.call(&Context::new(), br#"{"int0": 7, "bool2": "true"}"#)
        .unwrap();
    assert_eq!(*observed.lock().unwrap(), Some((7, String::new(), true)));
}

#[test]
fn test_call_error_returned() {
    let func = ArgsDef::of::<TestCommandArgs>()
        .unwrap()
        .string_args_func(
            |_: i32, _: String, _: bool| -> anyhow::Result<()> { anyhow::bail!("refused") },
            vec![],
        )
        .unwrap();

    let err = func
        .call(&Context::new(), &["123", "Hello World!", "true"])
        .unwrap_err();
    assert!(err.as_call_error().is_some());
    assert_eq!(err.to_string(), "refused");
}

#[test]
fn test_mismatched_function_rejected_at_build() {
    let def = ArgsDef::of::<TestCommandArgs>().unwrap();
    assert!(matches!(
        def.string_args_func(|_: i32, _: String| (), vec![]),
        Err(BuildError::ArgCountMismatch { .. })
    ));
    assert!(matches!(
        def.string_args_func(|_: i32, _: bool, _: String| (), vec![]),
        Err(BuildError::ArgTypeMismatch { ref field, index: 1, .. }) if field == "str1"
    ));
}

#[test]
fn test_context_and_callback_injected() {
    #[derive(Args, Default)]
    struct WaitArgs {
        #[arg]
        timeout: Duration,
    }

    struct RequestId(&'static str);

    let seen = Arc::new(Mutex::new(String::new()));
    let sink = Arc::clone(&seen);
    let func = ArgsDef::of::<WaitArgs>()
        .unwrap()
        .string_args_func(
            move |ctx: Context, on_done: Callback<dyn Fn() + Send + Sync>, timeout: Duration| {
                let id = ctx.value::<RequestId>().map_or("?", |r| r.0);
                *sink.lock().unwrap() = format!("{id} {timeout:?} {}", on_done.is_set());
            },
            vec![],
        )
        .unwrap();
    assert!(func.dispatcher().has_context_arg());

    let ctx = Context::new().with_value(RequestId("req-1"));
    func.call(&ctx, &["1m30s"]).unwrap();
    assert_eq!(*seen.lock().unwrap(), "req-1 90s false");
}

// =============================================================================
// Result handlers
// =============================================================================

#[test]
fn test_struct_result_printed_as_indented_json() {
    let buf = SharedBuffer::new();
    let func = ArgsDef::none()
        .string_args_func(not_found, vec![print_to(buf.clone())])
        .unwrap();

    func.call::<&str>(&Context::new(), &[]).unwrap();
    assert_eq!(
        buf.contents(),
        "{\n  \"ResultCode\": 404,\n  \"ResultMessage\": \"not found\"\n}"
    );
}

#[test]
fn test_call_error_skips_handlers() {
    let buf = SharedBuffer::new();
    let func = ArgsDef::none()
        .string_args_func(
            || -> anyhow::Result<ResultStruct> { anyhow::bail!("backend down") },
            vec![print_to(buf.clone()), println_to(buf.clone())],
        )
        .unwrap();

    let err = func.call::<&str>(&Context::new(), &[]).unwrap_err();
    assert!(matches!(err, Error::Call(_)));
    assert_eq!(buf.contents(), "");
}

#[test]
fn test_format_to_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let writer = file.reopen().unwrap();
    let func = ArgsDef::none()
        .string_args_func(not_found, vec![format_to(writer, OutputFormat::Yaml)])
        .unwrap();
    func.call::<&str>(&Context::new(), &[]).unwrap();

    let mut written = String::new();
    file.read_to_string(&mut written).unwrap();
    assert!(written.contains("ResultCode: 404"));
    assert!(written.contains("ResultMessage: not found"));
}

// =============================================================================
// Command tables
// =============================================================================

fn commands(buf: &SharedBuffer) -> StringArgsDispatcher {
    let mut table = StringArgsDispatcher::new();
    table
        .add_command(
            "lookup",
            "Looks up a record",
            ArgsDef::none(),
            not_found,
            vec![println_to(buf.clone())],
        )
        .unwrap();
    table
}

#[test]
fn test_unknown_command_distinguishable() {
    let buf = SharedBuffer::new();
    let err = commands(&buf)
        .dispatch::<&str>(&Context::new(), "delete", &[])
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.as_call_error().is_none());
    assert!(!matches!(err, Error::Convert { .. }));
}

#[test]
fn test_super_table_routes_command_lines() {
    let buf = SharedBuffer::new();
    let mut disp = SuperStringArgsDispatcher::new();
    disp.add_super_command("records")
        .unwrap()
        .add_command(
            "lookup",
            "",
            ArgsDef::none(),
            not_found,
            vec![println_to(buf.clone())],
        )
        .unwrap();
    disp.add_super_command("sum")
        .unwrap()
        .add_default_command(
            "Adds numbers",
            ArgsDef::of::<TestCommandArgs>().unwrap(),
            |a: i32, _: String, _: bool| a + 1,
            vec![println_to(buf.clone())],
        )
        .unwrap();

    let ctx = Context::new();
    disp.dispatch_combined_command_and_args(&ctx, &["sum", "41"])
        .unwrap();
    disp.dispatch_combined_command_and_args(&ctx, &["records", "lookup"])
        .unwrap();
    assert!(buf.contents().starts_with("42\n{\n  \"ResultCode\": 404"));

    let err = disp
        .dispatch_combined_command_and_args(&ctx, &["users", "list"])
        .unwrap_err();
    assert!(matches!(err, Error::SuperCommandNotFound { ref command } if command == "users"));
}

#[test]
fn test_default_group_reached_through_combined_dispatch() {
    let buf = SharedBuffer::new();
    let mut disp = SuperStringArgsDispatcher::new();
    let root = disp.add_super_command(cmdbind::DEFAULT).unwrap();
    root.add_command(
        "lookup",
        "",
        ArgsDef::none(),
        not_found,
        vec![println_to(buf.clone())],
    )
    .unwrap();
    root.add_default_command(
        "",
        ArgsDef::of::<TestCommandArgs>().unwrap(),
        |a: i32, s: String, _: bool| format!("{s}{a}"),
        vec![println_to(buf.clone())],
    )
    .unwrap();

    let ctx = Context::new();
    disp.dispatch_combined_command_and_args::<&str>(&ctx, &[])
        .unwrap();
    disp.dispatch_combined_command_and_args(&ctx, &["", "7", "n"])
        .unwrap();
    assert_eq!(buf.contents(), "0\nn7\n");
    assert_eq!(
        disp.split_command_and_args(&["", "lookup"]),
        ("", "", &["lookup"][..])
    );

    // without a default command the second word names the command
    let buf = SharedBuffer::new();
    let mut disp = SuperStringArgsDispatcher::new();
    disp.add_super_command(cmdbind::DEFAULT)
        .unwrap()
        .add_command(
            "lookup",
            "",
            ArgsDef::none(),
            not_found,
            vec![println_to(buf.clone())],
        )
        .unwrap();
    disp.dispatch_combined_command_and_args(&ctx, &["", "lookup"])
        .unwrap();
    assert!(buf.contents().contains("\"ResultCode\": 404"));
}

#[test]
fn test_usage_lists_argument_descriptions() {
    #[derive(Args, Default)]
    struct GetArgs {
        #[arg(name = "id", description = "Record id")]
        id: u64,
    }

    let buf = SharedBuffer::new();
    let mut table = commands(&buf);
    table
        .add_command(
            "get",
            "",
            ArgsDef::of::<GetArgs>().unwrap(),
            |id: u64| id,
            vec![],
        )
        .unwrap();

    let mut usage = Vec::new();
    table.print_commands_usage_intro("records", &mut usage).unwrap();
    assert_eq!(
        String::from_utf8(usage).unwrap(),
        "Commands:\n\
         \x20 records get <id:u64>\n\
         \x20         <id:u64> Record id\n\
         \n\
         \x20 records lookup\n\
         \x20     Looks up a record\n\
         \n\
         Flags:\n"
    );
}
