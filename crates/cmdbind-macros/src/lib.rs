//! Derive macro for `cmdbind` arguments structs.
//!
//! Re-exported as `cmdbind::Args`; depend on `cmdbind` rather than on this
//! crate directly.

mod attrs;
mod derive;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `cmdbind::Args` for a struct with named fields.
///
/// Fields become arguments in declaration order. The struct must also
/// implement `Default`, which provides the values of arguments without
/// input.
///
/// # Field Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[arg]` | Argument named after the field |
/// | `name = "..."` | Argument name used in maps, JSON objects and usage |
/// | `description = "..."` | Shown in command usage |
/// | `tag(key = "...", ...)` | Free-form tags, read with `ArgsDef::arg_tag` |
/// | `flatten` | Splice in the arguments of an embedded `Args` struct |
/// | `skip` | Exclude the field, also under `#[args(all)]` |
///
/// # Container Attributes
///
/// `#[args(all)]` makes every `pub` field an argument, tagged or not.
///
/// # Visibility
///
/// A field marked `#[arg]` is an argument whatever its visibility. Generated
/// code lives in the struct's own module, so private fields are reachable
/// and marking one is an explicit opt-in. Only `#[args(all)]` looks at
/// visibility, and it takes `pub` fields alone.
///
/// # Example
///
/// ```ignore
/// use cmdbind::Args;
///
/// #[derive(Args, Default)]
/// struct Paging {
///     #[arg(description = "Page number")]
///     page: u32,
///     #[arg(name = "per_page")]
///     size: u32,
/// }
///
/// #[derive(Args, Default)]
/// struct ListArgs {
///     #[arg]
///     filter: Option<String>,
///     #[arg(flatten)]
///     paging: Paging,
/// }
///
/// // ListArgs has three arguments: filter, page, per_page
/// ```
///
/// # Compile-Time Errors
///
/// Enums, unions, tuple structs and malformed attributes are rejected.
#[proc_macro_derive(Args, attributes(arg, args))]
pub fn derive_args(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive::args_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
