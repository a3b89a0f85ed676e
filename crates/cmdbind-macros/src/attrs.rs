//! Attribute parsing for the Args derive macro.
//!
//! Field attributes: `#[arg]`, `#[arg(name = "...", description = "...")]`,
//! `#[arg(tag(key = "..."))]`, `#[arg(flatten)]` and `#[arg(skip)]`.
//! Container attribute: `#[args(all)]`.

use proc_macro2::Span;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Expr, ExprLit, Lit, Meta, MetaNameValue, Result, Token,
};

/// Field-level attributes from `#[arg(...)]`.
#[derive(Debug, Clone)]
pub struct ArgAttr {
    /// The field carries an `#[arg]` attribute at all.
    pub tagged: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Free-form `key = "value"` pairs from `tag(...)`.
    pub tags: Vec<(String, String)>,
    /// Embedded arguments struct whose fields are spliced in.
    pub flatten: bool,
    /// Excluded even from `#[args(all)]` structs.
    pub skip: bool,
    pub span: Span,
}

impl Default for ArgAttr {
    fn default() -> Self {
        ArgAttr {
            tagged: false,
            name: None,
            description: None,
            tags: Vec::new(),
            flatten: false,
            skip: false,
            span: Span::call_site(),
        }
    }
}

fn string_value(nv: &MetaNameValue, key: &str) -> Result<String> {
    match &nv.value {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        other => Err(Error::new(
            other.span(),
            format!("{key} must be a string literal"),
        )),
    }
}

impl Parse for ArgAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = ArgAttr {
            tagged: true,
            span: input.span(),
            ..ArgAttr::default()
        };

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                Meta::Path(p) if p.is_ident("flatten") => attr.flatten = true,
                Meta::Path(p) if p.is_ident("skip") => attr.skip = true,
                Meta::NameValue(nv) if nv.path.is_ident("name") => {
                    attr.name = Some(string_value(nv, "name")?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("description") => {
                    attr.description = Some(string_value(nv, "description")?);
                }
                Meta::List(list) if list.path.is_ident("tag") => {
                    let pairs = list.parse_args_with(
                        Punctuated::<MetaNameValue, Token![,]>::parse_terminated,
                    )?;
                    for nv in &pairs {
                        let key = nv
                            .path
                            .get_ident()
                            .ok_or_else(|| Error::new(nv.path.span(), "tag keys must be identifiers"))?
                            .to_string();
                        if attr.tags.iter().any(|(k, _)| *k == key) {
                            return Err(Error::new(nv.path.span(), format!("duplicate tag {key}")));
                        }
                        let value = string_value(nv, &key)?;
                        attr.tags.push((key, value));
                    }
                }
                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown arg attribute. Expected: name = \"...\", description = \"...\", flatten or skip",
                    ));
                }
            }
        }

        if attr.flatten
            && (attr.name.is_some() || attr.description.is_some() || !attr.tags.is_empty())
        {
            return Err(Error::new(
                attr.span,
                "flattened fields take their names from the embedded struct",
            ));
        }

        Ok(attr)
    }
}

/// Extract `#[arg]` or `#[arg(...)]` from a field's attributes.
pub fn parse_arg_attrs(attrs: &[Attribute]) -> Result<ArgAttr> {
    for attr in attrs {
        if !attr.path().is_ident("arg") {
            continue;
        }
        return match &attr.meta {
            Meta::Path(p) => Ok(ArgAttr {
                tagged: true,
                span: p.span(),
                ..ArgAttr::default()
            }),
            Meta::List(_) => attr.parse_args::<ArgAttr>(),
            Meta::NameValue(nv) => Err(Error::new(
                nv.span(),
                "expected #[arg] or #[arg(...)]",
            )),
        };
    }
    Ok(ArgAttr::default())
}

/// Returns true if the container is marked `#[args(all)]`.
pub fn parse_args_all(attrs: &[Attribute]) -> Result<bool> {
    let mut all = false;
    for attr in attrs {
        if !attr.path().is_ident("args") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("all") {
                all = true;
                Ok(())
            } else {
                Err(meta.error("unknown args attribute. Expected: all"))
            }
        })?;
    }
    Ok(all)
}
