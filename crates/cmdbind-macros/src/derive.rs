//! Implementation of the `#[derive(Args)]` macro.
//!
//! Generates `cmdbind::Args` with the ordered field list and the slot
//! lookup by index path.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{spanned::Spanned, Data, DeriveInput, Error, Fields, Result, Visibility};

use crate::attrs::{parse_arg_attrs, parse_args_all};

pub fn args_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(Error::new(
                    input.span(),
                    "Args can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "Args can only be derived for structs",
            ))
        }
    };

    let all = parse_args_all(&input.attrs)?;

    let mut field_entries: Vec<TokenStream> = Vec::new();
    let mut slot_arms: Vec<TokenStream> = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;
        let ty = &field.ty;
        let attr = parse_arg_attrs(&field.attrs)?;

        let included = attr.tagged || (all && matches!(field.vis, Visibility::Public(_)));
        if attr.skip || !included {
            continue;
        }

        if attr.flatten {
            field_entries.push(quote! {
                fields.extend(
                    <#ty as ::cmdbind::Args>::arg_fields()
                        .into_iter()
                        .map(|field| field.prefixed(#index)),
                );
            });
            slot_arms.push(quote! {
                [#index, rest @ ..] => ::cmdbind::Args::arg_slot(&mut self.#ident, rest),
            });
        } else {
            let name = attr.name.unwrap_or_else(|| {
                let name = ident.to_string();
                name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
            });
            let description = attr.description.unwrap_or_default();
            let tags = attr
                .tags
                .iter()
                .map(|(key, value)| quote! { .with_tag(#key, #value) });
            field_entries.push(quote! {
                fields.push(
                    ::cmdbind::ArgField::new::<#ty>(#name, #description, #index)
                        #(#tags)*
                );
            });
            slot_arms.push(quote! {
                [#index] => ::std::option::Option::Some(&mut self.#ident as &mut dyn ::cmdbind::ArgSlot),
            });
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::cmdbind::Args for #struct_name #ty_generics #where_clause {
            #[allow(unused_mut)]
            fn arg_fields() -> ::std::vec::Vec<::cmdbind::ArgField> {
                let mut fields = ::std::vec::Vec::new();
                #(#field_entries)*
                fields
            }

            #[allow(unused_variables)]
            fn arg_slot(
                &mut self,
                path: &[usize],
            ) -> ::std::option::Option<&mut dyn ::cmdbind::ArgSlot> {
                match path {
                    #(#slot_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    })
}
