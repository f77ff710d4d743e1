use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{DeriveInput, LitStr};

use crate::fields::{expand_fields, serialized_fields, to_snake_case};

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields_impl = expand_fields(input)?;
    let table = extract_table(input)?;
    let keys = extract_key_fields(input)?;

    Ok(quote! {
        #fields_impl

        impl #impl_generics ::fluent_projections::Projection for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;
            const KEY: &'static [&'static str] = &[#(#keys),*];
        }
    })
}

/// Reads `#[projection(table = "...")]`, defaulting to snake_case name + "s".
fn extract_table(input: &DeriveInput) -> syn::Result<String> {
    let mut table = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("projection") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                table = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `table = \"...\"`"))
            }
        })?;
    }

    Ok(table.unwrap_or_else(|| format!("{}s", to_snake_case(&input.ident.to_string()))))
}

/// Serialized names of the fields marked `#[projection(key)]`, or of the
/// field named `id`.
fn extract_key_fields(input: &DeriveInput) -> syn::Result<Vec<String>> {
    let fields = serialized_fields(input)?;
    let mut keys = Vec::new();

    for (field, name) in &fields {
        for attr in &field.attrs {
            if !attr.path().is_ident("projection") {
                continue;
            }
            let mut is_key = false;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("key") {
                    is_key = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `key`"))
                }
            })?;
            if is_key {
                keys.push(name.clone());
            }
        }
    }

    if keys.is_empty() {
        let id = fields.iter().find(|(field, _)| {
            field
                .ident
                .as_ref()
                .is_some_and(|ident| ident.unraw() == "id")
        });
        if let Some((_, name)) = id {
            keys.push(name.clone());
        }
    }

    if keys.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Projection derive: no field marked with #[projection(key)] and no field named `id`",
        ));
    }

    Ok(keys)
}
