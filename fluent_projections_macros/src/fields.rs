use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{Data, DeriveInput, Field, Fields, FieldsNamed, LitStr, Token};

/// Named fields of a struct, or an error pointing at the offending item.
pub fn named_fields(input: &DeriveInput) -> syn::Result<&FieldsNamed> {
    match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => Ok(fields),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "only structs with named fields can be mapped",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            "only structs with named fields can be mapped",
        )),
    }
}

/// Every named field paired with the key serde writes it under.
///
/// Honors `#[serde(rename = "...")]` on fields and `#[serde(rename_all = "...")]`
/// on the struct. Attributes that drop or reshape keys are rejected.
pub fn serialized_fields(input: &DeriveInput) -> syn::Result<Vec<(&Field, String)>> {
    let rename_all = container_rename_all(input)?;

    let mut fields = Vec::new();
    for field in &named_fields(input)?.named {
        let Some(ident) = &field.ident else {
            continue;
        };
        let rust_name = ident.unraw().to_string();
        let name = match field_rename(field)? {
            Some(name) => name,
            None => match &rename_all {
                Some(rule) => rule.apply(&rust_name),
                None => rust_name,
            },
        };
        fields.push((field, name));
    }
    Ok(fields)
}

/// `impl Fields` listing every named field with its type.
pub fn expand_fields(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let entries = serialized_fields(input)?
        .into_iter()
        .map(|(field, field_name)| {
            let ty = &field.ty;
            quote! {
                ::fluent_projections::Field::of::<#ty>(#field_name)
            }
        });

    Ok(quote! {
        impl #impl_generics ::fluent_projections::Fields for #name #ty_generics #where_clause {
            const FIELDS: &'static [::fluent_projections::Field] = &[
                #(#entries),*
            ];
        }
    })
}

/// serde's `rename_all` casing rules.
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(rule: &LitStr) -> syn::Result<Self> {
        match rule.value().as_str() {
            "lowercase" => Ok(RenameRule::Lower),
            "UPPERCASE" => Ok(RenameRule::Upper),
            "PascalCase" => Ok(RenameRule::Pascal),
            "camelCase" => Ok(RenameRule::Camel),
            "snake_case" => Ok(RenameRule::Snake),
            "SCREAMING_SNAKE_CASE" => Ok(RenameRule::ScreamingSnake),
            "kebab-case" => Ok(RenameRule::Kebab),
            "SCREAMING-KEBAB-CASE" => Ok(RenameRule::ScreamingKebab),
            other => Err(syn::Error::new_spanned(
                rule,
                format!("unknown rename_all rule `{}`", other),
            )),
        }
    }

    /// Applies the rule to a snake_case field name.
    fn apply(&self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Pascal => to_pascal_case(field),
            RenameRule::Camel => {
                let pascal = to_pascal_case(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => pascal,
                }
            }
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
        }
    }
}

fn container_rename_all(input: &DeriveInput) -> syn::Result<Option<RenameRule>> {
    let mut rule = None;
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                rule = Some(RenameRule::parse(&plain_name(&meta, "rename_all")?)?);
                Ok(())
            } else {
                skip_value(&meta)
            }
        })?;
    }
    Ok(rule)
}

/// serde field attributes that make a field's key conditional or absent.
const UNMAPPABLE: &[&str] = &[
    "flatten",
    "skip",
    "skip_serializing",
    "skip_serializing_if",
    "skip_deserializing",
];

fn field_rename(field: &Field) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                rename = Some(plain_name(&meta, "rename")?.value());
                Ok(())
            } else if UNMAPPABLE.iter().any(|name| meta.path.is_ident(name)) {
                Err(meta.error("mapped fields must always serialize under a fixed key"))
            } else {
                skip_value(&meta)
            }
        })?;
    }
    Ok(rename)
}

/// The `= "..."` form; split serialize/deserialize names are rejected.
fn plain_name(meta: &ParseNestedMeta, attribute: &str) -> syn::Result<LitStr> {
    if !meta.input.peek(Token![=]) {
        return Err(meta.error(format!(
            "only `{} = \"...\"` is supported on mapped types",
            attribute
        )));
    }
    meta.value()?.parse()
}

/// Consumes a serde argument this derive has no use for.
fn skip_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse::<TokenStream>()?;
    }
    Ok(())
}

fn to_pascal_case(s: &str) -> String {
    let mut result = String::new();
    let mut upper_next = true;
    for ch in s.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            result.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}

pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
