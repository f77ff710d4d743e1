mod fields;
mod projection;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Message)]
// ============================================================================

/// Derive macro for inbound message types.
///
/// Generates the static field list used to validate mappings when a handler
/// is built.
///
/// ```ignore
/// #[derive(Serialize, Message)]
/// struct ItemPriced {
///     id: i32,
///     price: i64,
/// }
/// ```
#[proc_macro_derive(Message)]
pub fn derive_message(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    let expanded = fields::expand_fields(&input)
        .map(|fields_impl| {
            let name = &input.ident;
            let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
            quote::quote! {
                #fields_impl

                impl #impl_generics ::fluent_projections::Message for #name #ty_generics #where_clause {}
            }
        })
        .unwrap_or_else(syn::Error::into_compile_error);

    TokenStream::from(expanded)
}

// ============================================================================
// #[derive(Projection)]
// ============================================================================

/// Derive macro for projection (read model) types.
///
/// # Attributes
///
/// - `#[projection(table = "...")]` on the struct sets the table name.
///   Defaults to the snake_case struct name plus `s`.
/// - `#[projection(key)]` on a field marks it as part of the identity key.
///   Defaults to the field named `id`.
///
/// ```ignore
/// #[derive(Clone, Default, Serialize, Deserialize, Projection)]
/// #[projection(table = "item_prices")]
/// struct ItemPrice {
///     #[projection(key)]
///     id: i32,
///     price: i64,
/// }
/// ```
#[proc_macro_derive(Projection, attributes(projection))]
pub fn derive_projection(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    let expanded = projection::expand(&input).unwrap_or_else(syn::Error::into_compile_error);

    TokenStream::from(expanded)
}
