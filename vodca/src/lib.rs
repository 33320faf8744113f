//! Local stand-in for the `vodca` proc-macro crate.
//!
//! The upstream crate is published only as a git dependency
//! (`github.com/turtton/vodca`) which is unreachable in the offline build
//! environment. This reconstruction provides exactly the derive macros the
//! workspace relies on, generating the same code the call sites expect:
//!
//! * `Fromln`   — `impl From<Newtype> for Inner` for a single-field tuple struct.
//! * `AsRefln`  — `impl AsRef<Inner> for Newtype` returning `&self.0`.
//! * `References` — a `&self -> &FieldType` getter per named field.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

/// Derive `From<Inner>` for a single-field tuple struct `Newtype(Inner)`.
#[proc_macro_derive(Fromln)]
pub fn derive_fromln(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let inner = match single_tuple_field(&input.data) {
        Some(ty) => ty,
        None => {
            return syn::Error::new_spanned(name, "Fromln requires a single-field tuple struct")
                .to_compile_error()
                .into()
        }
    };

    quote! {
        impl #impl_generics ::core::convert::From<#name #ty_generics> for #inner #where_clause {
            fn from(value: #name #ty_generics) -> Self {
                value.0
            }
        }
    }
    .into()
}

/// Derive `AsRef<Inner>` for a single-field tuple struct `Newtype(Inner)`.
#[proc_macro_derive(AsRefln)]
pub fn derive_asrefln(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let inner = match single_tuple_field(&input.data) {
        Some(ty) => ty,
        None => {
            return syn::Error::new_spanned(name, "AsRefln requires a single-field tuple struct")
                .to_compile_error()
                .into()
        }
    };

    quote! {
        impl #impl_generics ::core::convert::AsRef<#inner> for #name #ty_generics #where_clause {
            fn as_ref(&self) -> &#inner {
                &self.0
            }
        }
    }
    .into()
}

/// Derive a `&self -> &FieldType` getter for every named field of a struct.
#[proc_macro_derive(References)]
pub fn derive_references(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(name, "References requires named fields")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(name, "References can only be derived for structs")
                .to_compile_error()
                .into()
        }
    };

    let getters = named.iter().map(|field| {
        let ident = field.ident.as_ref().expect("named field");
        let ty = &field.ty;
        quote! {
            pub fn #ident(&self) -> &#ty {
                &self.#ident
            }
        }
    });

    quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            #(#getters)*
        }
    }
    .into()
}

/// Extract the inner type of a single-field tuple struct, if that is the shape.
fn single_tuple_field(data: &Data) -> Option<&syn::Type> {
    match data {
        Data::Struct(data) => match &data.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                Some(&fields.unnamed.first().unwrap().ty)
            }
            _ => None,
        },
        _ => None,
    }
}
