//! # xmode-orm Procedural Macros
//!
//! This crate provides `#[derive(Model)]` for xmode-orm.
//!
//! The derive reads the struct's named fields and `#[orm(...)]` attributes
//! and implements `xmode_orm::Model`: the declared attributes reported to
//! the analyzer, the registrations applied when the type is first analyzed,
//! and attribute access used by the mapper.
//!
//! ```rust,ignore
//! use xmode_orm::Model;
//! use uuid::Uuid;
//!
//! #[derive(Model)]
//! #[orm(stored_in = "users")]
//! struct User {
//!     #[orm(id, default_with = Uuid::new_v4)]
//!     id: Uuid,
//!     #[orm(unique)]
//!     email: String,
//!     nickname: Option<String>,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attributes;
mod derive_model;

#[proc_macro_derive(Model, attributes(orm))]
pub fn model_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_model::expand(ast).unwrap_or_else(syn::Error::into_compile_error).into()
}
