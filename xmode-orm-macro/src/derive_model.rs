use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, LitStr, Result, ext::IdentExt};

use crate::attributes::{container_options, field_options};

/// Expands the `#[derive(Model)]` macro.
///
/// Fields whose name starts with `_` are left out of every generated method
/// except `from_attributes`, where they are filled with `Default::default()`.
pub fn expand(ast: DeriveInput) -> Result<TokenStream> {
    let struct_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(Error::new_spanned(struct_name, "Model must have named fields")),
        },
        _ => return Err(Error::new_spanned(struct_name, "Model must be a struct")),
    };

    let container = container_options(&ast.attrs)?;

    let mut declarations = Vec::new();
    let mut registrations = Vec::new();
    let mut id_attributes = Vec::new();
    let mut getters = Vec::new();
    let mut setters = Vec::new();
    let mut initializers = Vec::new();

    if let Some(table_name) = &container.stored_in {
        registrations.push(quote! { registrar.stored_in(#table_name); });
    }

    for field in fields {
        let Some(ident) = &field.ident else { continue };
        let ty = &field.ty;
        let attr_name = ident.unraw().to_string();

        if attr_name.starts_with('_') {
            if let Some(attr) = field.attrs.iter().find(|attr| attr.path().is_ident("orm")) {
                return Err(Error::new_spanned(
                    attr,
                    format!("`{attr_name}` starts with `_` and is not persisted, so it takes no #[orm] options"),
                ));
            }
            initializers.push(quote! { #ident: ::core::default::Default::default() });
            continue;
        }

        let options = field_options(&field.attrs)?;
        let column_name = options.column.as_ref().map_or_else(|| attr_name.clone(), LitStr::value);

        let column = options.column.as_ref().map(|column| quote! { .column(#column) });
        declarations.push(quote! {
            xmode_orm::AttributeDeclaration::new(#attr_name, <#ty as xmode_orm::FieldValue>::annotation()) #column
        });

        if options.id {
            id_attributes.push(attr_name.clone());
        }
        if options.unique {
            registrations.push(quote! { registrar.constraint("unique", #column_name, ::core::option::Option::None); });
        }
        if options.index {
            registrations.push(quote! { registrar.constraint("index", #column_name, ::core::option::Option::None); });
        }
        if let Some(value) = &options.default {
            registrations.push(quote! { registrar.default(#attr_name, #value); });
        }
        if let Some(producer) = &options.default_with {
            registrations.push(quote! {
                registrar.default_with(#attr_name, || xmode_orm::FieldValue::to_value(&#producer()));
            });
        }

        getters.push(quote! { #attr_name => ::core::option::Option::Some(xmode_orm::FieldValue::to_value(&self.#ident)) });
        setters.push(quote! { #attr_name => self.#ident = xmode_orm::FieldValue::from_value(value)? });
        initializers.push(quote! { #ident: xmode_orm::model::take_attribute(&mut attributes, #attr_name)? });
    }

    if !id_attributes.is_empty() {
        registrations.push(quote! { registrar.identified_by([#(#id_attributes),*]); });
    }

    for constraint in &container.constraints {
        let kind = &constraint.kind;
        let field_names = &constraint.fields;
        let extras = match &constraint.extras {
            Some(extras) => quote! { ::core::option::Option::Some(#extras) },
            None => quote! { ::core::option::Option::None },
        };
        registrations.push(quote! {
            let field_names: ::std::vec::Vec<&str> = ::std::vec![#(#field_names),*];
            registrar.constraint(#kind, field_names, #extras);
        });
    }

    for saved in &container.save_queries {
        let (name, query, auto_mapping) = (&saved.name, &saved.query, saved.auto_mapping);
        registrations.push(quote! { registrar.save_query(#name, #query, #auto_mapping); });
    }

    let model_name = struct_name.unraw().to_string();

    Ok(quote! {
        impl #impl_generics xmode_orm::Model for #struct_name #ty_generics #where_clause {
            fn model_name() -> &'static str {
                #model_name
            }

            fn declared_attributes() -> ::std::vec::Vec<xmode_orm::AttributeDeclaration> {
                ::std::vec![#(#declarations),*]
            }

            #[allow(unused_variables)]
            fn declare(registrar: &mut xmode_orm::Registrar<'_>) {
                #(#registrations)*
            }

            fn attribute(&self, name: &str) -> ::core::option::Option<xmode_orm::Value> {
                match name {
                    #(#getters,)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unreachable_code, unused_variables)]
            fn set_attribute(&mut self, name: &str, value: xmode_orm::Value) -> xmode_orm::Result<()> {
                match name {
                    #(#setters,)*
                    other => return ::core::result::Result::Err(xmode_orm::model::unknown_attribute::<Self>(other)),
                }
                ::core::result::Result::Ok(())
            }

            #[allow(unused_mut)]
            fn from_attributes(mut attributes: xmode_orm::Attributes) -> xmode_orm::Result<Self> {
                ::core::result::Result::Ok(Self {
                    #(#initializers,)*
                })
            }
        }
    })
}
