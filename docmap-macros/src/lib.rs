//! Procedural macros for the docmap project.
//!
//! This crate provides `#[derive(Record)]`, which emits a record's static
//! descriptor and its field accessors at compile time.

#[allow(unused_extern_crates)]
extern crate self as docmap_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, spanned::Spanned, Data, DeriveInput, Error, Field, Fields, Ident, LitStr,
    Result, Type,
};

/// Derives `docmap::record::Record` for a struct with named fields.
///
/// Each field lists its tags in one or more `#[tag(...)]` attributes. A tag is
/// a `name = "value"` pair; the bare word `readonly` marks a field the decoder
/// must not assign.
///
/// ```ignore
/// #[derive(Debug, Default, Record)]
/// pub struct User {
///     #[tag(db = "mongoid")]
///     pub id: String,
///     #[tag(db = "email,required,index,unique", json = "email")]
///     pub email: String,
///     #[tag(db = "created_at", readonly)]
///     pub created_at: Option<DateTime<Utc>>,
/// }
/// ```
///
/// Tuple structs, unit structs and enums derive a descriptor without fields;
/// the mapping engine rejects them at runtime. Every field type must implement
/// `docmap::value::FieldValue`.
#[proc_macro_derive(Record, attributes(tag))]
pub fn record_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

struct TaggedField {
    ident: Ident,
    ty: Type,
    tags: Vec<(String, LitStr)>,
    settable: bool,
}

impl TaggedField {
    fn from_field(field: &Field) -> Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new(field.span(), "Record requires named fields"))?;

        let mut tags: Vec<(String, LitStr)> = Vec::new();
        let mut settable = true;

        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("tag")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("readonly") {
                    settable = false;
                    return Ok(());
                }

                let name = meta
                    .path
                    .get_ident()
                    .ok_or_else(|| meta.error("expected a tag name"))?
                    .to_string();

                if tags.iter().any(|(existing, _)| *existing == name) {
                    return Err(meta.error(format!("tag `{}` is declared twice", name)));
                }

                let value: LitStr = meta.value()?.parse()?;
                tags.push((name, value));
                Ok(())
            })?;
        }

        Ok(Self {
            ident,
            ty: field.ty.clone(),
            tags,
            settable,
        })
    }

    fn definition(&self) -> TokenStream2 {
        let name = self.ident.to_string();
        let settable = self.settable;
        let tags = self.tags.iter().map(|(tag, value)| {
            quote! { ::docmap::record::Tag { name: #tag, value: #value } }
        });

        quote! {
            ::docmap::record::FieldDef {
                name: #name,
                tags: &[#(#tags),*],
                settable: #settable,
            }
        }
    }
}

fn expand(input: &DeriveInput) -> Result<TokenStream2> {
    let (kind, fields) = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => (
                quote! { ::docmap::record::RecordKind::Struct },
                named
                    .named
                    .iter()
                    .map(TaggedField::from_field)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Fields::Unnamed(_) => (quote! { ::docmap::record::RecordKind::Tuple }, Vec::new()),
            Fields::Unit => (quote! { ::docmap::record::RecordKind::Unit }, Vec::new()),
        },
        Data::Enum(_) => (quote! { ::docmap::record::RecordKind::Enum }, Vec::new()),
        Data::Union(data) => {
            return Err(Error::new(
                data.union_token.span(),
                "Record cannot be derived for unions",
            ));
        }
    };

    let ident = &input.ident;
    let name = ident.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let definitions = fields.iter().map(TaggedField::definition);
    let indices = (0..fields.len()).collect::<Vec<_>>();
    let idents = fields.iter().map(|field| &field.ident).collect::<Vec<_>>();
    let types = fields.iter().map(|field| &field.ty);

    Ok(quote! {
        impl #impl_generics ::docmap::record::Record for #ident #ty_generics #where_clause {
            fn descriptor() -> &'static ::docmap::record::RecordDescriptor {
                static DESCRIPTOR: ::docmap::record::RecordDescriptor = ::docmap::record::RecordDescriptor {
                    name: #name,
                    kind: #kind,
                    fields: &[#(#definitions),*],
                };

                &DESCRIPTOR
            }

            #[allow(unused_variables)]
            fn field_kind(index: usize) -> ::core::option::Option<::docmap::value::FieldKind> {
                match index {
                    #(#indices => ::core::option::Option::Some(<#types as ::docmap::value::FieldValue>::KIND),)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn field_value(&self, index: usize) -> ::core::option::Option<::docmap::value::Value> {
                match index {
                    #(#indices => ::core::option::Option::Some(::docmap::value::FieldValue::to_value(&self.#idents)),)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                index: usize,
                value: ::docmap::value::Value,
            ) -> ::core::result::Result<(), ::docmap::value::Coercion> {
                match index {
                    #(#indices => self.#idents = ::docmap::value::FieldValue::from_value(value)?,)*
                    _ => {}
                }

                ::core::result::Result::Ok(())
            }
        }
    })
}
