mod decode_column;
mod decode_table;

use decode_table::decode_table;
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Implements `sluice::Entity` for a struct with named fields.
///
/// Struct attributes: `#[sluice(name = "table", schema = "schema", primary_key = ("a", "b"))]`.
/// Field attributes: `#[sluice(name = "column", primary_key, default = "now()", skip)]`.
/// Every mapped field type must implement `sluice::AsValue` and `Clone`.
#[proc_macro_derive(Entity, attributes(sluice))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);
    let table = match decode_table(item) {
        Ok(v) => v,
        Err(e) => return e.into_compile_error().into(),
    };
    let name = &table.item.ident;
    if !table.item.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &table.item.generics,
            "Entity cannot be derived on a generic struct",
        )
        .into_compile_error()
        .into();
    }
    let table_name = &table.name;
    let schema_name = &table.schema;
    let column_defs = table.columns.iter().map(|c| {
        let field = c.ident.to_string();
        let column = &c.name;
        let ty = &c.ty;
        let nullable = c.nullable;
        let default = c
            .default
            .as_ref()
            .map_or(quote!(None), |v| quote!(Some(#v)));
        let primary_key = c.primary_key;
        quote! {
            ::sluice::ColumnDef {
                field: #field,
                name: #column,
                value: <#ty as ::sluice::AsValue>::as_empty_value(),
                nullable: #nullable,
                default: #default,
                primary_key: #primary_key,
            }
        }
    });
    let values = table.columns.iter().map(|c| {
        let field = &c.ident;
        quote!(::sluice::AsValue::as_value(::std::clone::Clone::clone(&self.#field)))
    });
    let assignments = table.columns.iter().map(|c| {
        let field = &c.ident;
        let ty = &c.ty;
        let column = &c.name;
        quote! {
            #column => {
                self.#field = <#ty as ::sluice::AsValue>::try_from_value(__v__.clone())
                    .with_context(|| format!("While decoding the column `{}`", #column))?;
            }
        }
    });
    quote! {
        impl ::sluice::Entity for #name {
            fn table_def() -> &'static ::sluice::TableDef {
                static TABLE_DEF: ::std::sync::LazyLock<::sluice::TableDef> =
                    ::std::sync::LazyLock::new(|| ::sluice::TableDef {
                        name: #table_name,
                        schema: #schema_name,
                        columns: vec![#(#column_defs),*].into_boxed_slice(),
                    });
                &TABLE_DEF
            }

            fn values(&self) -> Vec<::sluice::Value> {
                vec![#(#values),*]
            }

            fn hydrate(&mut self, row: &::sluice::RowLabeled) -> ::sluice::Result<()> {
                use ::sluice::Context;
                for (__n__, __v__) in row.iter() {
                    match __n__ {
                        #(#assignments)*
                        _ => {}
                    }
                }
                Ok(())
            }
        }
    }
    .into()
}
