use proc_macro2::TokenStream;
use quote::{ToTokens, TokenStreamExt, quote};
use syn::{
    Error, Field, GenericArgument, Ident, LitStr, PathArguments, Result, Type, parse::ParseBuffer,
    spanned::Spanned,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrimaryKeyType {
    PrimaryKey,
    PartOfPrimaryKey,
    #[default]
    None,
}

impl ToTokens for PrimaryKeyType {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        use PrimaryKeyType::*;
        tokens.append_all(match self {
            PrimaryKey => quote!(::sluice::PrimaryKeyType::PrimaryKey),
            PartOfPrimaryKey => quote!(::sluice::PrimaryKeyType::PartOfPrimaryKey),
            None => quote!(::sluice::PrimaryKeyType::None),
        });
    }
}

pub(crate) struct ColumnMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    pub(crate) name: String,
    pub(crate) nullable: bool,
    pub(crate) default: Option<String>,
    pub(crate) primary_key: PrimaryKeyType,
    pub(crate) skip: bool,
}

/// `Option<..>`, written with any path prefix.
fn is_option(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    let Some(last) = path.path.segments.last() else {
        return false;
    };
    last.ident == "Option"
        && matches!(
            &last.arguments,
            PathArguments::AngleBracketed(args)
                if args.args.len() == 1 && matches!(args.args[0], GenericArgument::Type(..))
        )
}

pub(crate) fn decode_column(field: &Field) -> Result<ColumnMetadata> {
    let Some(ident) = field.ident.clone() else {
        return Err(Error::new(
            field.span(),
            "Entity can only be derived on structs with named fields",
        ));
    };
    let mut metadata = ColumnMetadata {
        name: ident.to_string(),
        ident,
        ty: field.ty.clone(),
        nullable: is_option(&field.ty),
        default: None,
        primary_key: PrimaryKeyType::None,
        skip: false,
    };
    if metadata.name.starts_with('_') {
        metadata.name.remove(0);
    }
    for attr in &field.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("sluice") {
            continue;
        }
        let list = meta.require_list().map_err(|e| {
            Error::new(
                e.span(),
                "Error while parsing `sluice`, use it like: `#[sluice(attribute = value, ..)]`",
            )
        })?;
        list.parse_nested_meta(|arg| {
            if arg.path.is_ident("name") {
                let value = arg.value().and_then(ParseBuffer::parse::<LitStr>).map_err(|e| {
                    Error::new(
                        e.span(),
                        "Error while parsing `name`, use it like: `#[sluice(name = \"my_column\")]`",
                    )
                })?;
                metadata.name = value.value();
            } else if arg.path.is_ident("default") {
                let value = arg.value().and_then(ParseBuffer::parse::<LitStr>).map_err(|e| {
                    Error::new(
                        e.span(),
                        "Error while parsing `default`, use it like: `#[sluice(default = \"now()\")]`",
                    )
                })?;
                metadata.default = Some(value.value());
            } else if arg.path.is_ident("primary_key") {
                if arg.input.peek(syn::Token![=]) {
                    return Err(arg.error(
                        "Error while parsing `primary_key`, use it like: `#[sluice(primary_key)]`",
                    ));
                }
                metadata.primary_key = PrimaryKeyType::PrimaryKey;
                metadata.nullable = false;
            } else if arg.path.is_ident("skip") {
                metadata.skip = true;
            } else {
                return Err(arg.error(format!(
                    "Unknown attribute `{}` inside sluice macro",
                    arg.path.to_token_stream()
                )));
            }
            Ok(())
        })?;
    }
    Ok(metadata)
}
