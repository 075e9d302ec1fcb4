use crate::decode_column::{ColumnMetadata, PrimaryKeyType, decode_column};
use convert_case::{Case, Casing};
use syn::{
    Error, Expr, ExprLit, ExprTuple, ItemStruct, Lit, LitStr, Result, parse::ParseBuffer,
    spanned::Spanned,
};

pub(crate) struct TableMetadata {
    pub(crate) item: ItemStruct,
    pub(crate) name: String,
    pub(crate) schema: String,
    pub(crate) columns: Vec<ColumnMetadata>,
}

/// Column names listed in `#[sluice(primary_key = ("a", "b"))]`, or a single `"a"`.
fn decode_key_columns(expr: &Expr) -> Result<Vec<LitStr>> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(v), ..
        }) => Ok(vec![v.clone()]),
        Expr::Tuple(ExprTuple { elems, .. }) => elems
            .iter()
            .map(|v| match v {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(v), ..
                }) => Ok(v.clone()),
                _ => Err(Error::new(
                    v.span(),
                    "Primary key columns must be string literal column names",
                )),
            })
            .collect(),
        _ => Err(Error::new(
            expr.span(),
            "Error while parsing `primary_key`, use it like: `#[sluice(primary_key = (\"k1\", \"k2\", ..))]`",
        )),
    }
}

pub(crate) fn decode_table(item: ItemStruct) -> Result<TableMetadata> {
    let mut columns: Vec<_> = item
        .fields
        .iter()
        .map(decode_column)
        .collect::<Result<_>>()?;
    let mut name = item.ident.to_string().to_case(Case::Snake);
    let mut schema = String::new();
    let mut primary_key = Vec::new();
    if name.starts_with('_') {
        name.remove(0);
    }
    for attr in &item.attrs {
        let meta = &attr.meta;
        if !meta.path().is_ident("sluice") {
            continue;
        }
        let list = meta.require_list()?;
        list.parse_nested_meta(|arg| {
            if arg.path.is_ident("name") {
                name = arg.value().and_then(ParseBuffer::parse::<LitStr>)?.value();
            } else if arg.path.is_ident("schema") {
                schema = arg.value().and_then(ParseBuffer::parse::<LitStr>)?.value();
            } else if arg.path.is_ident("primary_key") {
                if !primary_key.is_empty() {
                    return Err(arg.error("Primary key attribute can appear just once on a table"));
                }
                let expr = arg.value().and_then(ParseBuffer::parse::<Expr>)?;
                primary_key = decode_key_columns(&expr)?;
            } else {
                return Err(arg.error(format!(
                    "Unknown attribute `{}` inside sluice macro",
                    arg.path.get_ident().map(ToString::to_string).unwrap_or_default()
                )));
            }
            Ok(())
        })?;
    }
    let declared_on_fields = columns
        .iter()
        .filter(|c| c.primary_key != PrimaryKeyType::None)
        .count();
    if !primary_key.is_empty() && declared_on_fields > 0 {
        return Err(Error::new(
            item.ident.span(),
            "The primary key is declared both on the table and on its fields",
        ));
    }
    if declared_on_fields > 1 {
        for column in columns.iter_mut().filter(|c| c.primary_key != PrimaryKeyType::None) {
            column.primary_key = PrimaryKeyType::PartOfPrimaryKey;
        }
    }
    for key in &primary_key {
        let Some(column) = columns.iter_mut().find(|c| c.name == key.value()) else {
            return Err(Error::new(
                key.span(),
                format!("Column `{}` does not exist in the table", key.value()),
            ));
        };
        column.nullable = false;
        column.primary_key = if primary_key.len() == 1 {
            PrimaryKeyType::PrimaryKey
        } else {
            PrimaryKeyType::PartOfPrimaryKey
        };
    }
    if let Some(column) = columns
        .iter()
        .find(|c| c.skip && c.primary_key != PrimaryKeyType::None)
    {
        return Err(Error::new(
            column.ident.span(),
            "A primary key column cannot be skipped",
        ));
    }
    columns.retain(|c| !c.skip);
    Ok(TableMetadata {
        item,
        name,
        schema,
        columns,
    })
}
