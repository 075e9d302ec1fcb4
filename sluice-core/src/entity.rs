use crate::{Result, RowLabeled, Value};

/// How (or if) a column participates in the primary key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyType {
    /// Single-column primary key.
    PrimaryKey,
    /// Member of a composite primary key.
    PartOfPrimaryKey,
    /// Not part of the primary key.
    #[default]
    None,
}

/// Static description of a mapped column.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Rust field name.
    pub field: &'static str,
    /// Column name.
    pub name: &'static str,
    /// Empty `Value` describing the column type.
    pub value: Value,
    pub nullable: bool,
    /// Default expression the backend applies when the column is omitted.
    pub default: Option<&'static str>,
    pub primary_key: PrimaryKeyType,
}

impl ColumnDef {
    pub fn is_primary_key(&self) -> bool {
        self.primary_key != PrimaryKeyType::None
    }
}

/// Static description of a mapped table, built once per entity type.
#[derive(Debug, Clone)]
pub struct TableDef {
    pub name: &'static str,
    /// May be empty.
    pub schema: &'static str,
    /// In field declaration order.
    pub columns: Box<[ColumnDef]>,
}

impl TableDef {
    /// `schema.name`, or just `name`.
    pub fn full_name(&self) -> String {
        let mut result = String::new();
        if !self.schema.is_empty() {
            result.push_str(self.schema);
            result.push('.');
        }
        result.push_str(self.name);
        result
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key columns with their position.
    pub fn primary_key(&self) -> impl Iterator<Item = (usize, &ColumnDef)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_primary_key())
    }
}

/// A Rust type mapped to a table row, usually through `#[derive(Entity)]`.
pub trait Entity {
    fn table_def() -> &'static TableDef;

    /// Current field values, one per column of [`Entity::table_def`] in the same order.
    fn values(&self) -> Vec<Value>;

    /// Overwrite the fields whose column appears in `row`, the others are left untouched.
    fn hydrate(&mut self, row: &RowLabeled) -> Result<()>;
}
