//! Static record type descriptors.

/// Storage affinity of one declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// Stored as `0`/`1`, exposed as JSON booleans.
    Boolean,
    /// Stored as JSON text, exposed as the decoded value.
    Json,
}

/// One declared, non-key column of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty }
    }
}

/// Record type descriptor.
///
/// `name` is the canonical type name used as registry key; two descriptors
/// with the same name are the same kind.
#[derive(Debug, PartialEq, Eq)]
pub struct ModelKind {
    pub name: &'static str,
    pub table: &'static str,
    /// Integer primary key column.
    pub primary_key: &'static str,
    pub columns: &'static [Column],
}

impl ModelKind {
    /// Declares a kind keyed by an integer `id` column.
    pub const fn new(name: &'static str, table: &'static str, columns: &'static [Column]) -> Self {
        Self {
            name,
            table,
            primary_key: "id",
            columns,
        }
    }

    pub const fn with_primary_key(self, primary_key: &'static str) -> Self {
        Self {
            primary_key,
            ..self
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Whether `name` is the key or a declared column.
    pub fn is_assignable(&self, name: &str) -> bool {
        name == self.primary_key || self.column(name).is_some()
    }

    /// Primary key followed by declared columns, in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.primary_key).chain(self.columns.iter().map(|column| column.name))
    }

    pub fn same_kind(&self, other: &ModelKind) -> bool {
        self.name == other.name
    }
}
