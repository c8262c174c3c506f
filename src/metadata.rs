use crate::{Nullability, Repr, SqlType, StubDbError, TypeRegistry};

/// Column descriptor: representation type, label and nullability.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Column {
    pub repr: Repr,
    pub label: String,
    pub nullable: Option<bool>,
}

impl Column {
    pub fn new(repr: Repr, label: impl Into<String>) -> Self {
        Self {
            repr,
            label: label.into(),
            nullable: None,
        }
    }

    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            nullable: Some(nullable),
            ..self
        }
    }
}

/// Column metadata of a [`RowList`](crate::RowList).
///
/// Columns are addressed with 1-based indexes. SQL type, precision, scale
/// and sign are derived from each column's representation through the
/// [`TypeRegistry`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RowListMetaData {
    reprs: Vec<Repr>,
    labels: Vec<String>,
    nullables: Vec<Option<bool>>,
}

impl RowListMetaData {
    pub fn new(columns: impl IntoIterator<Item = Column>) -> Self {
        let mut meta = Self::default();
        for column in columns {
            meta.reprs.push(column.repr);
            meta.labels.push(column.label);
            meta.nullables.push(column.nullable);
        }
        meta
    }

    /// Builds metadata from parallel sequences, which must have equal length.
    pub fn from_parts(
        reprs: Vec<Repr>,
        labels: Vec<String>,
        nullables: Vec<Option<bool>>,
    ) -> Result<Self, StubDbError> {
        if reprs.len() != labels.len() || reprs.len() != nullables.len() {
            return Err(StubDbError::Configuration(format!(
                "column sequences differ in length: {} types, {} labels, {} nullables",
                reprs.len(),
                labels.len(),
                nullables.len()
            )));
        }
        Ok(Self {
            reprs,
            labels,
            nullables,
        })
    }

    /// Columns labelled after their 1-based ordinal.
    pub fn of_reprs(reprs: impl IntoIterator<Item = Repr>) -> Self {
        Self::new(
            reprs
                .into_iter()
                .enumerate()
                .map(|(index, repr)| Column::new(repr, (index + 1).to_string())),
        )
    }

    pub fn column_count(&self) -> usize {
        self.reprs.len()
    }

    pub fn reprs(&self) -> &[Repr] {
        &self.reprs
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn nullables(&self) -> &[Option<bool>] {
        &self.nullables
    }

    pub fn column(&self, column: usize) -> Result<Column, StubDbError> {
        let index = self.index(column)?;
        Ok(Column {
            repr: self.reprs[index],
            label: self.labels[index].clone(),
            nullable: self.nullables[index],
        })
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.reprs
            .iter()
            .zip(&self.labels)
            .zip(&self.nullables)
            .map(|((repr, label), nullable)| Column {
                repr: *repr,
                label: label.clone(),
                nullable: *nullable,
            })
    }

    /// 1-based index of the column labelled exactly `label`.
    pub fn find_column(&self, label: &str) -> Result<usize, StubDbError> {
        self.labels
            .iter()
            .position(|candidate| candidate == label)
            .map(|index| index + 1)
            .ok_or_else(|| StubDbError::UnknownColumn {
                label: label.to_owned(),
                known: self.labels.clone(),
            })
    }

    pub fn catalog_name(&self, column: usize) -> Result<&'static str, StubDbError> {
        self.index(column).map(|_| "")
    }

    pub fn schema_name(&self, column: usize) -> Result<&'static str, StubDbError> {
        self.index(column).map(|_| "")
    }

    pub fn table_name(&self, column: usize) -> Result<&'static str, StubDbError> {
        self.index(column).map(|_| "")
    }

    pub fn display_size(&self, column: usize) -> Result<i32, StubDbError> {
        self.index(column).map(|_| i32::MAX)
    }

    pub fn column_repr(&self, column: usize) -> Result<Repr, StubDbError> {
        Ok(self.reprs[self.index(column)?])
    }

    pub fn column_repr_name(&self, column: usize) -> Result<&'static str, StubDbError> {
        Ok(self.column_repr(column)?.name())
    }

    pub fn column_label(&self, column: usize) -> Result<&str, StubDbError> {
        Ok(&self.labels[self.index(column)?])
    }

    pub fn column_name(&self, column: usize) -> Result<&str, StubDbError> {
        self.column_label(column)
    }

    /// SQL type derived from the column representation, `None` if unmapped.
    pub fn column_type(&self, column: usize) -> Result<Option<SqlType>, StubDbError> {
        Ok(TypeRegistry::global().tag_of(self.column_repr(column)?))
    }

    /// Vendor type number, `-1` for an unknown type.
    pub fn column_type_code(&self, column: usize) -> Result<i32, StubDbError> {
        Ok(self.column_type(column)?.map_or(-1, SqlType::code))
    }

    pub fn column_type_name(&self, column: usize) -> Result<&'static str, StubDbError> {
        Ok(self.column_type(column)?.map_or("UNKNOWN", SqlType::name))
    }

    pub fn precision(&self, column: usize) -> Result<i32, StubDbError> {
        let registry = TypeRegistry::global();
        Ok(self
            .column_type(column)?
            .map_or(0, |tag| registry.default_precision(tag)))
    }

    pub fn scale(&self, column: usize) -> Result<i32, StubDbError> {
        let registry = TypeRegistry::global();
        Ok(self
            .column_type(column)?
            .map_or(0, |tag| registry.default_scale(tag)))
    }

    pub fn is_signed(&self, column: usize) -> Result<bool, StubDbError> {
        let registry = TypeRegistry::global();
        Ok(self
            .column_type(column)?
            .is_some_and(|tag| registry.is_signed(tag)))
    }

    pub fn nullability(&self, column: usize) -> Result<Nullability, StubDbError> {
        Ok(Nullability::from_flag(self.nullables[self.index(column)?]))
    }

    pub fn is_currency(&self, column: usize) -> Result<bool, StubDbError> {
        self.index(column).map(|_| false)
    }

    pub fn is_searchable(&self, column: usize) -> Result<bool, StubDbError> {
        self.index(column).map(|_| true)
    }

    pub fn is_case_sensitive(&self, column: usize) -> Result<bool, StubDbError> {
        self.index(column).map(|_| true)
    }

    pub fn is_auto_increment(&self, column: usize) -> Result<bool, StubDbError> {
        self.index(column).map(|_| false)
    }

    pub fn is_read_only(&self, column: usize) -> Result<bool, StubDbError> {
        self.index(column).map(|_| true)
    }

    pub fn is_writable(&self, column: usize) -> Result<bool, StubDbError> {
        self.index(column).map(|_| false)
    }

    pub fn is_definitely_writable(&self, column: usize) -> Result<bool, StubDbError> {
        self.index(column).map(|_| false)
    }

    pub(crate) fn with_label(&self, column: usize, label: String) -> Result<Self, StubDbError> {
        let index = self.index(column)?;
        let mut meta = self.clone();
        meta.labels[index] = label;
        Ok(meta)
    }

    pub(crate) fn with_nullable(&self, column: usize, nullable: bool) -> Result<Self, StubDbError> {
        let index = self.index(column)?;
        let mut meta = self.clone();
        meta.nullables[index] = Some(nullable);
        Ok(meta)
    }

    /// Restricts the metadata to `columns` (1-based), in the given order.
    pub(crate) fn project(&self, columns: &[usize]) -> Result<Self, StubDbError> {
        let mut meta = Self::default();
        for column in columns {
            let index = self.index(*column)?;
            meta.reprs.push(self.reprs[index]);
            meta.labels.push(self.labels[index].clone());
            meta.nullables.push(self.nullables[index]);
        }
        Ok(meta)
    }

    pub(crate) fn index(&self, column: usize) -> Result<usize, StubDbError> {
        if column == 0 || column > self.reprs.len() {
            return Err(StubDbError::InvalidColumnIndex {
                index: column,
                count: self.reprs.len(),
            });
        }
        Ok(column - 1)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Column, Nullability, Repr, RowListMetaData, SqlType, StubDbError};

    fn sample() -> RowListMetaData {
        RowListMetaData::new([
            Column::new(Repr::Float, "ratio").nullable(false),
            Column::new(Repr::Text, "title"),
            Column::new(Repr::Time, "at").nullable(true),
        ])
    }

    #[test]
    fn constant_properties() {
        let meta = sample();
        assert_eq!(meta.column_count(), 3);
        assert_eq!(meta.catalog_name(1).expect("must read"), "");
        assert_eq!(meta.schema_name(1).expect("must read"), "");
        assert_eq!(meta.table_name(1).expect("must read"), "");
        assert_eq!(meta.display_size(1).expect("must read"), i32::MAX);
        assert!(meta.is_searchable(1).expect("must read"));
        assert!(meta.is_case_sensitive(1).expect("must read"));
        assert!(meta.is_read_only(1).expect("must read"));
        assert!(!meta.is_auto_increment(1).expect("must read"));
        assert!(!meta.is_writable(1).expect("must read"));
        assert!(!meta.is_definitely_writable(1).expect("must read"));
        assert!(!meta.is_currency(1).expect("must read"));
    }

    #[test]
    fn derived_type_properties() {
        let meta = sample();
        assert_eq!(meta.column_type(1).expect("must read"), Some(SqlType::Float));
        assert_eq!(meta.column_type_name(2).expect("must read"), "VARCHAR");
        assert_eq!(meta.column_type_code(3).expect("must read"), 92);
        assert_eq!(meta.precision(1).expect("must read"), 32);
        assert_eq!(meta.precision(2).expect("must read"), 0);
        assert_eq!(meta.scale(1).expect("must read"), 2);
        assert_eq!(meta.scale(3).expect("must read"), 0);
        assert!(meta.is_signed(1).expect("must read"));
        assert!(!meta.is_signed(2).expect("must read"));
        assert_eq!(meta.column_repr_name(2).expect("must read"), "String");
    }

    #[test]
    fn nullability_follows_flag() {
        let meta = sample();
        assert_eq!(meta.nullability(1).expect("must read"), Nullability::NoNulls);
        assert_eq!(meta.nullability(2).expect("must read"), Nullability::Unknown);
        assert_eq!(meta.nullability(3).expect("must read"), Nullability::Nullable);
    }

    #[test]
    fn unmapped_representation_is_unknown_type() {
        let meta = RowListMetaData::of_reprs([Repr::BinaryStream]);
        assert_eq!(meta.column_type(1).expect("must read"), None);
        assert_eq!(meta.column_type_code(1).expect("must read"), -1);
        assert_eq!(meta.column_type_name(1).expect("must read"), "UNKNOWN");
        assert_eq!(meta.precision(1).expect("must read"), 0);
        assert!(!meta.is_signed(1).expect("must read"));
    }

    #[test]
    fn ordinal_labels_and_lookup() {
        let meta = RowListMetaData::of_reprs([Repr::Int, Repr::Text]);
        assert_eq!(meta.labels(), ["1", "2"]);
        assert_eq!(meta.find_column("2").expect("must find"), 2);

        let err = sample().find_column("Title").expect_err("must fail");
        match err {
            StubDbError::UnknownColumn { label, known } => {
                assert_eq!(label, "Title");
                assert_eq!(known, vec!["ratio", "title", "at"]);
            }
            other => panic!("expected unknown column, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_sequences_are_rejected() {
        let err = RowListMetaData::from_parts(vec![Repr::Int], vec![], vec![None])
            .expect_err("must fail");
        assert!(matches!(err, StubDbError::Configuration(_)));
        assert!(matches!(
            sample().column_label(4),
            Err(StubDbError::InvalidColumnIndex { index: 4, count: 3 })
        ));
    }
}
