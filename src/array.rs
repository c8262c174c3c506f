use std::fmt;

use crate::{Column, Repr, RowList, SqlType, StubDbError, TypeRegistry, Value};

/// Immutable SQL array capsule.
#[derive(Clone, Debug, PartialEq)]
pub struct SqlArray {
    base_repr: Repr,
    base_type: SqlType,
    elements: Vec<Value>,
}

impl SqlArray {
    /// Builds an array whose elements share the `base_repr` representation.
    ///
    /// The base SQL type is resolved through the registry; a representation
    /// without a canonical tag is rejected.
    pub fn new(base_repr: Repr, elements: Vec<Value>) -> Result<Self, StubDbError> {
        let base_type = TypeRegistry::global().tag_of(base_repr).ok_or_else(|| {
            StubDbError::Configuration(format!(
                "unsupported array base representation: {base_repr}"
            ))
        })?;
        Ok(Self {
            base_repr,
            base_type,
            elements,
        })
    }

    pub fn empty(base_repr: Repr) -> Result<Self, StubDbError> {
        Self::new(base_repr, Vec::new())
    }

    pub fn base_type(&self) -> SqlType {
        self.base_type
    }

    pub fn base_type_name(&self) -> &'static str {
        self.base_type.name()
    }

    pub fn base_repr(&self) -> Repr {
        self.base_repr
    }

    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns at most `count` elements from the 0-based `index`.
    pub fn slice(&self, index: usize, count: usize) -> Result<&[Value], StubDbError> {
        if index >= self.elements.len() {
            return Err(StubDbError::OutOfBounds { position: index });
        }
        let end = index.saturating_add(count).min(self.elements.len());
        Ok(&self.elements[index..end])
    }

    /// One-column row list, one row per element.
    pub fn to_row_list(&self) -> RowList {
        self.rows_of(&self.elements)
    }

    pub fn to_row_list_range(&self, index: usize, count: usize) -> Result<RowList, StubDbError> {
        Ok(self.rows_of(self.slice(index, count)?))
    }

    fn rows_of(&self, elements: &[Value]) -> RowList {
        let mut builder = RowList::builder(vec![Column::new(self.base_repr, "1")]);
        for element in elements {
            builder = builder.row(vec![element.clone()]);
        }
        builder.build()
    }
}

impl fmt::Display for SqlArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, element) in self.elements.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element}")?;
        }
        f.write_str("]")
    }
}
