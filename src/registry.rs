//! Process-wide SQL type registry.
//!
//! The forward table (tag -> defaults) is total over [`SqlType`]; the
//! reverse table (representation -> tag) only keeps one canonical tag per
//! representation.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::{Repr, SqlType};

/// Defaults attached to a canonical SQL type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    pub repr: Repr,
    pub signed: bool,
    /// Default precision, 0 when not applicable.
    pub precision: i32,
    /// Default scale, 0 when not applicable.
    pub scale: i32,
}

impl TypeInfo {
    const fn new(repr: Repr, signed: bool, precision: i32, scale: i32) -> Self {
        Self {
            repr,
            signed,
            precision,
            scale,
        }
    }
}

/// Tags left out of the reverse table because their representation is
/// already claimed by a canonical tag.
const EXCLUDED_FROM_REVERSE: [SqlType; 16] = [
    SqlType::Bit,
    SqlType::Real,
    SqlType::Decimal,
    SqlType::VarBinary,
    SqlType::LongVarBinary,
    SqlType::LongVarChar,
    SqlType::LongNVarChar,
    SqlType::NChar,
    SqlType::NVarChar,
    SqlType::SqlXml,
    SqlType::Clob,
    SqlType::NClob,
    SqlType::JavaObject,
    SqlType::RefCursor,
    SqlType::TimeWithTimezone,
    SqlType::TimestampWithTimezone,
];

/// Immutable registry of SQL type defaults.
#[derive(Debug)]
pub struct TypeRegistry {
    reverse: HashMap<Repr, SqlType>,
}

impl TypeRegistry {
    /// Returns the registry, building it on first use.
    pub fn global() -> &'static TypeRegistry {
        static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
        REGISTRY.get_or_init(TypeRegistry::build)
    }

    fn build() -> Self {
        let reverse = SqlType::ALL
            .into_iter()
            .filter(|tag| !EXCLUDED_FROM_REVERSE.contains(tag))
            .map(|tag| (describe(tag).repr, tag))
            .collect::<HashMap<_, _>>();

        debug_assert_eq!(
            reverse.len(),
            SqlType::ALL.len() - EXCLUDED_FROM_REVERSE.len(),
            "every representation in the reverse table has a single tag"
        );

        Self { reverse }
    }

    pub fn info(&self, tag: SqlType) -> TypeInfo {
        describe(tag)
    }

    pub fn representation_of(&self, tag: SqlType) -> Repr {
        describe(tag).repr
    }

    /// Canonical tag for a representation, `None` when unmapped.
    pub fn tag_of(&self, repr: Repr) -> Option<SqlType> {
        self.reverse.get(&repr).copied()
    }

    pub fn is_signed(&self, tag: SqlType) -> bool {
        describe(tag).signed
    }

    pub fn default_precision(&self, tag: SqlType) -> i32 {
        describe(tag).precision
    }

    pub fn default_scale(&self, tag: SqlType) -> i32 {
        describe(tag).scale
    }

    /// Tags whose representation does not resolve back to them.
    pub fn excluded_from_reverse(&self) -> &'static [SqlType] {
        &EXCLUDED_FROM_REVERSE
    }
}

const fn describe(tag: SqlType) -> TypeInfo {
    match tag {
        SqlType::Array => TypeInfo::new(Repr::Array, false, 0, 0),
        SqlType::BigInt => TypeInfo::new(Repr::Long, true, 64, 0),
        SqlType::Binary => TypeInfo::new(Repr::Bytes, false, 0, 0),
        SqlType::Bit => TypeInfo::new(Repr::Bool, false, 1, 0),
        SqlType::Blob => TypeInfo::new(Repr::Blob, false, 0, 0),
        SqlType::Boolean => TypeInfo::new(Repr::Bool, false, 1, 0),
        SqlType::Char => TypeInfo::new(Repr::Char, false, 16, 0),
        SqlType::Clob => TypeInfo::new(Repr::Blob, false, 0, 0),
        SqlType::DataLink => TypeInfo::new(Repr::DataLink, false, 0, 0),
        SqlType::Date => TypeInfo::new(Repr::Date, false, 0, 0),
        SqlType::Decimal => TypeInfo::new(Repr::Decimal, true, 0, 2),
        SqlType::Distinct => TypeInfo::new(Repr::Distinct, false, 0, 0),
        SqlType::Double => TypeInfo::new(Repr::Double, true, 64, 2),
        SqlType::Float => TypeInfo::new(Repr::Float, true, 32, 2),
        SqlType::Integer => TypeInfo::new(Repr::Int, true, 32, 0),
        SqlType::JavaObject => TypeInfo::new(Repr::Object, false, 0, 0),
        SqlType::LongNVarChar => TypeInfo::new(Repr::Text, false, 0, 0),
        SqlType::LongVarBinary => TypeInfo::new(Repr::Bytes, false, 0, 0),
        SqlType::LongVarChar => TypeInfo::new(Repr::Text, false, 0, 0),
        SqlType::NChar => TypeInfo::new(Repr::Text, false, 0, 0),
        SqlType::NClob => TypeInfo::new(Repr::Blob, false, 0, 0),
        SqlType::Null => TypeInfo::new(Repr::Null, false, 0, 0),
        SqlType::Numeric => TypeInfo::new(Repr::Decimal, true, 0, 2),
        SqlType::NVarChar => TypeInfo::new(Repr::Text, false, 0, 0),
        SqlType::Other => TypeInfo::new(Repr::Object, false, 0, 0),
        SqlType::Real => TypeInfo::new(Repr::Float, true, 32, 2),
        SqlType::Ref => TypeInfo::new(Repr::Ref, false, 0, 0),
        SqlType::RefCursor => TypeInfo::new(Repr::Ref, false, 0, 0),
        SqlType::RowId => TypeInfo::new(Repr::RowId, false, 0, 0),
        SqlType::SmallInt => TypeInfo::new(Repr::Short, true, 16, 0),
        SqlType::Struct => TypeInfo::new(Repr::Struct, false, 0, 0),
        SqlType::SqlXml => TypeInfo::new(Repr::Text, false, 0, 0),
        SqlType::TinyInt => TypeInfo::new(Repr::Byte, true, 8, 0),
        SqlType::Time => TypeInfo::new(Repr::Time, false, 0, 0),
        SqlType::TimeWithTimezone => TypeInfo::new(Repr::Timestamp, false, 0, 0),
        SqlType::Timestamp => TypeInfo::new(Repr::Timestamp, false, 0, 0),
        SqlType::TimestampWithTimezone => TypeInfo::new(Repr::Timestamp, false, 0, 0),
        SqlType::VarChar => TypeInfo::new(Repr::Text, false, 0, 0),
        SqlType::VarBinary => TypeInfo::new(Repr::Bytes, false, 0, 0),
    }
}

#[cfg(test)]
mod tests {
    use crate::{Repr, SqlType, TypeRegistry};

    #[test]
    fn representation_round_trips_through_reverse_table() {
        let registry = TypeRegistry::global();
        for tag in SqlType::ALL {
            let repr = registry.representation_of(tag);
            let back = registry
                .tag_of(repr)
                .expect("every forward representation has a canonical tag");
            assert_eq!(registry.representation_of(back), repr, "{tag}");
        }
    }

    #[test]
    fn excluded_tags_resolve_to_their_canonical_sibling() {
        let registry = TypeRegistry::global();
        for tag in registry.excluded_from_reverse() {
            let canonical = registry
                .tag_of(registry.representation_of(*tag))
                .expect("must resolve");
            assert_ne!(canonical, *tag);
        }
        assert_eq!(registry.tag_of(Repr::Text), Some(SqlType::VarChar));
        assert_eq!(registry.tag_of(Repr::Decimal), Some(SqlType::Numeric));
        assert_eq!(registry.tag_of(Repr::Timestamp), Some(SqlType::Timestamp));
        assert_eq!(registry.tag_of(Repr::Bool), Some(SqlType::Boolean));
    }

    #[test]
    fn unmapped_representation_is_absent() {
        assert_eq!(TypeRegistry::global().tag_of(Repr::BinaryStream), None);
    }

    #[test]
    fn numeric_defaults() {
        let registry = TypeRegistry::global();
        assert_eq!(registry.default_precision(SqlType::Integer), 32);
        assert_eq!(registry.default_precision(SqlType::TinyInt), 8);
        assert_eq!(registry.default_scale(SqlType::Numeric), 2);
        assert_eq!(registry.default_scale(SqlType::Integer), 0);
        assert!(registry.is_signed(SqlType::Double));
        assert!(!registry.is_signed(SqlType::VarChar));
    }
}
