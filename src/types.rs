//! Type catalog: primitive kinds and their sized composite types.

use std::fmt;

use serde::Serialize;
use strum::IntoEnumIterator;

use crate::context::Context;

/// Primitive data kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::EnumIter, strum::Display,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum DataKind {
    Integer,
    Text,
    Boolean,
    Double,
    Float,
    Decimal,
    Null,
}

impl DataKind {
    pub fn is_numeric(self) -> bool {
        match self {
            DataKind::Integer | DataKind::Double | DataKind::Float | DataKind::Decimal => true,
            DataKind::Text | DataKind::Boolean | DataKind::Null => false,
        }
    }

    /// All kinds except NULL.
    pub fn non_null() -> impl Iterator<Item = DataKind> {
        DataKind::iter().filter(|k| *k != DataKind::Null)
    }

    pub fn random_without_null(ctx: &mut Context) -> DataKind {
        let kinds: Vec<DataKind> = Self::non_null().collect();
        kinds[ctx.gen_range(kinds.len())]
    }
}

/// A kind paired with its storage width.
///
/// The width is only meaningful for integer and floating point kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CompositeType {
    kind: DataKind,
    width: Option<u8>,
}

impl CompositeType {
    /// Build a composite type, rejecting widths the kind does not support.
    pub fn new(kind: DataKind, width: Option<u8>) -> Option<Self> {
        let ty = Self { kind, width };
        if ty.aliases().is_empty() {
            None
        } else {
            Some(ty)
        }
    }

    pub const fn bigint() -> Self {
        Self {
            kind: DataKind::Integer,
            width: Some(8),
        }
    }

    pub const fn int() -> Self {
        Self {
            kind: DataKind::Integer,
            width: Some(4),
        }
    }

    pub const fn text() -> Self {
        Self {
            kind: DataKind::Text,
            width: None,
        }
    }

    pub const fn double() -> Self {
        Self {
            kind: DataKind::Double,
            width: Some(8),
        }
    }

    pub const fn boolean() -> Self {
        Self {
            kind: DataKind::Boolean,
            width: None,
        }
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// Storage width in bytes; `None` for kinds without a width.
    pub fn width(&self) -> Option<u8> {
        self.width
    }

    pub fn random_without_null(ctx: &mut Context) -> Self {
        let kind = DataKind::random_without_null(ctx);
        let width = match kind {
            DataKind::Integer => Some(*ctx.choose(&[1u8, 2, 4, 8]).unwrap_or(&4)),
            DataKind::Float => Some(*ctx.choose(&[4u8, 8]).unwrap_or(&8)),
            DataKind::Double => Some(8),
            DataKind::Text | DataKind::Boolean | DataKind::Decimal | DataKind::Null => None,
        };
        Self { kind, width }
    }

    /// Every spelling the dialect accepts for this type.
    pub fn aliases(&self) -> &'static [&'static str] {
        match (self.kind, self.width) {
            (DataKind::Integer, Some(8)) => &["BIGINT", "INT8"],
            (DataKind::Integer, Some(4)) => &["INTEGER", "INT", "INT4", "SIGNED"],
            (DataKind::Integer, Some(2)) => &["SMALLINT", "INT2"],
            (DataKind::Integer, Some(1)) => &["TINYINT", "INT1"],
            (DataKind::Float, Some(8)) => &["DOUBLE"],
            (DataKind::Float, Some(4)) => &["REAL", "FLOAT4"],
            (DataKind::Double, Some(8)) => &["DOUBLE", "FLOAT8"],
            (DataKind::Decimal, None) => &["DECIMAL", "NUMERIC"],
            (DataKind::Text, None) => &["VARCHAR"],
            (DataKind::Boolean, None) => &["BOOLEAN", "BOOL"],
            (DataKind::Null, None) => &["NULL"],
            _ => &[],
        }
    }

    /// Pick one spelling at random.
    pub fn spell(&self, ctx: &mut Context) -> TypeName {
        let aliases = self.aliases();
        let spelling = aliases[ctx.gen_range(aliases.len())];
        TypeName {
            ty: *self,
            spelling,
        }
    }

    /// Map a declared column type read back from the engine.
    pub fn parse_declared(declared: &str) -> Self {
        let upper = declared.trim().to_uppercase();
        let base = upper
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        let (kind, width) = match base {
            "TINYINT" | "INT1" => (DataKind::Integer, Some(1)),
            "SMALLINT" | "INT2" => (DataKind::Integer, Some(2)),
            "BIGINT" | "INT8" | "HUGEINT" => (DataKind::Integer, Some(8)),
            "INTEGER" | "INT" | "INT4" | "MEDIUMINT" | "SIGNED" => (DataKind::Integer, Some(4)),
            "FLOAT" | "REAL" | "FLOAT4" => (DataKind::Float, Some(4)),
            "DOUBLE" | "FLOAT8" => (DataKind::Double, Some(8)),
            // decimals are read back as doubles
            "DECIMAL" | "NUMERIC" | "DEC" => (DataKind::Double, Some(8)),
            "BOOLEAN" | "BOOL" => (DataKind::Boolean, None),
            "NULL" => (DataKind::Null, None),
            _ => (DataKind::Text, None),
        };
        Self { kind, width }
    }
}

impl fmt::Display for CompositeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.width {
            Some(w) => write!(f, "{}({w})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// A composite type with its spelling already resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeName {
    pub ty: CompositeType,
    pub spelling: &'static str,
}

impl TypeName {
    pub fn bigint() -> Self {
        Self {
            ty: CompositeType::bigint(),
            spelling: "BIGINT",
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric() {
        assert!(DataKind::Integer.is_numeric());
        assert!(DataKind::Decimal.is_numeric());
        assert!(!DataKind::Text.is_numeric());
        assert!(!DataKind::Null.is_numeric());
    }

    #[test]
    fn test_random_without_null_never_null() {
        let mut ctx = Context::new_with_seed(42);
        for _ in 0..500 {
            let ty = CompositeType::random_without_null(&mut ctx);
            assert_ne!(ty.kind(), DataKind::Null);
            assert!(!ty.aliases().is_empty(), "{ty} has no spelling");
        }
    }

    #[test]
    fn test_width_only_for_sized_kinds() {
        assert_eq!(CompositeType::bigint().width(), Some(8));
        assert_eq!(CompositeType::text().width(), None);
        assert!(CompositeType::new(DataKind::Integer, Some(3)).is_none());
        assert!(CompositeType::new(DataKind::Text, Some(4)).is_none());
        assert!(CompositeType::new(DataKind::Boolean, None).is_some());
    }

    #[test]
    fn test_spelling_comes_from_alias_set() {
        let mut ctx = Context::new_with_seed(1);
        for _ in 0..200 {
            let ty = CompositeType::random_without_null(&mut ctx);
            let first = ty.spell(&mut ctx);
            let second = ty.spell(&mut ctx);
            assert!(ty.aliases().contains(&first.spelling));
            assert!(ty.aliases().contains(&second.spelling));
        }
    }

    #[test]
    fn test_parse_declared() {
        assert_eq!(CompositeType::parse_declared("INTEGER"), CompositeType::int());
        assert_eq!(
            CompositeType::parse_declared("tinyint(12) unsigned"),
            CompositeType::new(DataKind::Integer, Some(1)).unwrap()
        );
        assert_eq!(
            CompositeType::parse_declared("DECIMAL(10, 2)"),
            CompositeType::double()
        );
        assert_eq!(CompositeType::parse_declared("double"), CompositeType::double());
        assert_eq!(CompositeType::double().kind(), DataKind::Double);
        assert_eq!(CompositeType::parse_declared("VARCHAR(500)"), CompositeType::text());
        assert_eq!(CompositeType::parse_declared("LONGTEXT"), CompositeType::text());
        assert_eq!(CompositeType::parse_declared("BOOL"), CompositeType::boolean());
    }
}
