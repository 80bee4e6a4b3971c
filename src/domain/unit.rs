//! Export unit definitions
//!
//! An export unit is one configured procedure or view that produces one file
//! per run window. Units are grouped into execution-order categories and are
//! immutable for the duration of a run.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// How an export unit is executed against the source database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Stored procedure invoked with (output path, from, to)
    Procedure,
    /// View read with `SELECT *`
    View,
}

impl UnitKind {
    /// Derive the unit kind from an execution-order category name.
    ///
    /// Matching is case-insensitive and accepts singular or plural forms.
    pub fn from_category(category: &str) -> Option<Self> {
        match category.trim().to_lowercase().as_str() {
            "procedures" | "procedure" => Some(UnitKind::Procedure),
            "views" | "view" => Some(UnitKind::View),
            _ => None,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Procedure => write!(f, "procedure"),
            UnitKind::View => write!(f, "view"),
        }
    }
}

/// One configured export unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportUnitSpec {
    /// Execution-order category the unit belongs to
    pub category: String,

    /// File name prefix (may be empty)
    pub prefix: String,

    /// Procedure or view name in the source schema
    pub query_name: String,

    /// Execution kind
    pub kind: UnitKind,
}

impl ExportUnitSpec {
    /// Create a new unit spec
    pub fn new(
        category: impl Into<String>,
        prefix: impl Into<String>,
        query_name: impl Into<String>,
        kind: UnitKind,
    ) -> Self {
        Self {
            category: category.into(),
            prefix: prefix.into(),
            query_name: query_name.into(),
            kind,
        }
    }
}

/// Units grouped by category, plus the declared execution order
///
/// Category names are normalized to lowercase. Units keep their declaration
/// order within a category.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    order: Vec<String>,
    categories: IndexMap<String, Vec<ExportUnitSpec>>,
}

impl UnitCatalog {
    /// Build a catalog from an execution order and per-category units
    pub fn new(order: Vec<String>, categories: IndexMap<String, Vec<ExportUnitSpec>>) -> Self {
        Self {
            order: order.iter().map(|c| c.trim().to_lowercase()).collect(),
            categories: categories
                .into_iter()
                .map(|(name, units)| (name.trim().to_lowercase(), units))
                .collect(),
        }
    }

    /// Declared execution order (lowercased)
    pub fn execution_order(&self) -> &[String] {
        &self.order
    }

    /// Units of a category, if the category is configured
    pub fn category(&self, name: &str) -> Option<&[ExportUnitSpec]> {
        self.categories
            .get(&name.trim().to_lowercase())
            .map(Vec::as_slice)
    }

    /// All units reachable from the execution order, in execution order
    ///
    /// Categories named in the order but absent from configuration are
    /// skipped.
    pub fn units_in_order(&self) -> Vec<&ExportUnitSpec> {
        self.order
            .iter()
            .filter_map(|name| self.category(name))
            .flat_map(|units| units.iter())
            .collect()
    }

    /// Number of units that a run will consider
    pub fn total_units(&self) -> usize {
        self.units_in_order().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("procedures", Some(UnitKind::Procedure))]
    #[test_case("Procedure", Some(UnitKind::Procedure))]
    #[test_case("VIEWS", Some(UnitKind::View))]
    #[test_case(" view ", Some(UnitKind::View))]
    #[test_case("tables", None)]
    fn test_kind_from_category(category: &str, expected: Option<UnitKind>) {
        assert_eq!(UnitKind::from_category(category), expected);
    }

    fn catalog() -> UnitCatalog {
        let mut categories = IndexMap::new();
        categories.insert(
            "Views".to_string(),
            vec![
                ExportUnitSpec::new("views", "orders", "v_orders", UnitKind::View),
                ExportUnitSpec::new("views", "items", "v_items", UnitKind::View),
            ],
        );
        categories.insert(
            "procedures".to_string(),
            vec![ExportUnitSpec::new(
                "procedures",
                "stock",
                "sp_stock",
                UnitKind::Procedure,
            )],
        );
        UnitCatalog::new(
            vec![
                "PROCEDURES".to_string(),
                "missing".to_string(),
                "views".to_string(),
            ],
            categories,
        )
    }

    #[test]
    fn test_catalog_follows_execution_order() {
        let catalog = catalog();
        let prefixes: Vec<&str> = catalog
            .units_in_order()
            .iter()
            .map(|u| u.prefix.as_str())
            .collect();
        assert_eq!(prefixes, vec!["stock", "orders", "items"]);
        assert_eq!(catalog.total_units(), 3);
    }

    #[test]
    fn test_catalog_missing_category() {
        let catalog = catalog();
        assert!(catalog.category("missing").is_none());
        assert_eq!(catalog.execution_order()[0], "procedures");
    }

    #[test]
    fn test_unit_spec_creation() {
        let unit = ExportUnitSpec::new("views", "orders", "v_orders", UnitKind::View);
        assert_eq!(unit.category, "views");
        assert_eq!(unit.prefix, "orders");
        assert_eq!(unit.query_name, "v_orders");
        assert_eq!(unit.kind.to_string(), "view");
    }
}
