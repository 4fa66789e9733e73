use std::collections::HashMap;

use crate::xml::Element;

/// Category of a registered complex type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Distinct,
    Udt,
    Array,
}

/// The shape of a column or udt-field declaration, derived from which of its fields are set.
///
/// The first matching rule wins: a non-zero cardinality makes an array regardless of what else is
/// declared, a plain `type` makes a simple column, a `typeSchema`/`typeName` pair references a
/// registered complex type, and a bare `base` is a distinct wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedCategory {
    Simple,
    Array,
    Udt,
    Distinct,
    Unknown,
}

/// One column or udt-field declaration, as it appears in `metadata.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeAttribute {
    /// The declared name. Synthetic attributes (array elements) leave it empty.
    pub name: String,

    /// The simple SIARD type string (`INTEGER`, `VARCHAR(32)`, …), if declared.
    pub siard_type: String,

    /// The schema of a referenced complex type.
    pub type_schema: String,

    /// The name of a referenced complex type.
    pub type_name: String,

    /// Number of array elements; non-zero only for arrays.
    pub cardinality: u32,

    /// The base type of a distinct wrapper.
    pub base: String,
}

impl TypeAttribute {
    /// Reconstruct a declaration from a `<column>` or `<attribute>` element.
    pub fn from_xml(element: &Element) -> Self {
        TypeAttribute {
            name: element.child_text("name").to_string(),
            siard_type: element.child_text("type").to_string(),
            type_schema: element.child_text("typeSchema").to_string(),
            type_name: element.child_text("typeName").to_string(),
            cardinality: element.child_text("cardinality").parse().unwrap_or(0),
            base: element.child_text("base").to_string(),
        }
    }

    pub fn extended_category(&self) -> ExtendedCategory {
        if self.cardinality > 0 {
            ExtendedCategory::Array
        } else if !self.siard_type.is_empty() {
            ExtendedCategory::Simple
        } else if !self.type_schema.is_empty() || !self.type_name.is_empty() {
            ExtendedCategory::Udt
        } else if !self.base.is_empty() {
            ExtendedCategory::Distinct
        } else {
            ExtendedCategory::Unknown
        }
    }

    /// The `(schema, name)` pair the formatters dispatch on: the referenced complex type if one
    /// is declared, otherwise the simple type string under an empty schema.
    pub fn type_ref(&self) -> (&str, &str) {
        if !self.type_name.is_empty() {
            (&self.type_schema, &self.type_name)
        } else {
            ("", &self.siard_type)
        }
    }
}

/// A registered complex type.
///
/// A distinct node holds a single synthetic attribute carrying `base`; an array node holds a
/// single synthetic attribute carrying the element type and the cardinality; a udt node holds one
/// attribute per declared field, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub schema: String,
    pub name: String,
    pub category: TypeCategory,
    pub attributes: Vec<TypeAttribute>,
}

impl TypeNode {
    /// The synthetic attribute of a distinct or array node.
    ///
    /// Returns `None` for udt nodes or malformed registrations.
    pub fn synthetic_attribute(&self) -> Option<&TypeAttribute> {
        match self.category {
            TypeCategory::Distinct | TypeCategory::Array => self.attributes.first(),
            TypeCategory::Udt => None,
        }
    }
}

/// The registry of complex types for one translation run, keyed by `(schema, name)`.
///
/// Seeded by the metadata pre-pass across all schemas (udt attributes may reference types in any
/// schema, including later ones), then extended during the main pass as anonymous arrays are
/// discovered on columns. Insertion order is preserved.
#[derive(Debug, Default)]
pub struct DataTypeTable {
    nodes: Vec<TypeNode>,
    index: HashMap<(String, String), usize>,
    anonymous_arrays: u64,
}

impl DataTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register a node under `(node.schema, node.name)`. Re-registering the same key overwrites
    /// the previous node but keeps its insertion position.
    pub fn register(&mut self, node: TypeNode) {
        let key = (node.schema.clone(), node.name.clone());

        match self.index.get(&key) {
            Some(&pos) => self.nodes[pos] = node,
            None => {
                self.index.insert(key, self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    /// Look up a registered type. Absence means the name is a simple SIARD type string to be
    /// resolved through the type mapper.
    pub fn lookup(&self, schema: &str, name: &str) -> Option<&TypeNode> {
        self.index
            .get(&(schema.to_string(), name.to_string()))
            .map(|&pos| &self.nodes[pos])
    }

    /// Register an anonymous array type and return its generated name.
    ///
    /// `element` carries the element's type (either a simple type string or a
    /// `typeSchema`/`typeName` reference); `subname` disambiguates the synthetic name, together
    /// with a counter that is global across the table.
    pub fn register_array(
        &mut self,
        schema: &str,
        subname: &str,
        mut element: TypeAttribute,
        cardinality: u32,
    ) -> String {
        let generated = format!("ARRAY{}_{}_{}", cardinality, subname, self.anonymous_arrays);
        self.anonymous_arrays += 1;

        element.cardinality = cardinality;

        self.register(TypeNode {
            schema: schema.to_string(),
            name: generated.clone(),
            category: TypeCategory::Array,
            attributes: vec![element],
        });

        generated
    }

    /// Lift an array declaration out of `attr` into the table.
    ///
    /// A fresh array node is registered in `schema` and `attr` is rewritten to reference it, with
    /// the cardinality and inline type cleared, so the formatters can treat every non-simple
    /// reference uniformly via `(typeSchema, typeName)`.
    pub fn lift_array(&mut self, schema: &str, attr: &mut TypeAttribute) {
        debug_assert!(attr.cardinality > 0);

        let element = TypeAttribute {
            siard_type: std::mem::take(&mut attr.siard_type),
            type_schema: attr.type_schema.clone(),
            type_name: attr.type_name.clone(),
            ..Default::default()
        };

        let generated = self.register_array(schema, &attr.name, element, attr.cardinality);

        attr.type_schema = schema.to_string();
        attr.type_name = generated;
        attr.cardinality = 0;
    }
}
