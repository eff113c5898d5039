//! Derived domain model.
//!
//! Entities, attributes, unique constraints and bidirectional relations
//! derived from [`crate::models::Metadata`] by the
//! [`DomainModelAssembler`](assembler::DomainModelAssembler). Relations live
//! in one arena on [`DomainModel`]; entities and inverse relations refer to
//! them by index, so the model is a plain tree for serde.

pub mod assembler;
pub mod naming;
pub mod relation;
pub mod unique;

pub use assembler::DomainModelAssembler;
pub use naming::SymbolTable;
pub use relation::NamingResolver;
pub use unique::UniqueClassifier;

use crate::types::JdbcType;
use serde::{Deserialize, Serialize};

/// Index of an entity in [`DomainModel::entities`].
pub type EntityId = usize;

/// Index of a relation in [`DomainModel::relations`].
pub type RelationId = usize;

/// Identifier triple used by code generators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namer {
    /// Singular variable name (`language`)
    pub var: String,
    /// Plural variable name (`languages`)
    pub vars: String,
    /// Type name (`Language`)
    pub type_name: String,
}

/// A mapped column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub column_name: String,
    pub namer: Namer,
    pub data_type: Option<JdbcType>,
    pub type_name: String,
    /// Nullability after configuration overrides
    pub nullable: bool,
    pub primary_key: bool,
    pub foreign_key: bool,
    pub auto_increment: bool,
    #[serde(default)]
    pub enum_values: Vec<String>,
    pub size: Option<u32>,
    pub decimal_digits: Option<u32>,
    pub remarks: Option<String>,
}

impl Attribute {
    /// True for date, time and timestamp attributes.
    pub fn is_temporal(&self) -> bool {
        self.data_type.is_some_and(JdbcType::is_temporal)
    }

    /// True when the column carries a finite value set.
    pub fn is_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }
}

/// A unique constraint over attributes of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Unique {
    Simple { name: String, attribute: usize },
    Composite { name: String, attributes: Vec<usize> },
}

impl Unique {
    /// Constraint name with H2's generated `_INDEX_<tag>` suffix removed.
    pub fn name(&self) -> &str {
        let raw = match self {
            Self::Simple { name, .. } | Self::Composite { name, .. } => name.as_str(),
        };
        normalize_index_name(raw)
    }

    /// Attribute indexes in constraint order.
    pub fn attributes(&self) -> &[usize] {
        match self {
            Self::Simple { attribute, .. } => std::slice::from_ref(attribute),
            Self::Composite { attributes, .. } => attributes,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite { .. })
    }

    /// True when every attribute of the constraint is non-nullable.
    ///
    /// Evaluated against the entity's current attributes, so nullability
    /// overrides applied later are honored.
    pub fn is_potential_key(&self, entity: &Entity) -> bool {
        let mut attributes = self.attributes().iter().map(|&i| entity.attributes.get(i));
        !self.attributes().is_empty() && attributes.all(|a| a.is_some_and(|a| !a.nullable))
    }

    /// A potential key made of plain business data: no primary key, foreign
    /// key or temporal attribute.
    pub fn is_good_business_key_candidate(&self, entity: &Entity) -> bool {
        self.is_potential_key(entity)
            && self
                .attributes()
                .iter()
                .filter_map(|&i| entity.attributes.get(i))
                .all(|a| !a.primary_key && !a.foreign_key && !a.is_temporal())
    }
}

/// Strips a trailing `_INDEX_<tag>` (any case) from an index name.
fn normalize_index_name(name: &str) -> &str {
    const MARKER: &str = "_INDEX_";
    let upper = name.to_ascii_uppercase();
    let Some(at) = upper.rfind(MARKER) else {
        return name;
    };
    let tag = &upper[at + MARKER.len()..];
    if at > 0 && !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        &name[..at]
    } else {
        name
    }
}

/// A table mapped to a domain type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub table_name: String,
    pub schema: Option<String>,
    pub namer: Namer,
    pub remarks: Option<String>,
    pub attributes: Vec<Attribute>,
    /// Attribute indexes in key sequence order
    pub primary_key: Vec<usize>,
    #[serde(default)]
    pub uniques: Vec<Unique>,
    /// Relations navigable from this entity, owning and inverse
    #[serde(default)]
    pub relations: Vec<RelationId>,
}

impl Entity {
    /// Attribute index for a column name, exact match first.
    pub fn attribute_index(&self, column_name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|a| a.column_name == column_name)
            .or_else(|| {
                self.attributes
                    .iter()
                    .position(|a| a.column_name.eq_ignore_ascii_case(column_name))
            })
    }

    pub fn attribute(&self, column_name: &str) -> Option<&Attribute> {
        self.attribute_index(column_name).map(|i| &self.attributes[i])
    }

    /// Overrides an attribute's nullability. Returns `false` for an unknown column.
    pub fn set_nullable(&mut self, column_name: &str, nullable: bool) -> bool {
        match self.attribute_index(column_name) {
            Some(index) => {
                self.attributes[index].nullable = nullable;
                true
            }
            None => false,
        }
    }

    pub fn has_composite_primary_key(&self) -> bool {
        self.primary_key.len() > 1
    }

    /// Column names of the primary key.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &str> {
        self.primary_key
            .iter()
            .filter_map(|&i| self.attributes.get(i))
            .map(|a| a.column_name.as_str())
    }
}

/// Relation cardinality seen from the navigating side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl RelationKind {
    /// True when the accessor yields a collection.
    pub fn is_collection(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Cardinality of the opposite side.
    pub fn inverse(self) -> Self {
        match self {
            Self::ManyToOne => Self::OneToMany,
            Self::OneToMany => Self::ManyToOne,
            Self::OneToOne => Self::OneToOne,
            Self::ManyToMany => Self::ManyToMany,
        }
    }
}

/// Junction table carrying a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTable {
    pub name: String,
    /// Junction columns referencing the navigating entity
    pub from_columns: Vec<String>,
    /// Junction columns referencing the target entity
    pub to_columns: Vec<String>,
}

/// One navigable side of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    /// True for the side derived from the opposite end of a foreign key
    pub inverse: bool,
    pub from_entity: EntityId,
    pub from_attributes: Vec<usize>,
    pub to_entity: EntityId,
    pub to_attributes: Vec<usize>,
    pub mandatory: bool,
    pub namer: Namer,
    /// Owning relation of an inverse side
    pub inverse_of: Option<RelationId>,
    pub via_table: Option<JoinTable>,
    /// Foreign key constraint name, when known
    pub constraint_name: Option<String>,
}

impl Relation {
    pub fn is_self_relation(&self) -> bool {
        self.from_entity == self.to_entity
    }
}

/// The derived model plus warnings collected while deriving it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainModel {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl DomainModel {
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn relation(&self, id: RelationId) -> Option<&Relation> {
        self.relations.get(id)
    }

    /// Entity id for a table, exact name first, then case-insensitive.
    pub fn entity_id(&self, table_name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .position(|e| e.table_name == table_name)
            .or_else(|| {
                self.entities
                    .iter()
                    .position(|e| e.table_name.eq_ignore_ascii_case(table_name))
            })
    }

    pub fn entity_by_table(&self, table_name: &str) -> Option<&Entity> {
        self.entity_id(table_name).map(|id| &self.entities[id])
    }

    /// Relations navigable from an entity, in derivation order.
    pub fn relations_of(&self, entity: EntityId) -> impl Iterator<Item = (RelationId, &Relation)> {
        self.entities
            .get(entity)
            .into_iter()
            .flat_map(|e| e.relations.iter())
            .filter_map(|&id| self.relations.get(id).map(|r| (id, r)))
    }

    /// Relation accessor on an entity by variable name.
    pub fn relation_named(&self, entity: EntityId, name: &str) -> Option<&Relation> {
        self.relations_of(entity)
            .map(|(_, r)| r)
            .find(|r| r.namer.var == name || (r.kind.is_collection() && r.namer.vars == name))
    }

    /// Inverse side of an owning relation, if one was derived.
    pub fn inverse_of(&self, owning: RelationId) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|r| r.inverse_of == Some(owning))
    }

    /// True when warnings were collected during derivation.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
