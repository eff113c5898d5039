//! Metadata to domain model derivation.
//!
//! Derivation runs in four passes over the validated metadata:
//! 1. one entity per table that is neither excluded by the rule report nor
//!    a junction table, with attributes named through the entity's symbol
//!    table
//! 2. unique constraints per entity
//! 3. one owning relation per foreign key plus its inverse
//! 4. a many-to-many pair per junction table
//!
//! Problems that only concern part of the schema (a foreign key to an
//! excluded table, an index over an unknown column) are skipped and
//! recorded in [`DomainModel::warnings`].

use super::naming::{namer_for, pluralize, to_camel_case, to_pascal_case};
use super::relation::{classify_imported_key, is_junction_table};
use super::{
    Attribute, DomainModel, Entity, EntityId, JoinTable, Namer, NamingResolver, Relation,
    RelationKind, SymbolTable, UniqueClassifier,
};
use crate::config::ModelConfig;
use crate::models::{Column, ImportedKey, Metadata, Table};
use crate::validation::RuleReport;
use tracing::{debug, info, warn};

/// Builds a [`DomainModel`] from validated metadata.
pub struct DomainModelAssembler<'a> {
    report: &'a RuleReport,
    config: &'a ModelConfig,
    /// Source table of each entity, indexed by entity id
    tables: Vec<&'a Table>,
    junctions: Vec<&'a Table>,
    resolver: NamingResolver,
    type_names: SymbolTable<()>,
    model: DomainModel,
}

impl<'a> DomainModelAssembler<'a> {
    /// Derives the domain model.
    ///
    /// # Example
    /// ```rust
    /// use dbmodeler_core::config::{JdbcConnectivity, ModelConfig};
    /// use dbmodeler_core::model::DomainModelAssembler;
    /// use dbmodeler_core::models::{Column, DatabaseInfo, Metadata, Table};
    /// use dbmodeler_core::types::JdbcType;
    /// use dbmodeler_core::validation::MetadataValidator;
    ///
    /// let mut metadata = Metadata::new(DatabaseInfo::new("H2"), JdbcConnectivity::default());
    /// let mut language = Table::new("language");
    /// language.columns.push(Column::new("language_id", Some(JdbcType::Integer)).not_null());
    /// language.primary_keys.push("language_id".to_string());
    /// metadata.add_table(language);
    ///
    /// let report = MetadataValidator::validate(&metadata);
    /// let model = DomainModelAssembler::assemble(&metadata, &report, &ModelConfig::default());
    /// assert_eq!(model.entities[0].namer.type_name, "Language");
    /// assert_eq!(model.entities[0].attributes[0].namer.var, "languageId");
    /// ```
    pub fn assemble(
        metadata: &'a Metadata,
        report: &'a RuleReport,
        config: &'a ModelConfig,
    ) -> DomainModel {
        let mut assembler = Self {
            report,
            config,
            tables: Vec::new(),
            junctions: Vec::new(),
            resolver: NamingResolver::new(&config.conventions()),
            type_names: SymbolTable::new(),
            model: DomainModel::default(),
        };

        assembler.derive_entities(metadata);
        assembler.derive_uniques();
        assembler.derive_relations();
        assembler.derive_many_to_many();

        info!(
            "Derived {} entities and {} relations from {} tables ({} warnings)",
            assembler.model.entities.len(),
            assembler.model.relations.len(),
            metadata.tables.len(),
            assembler.model.warnings.len()
        );
        assembler.model
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.model.warnings.push(message);
    }

    fn derive_entities(&mut self, metadata: &'a Metadata) {
        for table in &metadata.tables {
            if self.report.is_excluded(&table.name) {
                self.warn(format!(
                    "Table '{}' excluded from the model: no primary key",
                    table.name
                ));
                continue;
            }
            if is_junction_table(table) {
                debug!("Table '{}' is a junction table", table.name);
                self.junctions.push(table);
                continue;
            }

            let id = self.model.entities.len();
            let entity = self.entity(id, table);
            debug!(
                "Table '{}' -> entity {} ({} attributes)",
                table.name,
                entity.namer.type_name,
                entity.attributes.len()
            );
            self.model.entities.push(entity);
            self.tables.push(table);
        }
    }

    fn entity(&mut self, id: EntityId, table: &Table) -> Entity {
        let config = self.config;
        let overrides = config.entity(&table.name);
        let defaults = namer_for(&table.name);

        let (type_name, default_var) = match overrides.and_then(|o| o.entity_name.as_deref()) {
            Some(name) => (name.to_string(), to_camel_case(name)),
            None => (defaults.type_name, defaults.var),
        };
        let var = overrides
            .and_then(|o| o.var.clone())
            .unwrap_or(default_var);
        let vars = overrides
            .and_then(|o| o.vars.clone())
            .unwrap_or_else(|| pluralize(&var));
        let namer = Namer {
            type_name: self.type_names.reserve((), &type_name),
            var,
            vars,
        };

        let attributes: Vec<Attribute> = table
            .columns
            .iter()
            .map(|column| self.attribute(id, table, column))
            .collect();

        let mut primary_key = Vec::with_capacity(table.primary_keys.len());
        for column in &table.primary_keys {
            match attributes.iter().position(|a| &a.column_name == column) {
                Some(index) => primary_key.push(index),
                None => self.warn(format!(
                    "{}: primary key column '{}' not found",
                    table.name, column
                )),
            }
        }

        Entity {
            table_name: table.name.clone(),
            schema: table.schema.clone(),
            namer,
            remarks: table.remarks.clone(),
            attributes,
            primary_key,
            uniques: Vec::new(),
            relations: Vec::new(),
        }
    }

    fn attribute(&mut self, entity: EntityId, table: &Table, column: &Column) -> Attribute {
        let config = self.config;
        let overrides = config.column(&table.name, &column.name);
        let var = overrides
            .and_then(|o| o.field_name.as_deref())
            .map_or_else(|| to_camel_case(&column.name), str::to_string);
        let var = self.resolver.reserve(entity, &var);

        Attribute {
            column_name: column.name.clone(),
            namer: Namer {
                vars: pluralize(&var),
                type_name: to_pascal_case(&var),
                var,
            },
            data_type: column.data_type,
            type_name: column.type_name.clone(),
            nullable: overrides
                .and_then(|o| o.nullable)
                .unwrap_or(column.nullable),
            primary_key: table.is_primary_key(&column.name),
            foreign_key: table.is_foreign_key(&column.name),
            auto_increment: column.auto_increment,
            enum_values: column.enum_values.clone(),
            size: column.size,
            decimal_digits: column.decimal_digits,
            remarks: column.remarks.clone(),
        }
    }

    fn derive_uniques(&mut self) {
        for (id, table) in self.tables.iter().enumerate() {
            let uniques =
                UniqueClassifier::classify(&self.model.entities[id], table, &mut self.model.warnings);
            self.model.entities[id].uniques = uniques;
        }
    }

    /// Attribute indexes for `columns` on an entity, `None` if any is unknown.
    fn attribute_indexes<'c>(
        &self,
        entity: EntityId,
        columns: impl Iterator<Item = &'c str>,
    ) -> Option<Vec<usize>> {
        let entity = &self.model.entities[entity];
        columns.map(|c| entity.attribute_index(c)).collect()
    }

    fn target_entity(&mut self, table: &Table, key: &ImportedKey) -> Option<EntityId> {
        if let Some(id) = self.model.entity_id(&key.pk_table) {
            return Some(id);
        }
        let reason = if self.report.is_excluded(&key.pk_table) {
            "target table is excluded"
        } else if self
            .junctions
            .iter()
            .any(|j| j.name.eq_ignore_ascii_case(&key.pk_table))
        {
            "target is a junction table"
        } else {
            "target table not found"
        };
        self.warn(format!(
            "{}: foreign key to '{}' skipped, {}",
            table.name, key.pk_table, reason
        ));
        None
    }

    fn add_relation(&mut self, relation: Relation) -> usize {
        let id = self.model.relations.len();
        self.model.entities[relation.from_entity].relations.push(id);
        self.model.relations.push(relation);
        id
    }

    fn derive_relations(&mut self) {
        let tables = self.tables.clone();
        for (from, table) in tables.into_iter().enumerate() {
            for key in &table.imported_keys {
                self.derive_relation(from, table, key);
            }
        }
    }

    fn derive_relation(&mut self, from: EntityId, table: &Table, key: &ImportedKey) {
        let Some(to) = self.target_entity(table, key) else {
            return;
        };
        let (Some(from_attributes), Some(to_attributes)) = (
            self.attribute_indexes(from, key.fk_columns()),
            self.attribute_indexes(to, key.pk_columns()),
        ) else {
            self.warn(format!(
                "{}: foreign key to '{}' references unknown columns, skipped",
                table.name, key.pk_table
            ));
            return;
        };

        let config = self.config;
        let kind = classify_imported_key(table, key);
        let from_entity = &self.model.entities[from];
        let source_namer = from_entity.namer.clone();
        let target_namer = self.model.entities[to].namer.clone();
        let attribute_var = if key.is_composite() {
            None
        } else {
            from_attributes
                .first()
                .map(|&i| from_entity.attributes[i].namer.var.clone())
        };
        let mandatory = from_attributes
            .iter()
            .all(|&i| !from_entity.attributes[i].nullable);
        let overrides = key
            .fk_columns()
            .next()
            .and_then(|column| config.relation(&table.name, column));

        let namer =
            self.resolver
                .forward_namer(from, attribute_var.as_deref(), &target_namer, overrides);
        debug!(
            "{}.{} -> {} ({:?})",
            source_namer.type_name, namer.var, target_namer.type_name, kind
        );
        let owning = self.add_relation(Relation {
            kind,
            inverse: false,
            from_entity: from,
            from_attributes: from_attributes.clone(),
            to_entity: to,
            to_attributes: to_attributes.clone(),
            mandatory,
            namer,
            inverse_of: None,
            via_table: None,
            constraint_name: key.name.clone(),
        });

        let inverse_kind = kind.inverse();
        match self
            .resolver
            .inverse_namer(to, inverse_kind, &source_namer, overrides)
        {
            Some(namer) => {
                self.add_relation(Relation {
                    kind: inverse_kind,
                    inverse: true,
                    from_entity: to,
                    from_attributes: to_attributes,
                    to_entity: from,
                    to_attributes: from_attributes,
                    mandatory: false,
                    namer,
                    inverse_of: Some(owning),
                    via_table: None,
                    constraint_name: key.name.clone(),
                });
            }
            None => debug!(
                "{}: no inverse accessor for foreign key to '{}'",
                table.name, key.pk_table
            ),
        }
    }

    fn derive_many_to_many(&mut self) {
        let junctions = self.junctions.clone();
        for junction in junctions {
            let [first, second] = junction.imported_keys.as_slice() else {
                continue;
            };
            let (Some(from), Some(to)) = (
                self.target_entity(junction, first),
                self.target_entity(junction, second),
            ) else {
                continue;
            };
            let (Some(from_attributes), Some(to_attributes)) = (
                self.attribute_indexes(from, first.pk_columns()),
                self.attribute_indexes(to, second.pk_columns()),
            ) else {
                self.warn(format!(
                    "{}: junction keys reference unknown columns, skipped",
                    junction.name
                ));
                continue;
            };

            let source_namer = self.model.entities[from].namer.clone();
            let target_namer = self.model.entities[to].namer.clone();
            let config = self.config;
            let overrides = config.relation(&self.model.entities[from].table_name, &junction.name);
            let first_columns: Vec<String> = first.fk_columns().map(str::to_string).collect();
            let second_columns: Vec<String> = second.fk_columns().map(str::to_string).collect();

            let namer = self
                .resolver
                .many_to_many_namer(from, &target_namer, overrides);
            debug!(
                "{}.{} <-> {} via {}",
                source_namer.type_name, namer.vars, target_namer.type_name, junction.name
            );
            let owning = self.add_relation(Relation {
                kind: RelationKind::ManyToMany,
                inverse: false,
                from_entity: from,
                from_attributes: from_attributes.clone(),
                to_entity: to,
                to_attributes: to_attributes.clone(),
                mandatory: false,
                namer,
                inverse_of: None,
                via_table: Some(JoinTable {
                    name: junction.name.clone(),
                    from_columns: first_columns.clone(),
                    to_columns: second_columns.clone(),
                }),
                constraint_name: None,
            });

            if let Some(namer) = self.resolver.inverse_namer(
                to,
                RelationKind::ManyToMany,
                &source_namer,
                overrides,
            ) {
                self.add_relation(Relation {
                    kind: RelationKind::ManyToMany,
                    inverse: true,
                    from_entity: to,
                    from_attributes: to_attributes,
                    to_entity: from,
                    to_attributes: from_attributes,
                    mandatory: false,
                    namer,
                    inverse_of: Some(owning),
                    via_table: Some(JoinTable {
                        name: junction.name.clone(),
                        from_columns: second_columns,
                        to_columns: first_columns,
                    }),
                    constraint_name: None,
                });
            }
        }
    }
}
