//! Relation cardinality and accessor naming.
//!
//! Cardinality is read off the foreign key and the owning table's keys:
//! a foreign key is one-to-one when its columns are exactly the primary key
//! or a unique index, many-to-one otherwise. A table whose only two
//! foreign keys cover exactly its primary key is a junction table and
//! becomes a many-to-many pair between the two referenced entities.
//!
//! Names go through one [`SymbolTable`] shared by the whole derivation, so
//! the forward and inverse sides of a self-relation never shadow each other
//! and the same schema always produces the same suffixes.

use super::naming::{pluralize, singularize};
use super::{EntityId, Namer, RelationKind, SymbolTable};
use crate::config::{NamingConventions, RelationConfig};
use crate::models::{ImportedKey, Table};
use std::collections::BTreeSet;

fn column_set<'a>(columns: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    columns.map(str::to_ascii_lowercase).collect()
}

/// Cardinality of a foreign key seen from the referencing table.
pub fn classify_imported_key(table: &Table, key: &ImportedKey) -> RelationKind {
    let fk_columns = column_set(key.fk_columns());
    if fk_columns.is_empty() {
        return RelationKind::ManyToOne;
    }

    let primary_key = column_set(table.primary_keys.iter().map(String::as_str));
    let covered_by_unique = table
        .indexes
        .iter()
        .filter(|i| i.unique)
        .any(|i| column_set(i.columns.iter().map(String::as_str)) == fk_columns);

    if fk_columns == primary_key || covered_by_unique {
        RelationKind::OneToOne
    } else {
        RelationKind::ManyToOne
    }
}

/// True for a table whose two foreign keys jointly form its primary key.
///
/// A key referencing the table itself disqualifies it.
pub fn is_junction_table(table: &Table) -> bool {
    if table.imported_keys.len() != 2 || !table.has_primary_key() {
        return false;
    }
    if table
        .imported_keys
        .iter()
        .any(|k| k.pk_table.eq_ignore_ascii_case(&table.name))
    {
        return false;
    }

    let fk_columns = column_set(table.imported_keys.iter().flat_map(ImportedKey::fk_columns));
    fk_columns == column_set(table.primary_keys.iter().map(String::as_str))
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

/// Assigns collision-free relation accessor names.
#[derive(Debug, Clone)]
pub struct NamingResolver {
    fk_suffixes: Vec<String>,
    symbols: SymbolTable,
}

impl NamingResolver {
    pub fn new(conventions: &NamingConventions) -> Self {
        Self {
            fk_suffixes: conventions.fk_suffixes.clone(),
            symbols: SymbolTable::new(),
        }
    }

    /// Reserves a name on an entity, returning the collision-free result.
    pub fn reserve(&mut self, entity: EntityId, name: &str) -> String {
        self.symbols.reserve(entity, name)
    }

    /// Name of a to-one accessor before collision handling.
    ///
    /// `attribute_var` is the referencing attribute's variable, `None` for a
    /// composite key.
    pub fn forward_base_name(&self, attribute_var: Option<&str>, target: &Namer) -> String {
        let Some(attribute_var) = attribute_var else {
            return target.var.clone();
        };

        let stripped = self.fk_suffixes.iter().find_map(|suffix| {
            attribute_var
                .strip_suffix(suffix.as_str())
                .filter(|rest| !suffix.is_empty() && !rest.is_empty())
        });
        match stripped {
            Some(name) => name.to_string(),
            None => target.var.clone(),
        }
    }

    /// Names the owning side of a many-to-one or one-to-one relation.
    pub fn forward_namer(
        &mut self,
        from: EntityId,
        attribute_var: Option<&str>,
        target: &Namer,
        overrides: Option<&RelationConfig>,
    ) -> Namer {
        let var = match overrides.and_then(|o| non_blank(o.var.as_ref())) {
            Some(var) => var.to_string(),
            None => self.forward_base_name(attribute_var, target),
        };
        let vars = overrides
            .and_then(|o| non_blank(o.vars.as_ref()))
            .map_or_else(|| pluralize(&var), str::to_string);
        self.reserve_pair(from, var, vars, false, &target.type_name)
    }

    /// Names the owning side of a many-to-many relation.
    pub fn many_to_many_namer(
        &mut self,
        from: EntityId,
        target: &Namer,
        overrides: Option<&RelationConfig>,
    ) -> Namer {
        let var = overrides.and_then(|o| non_blank(o.var.as_ref()));
        let vars = overrides.and_then(|o| non_blank(o.vars.as_ref()));
        let (var, vars) = match (var, vars) {
            (Some(var), Some(vars)) => (var.to_string(), vars.to_string()),
            (Some(var), None) => (var.to_string(), pluralize(var)),
            (None, Some(vars)) => (singularize(vars), vars.to_string()),
            (None, None) => (target.var.clone(), target.vars.clone()),
        };
        self.reserve_pair(from, var, vars, true, &target.type_name)
    }

    /// Names the inverse side, living on `owner`.
    ///
    /// `source` is the default namer of the entity the inverse navigates
    /// to. Returns `None` when inverse navigation is disabled or the form
    /// the relation kind needs is blank.
    pub fn inverse_namer(
        &mut self,
        owner: EntityId,
        kind: RelationKind,
        source: &Namer,
        overrides: Option<&RelationConfig>,
    ) -> Option<Namer> {
        if overrides.is_some_and(|o| o.inverse == Some(false)) {
            return None;
        }

        let var = overrides.and_then(|o| o.inverse_var.as_deref());
        let vars = overrides.and_then(|o| o.inverse_vars.as_deref());
        let (var, vars) = match (var, vars) {
            (Some(var), Some(vars)) => (var.to_string(), vars.to_string()),
            // a lone blank form leaves the other at its default
            (Some(var), None) if var.trim().is_empty() => (var.to_string(), source.vars.clone()),
            (Some(var), None) => (var.to_string(), pluralize(var)),
            (None, Some(vars)) if vars.trim().is_empty() => (source.var.clone(), vars.to_string()),
            (None, Some(vars)) => (singularize(vars), vars.to_string()),
            (None, None) => (source.var.clone(), source.vars.clone()),
        };

        let chosen = if kind.is_collection() { &vars } else { &var };
        if chosen.trim().is_empty() {
            return None;
        }
        Some(self.reserve_pair(owner, var, vars, kind.is_collection(), &source.type_name))
    }

    /// Reserves the accessor name and carries its suffix to the other form.
    fn reserve_pair(
        &mut self,
        owner: EntityId,
        var: String,
        vars: String,
        collection: bool,
        type_name: &str,
    ) -> Namer {
        let (chosen, other) = if collection { (&vars, &var) } else { (&var, &vars) };
        let (reserved, suffix) = self.symbols.reserve_with_suffix(owner, chosen);
        let other = match suffix {
            Some(n) if !other.trim().is_empty() => format!("{}{}", other, n),
            _ => other.clone(),
        };
        let (var, vars) = if collection { (other, reserved) } else { (reserved, other) };
        Namer {
            var,
            vars,
            type_name: type_name.to_string(),
        }
    }
}
