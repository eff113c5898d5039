//! Identifier conventions and collision-free name assignment.
//!
//! Database identifiers (`FILM_ID`, `film_id`, `filmId`) become camelCase
//! variables and PascalCase type names. A [`SymbolTable`] keeps the names
//! already taken per owner; a colliding name receives the first free
//! numeric suffix (2, 3, ...). Assignment depends only on call order, so
//! the same schema always yields the same identifiers.

use super::{EntityId, Namer};
use std::collections::{BTreeMap, BTreeSet};

/// Splits an identifier into words on separators and camel humps.
///
/// All-uppercase segments (`FILM`, `ID`) are one word each.
fn words(identifier: &str) -> Vec<String> {
    let mut words = Vec::new();
    for segment in identifier
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
    {
        if !segment.chars().any(char::is_lowercase) {
            words.push(segment.to_lowercase());
            continue;
        }

        let mut current = String::new();
        let mut previous_lower = false;
        for c in segment.chars() {
            if c.is_uppercase() && previous_lower && !current.is_empty() {
                words.push(std::mem::take(&mut current).to_lowercase());
            }
            previous_lower = c.is_lowercase() || c.is_ascii_digit();
            current.push(c);
        }
        if !current.is_empty() {
            words.push(current.to_lowercase());
        }
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `FILM_ID`, `film_id` and `filmId` all become `filmId`.
pub fn to_camel_case(identifier: &str) -> String {
    let mut result = String::new();
    for (position, word) in words(identifier).iter().enumerate() {
        if position == 0 {
            result.push_str(word);
        } else {
            result.push_str(&capitalize(word));
        }
    }
    result
}

/// `film_actor` becomes `FilmActor`.
pub fn to_pascal_case(identifier: &str) -> String {
    words(identifier).iter().map(|w| capitalize(w)).collect()
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
];

const UNCOUNTABLE: &[&str] = &["data", "information", "equipment", "series", "species", "news"];

/// Splits off the last camel hump: `filmCategory` -> (`film`, `Category`).
fn split_last_word(word: &str) -> (&str, &str) {
    let split = word
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_uppercase())
        .map_or(0, |(at, _)| at);
    word.split_at(split)
}

fn match_case(template: &str, replacement: &str) -> String {
    if template.chars().next().is_some_and(char::is_uppercase) {
        capitalize(replacement)
    } else {
        replacement.to_string()
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

/// English plural of the last word of a camelCase identifier.
pub fn pluralize(word: &str) -> String {
    let (head, last) = split_last_word(word);
    let lower = last.to_lowercase();
    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        return format!("{}{}", head, match_case(last, plural));
    }
    if IRREGULAR.iter().any(|(_, plural)| *plural == lower) {
        return word.to_string();
    }

    let mut chars = lower.chars().rev();
    let (last_char, before) = (chars.next(), chars.next());
    if last_char == Some('y') && before.is_some_and(|c| !is_vowel(c)) {
        return format!("{}{}ies", head, &last[..last.len() - 1]);
    }
    if lower.ends_with("ss")
        || lower.ends_with("us")
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", word);
    }
    if lower.ends_with('s') {
        // already plural
        return word.to_string();
    }
    format!("{}s", word)
}

/// English singular of the last word of a camelCase identifier.
pub fn singularize(word: &str) -> String {
    let (head, last) = split_last_word(word);
    let lower = last.to_lowercase();
    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == lower) {
        return format!("{}{}", head, match_case(last, singular));
    }

    let strip = |n: usize| word[..word.len() - n].to_string();
    if lower.ends_with("ies") && lower.len() > 3 {
        return format!("{}y", strip(3));
    }
    if lower.ends_with("sses")
        || lower.ends_with("uses")
        || lower.ends_with("xes")
        || lower.ends_with("zes")
        || lower.ends_with("ches")
        || lower.ends_with("shes")
    {
        return strip(2);
    }
    if lower.ends_with('s') && !lower.ends_with("ss") && !lower.ends_with("us") && lower.len() > 1 {
        return strip(1);
    }
    word.to_string()
}

/// Default namer for a database identifier.
pub fn namer_for(identifier: &str) -> Namer {
    let var = to_camel_case(identifier);
    Namer {
        vars: pluralize(&var),
        type_name: to_pascal_case(identifier),
        var,
    }
}

/// Names taken per owner.
///
/// # Example
/// ```rust
/// use dbmodeler_core::model::naming::SymbolTable;
///
/// let mut symbols = SymbolTable::new();
/// assert_eq!(symbols.reserve(0, "language"), "language");
/// assert_eq!(symbols.reserve(0, "language"), "language2");
/// assert_eq!(symbols.reserve(1, "language"), "language");
/// ```
#[derive(Debug, Clone)]
pub struct SymbolTable<K: Ord = EntityId> {
    symbols: BTreeMap<K, BTreeSet<String>>,
}

impl<K: Ord> Default for SymbolTable<K> {
    fn default() -> Self {
        Self {
            symbols: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy> SymbolTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `name` is taken for `owner`.
    pub fn contains(&self, owner: K, name: &str) -> bool {
        self.symbols
            .get(&owner)
            .is_some_and(|names| names.contains(name))
    }

    /// Takes `name`, or the first free `name2`, `name3`, ...
    pub fn reserve(&mut self, owner: K, name: &str) -> String {
        self.reserve_with_suffix(owner, name).0
    }

    /// Like [`Self::reserve`], also returning the suffix that was appended.
    pub fn reserve_with_suffix(&mut self, owner: K, name: &str) -> (String, Option<u32>) {
        let names = self.symbols.entry(owner).or_default();
        if names.insert(name.to_string()) {
            return (name.to_string(), None);
        }

        let mut suffix: u32 = 2;
        loop {
            let candidate = format!("{}{}", name, suffix);
            if names.insert(candidate.clone()) {
                return (candidate, Some(suffix));
            }
            suffix = suffix.saturating_add(1);
        }
    }
}
