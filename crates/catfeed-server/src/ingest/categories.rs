//! Category hierarchy resolution
//!
//! The feed header carries a flat `<categories>` table where each entry names
//! an optional parent. Offers reference a leaf category id; the pipeline needs
//! the full ancestor chain in root-to-leaf order, sliced into three fixed
//! levels plus an overflow string.

use std::collections::{HashMap, HashSet};

use super::models::Category;

/// In-memory category table for one job, read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    categories: HashMap<String, Category>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: String, category: Category) {
        self.categories.insert(id, category);
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Resolve a category id into its ancestor-name chain, root to leaf.
    ///
    /// Traversal follows parent links until a missing parent or an id absent
    /// from the table. Each id is visited at most once, so a malformed table
    /// containing a parent cycle terminates with a chain no longer than the
    /// number of distinct categories.
    pub fn hierarchy(&self, category_id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(category_id.to_string());

        while let Some(id) = current {
            if !visited.insert(id.clone()) {
                break;
            }
            match self.categories.get(&id) {
                Some(category) => {
                    chain.push(category.name.clone());
                    current = category.parent_id.clone();
                },
                None => break,
            }
        }

        chain.reverse();
        chain
    }
}

/// A hierarchy sliced into the three named levels plus overflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryLevels {
    pub lvl_1: Option<String>,
    pub lvl_2: Option<String>,
    pub lvl_3: Option<String>,
    /// Levels beyond the third, joined by `/`
    pub remaining: Option<String>,
}

impl CategoryLevels {
    /// Slice a root-to-leaf hierarchy into fixed levels.
    pub fn split(hierarchy: &[String]) -> Self {
        Self {
            lvl_1: hierarchy.first().cloned(),
            lvl_2: hierarchy.get(1).cloned(),
            lvl_3: hierarchy.get(2).cloned(),
            remaining: if hierarchy.len() > 3 {
                Some(hierarchy[3..].join("/"))
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str, Option<&str>)]) -> CategoryTable {
        let mut table = CategoryTable::new();
        for (id, name, parent) in entries {
            table.insert(
                id.to_string(),
                Category {
                    name: name.to_string(),
                    parent_id: parent.map(|p| p.to_string()),
                },
            );
        }
        table
    }

    #[test]
    fn test_hierarchy_root_to_leaf_order() {
        let table = table(&[
            ("1", "Electronics", None),
            ("2", "Phones", Some("1")),
            ("3", "Accessories", Some("2")),
        ]);

        assert_eq!(table.hierarchy("3"), vec!["Electronics", "Phones", "Accessories"]);
    }

    #[test]
    fn test_hierarchy_unknown_id_is_empty() {
        let table = table(&[("1", "Electronics", None)]);
        assert!(table.hierarchy("42").is_empty());
    }

    #[test]
    fn test_hierarchy_stops_at_missing_parent() {
        let table = table(&[("2", "Phones", Some("1")), ("3", "Accessories", Some("2"))]);

        // "1" is referenced but absent from the table
        assert_eq!(table.hierarchy("3"), vec!["Phones", "Accessories"]);
    }

    #[test]
    fn test_hierarchy_terminates_on_cycle() {
        let table = table(&[("a", "A", Some("b")), ("b", "B", Some("a"))]);

        let chain = table.hierarchy("a");
        assert!(chain.len() <= table.len());
        assert_eq!(chain, vec!["B", "A"]);
    }

    #[test]
    fn test_hierarchy_self_cycle() {
        let table = table(&[("a", "A", Some("a"))]);
        assert_eq!(table.hierarchy("a"), vec!["A"]);
    }

    #[test]
    fn test_split_exact_three_levels() {
        let levels = CategoryLevels::split(&[
            "Electronics".to_string(),
            "Phones".to_string(),
            "Accessories".to_string(),
        ]);

        assert_eq!(levels.lvl_1.as_deref(), Some("Electronics"));
        assert_eq!(levels.lvl_2.as_deref(), Some("Phones"));
        assert_eq!(levels.lvl_3.as_deref(), Some("Accessories"));
        assert_eq!(levels.remaining, None);
    }

    #[test]
    fn test_split_overflow_joined_with_slash() {
        let chain: Vec<String> = ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect();
        let levels = CategoryLevels::split(&chain);

        assert_eq!(levels.remaining.as_deref(), Some("D/E"));
    }

    #[test]
    fn test_split_empty_hierarchy() {
        let levels = CategoryLevels::split(&[]);
        assert_eq!(levels, CategoryLevels::default());
    }

    #[test]
    fn test_split_reconstructs_full_chain() {
        let chain: Vec<String> = ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect();
        let levels = CategoryLevels::split(&chain);

        let mut rebuilt: Vec<String> = [&levels.lvl_1, &levels.lvl_2, &levels.lvl_3]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        if let Some(rest) = &levels.remaining {
            rebuilt.extend(rest.split('/').map(|s| s.to_string()));
        }

        assert_eq!(rebuilt, chain);
    }
}
