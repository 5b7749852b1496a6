use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::attribute::CollectionShape;

/// Host collection types with ordered-sequence semantics.
pub static LIST_TYPES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut s = HashSet::new();
    s.insert("List");
    s.insert("ArrayList");
    s.insert("LinkedList");
    s.insert("Vec");
    s.insert("VecDeque");
    s
});

/// Host collection types with unique, unordered semantics.
pub static SET_TYPES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut s = HashSet::new();
    s.insert("Set");
    s.insert("HashSet");
    s.insert("TreeSet");
    s.insert("SortedSet");
    s.insert("NavigableSet");
    s.insert("LinkedHashSet");
    s.insert("BTreeSet");
    s.insert("IndexSet");
    s
});

/// Host key-value types.
pub static MAP_TYPES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut s = HashSet::new();
    s.insert("Map");
    s.insert("HashMap");
    s.insert("TreeMap");
    s.insert("SortedMap");
    s.insert("NavigableMap");
    s.insert("LinkedHashMap");
    s.insert("BTreeMap");
    s.insert("IndexMap");
    s
});

/// `qualified.Base<args>` with optional generic arguments.
static RE_HOST_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_$][\w$]*(?:(?:\.|::)[A-Za-z_$][\w$]*)*)\s*(?:<(.*)>)?\s*$")
        .expect("host type pattern is valid")
});

/// Model document version constant.
pub const MODEL_VERSION: &str = "1.0";

/// A declared host type split into its base name and generic arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostType {
    pub qualified: String,
    pub args: Vec<String>,
}

impl HostType {
    /// Base name without package / module prefix.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.qualified)
    }

    /// Element type of a collection: the value type for maps.
    pub fn element(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }

    pub fn map_key(&self) -> Option<&str> {
        if self.args.len() >= 2 {
            self.args.first().map(String::as_str)
        } else {
            None
        }
    }

    pub fn shape(&self) -> CollectionShape {
        shape_of(self.simple_name())
    }
}

/// Parse a declared host type such as `java.util.Map<String, com.acme.Item>`.
/// Returns `None` when the text is not a type expression.
pub fn parse_host_type(raw: &str) -> Option<HostType> {
    let caps = RE_HOST_TYPE.captures(raw)?;
    let qualified = caps.get(1)?.as_str().to_string();
    let args = match caps.get(2) {
        Some(inner) => split_type_args(inner.as_str())?,
        None => Vec::new(),
    };
    Some(HostType { qualified, args })
}

/// Strip a `.` or `::` separated prefix.
pub fn simple_name(qualified: &str) -> &str {
    let after_colons = qualified.rsplit("::").next().unwrap_or(qualified);
    after_colons.rsplit('.').next().unwrap_or(after_colons)
}

/// Collection shape of a host collection base name.
pub fn shape_of(base: &str) -> CollectionShape {
    let base = simple_name(base);
    if LIST_TYPES.contains(base) {
        CollectionShape::List
    } else if SET_TYPES.contains(base) {
        CollectionShape::Set
    } else if MAP_TYPES.contains(base) {
        CollectionShape::Map
    } else {
        CollectionShape::Collection
    }
}

/// Split top-level comma separated generic arguments, respecting nesting.
fn split_type_args(inner: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut depth: usize = 0;
    let mut current = String::new();

    for ch in inner.chars() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth = depth.checked_sub(1)?;
                current.push(ch);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 {
        return None;
    }
    let last = current.trim();
    if !last.is_empty() {
        args.push(last.to_string());
    }
    if args.iter().any(|a| a.is_empty()) {
        return None;
    }
    Some(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_type() {
        let t = parse_host_type("java.lang.String").unwrap();
        assert_eq!(t.qualified, "java.lang.String");
        assert_eq!(t.simple_name(), "String");
        assert!(t.args.is_empty());
        assert_eq!(t.element(), None);
    }

    #[test]
    fn parses_generic_list() {
        let t = parse_host_type("java.util.List<com.acme.Phone>").unwrap();
        assert_eq!(t.simple_name(), "List");
        assert_eq!(t.element(), Some("com.acme.Phone"));
        assert_eq!(t.shape(), CollectionShape::List);
    }

    #[test]
    fn parses_nested_map() {
        let t = parse_host_type("Map<String, List<Item>>").unwrap();
        assert_eq!(t.args, vec!["String".to_string(), "List<Item>".to_string()]);
        assert_eq!(t.map_key(), Some("String"));
        assert_eq!(t.element(), Some("List<Item>"));
        assert_eq!(t.shape(), CollectionShape::Map);
    }

    #[test]
    fn rust_paths_are_accepted() {
        let t = parse_host_type("std::collections::BTreeSet<crate::Tag>").unwrap();
        assert_eq!(t.simple_name(), "BTreeSet");
        assert_eq!(t.shape(), CollectionShape::Set);
        assert_eq!(simple_name("crate::Tag"), "Tag");
    }

    #[test]
    fn unknown_iterables_are_generic_collections() {
        assert_eq!(shape_of("Collection"), CollectionShape::Collection);
        assert_eq!(shape_of("org.apache.Bag"), CollectionShape::Collection);
        assert_eq!(shape_of("java.util.TreeSet"), CollectionShape::Set);
    }

    #[test]
    fn rejects_unbalanced_generics() {
        assert!(parse_host_type("List<Foo").is_none());
        assert!(parse_host_type("Map<,Foo>").is_none());
        assert!(parse_host_type("").is_none());
    }
}
