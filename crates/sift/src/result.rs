// ABOUTME: Result tree built from rule extractions, keyed by dotted rule names.
// ABOUTME: Handles nesting, scalar vs record-list leaves, name conflicts, and multiplicity when serializing.

//! Result building.
//!
//! A rule name is split on `.`:
//! - `title` writes a scalar leaf `title`.
//! - `link.href` writes field `href` of a record-list leaf `link`.
//! - `page.link.href` nests the record-list `link` inside object `page`;
//!   every segment before the last two is an object key.
//!
//! The first rule touching a path fixes its shape. A later rule that needs a
//! different shape at the same path is a `NameConflict`.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::error::SiftError;
use crate::extractors::rule::{Rule, NAME_DELIMITER};

/// How scalar leaves are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    /// Zero matches become `null`, one becomes a bare string, more become a list.
    #[default]
    Collapse,
    /// Always a list, possibly empty.
    Arrays,
}

/// A node of the result tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Object(BTreeMap<String, Node>),
    Leaf(Leaf),
}

/// A leaf slot, tagged with the shape fixed by the first rule that touched it.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Scalar(Vec<String>),
    Records(Records),
}

impl Leaf {
    fn shape(&self) -> &'static str {
        match self {
            Leaf::Scalar(_) => "a list of values",
            Leaf::Records(_) => "a list of records",
        }
    }
}

/// Positionally aligned records sharing one slot.
///
/// `fields` holds every field any rule registered on the slot, so rows can be
/// padded to the same keys when serialized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Records {
    fields: BTreeSet<String>,
    rows: Vec<BTreeMap<String, String>>,
}

impl Records {
    fn write_field(&mut self, field: &str, values: Vec<String>) {
        self.fields.insert(field.to_string());
        for (i, value) in values.into_iter().enumerate() {
            if i == self.rows.len() {
                self.rows.push(BTreeMap::new());
            }
            self.rows[i].insert(field.to_string(), value);
        }
    }

    fn to_value(&self) -> Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .fields
                    .iter()
                    .map(|field| {
                        let value = row.get(field).cloned().unwrap_or_default();
                        (field.clone(), Value::String(value))
                    })
                    .collect();
                Value::Object(record)
            })
            .collect();
        Value::Array(rows)
    }
}

/// Overwrites `list` positionally with `values`, extending it as needed.
fn overwrite(list: &mut Vec<String>, values: Vec<String>) {
    for (i, value) in values.into_iter().enumerate() {
        match list.get_mut(i) {
            Some(slot) => *slot = value,
            None => list.push(value),
        }
    }
}

/// The nested mapping for one document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTree {
    root: BTreeMap<String, Node>,
}

impl ResultTree {
    /// Looks up the node at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split(NAME_DELIMITER);
        let mut node = self.root.get(segments.next()?)?;
        for seg in segments {
            node = match node {
                Node::Object(map) => map.get(seg)?,
                Node::Leaf(_) => return None,
            };
        }
        Some(node)
    }

    /// Serializes the tree as a JSON object under the given multiplicity.
    pub fn to_map(&self, multiplicity: Multiplicity) -> Map<String, Value> {
        object_to_map(&self.root, multiplicity)
    }

    /// Every extracted string, in key order, for line-oriented output.
    ///
    /// Record fields are visited row by row; padding is not emitted.
    pub fn strings(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_strings(&self.root, &mut out);
        out
    }
}

fn object_to_map(map: &BTreeMap<String, Node>, multiplicity: Multiplicity) -> Map<String, Value> {
    map.iter()
        .map(|(key, node)| (key.clone(), node_to_value(node, multiplicity)))
        .collect()
}

fn node_to_value(node: &Node, multiplicity: Multiplicity) -> Value {
    match node {
        Node::Object(map) => Value::Object(object_to_map(map, multiplicity)),
        Node::Leaf(Leaf::Records(records)) => records.to_value(),
        Node::Leaf(Leaf::Scalar(values)) => match (multiplicity, values.as_slice()) {
            (Multiplicity::Collapse, []) => Value::Null,
            (Multiplicity::Collapse, [single]) => Value::String(single.clone()),
            _ => Value::Array(values.iter().cloned().map(Value::String).collect()),
        },
    }
}

fn collect_strings<'a>(map: &'a BTreeMap<String, Node>, out: &mut Vec<&'a str>) {
    for node in map.values() {
        match node {
            Node::Object(inner) => collect_strings(inner, out),
            Node::Leaf(Leaf::Scalar(values)) => out.extend(values.iter().map(String::as_str)),
            Node::Leaf(Leaf::Records(records)) => {
                for row in &records.rows {
                    out.extend(row.values().map(String::as_str));
                }
            }
        }
    }
}

/// Accumulates extracted values for a set of rules into a `ResultTree`.
#[derive(Debug, Clone)]
pub struct ResultBuilder {
    names: Vec<String>,
    tree: ResultTree,
}

impl ResultBuilder {
    /// Creates a builder; the rule names are kept for conflict diagnostics.
    pub fn new(rules: &[Rule]) -> Self {
        Self {
            names: rules.iter().map(|r| r.name().to_string()).collect(),
            tree: ResultTree::default(),
        }
    }

    /// Writes the values extracted by `rule` into its slot.
    pub fn add(&mut self, rule: &Rule, values: Vec<String>) -> Result<(), SiftError> {
        let names = &self.names;
        let segments = rule.segments();
        let split = segments.len().saturating_sub(2);
        let (chain, terminals) = segments.split_at(split);

        let mut map = &mut self.tree.root;
        for (depth, seg) in chain.iter().enumerate() {
            let node = map
                .entry(seg.to_string())
                .or_insert_with(|| Node::Object(BTreeMap::new()));
            map = match node {
                Node::Object(inner) => inner,
                Node::Leaf(leaf) => {
                    return Err(conflict(
                        rule,
                        &segments[..=depth],
                        format!("{}, not an object", leaf.shape()),
                        names,
                    ))
                }
            };
        }

        match terminals {
            [key] => {
                let node = map
                    .entry(key.to_string())
                    .or_insert_with(|| Node::Leaf(Leaf::Scalar(Vec::new())));
                match node {
                    Node::Leaf(Leaf::Scalar(list)) => overwrite(list, values),
                    other => {
                        return Err(conflict(rule, &segments, describe(other), names));
                    }
                }
            }
            [key, field] => {
                let node = map
                    .entry(key.to_string())
                    .or_insert_with(|| Node::Leaf(Leaf::Records(Records::default())));
                match node {
                    Node::Leaf(Leaf::Records(records)) => records.write_field(field, values),
                    other => {
                        return Err(conflict(rule, &segments[..split + 1], describe(other), names));
                    }
                }
            }
            _ => unreachable!("rule names always have at least one segment"),
        }

        Ok(())
    }

    pub fn finish(self) -> ResultTree {
        self.tree
    }
}

fn describe(node: &Node) -> String {
    match node {
        Node::Object(_) => "an object".to_string(),
        Node::Leaf(leaf) => leaf.shape().to_string(),
    }
}

fn conflict(rule: &Rule, path: &[&str], existing: String, names: &[String]) -> SiftError {
    let path = path.join(&NAME_DELIMITER.to_string());
    SiftError::name_conflict(
        rule.name(),
        format!("`{}` already holds {}", path, existing),
        names,
    )
}

/// Checks that `rules` can share one result tree alongside the URL key.
///
/// Runs the builder over empty extractions so every shape conflict surfaces
/// before anything is fetched.
pub fn validate_names(rules: &[Rule], url_key: &str) -> Result<(), SiftError> {
    let mut builder = ResultBuilder::new(rules);
    for rule in rules {
        if rule.segments().first() == Some(&url_key) {
            return Err(SiftError::name_conflict(
                rule.name(),
                format!("`{}` is reserved for the page URL", url_key),
                &builder.names,
            ));
        }
        builder.add(rule, Vec::new())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rules(specs: &[&str]) -> Vec<Rule> {
        Rule::parse_all(specs).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn build(specs: &[&str], values: &[&[&str]]) -> Result<ResultTree, SiftError> {
        let rules = rules(specs);
        let mut builder = ResultBuilder::new(&rules);
        for (rule, vals) in rules.iter().zip(values) {
            builder.add(rule, strings(vals))?;
        }
        Ok(builder.finish())
    }

    #[test]
    fn test_scalar_collapse() {
        let tree = build(
            &["none/a", "one/b", "many/c"],
            &[&[], &["x"], &["x", "y"]],
        )
        .unwrap();
        assert_eq!(
            Value::Object(tree.to_map(Multiplicity::Collapse)),
            json!({"none": null, "one": "x", "many": ["x", "y"]})
        );
    }

    #[test]
    fn test_scalar_arrays() {
        let tree = build(
            &["none/a", "one/b", "many/c"],
            &[&[], &["x"], &["x", "y"]],
        )
        .unwrap();
        assert_eq!(
            Value::Object(tree.to_map(Multiplicity::Arrays)),
            json!({"none": [], "one": ["x"], "many": ["x", "y"]})
        );
    }

    #[test]
    fn test_records_zip_by_index() {
        let tree = build(
            &["a.x/p/x", "a.y/p/y"],
            &[&["x0", "x1", "x2"], &["y0", "y1", "y2"]],
        )
        .unwrap();
        assert_eq!(
            Value::Object(tree.to_map(Multiplicity::Collapse)),
            json!({"a": [
                {"x": "x0", "y": "y0"},
                {"x": "x1", "y": "y1"},
                {"x": "x2", "y": "y2"},
            ]})
        );
    }

    #[test]
    fn test_single_record_stays_a_list() {
        let tree = build(&["link.href/a/href", "link.text/a"], &[&["/x"], &["Y"]]).unwrap();
        assert_eq!(
            Value::Object(tree.to_map(Multiplicity::Collapse)),
            json!({"link": [{"href": "/x", "text": "Y"}]})
        );
    }

    #[test]
    fn test_misaligned_records_are_padded() {
        let tree = build(
            &["a.x/p/x", "a.y/p/y"],
            &[&["x0"], &["y0", "y1"]],
        )
        .unwrap();
        assert_eq!(
            Value::Object(tree.to_map(Multiplicity::Collapse)),
            json!({"a": [{"x": "x0", "y": "y0"}, {"x": "", "y": "y1"}]})
        );
    }

    #[test]
    fn test_empty_records_are_empty_list() {
        let tree = build(&["a.x/p"], &[&[]]).unwrap();
        assert_eq!(
            Value::Object(tree.to_map(Multiplicity::Collapse)),
            json!({"a": []})
        );
    }

    #[test]
    fn test_nested_chain() {
        let tree = build(
            &["page.link.href/a/href", "page.link.text/a", "page.meta.og.title/meta"],
            &[&["/a", "/b"], &["A", "B"], &["T"]],
        )
        .unwrap();
        assert_eq!(
            Value::Object(tree.to_map(Multiplicity::Collapse)),
            json!({"page": {
                "link": [{"href": "/a", "text": "A"}, {"href": "/b", "text": "B"}],
                "meta": {"og": [{"title": "T"}]},
            }})
        );
        assert!(matches!(tree.get("page.link"), Some(Node::Leaf(Leaf::Records(_)))));
        assert!(matches!(tree.get("page.meta"), Some(Node::Object(_))));
        assert!(tree.get("page.missing").is_none());
    }

    #[test]
    fn test_same_name_overwrites_positionally() {
        let tree = build(&["a/p", "a/q"], &[&["1", "2", "3"], &["x"]]).unwrap();
        assert_eq!(
            Value::Object(tree.to_map(Multiplicity::Collapse)),
            json!({"a": ["x", "2", "3"]})
        );

        let tree = build(&["a/p", "a/q"], &[&["1"], &["x", "y"]]).unwrap();
        assert_eq!(
            Value::Object(tree.to_map(Multiplicity::Collapse)),
            json!({"a": ["x", "y"]})
        );
    }

    #[test]
    fn test_scalar_then_records_conflicts() {
        let err = build(&["a/p", "a.b/q"], &[&["1"], &["2"]]).unwrap_err();
        assert!(err.is_name_conflict());
        assert_eq!(err.target, "a.b");
        assert!(err.to_string().contains("rules: a, a.b"));
    }

    #[test]
    fn test_records_then_scalar_conflicts() {
        let err = build(&["a.b/q", "a/p"], &[&["1"], &["2"]]).unwrap_err();
        assert!(err.is_name_conflict());
        assert_eq!(err.target, "a");
    }

    #[test]
    fn test_chain_through_leaf_conflicts() {
        let err = build(&["a/p", "a.b.c/q"], &[&[], &[]]).unwrap_err();
        assert!(err.is_name_conflict());
        assert!(err.to_string().contains("not an object"));

        let err = build(&["page.title/h1", "page.link.href/a"], &[&[], &[]]).unwrap_err();
        assert!(err.is_name_conflict());
    }

    #[test]
    fn test_object_then_leaf_conflicts() {
        let err = build(&["a.b.c/p", "a.b/q"], &[&[], &[]]).unwrap_err();
        assert!(err.is_name_conflict());
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn test_validate_names() {
        assert!(validate_names(&rules(&["a/p", "b.x/q", "b.y/q"]), "key").is_ok());
        assert!(validate_names(&rules(&["a/p", "a.x/q"]), "key")
            .unwrap_err()
            .is_name_conflict());
    }

    #[test]
    fn test_validate_names_reserves_url_key() {
        let err = validate_names(&rules(&["key/p"]), "key").unwrap_err();
        assert!(err.is_name_conflict());
        assert!(validate_names(&rules(&["url.x/p"]), "url")
            .unwrap_err()
            .is_name_conflict());
        assert!(validate_names(&rules(&["key/p"]), "url").is_ok());
    }

    #[test]
    fn test_strings_in_key_order() {
        let tree = build(
            &["b/p", "a.y/q", "a.x/q"],
            &[&["b0", "b1"], &["y0"], &["x0", "x1"]],
        )
        .unwrap();
        assert_eq!(tree.strings(), vec!["x0", "y0", "x1", "b0", "b1"]);
    }

    #[test]
    fn test_json_round_trip() {
        let tree = build(
            &["title/h1", "link.href/a/href", "link.text/a"],
            &[&["T1", "T2"], &["/a"], &["A"]],
        )
        .unwrap();
        let value = Value::Object(tree.to_map(Multiplicity::Collapse));
        let text = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }
}
