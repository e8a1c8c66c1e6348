//! Field paths: typed addresses into nested models.
//!
//! The public string form is the dotted/bracket syntax UI layers use for
//! control names (`businessHours.values[3].from`). Bare numeric dotted
//! segments are also accepted as indices (`businessHours.values.3.from`),
//! since both spellings appear in the wild. Internally a path is a list
//! of typed [`PathSegment`]s; the string form is parsed exactly once at
//! the boundary.
//!
//! Resolution is deliberately forgiving: [`get`] returns `None` for any
//! path that does not match the live model shape, and never panics.
//! Mutation has value semantics: [`set`] consumes a model and returns the
//! new one, so snapshot comparison in the reactive layer stays sound.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::PathParseError;

/// One step into a nested model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// An object member, addressed by key.
    Key(String),
    /// An array element, addressed by non-negative index.
    Index(usize),
}

/// A typed address into a nested model.
///
/// Paths are ordered and hashable so they can key result maps and
/// pending sets. The empty path addresses the model root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse the public dotted/bracket string form.
    ///
    /// Accepts `a.b[0].c` and the dotted-numeric spelling `a.b.0.c`.
    /// The empty string and malformed inputs (unmatched brackets, empty
    /// segments, non-numeric indices) are errors; runtime entry points
    /// that receive untrusted strings treat those errors as "no value".
    pub fn parse(input: &str) -> Result<Self, PathParseError> {
        if input.is_empty() {
            return Err(PathParseError::Empty);
        }

        let mut segments = Vec::new();
        let mut rest = input;
        loop {
            // One dotted segment, then any number of bracket suffixes.
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            let head = &rest[..end];
            if head.is_empty() {
                // Only legal when a bracket directly follows a previous
                // segment (`a[0][1]` after the outer loop re-enters).
                if !(rest.starts_with('[') && !segments.is_empty()) {
                    return Err(PathParseError::EmptySegment {
                        input: input.to_string(),
                    });
                }
            } else if head.contains(']') {
                return Err(PathParseError::UnmatchedBracket {
                    input: input.to_string(),
                });
            } else {
                segments.push(Self::key_or_index(head));
            }
            rest = &rest[end..];

            while let Some(inner) = rest.strip_prefix('[') {
                let close =
                    inner
                        .find(']')
                        .ok_or_else(|| PathParseError::UnmatchedBracket {
                            input: input.to_string(),
                        })?;
                let raw = &inner[..close];
                let index: usize =
                    raw.parse()
                        .map_err(|_| PathParseError::InvalidIndex {
                            input: input.to_string(),
                            index: raw.to_string(),
                        })?;
                segments.push(PathSegment::Index(index));
                rest = &inner[close + 1..];
            }

            if rest.is_empty() {
                break;
            }
            match rest.strip_prefix('.') {
                Some(tail) => rest = tail,
                // Something like `a[0]b` — text directly after a bracket.
                None => {
                    return Err(PathParseError::TrailingCharacters {
                        input: input.to_string(),
                    });
                }
            }
            if rest.is_empty() {
                // Trailing dot.
                return Err(PathParseError::EmptySegment {
                    input: input.to_string(),
                });
            }
        }

        Ok(Self { segments })
    }

    /// Build a path directly from typed segments.
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// The root path (zero segments). Addresses the whole model.
    pub fn root() -> Self {
        Self::default()
    }

    /// The typed segments, in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// True for the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Extend this path by one segment.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// True if `prefix` is a (non-strict) prefix of this path.
    ///
    /// Used for subtree matching: a preserve-list entry `bio` covers
    /// `bio.title` and `bio` itself.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// A bare dotted segment: all-digits means an array index.
    fn key_or_index(head: &str) -> PathSegment {
        if head.bytes().all(|b| b.is_ascii_digit()) {
            match head.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Key(head.to_string()),
            }
        } else {
            PathSegment::Key(head.to_string())
        }
    }
}

impl fmt::Display for FieldPath {
    /// Renders the canonical dotted/bracket form (`a.b[0].c`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) => {
                    if i > 0 {
                        write!(f, ".{key}")?;
                    } else {
                        write!(f, "{key}")?;
                    }
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}

/// Resolve a path against a model.
///
/// Returns `None` on any missing or shape-mismatched segment; never
/// panics. The root path resolves to the model itself. An [`Index`]
/// segment against an object falls back to the numeric string key, so
/// `a.3.b` works for both arrays and maps keyed by `"3"`.
///
/// [`Index`]: PathSegment::Index
pub fn get<'a>(model: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = model;
    for segment in path.segments() {
        current = match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key)?,
            (Value::Array(items), PathSegment::Index(index)) => items.get(*index)?,
            (Value::Object(map), PathSegment::Index(index)) => map.get(&index.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write a leaf into a model, returning the new model.
///
/// Consumes the input so callers never observe in-place mutation of a
/// shared snapshot. Intermediate containers are created when absent —
/// arrays when the next segment is an index, objects otherwise — and a
/// scalar standing where a container is needed is replaced. The root
/// path replaces the whole model.
pub fn set(model: Value, path: &FieldPath, leaf: Value) -> Value {
    let mut model = model;
    set_in_place(&mut model, path.segments(), leaf);
    model
}

fn set_in_place(slot: &mut Value, segments: &[PathSegment], leaf: Value) {
    let Some((segment, rest)) = segments.split_first() else {
        *slot = leaf;
        return;
    };

    match segment {
        PathSegment::Key(key) => {
            if !matches!(slot, Value::Object(_)) {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(map) = slot {
                let entry = map.entry(key.clone()).or_insert(Value::Null);
                set_in_place(entry, rest, leaf);
            }
        }
        PathSegment::Index(index) => {
            // An existing object absorbs index segments as numeric keys,
            // mirroring `get`. Everything else becomes an array.
            if let Value::Object(map) = slot {
                let entry = map.entry(index.to_string()).or_insert(Value::Null);
                set_in_place(entry, rest, leaf);
                return;
            }
            if !matches!(slot, Value::Array(_)) {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(items) = slot {
                if items.len() <= *index {
                    items.resize(index + 1, Value::Null);
                }
                set_in_place(&mut items[*index], rest, leaf);
            }
        }
    }
}

/// Shallowest paths at which two models differ.
///
/// Walks both models in lockstep: matching containers recurse, anything
/// else compares by value. A key or element present on only one side is
/// reported at its own path. Output order is deterministic (sorted keys,
/// ascending indices).
pub fn diff_leaf_paths(a: &Value, b: &Value) -> Vec<FieldPath> {
    let mut out = Vec::new();
    diff_walk(a, b, &mut Vec::new(), &mut out);
    out
}

fn diff_walk(a: &Value, b: &Value, prefix: &mut Vec<PathSegment>, out: &mut Vec<FieldPath>) {
    match (a, b) {
        (Value::Object(map_a), Value::Object(map_b)) => {
            let mut keys: Vec<&String> = map_a.keys().chain(map_b.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                prefix.push(PathSegment::Key(key.clone()));
                match (map_a.get(key), map_b.get(key)) {
                    (Some(va), Some(vb)) => diff_walk(va, vb, prefix, out),
                    _ => out.push(FieldPath::from_segments(prefix.clone())),
                }
                prefix.pop();
            }
        }
        (Value::Array(items_a), Value::Array(items_b)) => {
            for index in 0..items_a.len().max(items_b.len()) {
                prefix.push(PathSegment::Index(index));
                match (items_a.get(index), items_b.get(index)) {
                    (Some(va), Some(vb)) => diff_walk(va, vb, prefix, out),
                    _ => out.push(FieldPath::from_segments(prefix.clone())),
                }
                prefix.pop();
            }
        }
        _ => {
            if a != b {
                out.push(FieldPath::from_segments(prefix.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(s: &str) -> FieldPath {
        FieldPath::parse(s).expect("path should parse")
    }

    #[test]
    fn parse_dotted_path() {
        assert_eq!(
            p("a.b.c").segments(),
            &[
                PathSegment::Key("a".into()),
                PathSegment::Key("b".into()),
                PathSegment::Key("c".into()),
            ]
        );
    }

    #[test]
    fn parse_bracket_index() {
        assert_eq!(
            p("items[2].name").segments(),
            &[
                PathSegment::Key("items".into()),
                PathSegment::Index(2),
                PathSegment::Key("name".into()),
            ]
        );
    }

    #[test]
    fn parse_dotted_numeric_as_index() {
        assert_eq!(
            p("businessHours.values.3.from").segments(),
            &[
                PathSegment::Key("businessHours".into()),
                PathSegment::Key("values".into()),
                PathSegment::Index(3),
                PathSegment::Key("from".into()),
            ]
        );
    }

    #[test]
    fn parse_consecutive_brackets() {
        assert_eq!(
            p("grid[1][2]").segments(),
            &[
                PathSegment::Key("grid".into()),
                PathSegment::Index(1),
                PathSegment::Index(2),
            ]
        );
    }

    #[test]
    fn parse_empty_is_error() {
        assert_eq!(FieldPath::parse(""), Err(PathParseError::Empty));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(matches!(
            FieldPath::parse("a..b"),
            Err(PathParseError::EmptySegment { .. })
        ));
        assert!(matches!(
            FieldPath::parse("a."),
            Err(PathParseError::EmptySegment { .. })
        ));
        assert!(matches!(
            FieldPath::parse("a[1"),
            Err(PathParseError::UnmatchedBracket { .. })
        ));
        assert!(matches!(
            FieldPath::parse("a]b"),
            Err(PathParseError::UnmatchedBracket { .. })
        ));
        assert!(matches!(
            FieldPath::parse("a[x]"),
            Err(PathParseError::InvalidIndex { .. })
        ));
        assert!(matches!(
            FieldPath::parse("a[0]b"),
            Err(PathParseError::TrailingCharacters { .. })
        ));
        assert!(matches!(
            FieldPath::parse("[0]"),
            Err(PathParseError::EmptySegment { .. })
        ));
    }

    #[test]
    fn display_renders_canonical_form() {
        assert_eq!(p("a.b[0].c").to_string(), "a.b[0].c");
        // Dotted-numeric input canonicalizes to bracket form.
        assert_eq!(p("a.b.0.c").to_string(), "a.b[0].c");
    }

    #[test]
    fn starts_with_matches_subtrees() {
        assert!(p("bio.title").starts_with(&p("bio")));
        assert!(p("bio").starts_with(&p("bio")));
        assert!(!p("biography").starts_with(&p("bio")));
        assert!(!p("bio").starts_with(&p("bio.title")));
    }

    #[test]
    fn get_resolves_nested() {
        let model = json!({"users": [{"name": "Alice"}, {"name": "Bob"}]});
        assert_eq!(get(&model, &p("users[1].name")), Some(&json!("Bob")));
        assert_eq!(get(&model, &p("users.0.name")), Some(&json!("Alice")));
    }

    #[test]
    fn get_missing_returns_none() {
        let model = json!({"a": {"b": 1}});
        assert_eq!(get(&model, &p("a.c")), None);
        assert_eq!(get(&model, &p("a.b.c")), None);
        assert_eq!(get(&model, &p("a[0]")), None);
    }

    #[test]
    fn get_root_returns_model() {
        let model = json!({"a": 1});
        assert_eq!(get(&model, &FieldPath::root()), Some(&model));
    }

    #[test]
    fn get_numeric_key_on_object() {
        let model = json!({"hours": {"3": {"from": "09:00"}}});
        assert_eq!(get(&model, &p("hours.3.from")), Some(&json!("09:00")));
    }

    #[test]
    fn set_replaces_leaf() {
        let model = json!({"email": ""});
        let updated = set(model, &p("email"), json!("a@b.com"));
        assert_eq!(updated, json!({"email": "a@b.com"}));
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let updated = set(json!({}), &p("profile.name"), json!("Ada"));
        assert_eq!(updated, json!({"profile": {"name": "Ada"}}));
    }

    #[test]
    fn set_creates_intermediate_arrays() {
        let updated = set(json!({}), &p("tags[1]"), json!("rust"));
        assert_eq!(updated, json!({"tags": [null, "rust"]}));
    }

    #[test]
    fn set_leaves_siblings_untouched() {
        let model = json!({"a": {"x": 1, "y": 2}, "b": [1, 2, 3]});
        let updated = set(model, &p("a.x"), json!(9));
        assert_eq!(updated, json!({"a": {"x": 9, "y": 2}, "b": [1, 2, 3]}));
    }

    #[test]
    fn set_replaces_scalar_blocking_the_spine() {
        let updated = set(json!({"a": 5}), &p("a.b"), json!(1));
        assert_eq!(updated, json!({"a": {"b": 1}}));
    }

    #[test]
    fn read_modify_write_is_identity() {
        let model = json!({"hours": [{"from": "09:00", "to": "12:00"}]});
        let read = get(&model, &p("hours[0].from")).cloned().expect("resolves");
        assert_eq!(set(model.clone(), &p("hours[0].from"), read), model);
    }

    #[test]
    fn diff_reports_changed_leaves() {
        let a = json!({"email": "x@y.z", "bio": "old", "n": 1});
        let b = json!({"email": "x@y.z", "bio": "new", "n": 2});
        assert_eq!(diff_leaf_paths(&a, &b), vec![p("bio"), p("n")]);
    }

    #[test]
    fn diff_reports_one_sided_keys() {
        let a = json!({"a": 1});
        let b = json!({"a": 1, "b": 2});
        assert_eq!(diff_leaf_paths(&a, &b), vec![p("b")]);
    }

    #[test]
    fn diff_descends_arrays() {
        let a = json!({"items": [1, 2]});
        let b = json!({"items": [1, 3, 4]});
        assert_eq!(
            diff_leaf_paths(&a, &b),
            vec![p("items[1]"), p("items[2]")]
        );
    }

    #[test]
    fn diff_equal_models_is_empty() {
        let a = json!({"a": {"b": [1, {"c": null}]}});
        assert!(diff_leaf_paths(&a, &a.clone()).is_empty());
    }

    #[test]
    fn serde_round_trip() {
        let path = p("a.b[2].c");
        let encoded = serde_json::to_string(&path).expect("serializes");
        assert_eq!(encoded, "\"a.b[2].c\"");
        let decoded: FieldPath = serde_json::from_str(&encoded).expect("deserializes");
        assert_eq!(decoded, path);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_model() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i64>().prop_map(|n| Value::Number(n.into())),
                "[a-z]{0,6}".prop_map(Value::String),
            ];
            leaf.prop_recursive(3, 24, 4, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                    prop::collection::btree_map("[a-z]{1,5}", inner, 0..4)
                        .prop_map(|m| Value::Object(m.into_iter().collect())),
                ]
            })
        }

        fn leaf_paths(model: &Value) -> Vec<FieldPath> {
            fn walk(value: &Value, prefix: &mut Vec<PathSegment>, out: &mut Vec<FieldPath>) {
                match value {
                    Value::Object(map) if !map.is_empty() => {
                        for (key, child) in map {
                            prefix.push(PathSegment::Key(key.clone()));
                            walk(child, prefix, out);
                            prefix.pop();
                        }
                    }
                    Value::Array(items) if !items.is_empty() => {
                        for (index, child) in items.iter().enumerate() {
                            prefix.push(PathSegment::Index(index));
                            walk(child, prefix, out);
                            prefix.pop();
                        }
                    }
                    _ => out.push(FieldPath::from_segments(prefix.clone())),
                }
            }
            let mut out = Vec::new();
            walk(model, &mut Vec::new(), &mut out);
            out
        }

        proptest! {
            #[test]
            fn read_modify_write_identity(model in arb_model()) {
                for path in leaf_paths(&model) {
                    let read = get(&model, &path).cloned();
                    prop_assert!(read.is_some(), "leaf path must resolve: {path}");
                    if let Some(read) = read {
                        prop_assert_eq!(set(model.clone(), &path, read), model.clone());
                    }
                }
            }

            #[test]
            fn display_parse_round_trip(model in arb_model()) {
                for path in leaf_paths(&model) {
                    // Root and leading-index paths have no string form.
                    if !matches!(path.segments().first(), Some(PathSegment::Key(_))) {
                        continue;
                    }
                    let rendered = path.to_string();
                    prop_assert_eq!(FieldPath::parse(&rendered), Ok(path));
                }
            }

            #[test]
            fn diff_is_empty_iff_equal(a in arb_model(), b in arb_model()) {
                let diffs = diff_leaf_paths(&a, &b);
                prop_assert_eq!(diffs.is_empty(), a == b);
            }
        }
    }
}
