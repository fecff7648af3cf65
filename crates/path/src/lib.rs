//! modelmap-path: dotted-path lookup and assignment over `serde_json::Value`.
//!
//! Paths are written the way they appear in mapping declarations:
//! `profile.name`, `items[0].id`, `items.0.id` or `meta["content-type"]`.
//! A path is parsed once into [`Segment`]s; the `*_at_segments` functions
//! walk pre-parsed paths and the `*_at_path` functions parse on the fly.
//!
//! Lookups are tolerant: a missing key, an out-of-range index or a
//! malformed path simply yields `None`. Assignment creates intermediate
//! structure as needed: objects for key segments, arrays for index
//! segments. Any scalar standing in the way is replaced.
//!
//! Only canonical digit strings (`0`, or digits without a leading zero)
//! are array indices; `01` stays an object key. Indices are capped at
//! [`MAX_INDEX`].

use serde_json::{Map, Value};
use std::fmt;

/// Largest array index a path may address. Assignment pads arrays with
/// nulls up to the index, so the bound also caps that allocation.
pub const MAX_INDEX: usize = 65_535;

/// Errors raised while parsing a path expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path expression is the empty string.
    #[error("path is empty")]
    Empty,
    /// The path expression could not be split into segments.
    #[error("malformed path '{path}': {message}")]
    Malformed { path: String, message: String },
}

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object key.
    Key(String),
    /// Array index. Also matches the stringified key on objects.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

// ──────────────────────────────────────────────
// Parsing
// ──────────────────────────────────────────────

/// Parse a path expression into segments.
pub fn parse_path(path: &str) -> Result<Vec<Segment>, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    // Set right after a closing bracket: only '.' or '[' may follow.
    let mut after_bracket = false;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if current.is_empty() && !after_bracket {
                    return Err(malformed(path, "empty segment"));
                }
                if !current.is_empty() {
                    segments.push(key_segment(std::mem::take(&mut current)));
                }
                if chars.peek().is_none() {
                    return Err(malformed(path, "trailing '.'"));
                }
                after_bracket = false;
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(key_segment(std::mem::take(&mut current)));
                }
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return Err(malformed(path, "unclosed '['"));
                }
                segments.push(bracket_segment(path, &inner)?);
                after_bracket = true;
            }
            ']' => return Err(malformed(path, "unexpected ']'")),
            _ => {
                if after_bracket {
                    return Err(malformed(path, "expected '.' or '[' after ']'"));
                }
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        segments.push(key_segment(current));
    }

    Ok(segments)
}

fn malformed(path: &str, message: &str) -> PathError {
    PathError::Malformed {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn key_segment(raw: String) -> Segment {
    // Oversized dotted indices stay keys: they are valid object keys.
    match parse_index(&raw) {
        Some(Ok(index)) => Segment::Index(index),
        _ => Segment::Key(raw),
    }
}

fn bracket_segment(path: &str, inner: &str) -> Result<Segment, PathError> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Err(malformed(path, "empty brackets"));
    }
    for quote in ['"', '\''] {
        if inner.len() >= 2 && inner.starts_with(quote) && inner.ends_with(quote) {
            return Ok(Segment::Key(inner[1..inner.len() - 1].to_string()));
        }
    }
    match parse_index(inner) {
        Some(Ok(index)) => Ok(Segment::Index(index)),
        Some(Err(())) => Err(malformed(
            path,
            &format!("index {} exceeds maximum of {}", inner, MAX_INDEX),
        )),
        None => Ok(Segment::Key(inner.to_string())),
    }
}

/// `None` when `raw` is not a canonical index; `Some(Err(()))` when it is
/// one but lies above [`MAX_INDEX`].
fn parse_index(raw: &str) -> Option<Result<usize, ()>> {
    let canonical = raw == "0"
        || (raw.starts_with(|c: char| matches!(c, '1'..='9'))
            && raw.bytes().all(|b| b.is_ascii_digit()));
    if !canonical {
        return None;
    }
    Some(match raw.parse::<usize>() {
        Ok(index) if index <= MAX_INDEX => Ok(index),
        _ => Err(()),
    })
}

// ──────────────────────────────────────────────
// Lookup
// ──────────────────────────────────────────────

/// Look up the value at pre-parsed `segments`. An empty slice yields the root.
pub fn get_at_segments<'a>(value: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(value, |current, segment| match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key),
            (Segment::Index(index), Value::Array(items)) => items.get(*index),
            (Segment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
            _ => None,
        })
}

/// Look up the value at `path`. Malformed paths yield `None`.
pub fn get_at_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path).ok()?;
    get_at_segments(value, &segments)
}

/// Look up the value at `path`, returning a copy of `fallback` when absent.
pub fn get_at_path_or(value: &Value, path: &str, fallback: Value) -> Value {
    get_at_path(value, path).cloned().unwrap_or(fallback)
}

// ──────────────────────────────────────────────
// Assignment
// ──────────────────────────────────────────────

/// Write `new_value` at pre-parsed `segments`, creating intermediate structure.
/// An empty slice replaces the root.
pub fn set_at_segments(target: &mut Value, segments: &[Segment], new_value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = new_value;
        return;
    };

    match head {
        Segment::Key(key) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(map) = target {
                let slot = map.entry(key.clone()).or_insert(Value::Null);
                set_at_segments(slot, rest, new_value);
            }
        }
        // Out-of-range indices are never written.
        Segment::Index(index) if *index > MAX_INDEX => {}
        Segment::Index(index) => match target {
            Value::Array(items) => {
                if items.len() <= *index {
                    items.resize(index + 1, Value::Null);
                }
                set_at_segments(&mut items[*index], rest, new_value);
            }
            Value::Object(map) => {
                let slot = map.entry(index.to_string()).or_insert(Value::Null);
                set_at_segments(slot, rest, new_value);
            }
            _ => {
                *target = Value::Array(Vec::new());
                set_at_segments(target, segments, new_value);
            }
        },
    }
}

/// Write `new_value` at `path`, creating intermediate structure.
pub fn set_at_path(target: &mut Value, path: &str, new_value: Value) -> Result<(), PathError> {
    let segments = parse_path(path)?;
    set_at_segments(target, &segments, new_value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_dotted_and_bracketed_segments() {
        assert_eq!(
            parse_path("a.b[2].c").unwrap(),
            vec![
                Segment::Key("a".into()),
                Segment::Key("b".into()),
                Segment::Index(2),
                Segment::Key("c".into()),
            ]
        );
        assert_eq!(
            parse_path("items.0").unwrap(),
            vec![Segment::Key("items".into()), Segment::Index(0)]
        );
        assert_eq!(
            parse_path("meta[\"content-type\"]").unwrap(),
            vec![
                Segment::Key("meta".into()),
                Segment::Key("content-type".into())
            ]
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(parse_path(""), Err(PathError::Empty));
        assert!(matches!(parse_path("a..b"), Err(PathError::Malformed { .. })));
        assert!(matches!(parse_path("a."), Err(PathError::Malformed { .. })));
        assert!(matches!(parse_path("a[0"), Err(PathError::Malformed { .. })));
        assert!(matches!(parse_path("a[0]b"), Err(PathError::Malformed { .. })));
        assert!(matches!(parse_path("a]"), Err(PathError::Malformed { .. })));
        assert!(matches!(parse_path("a[]"), Err(PathError::Malformed { .. })));
    }

    #[test]
    fn get_walks_objects_and_arrays() {
        let data = json!({ "a": { "b": [ { "c": 1 }, { "c": 2 } ] } });
        assert_eq!(get_at_path(&data, "a.b[1].c"), Some(&json!(2)));
        assert_eq!(get_at_path(&data, "a.b.0.c"), Some(&json!(1)));
        assert_eq!(get_at_path(&data, "a.x"), None);
        assert_eq!(get_at_path(&data, "a.b[5]"), None);
        assert_eq!(get_at_path(&data, "a..b"), None);
    }

    #[test]
    fn get_does_not_descend_into_scalars() {
        let data = json!({ "a": "text" });
        assert_eq!(get_at_path(&data, "a.length"), None);
    }

    #[test]
    fn get_or_returns_fallback() {
        let data = json!({ "a": 1 });
        assert_eq!(get_at_path_or(&data, "b", json!("none")), json!("none"));
        assert_eq!(get_at_path_or(&data, "a", json!("none")), json!(1));
    }

    #[test]
    fn index_segment_matches_numeric_object_key() {
        let data = json!({ "codes": { "0": "zero" } });
        assert_eq!(get_at_path(&data, "codes.0"), Some(&json!("zero")));
    }

    #[test]
    fn zero_padded_segments_stay_keys() {
        assert_eq!(
            parse_path("codes.01").unwrap(),
            vec![Segment::Key("codes".into()), Segment::Key("01".into())]
        );
        assert_eq!(parse_path("a[007]").unwrap()[1], Segment::Key("007".into()));

        let data = json!({ "codes": { "01": "x", "1": "y" } });
        assert_eq!(get_at_path(&data, "codes.01"), Some(&json!("x")));
        assert_eq!(get_at_path(&data, "codes.1"), Some(&json!("y")));

        let mut out = json!({});
        set_at_path(&mut out, "codes.01", json!("x")).unwrap();
        assert_eq!(out, json!({ "codes": { "01": "x" } }));
    }

    #[test]
    fn oversized_bracket_indices_are_rejected() {
        for path in ["a[18446744073709551615]", "a[99999999999999999999999]", "a[65536]"] {
            assert!(
                matches!(parse_path(path), Err(PathError::Malformed { .. })),
                "{} should be rejected",
                path
            );
        }
        assert_eq!(parse_path("a[65535]").unwrap()[1], Segment::Index(MAX_INDEX));
    }

    #[test]
    fn oversized_dotted_indices_write_object_keys() {
        let mut data = json!({});
        set_at_path(&mut data, "a.10000000000", json!(1)).unwrap();
        assert_eq!(data, json!({ "a": { "10000000000": 1 } }));
        assert_eq!(get_at_path(&data, "a.10000000000"), Some(&json!(1)));
    }

    #[test]
    fn set_ignores_out_of_range_index_segments() {
        let mut data = json!([1]);
        set_at_segments(&mut data, &[Segment::Index(usize::MAX)], json!(2));
        assert_eq!(data, json!([1]));
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut data = json!({});
        set_at_path(&mut data, "profile.name.first", json!("Ada")).unwrap();
        assert_eq!(data, json!({ "profile": { "name": { "first": "Ada" } } }));
    }

    #[test]
    fn set_creates_arrays_for_index_segments() {
        let mut data = json!({});
        set_at_path(&mut data, "items[1].id", json!(7)).unwrap();
        assert_eq!(data, json!({ "items": [null, { "id": 7 }] }));
    }

    #[test]
    fn set_replaces_scalars_in_the_way() {
        let mut data = json!({ "a": 5 });
        set_at_path(&mut data, "a.b", json!(true)).unwrap();
        assert_eq!(data, json!({ "a": { "b": true } }));
    }

    #[test]
    fn set_preserves_siblings() {
        let mut data = json!({ "a": { "x": 1 } });
        set_at_path(&mut data, "a.y", json!(2)).unwrap();
        assert_eq!(data, json!({ "a": { "x": 1, "y": 2 } }));
    }

    #[test]
    fn set_rejects_malformed_path() {
        let mut data = json!({});
        assert_eq!(set_at_path(&mut data, "", json!(1)), Err(PathError::Empty));
        assert_eq!(data, json!({}));
    }

    #[test]
    fn empty_segments_address_the_root() {
        let mut data = json!({ "a": 1 });
        assert_eq!(get_at_segments(&data, &[]), Some(&json!({ "a": 1 })));
        set_at_segments(&mut data, &[], json!([1, 2]));
        assert_eq!(data, json!([1, 2]));
    }
}
