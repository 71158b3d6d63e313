//! Filter language used by query predicates.
//!
//! Filters are JSON objects with a single operator key, e.g.
//! `{"and": [{"eq": ["kind", "Pod"]}, {"has": ["labels", "app"]}]}`. An attribute path is either a
//! string (one segment) or an array of segments; numeric segments index sequences. `{}` and
//! `null` match everything.
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::graph::{Edge, Node, Record};

/// Anything a filter can be evaluated against.
pub trait Attributes {
    fn attribute(&self, path: &[String]) -> Record;
}

impl Attributes for Node {
    fn attribute(&self, path: &[String]) -> Record {
        Node::attribute(self, path)
    }
}

impl Attributes for Edge {
    fn attribute(&self, path: &[String]) -> Record {
        Edge::attribute(self, path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "PathRepr")]
pub struct AttrPath(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum PathRepr {
    One(String),
    Many(Vec<Segment>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Segment {
    Key(String),
    Index(u64),
}

impl From<PathRepr> for AttrPath {
    fn from(repr: PathRepr) -> Self {
        match repr {
            PathRepr::One(s) => AttrPath(vec![s]),
            PathRepr::Many(segments) => AttrPath(
                segments
                    .into_iter()
                    .map(|s| match s {
                        Segment::Key(k) => k,
                        Segment::Index(i) => i.to_string(),
                    })
                    .collect(),
            ),
        }
    }
}

/// A compiled regular expression.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Regex::new(&raw).map(Pattern).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Eq(AttrPath, Value),
    Neq(AttrPath, Value),
    Lt(AttrPath, f64),
    Lte(AttrPath, f64),
    Gt(AttrPath, f64),
    Gte(AttrPath, f64),
    In(AttrPath, Vec<Value>),
    /// Sequence membership, substring, or map key.
    Contains(AttrPath, Value),
    Has(AttrPath),
    Regex(AttrPath, Pattern),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

/// A filter; the empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filter(Option<Condition>);

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Null => Ok(Filter::all()),
            Value::Object(map) if map.is_empty() => Ok(Filter::all()),
            _ => serde_json::from_value::<Condition>(value).map(Filter::from).map_err(de::Error::custom),
        }
    }
}

impl From<Condition> for Filter {
    fn from(condition: Condition) -> Self {
        Filter(Some(condition))
    }
}

fn loosely_equal(actual: &Record, expected: &Record) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
        _ if matches!(expected, Record::Null) => !actual.is_present(),
        _ => actual == expected,
    }
}

fn compare(actual: &Record, op: fn(f64, f64) -> bool, bound: f64) -> bool {
    actual.as_f64().is_some_and(|a| op(a, bound))
}

impl Filter {
    #[must_use]
    pub fn all() -> Self {
        Filter(None)
    }

    /// Parse a filter from its JSON form.
    ///
    /// # Errors
    /// Returns the deserialization error for unknown operators or malformed operands.
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        Filter::deserialize(value)
    }

    #[must_use]
    pub fn matches_all(&self) -> bool {
        self.0.is_none()
    }

    #[must_use]
    pub fn matches<A: Attributes + ?Sized>(&self, item: &A) -> bool {
        self.0.as_ref().map_or(true, |c| c.matches(item))
    }
}

impl Condition {
    fn matches<A: Attributes + ?Sized>(&self, item: &A) -> bool {
        match self {
            Condition::Eq(p, v) => loosely_equal(&item.attribute(&p.0), &Record::from(v)),
            Condition::Neq(p, v) => !loosely_equal(&item.attribute(&p.0), &Record::from(v)),
            Condition::Lt(p, b) => compare(&item.attribute(&p.0), |a, b| a < b, *b),
            Condition::Lte(p, b) => compare(&item.attribute(&p.0), |a, b| a <= b, *b),
            Condition::Gt(p, b) => compare(&item.attribute(&p.0), |a, b| a > b, *b),
            Condition::Gte(p, b) => compare(&item.attribute(&p.0), |a, b| a >= b, *b),
            Condition::In(p, options) => {
                let actual = item.attribute(&p.0);
                options.iter().any(|o| loosely_equal(&actual, &Record::from(o)))
            }
            Condition::Contains(p, v) => {
                let expected = Record::from(v);
                match item.attribute(&p.0) {
                    Record::Seq(items) => items.iter().any(|i| loosely_equal(i, &expected)),
                    Record::Str(s) => expected.as_str().is_some_and(|e| s.contains(e)),
                    map @ Record::Map(_) => {
                        expected.scalar_string().is_some_and(|k| map.get(&k).is_present())
                    }
                    _ => false,
                }
            }
            Condition::Has(p) => item.attribute(&p.0).is_present(),
            Condition::Regex(p, Pattern(re)) => {
                item.attribute(&p.0).scalar_string().is_some_and(|s| re.is_match(&s))
            }
            Condition::And(filters) => filters.iter().all(|f| f.matches(item)),
            Condition::Or(filters) => filters.iter().any(|f| f.matches(item)),
            Condition::Not(filter) => !filter.matches(item),
        }
    }
}
