//! Lenient recursive view over manifest documents.
//!
//! A `Record` is the tagged union every manifest is converted into after YAML parsing.
//! Field access never fails: looking up a key that is missing (or indexing into a value
//! that is not a map) yields [`Record::Absent`], so rules can walk `spec.template.spec`
//! without checking every level.
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

static ABSENT: Record = Record::Absent;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Record {
    /// Marker returned for fields that do not exist.
    #[default]
    Absent,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Record>),
    /// Entries keep their document order.
    Map(Vec<(String, Record)>),
}

impl Record {
    #[must_use]
    pub fn map() -> Self {
        Record::Map(Vec::new())
    }

    /// Look up `key` in a map, or an index in a sequence when `key` is numeric.
    #[must_use]
    pub fn get(&self, key: &str) -> &Record {
        match self {
            Record::Map(entries) => {
                entries.iter().find(|(k, _)| k == key).map_or(&ABSENT, |(_, v)| v)
            }
            Record::Seq(items) => {
                key.parse::<usize>().ok().and_then(|i| items.get(i)).unwrap_or(&ABSENT)
            }
            _ => &ABSENT,
        }
    }

    /// Walk a sequence of keys, e.g. `["spec", "selector", "matchLabels"]`.
    #[must_use]
    pub fn path<S: AsRef<str>>(&self, segments: &[S]) -> &Record {
        segments.iter().fold(self, |cur, seg| cur.get(seg.as_ref()))
    }

    #[must_use]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Record> {
        match self {
            Record::Map(entries) => entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Insert or replace `key`. Absent and null values are turned into an empty map first;
    /// any other non-map value is left untouched.
    pub fn insert(&mut self, key: &str, value: Record) {
        if matches!(self, Record::Absent | Record::Null) {
            *self = Record::map();
        }
        if let Record::Map(entries) = self {
            match entries.iter_mut().find(|(k, _)| k == key) {
                Some((_, slot)) => *slot = value,
                None => entries.push((key.to_string(), value)),
            }
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Record::Absent)
    }

    /// True for anything except `Absent` and `Null`.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Record::Absent | Record::Null)
    }

    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Record::Int(_) | Record::Float(_))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Record::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Record::Int(i) => Some(*i),
            Record::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Record::Int(i) => Some(*i as f64),
            Record::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_seq(&self) -> Option<&[Record]> {
        match self {
            Record::Seq(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&[(String, Record)]> {
        match self {
            Record::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Render a scalar as text (`"web"`, `"3"`, `"true"`); `None` for containers and absent values.
    #[must_use]
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            Record::Str(s) => Some(s.clone()),
            Record::Int(i) => Some(i.to_string()),
            Record::Float(f) => Some(f.to_string()),
            Record::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Map entries with scalar values, in document order. Used for labels, annotations and
    /// selectors, where nested values carry no key/value meaning.
    #[must_use]
    pub fn string_pairs(&self) -> Vec<(String, String)> {
        self.as_map()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(k, v)| v.scalar_string().map(|s| (k.clone(), s)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Keys of a map value, in document order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.as_map().map(|entries| entries.iter().map(|(k, _)| k.clone()).collect()).unwrap_or_default()
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other).map(|s| s.trim().to_string()).unwrap_or_default(),
    }
}

impl From<serde_yaml::Value> for Record {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Record::Null,
            serde_yaml::Value::Bool(b) => Record::Bool(b),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => Record::Int(i),
                None => n.as_f64().map_or(Record::Null, Record::Float),
            },
            serde_yaml::Value::String(s) => Record::Str(s),
            serde_yaml::Value::Sequence(items) => {
                Record::Seq(items.into_iter().map(Record::from).collect())
            }
            serde_yaml::Value::Mapping(map) => {
                Record::Map(map.into_iter().map(|(k, v)| (yaml_key(k), Record::from(v))).collect())
            }
            serde_yaml::Value::Tagged(tagged) => Record::from(tagged.value),
        }
    }
}

impl From<&serde_json::Value> for Record {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Record::Null,
            serde_json::Value::Bool(b) => Record::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Record::Int(i),
                None => n.as_f64().map_or(Record::Null, Record::Float),
            },
            serde_json::Value::String(s) => Record::Str(s.clone()),
            serde_json::Value::Array(items) => Record::Seq(items.iter().map(Record::from).collect()),
            serde_json::Value::Object(map) => {
                Record::Map(map.iter().map(|(k, v)| (k.clone(), Record::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Record {
    fn from(value: &str) -> Self {
        Record::Str(value.to_string())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Record::Absent | Record::Null => serializer.serialize_none(),
            Record::Bool(b) => serializer.serialize_bool(*b),
            Record::Int(i) => serializer.serialize_i64(*i),
            Record::Float(f) => serializer.serialize_f64(*f),
            Record::Str(s) => serializer.serialize_str(s),
            Record::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Record::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}
