//! Column values: atoms, sets, maps, and rows.
//!
//! Column data travels as a small tagged union with context-sensitive JSON
//! encodings (RFC 7047 section 5.1). Scalars are bare JSON values; UUID
//! references and in-transaction placeholders are 2-element tagged arrays;
//! sets and maps are tagged arrays too. Nothing in the encoding says which
//! alternative a given JSON array is, so decoding without a schema is an
//! ordered attempt: atom first, then set, then map.

use crate::error::ProtocolError;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::{json, Value as Json};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A single scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    /// A reference to a row, by its UUID.
    Uuid(Uuid),
    /// A placeholder reference to a row inserted earlier in the same
    /// transaction, resolved server-side before commit.
    NamedUuid(String),
}

impl Atom {
    /// Encodes the atom into its wire form.
    ///
    /// Scalars encode as bare JSON values; the reference kinds encode as
    /// `["uuid", "<text>"]` and `["named-uuid", "<id>"]`.
    pub fn to_json(&self) -> Json {
        match self {
            Atom::String(s) => Json::String(s.clone()),
            Atom::Integer(i) => json!(i),
            Atom::Real(r) => json!(r),
            Atom::Boolean(b) => Json::Bool(*b),
            Atom::Uuid(u) => json!(["uuid", u.to_string()]),
            Atom::NamedUuid(name) => json!(["named-uuid", name]),
        }
    }

    /// Decodes an atom from its wire form.
    ///
    /// Arrays that are not a well-formed 2-element `uuid`/`named-uuid` pair
    /// are rejected, which is what lets the ordered value decode fall
    /// through to the set and map alternatives.
    pub fn from_json(json: &Json) -> Result<Self, ProtocolError> {
        match json {
            Json::String(s) => Ok(Atom::String(s.clone())),
            Json::Bool(b) => Ok(Atom::Boolean(*b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Atom::Integer(i))
                } else if let Some(r) = n.as_f64() {
                    Ok(Atom::Real(r))
                } else {
                    Err(ProtocolError::InvalidAtom(format!(
                        "number out of range: {n}"
                    )))
                }
            }
            Json::Array(items) => Self::from_tagged_pair(items),
            other => Err(ProtocolError::InvalidAtom(format!(
                "expected scalar or tagged pair, got {other}"
            ))),
        }
    }

    fn from_tagged_pair(items: &[Json]) -> Result<Self, ProtocolError> {
        if items.len() != 2 {
            return Err(ProtocolError::InvalidAtom(format!(
                "tagged pair has {} elements",
                items.len()
            )));
        }
        let tag = items[0].as_str().ok_or_else(|| {
            ProtocolError::InvalidAtom("tag is not a string".to_string())
        })?;
        match tag {
            "uuid" => {
                let text = items[1]
                    .as_str()
                    .ok_or_else(|| ProtocolError::InvalidUuid(items[1].to_string()))?;
                parse_uuid(text).map(Atom::Uuid)
            }
            "named-uuid" => {
                let name = items[1].as_str().ok_or_else(|| {
                    ProtocolError::InvalidAtom("named-uuid id is not a string".to_string())
                })?;
                Ok(Atom::NamedUuid(name.to_string()))
            }
            other => Err(ProtocolError::InvalidAtom(format!(
                "unknown tag {other:?}"
            ))),
        }
    }
}

/// Parses the 36-character hyphenated UUID form and nothing else.
fn parse_uuid(text: &str) -> Result<Uuid, ProtocolError> {
    if text.len() != 36 {
        return Err(ProtocolError::InvalidUuid(text.to_string()));
    }
    Uuid::parse_str(text).map_err(|_| ProtocolError::InvalidUuid(text.to_string()))
}

impl From<&str> for Atom {
    fn from(s: &str) -> Self {
        Atom::String(s.to_string())
    }
}

impl From<String> for Atom {
    fn from(s: String) -> Self {
        Atom::String(s)
    }
}

impl From<i64> for Atom {
    fn from(i: i64) -> Self {
        Atom::Integer(i)
    }
}

impl From<f64> for Atom {
    fn from(r: f64) -> Self {
        Atom::Real(r)
    }
}

impl From<bool> for Atom {
    fn from(b: bool) -> Self {
        Atom::Boolean(b)
    }
}

impl From<Uuid> for Atom {
    fn from(u: Uuid) -> Self {
        Atom::Uuid(u)
    }
}

impl Serialize for Atom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Atom {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Atom::from_json(&json).map_err(serde::de::Error::custom)
    }
}

/// A column value: a single atom, a set of atoms, or a map of atom pairs.
///
/// Sets and maps are unordered on the wire; equality ignores element order.
#[derive(Debug, Clone)]
pub enum Value {
    Atom(Atom),
    Set(Vec<Atom>),
    Map(Vec<(Atom, Atom)>),
}

impl Value {
    /// Builds a set value from anything atom-convertible.
    pub fn set<I, T>(atoms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Atom>,
    {
        Value::Set(atoms.into_iter().map(Into::into).collect())
    }

    /// Builds a map value from anything atom-convertible.
    pub fn map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Atom>,
        V: Into<Atom>,
    {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Encodes the value into its wire form.
    ///
    /// Sets always encode in the tagged `["set", [...]]` form, even for a
    /// single element; the bare-atom shorthand is accepted on decode only.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Atom(atom) => atom.to_json(),
            Value::Set(atoms) => {
                let items: Vec<Json> = atoms.iter().map(Atom::to_json).collect();
                json!(["set", items])
            }
            Value::Map(pairs) => {
                let entries: Vec<Json> = pairs
                    .iter()
                    .map(|(k, v)| json!([k.to_json(), v.to_json()]))
                    .collect();
                json!(["map", entries])
            }
        }
    }

    /// Decodes a value without schema knowledge: first as an atom, then as
    /// a set, then as a map, accepting the first well-formed parse.
    pub fn from_json(json: &Json) -> Result<Self, ProtocolError> {
        if let Ok(atom) = Atom::from_json(json) {
            return Ok(Value::Atom(atom));
        }
        if let Ok(set) = Self::set_from_json(json) {
            return Ok(set);
        }
        if let Ok(map) = Self::map_from_json(json) {
            return Ok(map);
        }
        Err(ProtocolError::InvalidValue(json.to_string()))
    }

    /// Decodes a value known from context to be a set.
    ///
    /// A bare atom is the permitted shorthand for a one-element set and
    /// decodes as such here.
    pub fn set_from_json(json: &Json) -> Result<Self, ProtocolError> {
        if let Ok(atom) = Atom::from_json(json) {
            return Ok(Value::Set(vec![atom]));
        }
        match json {
            Json::Array(items) if items.len() == 2 && items[0] == "set" => {
                let elements = items[1].as_array().ok_or_else(|| {
                    ProtocolError::InvalidSet("elements are not an array".to_string())
                })?;
                let atoms = elements
                    .iter()
                    .map(Atom::from_json)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| ProtocolError::InvalidSet(e.to_string()))?;
                Ok(Value::Set(atoms))
            }
            other => Err(ProtocolError::InvalidSet(other.to_string())),
        }
    }

    /// Decodes a value known from context to be a map.
    pub fn map_from_json(json: &Json) -> Result<Self, ProtocolError> {
        match json {
            Json::Array(items) if items.len() == 2 && items[0] == "map" => {
                let entries = items[1].as_array().ok_or_else(|| {
                    ProtocolError::InvalidMap("entries are not an array".to_string())
                })?;
                let pairs = entries
                    .iter()
                    .map(|entry| {
                        let pair = entry
                            .as_array()
                            .filter(|p| p.len() == 2)
                            .ok_or_else(|| {
                                ProtocolError::InvalidMap(format!(
                                    "entry is not a 2-element array: {entry}"
                                ))
                            })?;
                        let key = Atom::from_json(&pair[0])
                            .map_err(|e| ProtocolError::InvalidMap(e.to_string()))?;
                        let value = Atom::from_json(&pair[1])
                            .map_err(|e| ProtocolError::InvalidMap(e.to_string()))?;
                        Ok((key, value))
                    })
                    .collect::<Result<Vec<_>, ProtocolError>>()?;
                Ok(Value::Map(pairs))
            }
            other => Err(ProtocolError::InvalidMap(other.to_string())),
        }
    }

    /// Returns the atom if this value is one.
    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Value::Atom(atom) => Some(atom),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Atom(a), Value::Atom(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => unordered_eq(a, b),
            (Value::Map(a), Value::Map(b)) => unordered_eq(a, b),
            _ => false,
        }
    }
}

/// Multiset equality for wire collections, which carry no defined order.
fn unordered_eq<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut unmatched: Vec<&T> = b.iter().collect();
    for item in a {
        match unmatched.iter().position(|candidate| *candidate == item) {
            Some(i) => {
                unmatched.swap_remove(i);
            }
            None => return false,
        }
    }
    true
}

impl From<Atom> for Value {
    fn from(atom: Atom) -> Self {
        Value::Atom(atom)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Atom(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Atom(s.into())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Atom(i.into())
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Atom(r.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Atom(b.into())
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Atom(u.into())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Value::from_json(&json).map_err(serde::de::Error::custom)
    }
}

/// A row: a mapping from column name to value.
///
/// Rows have no identity of their own; two rows are equal iff their column
/// maps are equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column insertion.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.columns.iter()
    }

    /// Encodes the row as a JSON object.
    pub fn to_json(&self) -> Json {
        let map = self
            .columns
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<String, Json>>();
        Json::Object(map)
    }

    /// Decodes a row, running the ordered value decode on each member
    /// independently.
    pub fn from_json(json: &Json) -> Result<Self, ProtocolError> {
        let obj = json.as_object().ok_or_else(|| {
            ProtocolError::InvalidValue(format!("row is not an object: {json}"))
        })?;
        let mut columns = BTreeMap::new();
        for (name, value) in obj {
            columns.insert(name.clone(), Value::from_json(value)?);
        }
        Ok(Row { columns })
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row {
            columns: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Row::from_json(&json).map_err(serde::de::Error::custom)
    }
}
