//! Typed view of a search index.
//!
//! Conversion to and from [`serde_json::Value`] is lossless: every encoding
//! variant the documentation builder emits is kept as it was read, and unknown
//! top-level keys are carried in [`SearchIndex::extra`].

use crate::error::ModelError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The postings recorded for one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Postings {
    /// A bare document index (`term:3`).
    Single(usize),
    /// A list of document indices (`term:[0,3,8]`).
    List(Vec<usize>),
    /// Detailed records (`term:[[0,1,1,""]]`).
    Detailed(Vec<Posting>),
}

impl Postings {
    /// Document indices in file order.
    pub fn docs(&self) -> Vec<usize> {
        match self {
            Self::Single(doc) => vec![*doc],
            Self::List(docs) => docs.clone(),
            Self::Detailed(records) => records.iter().map(|p| p.doc).collect(),
        }
    }

    /// Postings normalised to full records.
    pub fn records(&self) -> Vec<Posting> {
        match self {
            Self::Single(doc) => vec![Posting::new(*doc)],
            Self::List(docs) => docs.iter().copied().map(Posting::new).collect(),
            Self::Detailed(records) => records.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::List(docs) => docs.len(),
            Self::Detailed(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, doc: usize) -> bool {
        match self {
            Self::Single(d) => *d == doc,
            Self::List(docs) => docs.contains(&doc),
            Self::Detailed(records) => records.iter().any(|p| p.doc == doc),
        }
    }

    fn from_value(value: &Value, path: &str) -> Result<Self, ModelError> {
        match value {
            Value::Number(_) => as_index(value, path).map(Self::Single),
            Value::Array(items) if items.iter().any(Value::is_array) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Posting::from_value(item, &format!("{}[{}]", path, i)))
                .collect::<Result<_, _>>()
                .map(Self::Detailed),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| as_index(item, &format!("{}[{}]", path, i)))
                .collect::<Result<_, _>>()
                .map(Self::List),
            _ => Err(ModelError::new(path, "a document index or a list of postings")),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Single(doc) => Value::from(*doc),
            Self::List(docs) => Value::from(docs.clone()),
            Self::Detailed(records) => Value::Array(records.iter().map(Posting::to_value).collect()),
        }
    }
}

/// One detailed posting: `[doc, weight, flags, anchor]`.
///
/// Trailing fields are optional in the file; absent ones stay absent when written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc: usize,
    pub weight: Option<i64>,
    pub flags: Option<i64>,
    pub anchor: Option<String>,
}

impl Posting {
    pub const fn new(doc: usize) -> Self {
        Self {
            doc,
            weight: None,
            flags: None,
            anchor: None,
        }
    }

    /// Relevance weight, `1` when the record does not carry one.
    pub fn weight(&self) -> i64 {
        self.weight.unwrap_or(1)
    }

    pub fn flags(&self) -> i64 {
        self.flags.unwrap_or(0)
    }

    pub fn anchor(&self) -> &str {
        self.anchor.as_deref().unwrap_or("")
    }

    fn from_value(value: &Value, path: &str) -> Result<Self, ModelError> {
        const EXPECTED: &str = "a posting record [doc, weight?, flags?, anchor?]";
        let Some(fields) = value.as_array().filter(|f| (1..=4).contains(&f.len())) else {
            return Err(ModelError::new(path, EXPECTED));
        };
        let doc = as_index(&fields[0], &format!("{}[0]", path))?;
        let weight = fields
            .get(1)
            .map(|v| v.as_i64().ok_or_else(|| ModelError::new(format!("{}[1]", path), "an integer weight")))
            .transpose()?;
        let flags = fields
            .get(2)
            .map(|v| v.as_i64().ok_or_else(|| ModelError::new(format!("{}[2]", path), "integer flags")))
            .transpose()?;
        let anchor = fields
            .get(3)
            .map(|v| as_string(v, &format!("{}[3]", path)))
            .transpose()?;
        Ok(Self {
            doc,
            weight,
            flags,
            anchor,
        })
    }

    fn to_value(&self) -> Value {
        let mut fields = vec![Value::from(self.doc)];
        // Positional record: a later field forces the earlier ones to be written.
        let width = if self.anchor.is_some() {
            4
        } else if self.flags.is_some() {
            3
        } else if self.weight.is_some() {
            2
        } else {
            1
        };
        if width >= 2 {
            fields.push(Value::from(self.weight()));
        }
        if width >= 3 {
            fields.push(Value::from(self.flags()));
        }
        if width >= 4 {
            fields.push(Value::from(self.anchor()));
        }
        Value::Array(fields)
    }
}

/// A documented object registered by a domain (directive, option, module, setting...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub name: String,
    pub doc: usize,
    /// Key into `objtypes` / `objnames`
    pub objtype: usize,
    /// 0 important, 1 default, 2 unimportant, -1 hidden
    pub priority: i64,
    /// `""` means the full name, `"-"` means `<role>-<fullname>`
    pub anchor: String,
}

impl ObjectEntry {
    fn from_fields(name: String, fields: &[Value], path: &str) -> Result<Self, ModelError> {
        Ok(Self {
            name,
            doc: as_index(&fields[0], &format!("{}[0]", path))?,
            objtype: as_index(&fields[1], &format!("{}[1]", path))?,
            priority: fields[2]
                .as_i64()
                .ok_or_else(|| ModelError::new(format!("{}[2]", path), "an integer priority"))?,
            anchor: as_string(&fields[3], &format!("{}[3]", path))?,
        })
    }

    fn to_fields(&self) -> Vec<Value> {
        vec![
            Value::from(self.doc),
            Value::from(self.objtype),
            Value::from(self.priority),
            Value::from(self.anchor.as_str()),
        ]
    }
}

/// Objects grouped by namespace prefix, in whichever layout the builder used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Objects {
    /// `prefix -> {name -> [doc, objtype, prio, anchor]}`
    Named(BTreeMap<String, BTreeMap<String, ObjectEntry>>),
    /// `prefix -> [[doc, objtype, prio, anchor, name], ...]`
    Listed(BTreeMap<String, Vec<ObjectEntry>>),
}

impl Default for Objects {
    fn default() -> Self {
        Self::Named(BTreeMap::new())
    }
}

impl Objects {
    /// Every `(prefix, entry)` pair, grouped by prefix.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&str, &ObjectEntry)> + '_> {
        match self {
            Self::Named(prefixes) => Box::new(
                prefixes
                    .iter()
                    .flat_map(|(prefix, entries)| entries.values().map(move |e| (prefix.as_str(), e))),
            ),
            Self::Listed(prefixes) => Box::new(
                prefixes
                    .iter()
                    .flat_map(|(prefix, entries)| entries.iter().map(move |e| (prefix.as_str(), e))),
            ),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Named(prefixes) => prefixes.values().map(BTreeMap::len).sum(),
            Self::Listed(prefixes) => prefixes.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn from_value(value: &Value) -> Result<Self, ModelError> {
        let map = value
            .as_object()
            .ok_or_else(|| ModelError::new("objects", "an object keyed by prefix"))?;

        let listed = map.values().next().is_some_and(Value::is_array);
        if listed {
            let mut prefixes = BTreeMap::new();
            for (prefix, entries) in map {
                let path = format!("objects.{}", prefix);
                let entries = entries
                    .as_array()
                    .ok_or_else(|| ModelError::new(path.clone(), "a list of object records"))?;
                let parsed = entries
                    .iter()
                    .enumerate()
                    .map(|(i, record)| {
                        let path = format!("{}[{}]", path, i);
                        let fields = record
                            .as_array()
                            .filter(|f| f.len() == 5)
                            .ok_or_else(|| ModelError::new(path.clone(), "[doc, objtype, prio, anchor, name]"))?;
                        let name = as_string(&fields[4], &format!("{}[4]", path))?;
                        ObjectEntry::from_fields(name, fields, &path)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                prefixes.insert(prefix.clone(), parsed);
            }
            Ok(Self::Listed(prefixes))
        } else {
            let mut prefixes = BTreeMap::new();
            for (prefix, entries) in map {
                let path = format!("objects.{}", prefix);
                let entries = entries
                    .as_object()
                    .ok_or_else(|| ModelError::new(path.clone(), "an object keyed by name"))?;
                let mut parsed = BTreeMap::new();
                for (name, record) in entries {
                    let path = format!("{}.{}", path, name);
                    let fields = record
                        .as_array()
                        .filter(|f| f.len() == 4)
                        .ok_or_else(|| ModelError::new(path.clone(), "[doc, objtype, prio, anchor]"))?;
                    parsed.insert(name.clone(), ObjectEntry::from_fields(name.clone(), fields, &path)?);
                }
                prefixes.insert(prefix.clone(), parsed);
            }
            Ok(Self::Named(prefixes))
        }
    }

    fn to_value(&self) -> Value {
        let mut out = Map::new();
        match self {
            Self::Named(prefixes) => {
                for (prefix, entries) in prefixes {
                    let entries: Map<String, Value> = entries
                        .iter()
                        .map(|(name, entry)| (name.clone(), Value::Array(entry.to_fields())))
                        .collect();
                    out.insert(prefix.clone(), Value::Object(entries));
                }
            }
            Self::Listed(prefixes) => {
                for (prefix, entries) in prefixes {
                    let entries = entries
                        .iter()
                        .map(|entry| {
                            let mut fields = entry.to_fields();
                            fields.push(Value::from(entry.name.as_str()));
                            Value::Array(fields)
                        })
                        .collect();
                    out.insert(prefix.clone(), Value::Array(entries));
                }
            }
        }
        Value::Object(out)
    }
}

/// `[domain, role, label]`, e.g. `["rst", "directive", "reStructuredText directive"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    pub domain: String,
    pub role: String,
    pub label: String,
}

/// Schema markers for the consuming renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvVersion {
    /// Single environment version number, as very old builders wrote it.
    Schema(i64),
    /// Version per domain/extension plus a `sphinx` entry.
    Extensions(BTreeMap<String, i64>),
}

impl EnvVersion {
    /// The builder's own environment schema number.
    pub fn sphinx(&self) -> Option<i64> {
        match self {
            Self::Schema(v) => Some(*v),
            Self::Extensions(map) => map.get("sphinx").copied(),
        }
    }
}

impl std::fmt::Display for EnvVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schema(v) => write!(f, "{}", v),
            Self::Extensions(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

/// A complete documentation search index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchIndex {
    pub docnames: Vec<String>,
    pub filenames: Option<Vec<String>>,
    pub titles: Vec<String>,
    pub terms: BTreeMap<String, Postings>,
    pub titleterms: Option<BTreeMap<String, Postings>>,
    pub objects: Option<Objects>,
    pub objtypes: Option<BTreeMap<String, String>>,
    pub objnames: Option<BTreeMap<String, ObjectName>>,
    pub envversion: Option<EnvVersion>,
    /// Top-level keys this model does not interpret (`alltitles`, `indexentries`, ...)
    pub extra: Map<String, Value>,
}

impl SearchIndex {
    /// Builds the typed index from a parsed literal.
    pub fn from_value(value: &Value) -> Result<Self, ModelError> {
        let root = value
            .as_object()
            .ok_or_else(|| ModelError::new("<root>", "an object"))?;

        let mut index = Self::default();
        for (key, value) in root {
            match key.as_str() {
                "docnames" => index.docnames = string_list(value, "docnames")?,
                "filenames" => index.filenames = Some(string_list(value, "filenames")?),
                "titles" => index.titles = string_list(value, "titles")?,
                "terms" => index.terms = term_map(value, "terms")?,
                "titleterms" => index.titleterms = Some(term_map(value, "titleterms")?),
                "objects" => index.objects = Some(Objects::from_value(value)?),
                "objtypes" => index.objtypes = Some(objtypes(value)?),
                "objnames" => index.objnames = Some(objnames(value)?),
                "envversion" => index.envversion = Some(envversion(value)?),
                _ => {
                    index.extra.insert(key.clone(), value.clone());
                }
            }
        }

        for required in ["docnames", "titles", "terms"] {
            if !root.contains_key(required) {
                return Err(ModelError::new(required, "a required field"));
            }
        }

        Ok(index)
    }

    /// Converts back to a literal value holding exactly the fields that were read.
    pub fn to_value(&self) -> Value {
        let mut root = self.extra.clone();
        root.insert("docnames".into(), Value::from(self.docnames.clone()));
        root.insert("titles".into(), Value::from(self.titles.clone()));
        root.insert("terms".into(), term_map_value(&self.terms));
        if let Some(filenames) = &self.filenames {
            root.insert("filenames".into(), Value::from(filenames.clone()));
        }
        if let Some(titleterms) = &self.titleterms {
            root.insert("titleterms".into(), term_map_value(titleterms));
        }
        if let Some(objects) = &self.objects {
            root.insert("objects".into(), objects.to_value());
        }
        if let Some(objtypes) = &self.objtypes {
            let map = objtypes
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect();
            root.insert("objtypes".into(), Value::Object(map));
        }
        if let Some(objnames) = &self.objnames {
            let map = objnames
                .iter()
                .map(|(k, n)| {
                    let triple = vec![n.domain.as_str(), n.role.as_str(), n.label.as_str()];
                    (k.clone(), Value::from(triple))
                })
                .collect();
            root.insert("objnames".into(), Value::Object(map));
        }
        match &self.envversion {
            Some(EnvVersion::Schema(v)) => {
                root.insert("envversion".into(), Value::from(*v));
            }
            Some(EnvVersion::Extensions(map)) => {
                let map = map.iter().map(|(k, v)| (k.clone(), Value::from(*v))).collect();
                root.insert("envversion".into(), Value::Object(map));
            }
            None => {}
        }
        Value::Object(root)
    }
}

fn as_index(value: &Value, path: &str) -> Result<usize, ModelError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ModelError::new(path, "a non-negative integer"))
}

fn as_string(value: &Value, path: &str) -> Result<String, ModelError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ModelError::new(path, "a string"))
}

fn string_list(value: &Value, path: &str) -> Result<Vec<String>, ModelError> {
    let items = value
        .as_array()
        .ok_or_else(|| ModelError::new(path, "a list of strings"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| as_string(item, &format!("{}[{}]", path, i)))
        .collect()
}

fn term_map(value: &Value, path: &str) -> Result<BTreeMap<String, Postings>, ModelError> {
    let map = value
        .as_object()
        .ok_or_else(|| ModelError::new(path, "an object keyed by term"))?;
    map.iter()
        .map(|(term, postings)| {
            Postings::from_value(postings, &format!("{}.{}", path, term)).map(|p| (term.clone(), p))
        })
        .collect()
}

fn term_map_value(terms: &BTreeMap<String, Postings>) -> Value {
    Value::Object(
        terms
            .iter()
            .map(|(term, postings)| (term.clone(), postings.to_value()))
            .collect(),
    )
}

fn objtypes(value: &Value) -> Result<BTreeMap<String, String>, ModelError> {
    let map = value
        .as_object()
        .ok_or_else(|| ModelError::new("objtypes", "an object keyed by type index"))?;
    map.iter()
        .map(|(k, v)| as_string(v, &format!("objtypes.{}", k)).map(|s| (k.clone(), s)))
        .collect()
}

fn objnames(value: &Value) -> Result<BTreeMap<String, ObjectName>, ModelError> {
    let map = value
        .as_object()
        .ok_or_else(|| ModelError::new("objnames", "an object keyed by type index"))?;
    map.iter()
        .map(|(k, v)| {
            let path = format!("objnames.{}", k);
            let triple = string_list(v, &path)?;
            let [domain, role, label] = <[String; 3]>::try_from(triple)
                .map_err(|_| ModelError::new(path, "[domain, role, label]"))?;
            Ok((k.clone(), ObjectName { domain, role, label }))
        })
        .collect()
}

fn envversion(value: &Value) -> Result<EnvVersion, ModelError> {
    match value {
        Value::Number(_) => value
            .as_i64()
            .map(EnvVersion::Schema)
            .ok_or_else(|| ModelError::new("envversion", "an integer")),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                v.as_i64()
                    .map(|n| (k.clone(), n))
                    .ok_or_else(|| ModelError::new(format!("envversion.{}", k), "an integer"))
            })
            .collect::<Result<_, _>>()
            .map(EnvVersion::Extensions),
        _ => Err(ModelError::new("envversion", "an integer or an object of integers")),
    }
}
