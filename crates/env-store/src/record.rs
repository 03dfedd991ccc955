use std::{
    collections::{btree_map, BTreeMap},
    fmt::Write,
};

use crate::errors::EnvStoreError;

/// Flat parameter map of the active provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvRecord(BTreeMap<String, String>);

impl EnvRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Inserts a pair, rejecting anything a shell could not source back.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), EnvStoreError> {
        let key = key.into();
        let value = value.into();
        if !is_valid_key(&key) {
            return Err(EnvStoreError::InvalidKey(key));
        }
        if value.contains(['\n', '\r']) {
            return Err(EnvStoreError::InvalidValue(key));
        }
        self.0.insert(key, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Fails with every absent or empty key listed.
    pub fn require<S: AsRef<str>>(&self, keys: &[S]) -> Result<(), EnvStoreError> {
        let missing: Vec<String> = keys
            .iter()
            .map(AsRef::as_ref)
            .filter(|k| self.get(k).map_or(true, str::is_empty))
            .map(str::to_owned)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EnvStoreError::MissingKeys(missing))
        }
    }

    /// Parses the on-disk format.
    pub fn parse(input: &str) -> Result<Self, EnvStoreError> {
        let mut record = Self::new();
        for (idx, raw) in input.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
            let (key, value) = line.split_once('=').ok_or_else(|| EnvStoreError::Malformed {
                line: idx + 1,
                content: raw.to_owned(),
            })?;
            let key = key.trim();
            if !is_valid_key(key) {
                return Err(EnvStoreError::Malformed {
                    line: idx + 1,
                    content: raw.to_owned(),
                });
            }
            record.0.insert(key.to_owned(), unquote(value.trim()).to_owned());
        }
        Ok(record)
    }

    /// Renders the record in sorted key order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.0 {
            let _ = writeln!(out, "{key}={}", quote(value));
        }
        out
    }
}

impl<'a> IntoIterator for &'a EnvRecord {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Quotes values a POSIX shell would otherwise split or expand.
fn quote(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-.:/@+,".contains(c));
    if plain && !value.is_empty() {
        value.to_owned()
    } else {
        format!("'{value}'")
    }
}
