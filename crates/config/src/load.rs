use std::{fs, path::Path};

use toml::value::{Table, Value};

use crate::{config::Config, errors::ConfigError};

/// Table key that selects the provider variant.
const KIND_KEY: &str = "kind";

/// Builds the effective config from the built-in table, an optional file and
/// `a.b.c=value` overrides, in that order.
pub fn load_config(path: Option<&Path>, overrides: &[String]) -> Result<Config, ConfigError> {
    let mut config_toml = Value::try_from(Config::default())?;

    if let Some(path) = path {
        let file_toml = load_config_from_path(path)?;
        merge_values(&mut config_toml, file_toml);
    }

    let overrides = overrides
        .iter()
        .map(|o| parse_override(o))
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let table = config_toml
        .as_table_mut()
        .ok_or(ConfigError::TraverseNonTableAt {
            key: "<root>".to_string(),
            path: "".to_string(),
        })?;

    for (path, val) in overrides {
        apply_override(&path, val, table)?;
    }

    let config = config_toml.try_into::<Config>()?;
    config.validate()?;
    Ok(config)
}

fn load_config_from_path(path: &Path) -> Result<Value, ConfigError> {
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    Ok(toml::from_str(&config_str)?)
}

/// Recursively merges `overlay` into `base`.
///
/// A provider table whose `kind` differs from the base replaces it outright,
/// since fields of one variant are meaningless for another.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base), Value::Table(overlay)) => {
            if kind_changes(base, &overlay) {
                *base = overlay;
                return;
            }
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn kind_changes(base: &Table, overlay: &Table) -> bool {
    match (base.get(KIND_KEY), overlay.get(KIND_KEY)) {
        (Some(old), Some(new)) => old != new,
        _ => false,
    }
}

/// Parses a `path.to.key=value` override.
///
/// The value is read as a TOML value when it parses as one, so
/// `general.poll_interval_ms=250` yields an integer and `logging.json_format=true`
/// a boolean. Anything else is kept as a bare string.
pub fn parse_override(s: &str) -> Result<(String, Value), ConfigError> {
    let (path, raw) = s
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidOverride(s.to_owned()))?;
    let path = path.trim();
    if path.is_empty() || path.split('.').any(|seg| seg.is_empty()) {
        return Err(ConfigError::InvalidOverride(s.to_owned()));
    }

    let raw = raw.trim();
    let value = toml::from_str::<Table>(&format!("v = {raw}"))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| Value::String(raw.to_owned()));

    Ok((path.to_owned(), value))
}

/// Applies a parsed override to the table.
///
/// Intermediate tables must already exist. The final key may be new.
pub fn apply_override(path: &str, value: Value, table: &mut Table) -> Result<(), ConfigError> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(ConfigError::InvalidOverride(path.to_owned()));
    };

    let mut cur = table;
    for (i, seg) in parents.iter().enumerate() {
        let walked = segments[..i].join(".");
        let next = cur.get_mut(*seg).ok_or_else(|| ConfigError::MissingKey {
            key: (*seg).to_owned(),
            path: walked.clone(),
        })?;
        cur = next
            .as_table_mut()
            .ok_or_else(|| ConfigError::TraverseNonTableAt {
                key: (*seg).to_owned(),
                path: walked,
            })?;
    }

    cur.insert((*leaf).to_owned(), value);
    Ok(())
}
