//! `LNDLINK_*` environment variable fallbacks.
//!
//! A variable only applies when the config file left its field unset.

use std::collections::HashMap;

use tracing::warn;

/// Prefix of every recognised variable.
pub const ENV_PREFIX: &str = "LNDLINK_";

/// Variable name suffix to dotted config field.
const ENV_FIELDS: &[(&str, &str, FieldKind)] = &[
    ("ADDRESS", "lnd.address", FieldKind::Str),
    ("NETWORK", "lnd.network", FieldKind::Str),
    ("MACAROON_DIR", "lnd.macaroon_dir", FieldKind::Str),
    ("MACAROON_PATH", "lnd.macaroon_path", FieldKind::Str),
    ("MACAROON_HEX", "lnd.macaroon_hex", FieldKind::Str),
    ("TLS_PATH", "lnd.tls_path", FieldKind::Str),
    ("MIN_VERSION", "lnd.min_version", FieldKind::Str),
    ("WAIT_SYNC", "sync.wait", FieldKind::Bool),
    ("LOG_LEVEL", "logging.level", FieldKind::Str),
    ("LOG_FORMAT", "logging.format", FieldKind::Str),
];

#[derive(Clone, Copy)]
enum FieldKind {
    Str,
    Bool,
}

/// Snapshot the `LNDLINK_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect()
}

/// Apply variables from `env` to fields of `merged` that `file` did not set.
///
/// Returns how many fields were filled from the environment. Boolean
/// variables that do not parse are ignored.
pub fn apply_env_fallbacks(
    merged: &mut toml::Value,
    file: Option<&toml::Value>,
    env: &HashMap<String, String>,
) -> usize {
    let mut applied: usize = 0;

    for (suffix, field, kind) in ENV_FIELDS {
        let Some(raw) = env.get(&format!("{ENV_PREFIX}{suffix}")) else {
            continue;
        };
        if file.is_some_and(|f| lookup(f, field).is_some()) {
            continue;
        }
        let value = match kind {
            FieldKind::Str => toml::Value::String(raw.clone()),
            FieldKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => toml::Value::Boolean(true),
                "0" | "false" | "no" => toml::Value::Boolean(false),
                _ => {
                    warn!(var = *suffix, "ignoring non-boolean environment value");
                    continue;
                },
            },
        };
        if set(merged, field, value) {
            applied = applied.saturating_add(1);
        }
    }

    applied
}

fn lookup<'a>(root: &'a toml::Value, dotted: &str) -> Option<&'a toml::Value> {
    dotted.split('.').try_fold(root, |node, key| node.get(key))
}

fn set(root: &mut toml::Value, dotted: &str, value: toml::Value) -> bool {
    let Some((section, key)) = dotted.split_once('.') else {
        return false;
    };
    let Some(table) = root.as_table_mut() else {
        return false;
    };
    let section = table
        .entry(section)
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    match section.as_table_mut() {
        Some(section) => {
            section.insert(key.to_owned(), value);
            true
        },
        None => false,
    }
}
