//! Configuration loading and environment parsing.

use super::validation::validate_config;
use super::Config;
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Env var holding an inline JSON document.
pub const CONFIG_JSON_ENV: &str = "PAIRLINE_CONFIG_JSON";
/// Env var that opts in to reading JSON from stdin.
pub const CONFIG_STDIN_ENV: &str = "PAIRLINE_CONFIG_STDIN";
/// Env var pointing at a config file.
pub const CONFIG_PATH_ENV: &str = "PAIRLINE_CONFIG_PATH";
/// Prefix for per-field overrides, e.g. `PAIRLINE__SERVER__LIVENESS_INTERVAL_SECS=10`.
pub const OVERRIDE_PREFIX: &str = "PAIRLINE__";

/// Load configuration with the following precedence (highest first):
/// 1) `PAIRLINE_CONFIG_JSON` env var containing raw JSON
/// 2) If `PAIRLINE_CONFIG_STDIN=true/1`, read JSON from stdin
/// 3) File pointed by `PAIRLINE_CONFIG_PATH`
/// 4) config.json in current working directory
/// 5) config.json next to the executable
/// 6) Defaults compiled into the binary
///
/// Individual fields can then be overridden with `PAIRLINE__` variables using
/// `__` as the nested separator. Read and parse failures are reported on
/// stderr and the offending source is skipped.
///
/// Validation problems are only reported here; callers that need a hard
/// failure should run [`validate_config`] on the result.
#[must_use]
pub fn load() -> Config {
    let defaults = Config::default();
    let mut merged =
        serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(Map::new()));

    // Lowest precedence first so later merges win.
    let mut file_sources = Vec::new();
    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            file_sources.push(exe_dir.join("config.json"));
        }
    }
    file_sources.push(PathBuf::from("config.json"));
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        file_sources.push(PathBuf::from(path));
    }
    for path in &file_sources {
        merge_file_source(&mut merged, path);
    }

    if env::var(CONFIG_STDIN_ENV).is_ok_and(|v| env_var_truthy(&v)) {
        let mut buf = String::new();
        match std::io::stdin().read_to_string(&mut buf) {
            Ok(_) => {
                if let Some(value) = parse_json_document(&buf, "stdin") {
                    merge_values(&mut merged, value);
                }
            }
            Err(e) => eprintln!("Failed to read config from stdin: {e}"),
        }
    }

    if let Ok(json) = env::var(CONFIG_JSON_ENV) {
        if let Some(value) = parse_json_document(&json, CONFIG_JSON_ENV) {
            merge_values(&mut merged, value);
        }
    }

    apply_env_overrides(&mut merged, env::vars());

    let config = match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to deserialize config; using defaults: {e}");
            defaults
        }
    };

    if let Err(e) = validate_config(&config) {
        eprintln!("Configuration validation error: {e}");
    }

    config
}

fn parse_json_document(raw: &str, label: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }

    serde_json::from_str(raw)
        .map_err(|err| eprintln!("Failed to parse config from {label}: {err}"))
        .ok()
}

fn merge_file_source(target: &mut Value, path: &Path) {
    if path.as_os_str().is_empty() || !path.exists() {
        return;
    }

    match fs::read_to_string(path) {
        Ok(contents) => {
            if let Some(value) = parse_json_document(&contents, &format!("file {}", path.display()))
            {
                merge_values(target, value);
            }
        }
        Err(err) => eprintln!("Failed to read config from {}: {err}", path.display()),
    }
}

/// Deep-merge `source` into `target`; objects merge per key, everything else replaces.
pub(crate) fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target_slot, source_value) => *target_slot = source_value,
    }
}

pub(crate) fn apply_env_overrides<I>(root: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, raw_value) in vars {
        let Some(stripped) = key.strip_prefix(OVERRIDE_PREFIX) else {
            continue;
        };

        let segments: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        if segments.is_empty() {
            continue;
        }

        set_nested_value(root, &segments, parse_env_value(&raw_value));
    }
}

fn env_var_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::String(String::new());
    }
    // Keep comma lists (e.g. CORS origins) as one string; config fields take them that way.
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

fn set_nested_value(target: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(map) = target else {
        return;
    };

    if rest.is_empty() {
        map.insert(head.clone(), value);
    } else {
        let entry = map
            .entry(head.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        set_nested_value(entry, rest, value);
    }
}
