/*!
 * Splitting cells into translatable segments and putting them back together.
 *
 * - `Plain`: the whole cell, surrounding whitespace kept around the translation
 * - `Set`: separator-delimited elements, each trimmed and translated on its own
 * - `Json`: object keys and/or string values; links (`http...`) are left alone
 */

use std::collections::HashMap;

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::app_config::JsonFieldConfig;

/// How a column's cells are translated
#[derive(Debug, Clone, Copy)]
pub enum CellKind<'a> {
    /// The whole cell is one segment
    Plain,
    /// Elements separated by the given separator
    Set { separator: &'a str },
    /// A JSON object
    Json(&'a JsonFieldConfig),
}

impl CellKind<'_> {
    /// Segments of a cell that need translation, in order of appearance
    pub fn segments(&self, value: &str) -> Vec<String> {
        match self {
            CellKind::Plain => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Vec::new()
                } else {
                    vec![trimmed.to_string()]
                }
            }
            CellKind::Set { separator } => value
                .split(*separator)
                .map(str::trim)
                .filter(|element| !element.is_empty())
                .map(str::to_string)
                .collect(),
            CellKind::Json(config) => match parse_object(value) {
                Some(object) => json_segments(&object, config),
                None => Vec::new(),
            },
        }
    }

    /// Rebuild a cell from translated segments. Segments missing from
    /// `translations` are kept in the source language.
    pub fn rebuild(&self, value: &str, translations: &HashMap<String, String>) -> String {
        let lookup = |segment: &str| -> String {
            translations.get(segment).cloned().unwrap_or_else(|| segment.to_string())
        };

        match self {
            CellKind::Plain => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return value.to_string();
                }
                let start = value.len() - value.trim_start().len();
                let end = start + trimmed.len();
                format!("{}{}{}", &value[..start], lookup(trimmed), &value[end..])
            }
            CellKind::Set { separator } => {
                if value.trim().is_empty() {
                    return value.to_string();
                }
                value
                    .split(*separator)
                    .map(|element| {
                        let element = element.trim();
                        if element.is_empty() { String::new() } else { lookup(element) }
                    })
                    .collect::<Vec<_>>()
                    .join(*separator)
            }
            CellKind::Json(config) => {
                let Some(object) = parse_object(value) else {
                    return value.to_string();
                };

                let mut rebuilt = Map::with_capacity(object.len());
                for (key, item) in object {
                    let translated_key = if config.translate_keys && !key.trim().is_empty() {
                        Some(lookup(key.trim()))
                    } else {
                        None
                    };
                    // Two keys translated to the same text: the later one stays untranslated
                    let new_key = match translated_key {
                        Some(translated) if rebuilt.contains_key(&translated) => {
                            warn!("JSON key '{}' translates to existing key '{}', keeping it untranslated", key, translated);
                            key
                        }
                        Some(translated) => translated,
                        None => key,
                    };
                    if rebuilt.contains_key(&new_key) {
                        warn!("JSON key '{}' appears twice after translation, the later value wins", new_key);
                    }
                    let new_item = match item {
                        Value::String(text) if config.translate_values && is_translatable_value(&text) => {
                            Value::String(lookup(text.trim()))
                        }
                        other => other,
                    };
                    rebuilt.insert(new_key, new_item);
                }

                serde_json::to_string(&Value::Object(rebuilt)).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

fn parse_object(value: &str) -> Option<Map<String, Value>> {
    let trimmed = value.trim();
    if !trimmed.starts_with('{') {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(object)) => Some(object),
        Ok(_) => None,
        Err(e) => {
            debug!("Leaving malformed JSON cell unchanged: {}", e);
            None
        }
    }
}

fn is_translatable_value(text: &str) -> bool {
    !text.trim().is_empty() && !text.starts_with("http")
}

fn json_segments(object: &Map<String, Value>, config: &JsonFieldConfig) -> Vec<String> {
    let mut segments = Vec::new();

    for (key, item) in object {
        if config.translate_keys && !key.trim().is_empty() {
            segments.push(key.trim().to_string());
        }
        if config.translate_values {
            if let Value::String(text) = item {
                if is_translatable_value(text) {
                    segments.push(text.trim().to_string());
                }
            }
        }
    }

    segments
}
