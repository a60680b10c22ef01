//! Parsing of model responses into category maps.
//!
//! Model output is untrusted: it may wrap the JSON in prose or markdown
//! fences, and the JSON itself may contain values of the wrong shape. Only
//! `string -> [string]` entries survive.

use serde_json::{Map, Value};

use crate::category::CategoryMap;
use crate::error::ParseError;

/// Most `{` positions tried as the start of an object. Each attempt may scan
/// to the end of the text, so the bound keeps extraction linear.
const MAX_OBJECT_STARTS: usize = 32;

/// Find the first well-formed JSON object embedded in `text`.
///
/// A `{` is tried as a starting point only when a key or `}` follows it, so
/// leading prose, code fences and trailing commentary are ignored. At most
/// [`MAX_OBJECT_STARTS`] candidates are parsed.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let candidates = text
        .match_indices('{')
        .map(|(start, _)| start)
        .filter(|&start| opens_object(&text[start + 1..]))
        .take(MAX_OBJECT_STARTS);

    for start in candidates {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(object))) = stream.next() {
            return Some(object);
        }
    }
    None
}

fn opens_object(rest: &str) -> bool {
    matches!(rest.trim_start().chars().next(), Some('"' | '}'))
}

/// Parse a model response into a validated [`CategoryMap`].
///
/// Non-array values and non-string array entries are dropped. Names are
/// trimmed and de-duplicated per category, first occurrence wins.
pub fn parse_category_response(text: &str) -> Result<CategoryMap, ParseError> {
    let object = extract_json_object(text).ok_or(ParseError::NoJsonObject {
        length: text.chars().count(),
    })?;

    let mut map = CategoryMap::new();
    for (category, value) in &object {
        let Value::Array(entries) = value else {
            continue;
        };
        for entry in entries {
            if let Value::String(name) = entry {
                let name = name.trim();
                if !name.is_empty() {
                    map.insert(category, name);
                }
            }
        }
    }

    map.prune_empty();
    if map.is_empty() {
        return Err(ParseError::NoCategories);
    }
    Ok(map)
}
