// WHY: Diary entries may open with a `---` delimited YAML block of metadata.
// Only the first closing delimiter after the opening one ends the block.

use anyhow::{Context, Result};
use serde_json::{Map, Value};

const DELIMITER: &str = "---";

/// True when `content` opens with `---` and contains another `---` later
pub fn has_frontmatter(content: &str) -> bool {
    content.starts_with(DELIMITER) && content[DELIMITER.len()..].contains(DELIMITER)
}

/// Split into `(front_matter, body)`, both trimmed
///
/// Without front matter the whole content is returned as the body, untouched.
pub fn split(content: &str) -> (&str, &str) {
    let Some(rest) = content.strip_prefix(DELIMITER) else {
        return ("", content);
    };
    let Some(end) = rest.find(DELIMITER) else {
        return ("", content);
    };

    let front = rest[..end].trim();
    let body = rest[end + DELIMITER.len()..].trim();
    (front, body)
}

/// Parse the front matter into a JSON object
///
/// Missing, empty or non-mapping front matter yields an empty map; YAML that
/// does not parse is an error.
pub fn parse(content: &str) -> Result<Map<String, Value>> {
    if !has_frontmatter(content) {
        return Ok(Map::new());
    }

    let (front, _body) = split(content);
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(front).context("Failed to parse YAML front matter")?;

    // WHY: serde_json keeps parity with the config and report layers
    let json = serde_json::to_value(yaml).context("Front matter is not representable as JSON")?;

    Ok(match json {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

/// Render front matter as a fenced block followed by the body
pub fn format_for_display(content: &str) -> String {
    if !has_frontmatter(content) {
        return content.to_string();
    }

    let (front, body) = split(content);
    format!("```\n{front}\n```\n\n{body}")
}
