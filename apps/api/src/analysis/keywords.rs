//! Keyword extraction output: fence stripping, best-effort JSON parse and
//! rendering of the three skill categories.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

pub const TECHNICAL: &str = "Technical Skills";
pub const ANALYTICAL: &str = "Analytical Skills";
pub const SOFT: &str = "Soft Skills";

/// Skills grouped under the three fixed categories. A missing category is empty.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct SkillsReport {
    #[serde(rename = "Technical Skills", default)]
    pub technical: Vec<String>,
    #[serde(rename = "Analytical Skills", default)]
    pub analytical: Vec<String>,
    #[serde(rename = "Soft Skills", default)]
    pub soft: Vec<String>,
}

impl SkillsReport {
    /// One `Label: a, b` line per category, in fixed order.
    pub fn render_lines(&self) -> Vec<String> {
        [
            (TECHNICAL, &self.technical),
            (ANALYTICAL, &self.analytical),
            (SOFT, &self.soft),
        ]
        .iter()
        .map(|(label, skills)| format!("{label}: {}", skills.join(", ")))
        .collect()
    }
}

/// Removes a fenced code block wrapper of any backtick length, with or
/// without a language tag. Text that is not fenced is only trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let opening = text.len() - text.trim_start_matches('`').len();
    if opening < 3 {
        return text;
    }

    let rest = &text[opening..];
    let tag_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')))
        .unwrap_or(rest.len());
    let rest = rest[tag_len..].trim_end();

    let closing = rest.len() - rest.trim_end_matches('`').len();
    let body = if closing >= 3 {
        &rest[..rest.len() - closing]
    } else {
        rest
    };
    body.trim()
}

/// Parses the model's keyword answer. `None` means extraction failed: the text
/// is not JSON, not an object, an empty object, or has a non-list category.
pub fn parse_skills(text: &str) -> Option<SkillsReport> {
    let body = strip_code_fence(text);
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Keyword response is not valid JSON: {e}");
            return None;
        }
    };

    match value.as_object() {
        Some(map) if !map.is_empty() => {}
        _ => {
            warn!("Keyword response is not a non-empty JSON object");
            return None;
        }
    }

    serde_json::from_value(value)
        .map_err(|e| warn!("Keyword response has an unexpected shape: {e}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json_renders_three_lines() {
        let text = "```json\n{\"Technical Skills\":[\"A\"],\"Analytical Skills\":[],\"Soft Skills\":[\"B\"]}\n```";
        let report = parse_skills(text).unwrap();
        assert_eq!(
            report.render_lines(),
            vec![
                "Technical Skills: A".to_string(),
                "Analytical Skills: ".to_string(),
                "Soft Skills: B".to_string(),
            ]
        );
    }

    #[test]
    fn test_strip_fence_without_tag() {
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_longer_fence() {
        assert_eq!(strip_code_fence("````json\n[1]\n````"), "[1]");
    }

    #[test]
    fn test_strip_fence_on_one_line() {
        assert_eq!(strip_code_fence("```json{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn test_unfenced_text_is_trimmed_only() {
        assert_eq!(strip_code_fence("  {\"a\": 1}\n"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("`code`"), "`code`");
    }

    #[test]
    fn test_missing_category_defaults_to_empty() {
        let report = parse_skills(r#"{"Technical Skills": ["Rust", "SQL"]}"#).unwrap();
        assert_eq!(report.technical, vec!["Rust", "SQL"]);
        assert_eq!(report.render_lines()[0], "Technical Skills: Rust, SQL");
        assert_eq!(report.render_lines()[2], "Soft Skills: ");
    }

    #[test]
    fn test_invalid_json_is_none() {
        assert!(parse_skills("```json\nTechnical Skills: Rust\n```").is_none());
        assert!(parse_skills("Sorry, I cannot help with that.").is_none());
    }

    #[test]
    fn test_empty_or_non_object_is_none() {
        assert!(parse_skills("{}").is_none());
        assert!(parse_skills("[\"Rust\"]").is_none());
        assert!(parse_skills(r#"{"Technical Skills": "Rust"}"#).is_none());
    }
}
