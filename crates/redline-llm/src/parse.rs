//! Parse the analysis reply into an [`AnalysisResult`].

use serde_json::{Map, Value};

use redline_core::{AnalysisResult, RedFlag, RedlineError, Result, Severity};

/// Parse an analysis reply.
///
/// Accepts a bare JSON object, or one wrapped in a single Markdown code
/// fence (optionally tagged `json`). Anything else, including prose around
/// the object, is rejected. `safety_score` must be an integer in 0..=100 and
/// every red flag needs `clause`, `risk` and a `High`/`Medium` severity.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult> {
    let json_str = extract_json(text)?;

    let json: Value = serde_json::from_str(json_str)
        .map_err(|e| RedlineError::parse(format!("JSON parse error: {}", e)))?;

    let obj = json
        .as_object()
        .ok_or_else(|| RedlineError::parse("Expected a JSON object"))?;

    let safety_score = parse_score(obj)?;

    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .ok_or_else(|| RedlineError::parse("Missing or invalid 'summary'"))?
        .to_string();

    let red_flags = match obj.get("red_flags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                parse_red_flag(item)
                    .map_err(|e| RedlineError::parse(format!("red_flags[{}]: {}", idx, e)))
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(RedlineError::parse("'red_flags' is not an array")),
    };

    Ok(AnalysisResult {
        safety_score,
        summary,
        red_flags,
    })
}

/// Strip at most one surrounding code fence.
fn extract_json(text: &str) -> Result<&str> {
    let trimmed = text.trim();

    let body = if let Some(rest) = trimmed.strip_prefix("```") {
        let inner = rest
            .strip_suffix("```")
            .ok_or_else(|| RedlineError::parse("Unterminated code fence"))?;
        // Drop the info string (e.g. `json`), which may run straight into
        // the object on a one-line fence.
        let tag_len = inner
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(inner.len());
        let (tag, inner) = inner.split_at(tag_len);
        if !tag.is_empty() && !tag.eq_ignore_ascii_case("json") {
            return Err(RedlineError::parse(format!(
                "Unexpected code fence language '{}'",
                tag
            )));
        }
        if inner.contains("```") {
            return Err(RedlineError::parse("More than one code fence"));
        }
        inner.trim()
    } else {
        trimmed
    };

    if !(body.starts_with('{') && body.ends_with('}')) {
        return Err(RedlineError::parse("Reply is not a single JSON object"));
    }

    Ok(body)
}

fn parse_score(obj: &Map<String, Value>) -> Result<u8> {
    let score = obj
        .get("safety_score")
        .ok_or_else(|| RedlineError::parse("Missing 'safety_score'"))?;

    let value = match score.as_i64() {
        Some(v) => v,
        None => match score.as_f64() {
            Some(f) if f.fract() == 0.0 => f as i64,
            _ => return Err(RedlineError::parse("'safety_score' is not an integer")),
        },
    };

    u8::try_from(value)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or_else(|| {
            RedlineError::parse(format!("'safety_score' {} is outside 0..=100", value))
        })
}

fn parse_red_flag(json: &Value) -> std::result::Result<RedFlag, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "not a JSON object".to_string())?;

    let clause = obj
        .get("clause")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing or invalid 'clause'".to_string())?;

    let risk = obj
        .get("risk")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing or invalid 'risk'".to_string())?;

    let severity = match obj.get("severity").and_then(Value::as_str).map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("high") => Severity::High,
        Some(s) if s.eq_ignore_ascii_case("medium") => Severity::Medium,
        Some(s) => return Err(format!("unknown severity '{}'", s)),
        None => return Err("missing or invalid 'severity'".to_string()),
    };

    Ok(RedFlag::new(clause, risk, severity))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "safety_score": 42,
        "summary": "Landlord-friendly lease with a harsh deposit clause.",
        "red_flags": [
            {
                "clause": "Tenant forfeits security deposit if keys not returned within 24 hours",
                "risk": "You can lose your whole deposit over a small delay.",
                "severity": "High"
            },
            {
                "clause": "Rent may increase at any time.",
                "risk": "Your costs are unpredictable.",
                "severity": "Medium"
            }
        ]
    }"#;

    #[test]
    fn test_bare_json() {
        let result = parse_analysis(VALID).unwrap();
        assert_eq!(result.safety_score, 42);
        assert_eq!(result.red_flags.len(), 2);
        assert_eq!(result.red_flags[0].severity, Severity::High);
        assert_eq!(result.red_flags[1].severity, Severity::Medium);
        assert!(result.red_flags.iter().all(|f| f.page.is_none()));
    }

    #[test]
    fn test_fenced_json() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert_eq!(parse_analysis(&fenced).unwrap().safety_score, 42);

        let untagged = format!("```\n{}\n```", VALID);
        assert_eq!(parse_analysis(&untagged).unwrap().safety_score, 42);

        let one_line = r#"```json{"safety_score": 61, "summary": "x", "red_flags": []}```"#;
        assert_eq!(parse_analysis(one_line).unwrap().safety_score, 61);

        let upper = r#"```JSON {"safety_score": 9, "summary": "x"}```"#;
        assert_eq!(parse_analysis(upper).unwrap().safety_score, 9);
    }

    #[test]
    fn test_rejects_prose() {
        let chatty = format!("Here is my analysis:\n{}", VALID);
        assert!(matches!(
            parse_analysis(&chatty),
            Err(RedlineError::Parse { .. })
        ));

        let trailing = format!("```json\n{}\n```\nHope this helps!", VALID);
        assert!(parse_analysis(&trailing).is_err());

        assert!(parse_analysis("I cannot review this contract.").is_err());
        assert!(parse_analysis("").is_err());
    }

    #[test]
    fn test_rejects_out_of_range_score() {
        assert!(parse_analysis(r#"{"safety_score": 150, "summary": "x", "red_flags": []}"#).is_err());
        assert!(parse_analysis(r#"{"safety_score": -1, "summary": "x", "red_flags": []}"#).is_err());
        assert!(parse_analysis(r#"{"safety_score": 7.5, "summary": "x", "red_flags": []}"#).is_err());
        assert!(parse_analysis(r#"{"safety_score": "80", "summary": "x", "red_flags": []}"#).is_err());
    }

    #[test]
    fn test_boundary_scores() {
        assert_eq!(
            parse_analysis(r#"{"safety_score": 0, "summary": "x"}"#)
                .unwrap()
                .safety_score,
            0
        );
        assert_eq!(
            parse_analysis(r#"{"safety_score": 100.0, "summary": "x", "red_flags": null}"#)
                .unwrap()
                .safety_score,
            100
        );
    }

    #[test]
    fn test_rejects_bad_red_flags() {
        let unknown_severity = r#"{"safety_score": 50, "summary": "x",
            "red_flags": [{"clause": "c", "risk": "r", "severity": "Low"}]}"#;
        assert!(parse_analysis(unknown_severity).is_err());

        let missing_clause = r#"{"safety_score": 50, "summary": "x",
            "red_flags": [{"risk": "r", "severity": "High"}]}"#;
        assert!(parse_analysis(missing_clause).is_err());

        let not_array = r#"{"safety_score": 50, "summary": "x", "red_flags": "none"}"#;
        assert!(parse_analysis(not_array).is_err());
    }

    #[test]
    fn test_rejects_foreign_fence_language() {
        assert!(parse_analysis("```python\n{\"a\": 1}\n```").is_err());
    }

    #[test]
    fn test_severity_case_insensitive() {
        let lower = r#"{"safety_score": 50, "summary": "x",
            "red_flags": [{"clause": "c", "risk": "r", "severity": "high"}]}"#;
        assert_eq!(
            parse_analysis(lower).unwrap().red_flags[0].severity,
            Severity::High
        );
    }
}
