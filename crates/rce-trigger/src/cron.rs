// crates/rce-trigger/src/cron.rs
// ============================================================================
// Module: Cron Expression Validator
// Description: Minimal 5-field cron syntax check, adequate to reject
// malformed schedules before they reach the external scheduler.
// Purpose: spec.md §4.4's INVALID_SCHEDULE contract. (ADDED per
// SPEC_FULL.md §4.4: no cron crate is available in the dependency set, so
// validation is implemented directly.)
// Dependencies: none
// ============================================================================

use thiserror::Error;

/// A cron expression failed validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid cron expression: {0}")]
pub struct CronSyntaxError(pub String);

const FIELD_NAMES: [&str; 5] = ["minute", "hour", "day-of-month", "month", "day-of-week"];

/// Validates a 5-field cron expression (`minute hour day-of-month month
/// day-of-week`). Accepts `*`, a literal number, a `*/step`, a `a-b` range,
/// and comma-separated lists of the above in each field; rejects anything
/// else, including 6-field (seconds-prefixed) expressions.
///
/// # Errors
/// Returns [`CronSyntaxError`] naming the first field that fails to parse.
pub fn validate_cron_expression(expression: &str) -> Result<(), CronSyntaxError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(CronSyntaxError(format!(
            "expected 5 whitespace-separated fields, got {}",
            fields.len()
        )));
    }

    let bounds: [(u32, u32); 5] = [(0, 59), (0, 23), (1, 31), (1, 12), (0, 6)];
    for (index, field) in fields.iter().enumerate() {
        validate_field(field, bounds[index]).map_err(|reason| {
            CronSyntaxError(format!("{} field {field:?}: {reason}", FIELD_NAMES[index]))
        })?;
    }
    Ok(())
}

fn validate_field(field: &str, (low, high): (u32, u32)) -> Result<(), String> {
    for part in field.split(',') {
        validate_field_part(part, (low, high))?;
    }
    Ok(())
}

fn validate_field_part(part: &str, (low, high): (u32, u32)) -> Result<(), String> {
    let (base, step) = match part.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (part, None),
    };

    match base.split_once('-') {
        Some((start, end)) => {
            let start = parse_bounded(start, low, high)?;
            let end = parse_bounded(end, low, high)?;
            if start > end {
                return Err(format!("range start {start} exceeds end {end}"));
            }
        }
        None if base == "*" => {}
        None => {
            parse_bounded(base, low, high)?;
        }
    }

    if let Some(step) = step {
        let step: u32 = step.parse().map_err(|_| format!("non-numeric step {step:?}"))?;
        if step == 0 {
            return Err("step cannot be zero".to_string());
        }
    }
    Ok(())
}

fn parse_bounded(raw: &str, low: u32, high: u32) -> Result<u32, String> {
    let value: u32 = raw.parse().map_err(|_| format!("non-numeric value {raw:?}"))?;
    if value < low || value > high {
        return Err(format!("value {value} outside {low}-{high}"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_wildcard_expression() {
        assert!(validate_cron_expression("* * * * *").is_ok());
    }

    #[test]
    fn accepts_step_and_range_and_list() {
        assert!(validate_cron_expression("*/15 0-6 1,15 * 1-5").is_ok());
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = validate_cron_expression("* * * *").unwrap_err();
        assert!(err.0.contains("expected 5"));
    }

    #[test]
    fn rejects_seconds_prefixed_expression() {
        assert!(validate_cron_expression("0 * * * * *").is_err());
    }

    #[test]
    fn rejects_out_of_range_value() {
        assert!(validate_cron_expression("99 * * * *").is_err());
    }

    #[test]
    fn rejects_zero_step() {
        assert!(validate_cron_expression("*/0 * * * *").is_err());
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(validate_cron_expression("30-10 * * * *").is_err());
    }
}
