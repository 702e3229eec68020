//! Calendar expressions for schedule triggers.
//!
//! Rules are written in classic 5-field Unix cron (`min hour dom month dow`,
//! Sunday = 0 or 7) or with a leading seconds field. The `cron` crate wants
//! the seconds field and numbers days of the week from Sunday = 1, so
//! expressions are normalised before parsing: the seconds field is filled in
//! and day-of-week numbers are rewritten as names.

use std::str::FromStr;

use crate::error::ConfigurationError;
use crate::time::Timestamp;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// A parsed, validated calendar schedule. Evaluated in UTC.
#[derive(Debug, Clone)]
pub struct CronExpression {
    expression: String,
    schedule: cron::Schedule,
}

impl CronExpression {
    /// Parse a 5- or 6-field expression.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the field count is wrong, a
    /// day-of-week token is out of range, the cron parser rejects it, or no
    /// future instant matches (e.g. `0 0 30 2 *`).
    pub fn parse(expression: &str) -> Result<Self, ConfigurationError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let (seconds, rest) = match fields.len() {
            5 => ("0", &fields[..]),
            6 => (fields[0], &fields[1..]),
            n => {
                return Err(ConfigurationError::CronFieldCount {
                    expression: expression.to_string(),
                    fields: n,
                });
            }
        };
        let day_of_week = translate_day_of_week(rest[4], expression)?;
        let normalized = format!(
            "{seconds} {} {} {} {} {day_of_week}",
            rest[0], rest[1], rest[2], rest[3]
        );

        let schedule = cron::Schedule::from_str(&normalized).map_err(|source| {
            ConfigurationError::InvalidCron {
                expression: expression.to_string(),
                source,
            }
        })?;
        if schedule.after(&crate::time::now()).next().is_none() {
            return Err(ConfigurationError::NeverFires {
                expression: expression.to_string(),
            });
        }

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    /// The expression as written by the user.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// First fire instant strictly after `after`.
    #[must_use]
    pub fn next_after(&self, after: &Timestamp) -> Option<Timestamp> {
        self.schedule.after(after).next()
    }
}

fn translate_day_of_week(field: &str, expression: &str) -> Result<String, ConfigurationError> {
    let invalid = |token: &str| ConfigurationError::InvalidDayOfWeek {
        expression: expression.to_string(),
        token: token.to_string(),
    };

    let mut parts = Vec::new();
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (part, None),
        };

        let translated = if range == "*" || range == "?" {
            range.to_string()
        } else if let Some((start, end)) = range.split_once('-') {
            let start = day_index(start).ok_or_else(|| invalid(part))?;
            let end = day_index(end).ok_or_else(|| invalid(part))?;
            if end == 0 && start != 0 {
                // `5-7` style ranges run through Sunday, which sorts first here.
                if step.is_some() {
                    return Err(invalid(part));
                }
                if start == 6 {
                    parts.push("Sat,Sun".to_string());
                } else {
                    parts.push(format!("{}-Sat,Sun", DAY_NAMES[start]));
                }
                continue;
            }
            if start > end {
                return Err(invalid(part));
            }
            format!("{}-{}", DAY_NAMES[start], DAY_NAMES[end])
        } else {
            DAY_NAMES[day_index(range).ok_or_else(|| invalid(part))?].to_string()
        };

        match step {
            Some(step) => parts.push(format!("{translated}/{step}")),
            None => parts.push(translated),
        }
    }
    Ok(parts.join(","))
}

/// Index into [`DAY_NAMES`]; accepts `0-7` and English day names.
fn day_index(token: &str) -> Option<usize> {
    if let Ok(number) = token.parse::<u8>() {
        return match number {
            0 | 7 => Some(0),
            1..=6 => Some(usize::from(number)),
            _ => None,
        };
    }
    let prefix = token.get(..3)?.to_ascii_lowercase();
    DAY_NAMES
        .iter()
        .position(|name| name.to_ascii_lowercase() == prefix)
}
