use std::collections::HashMap;
use std::str::FromStr;

use chrono::{NaiveDate, Weekday};
use serde_json::json;

use crate::error::{PlannerError, PlannerResult};
use crate::models::recurrence::{
    Cadence, OrdinalWeekday, RecurrenceFrequency, RecurrencePlan,
};

/// FREQ values understood by the parser (RFC 5545 subset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freq {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for Freq {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DAILY" => Ok(Freq::Daily),
            "WEEKLY" => Ok(Freq::Weekly),
            "MONTHLY" => Ok(Freq::Monthly),
            "YEARLY" => Ok(Freq::Yearly),
            _ => Err(PlannerError::validation(format!("invalid FREQ: {s}"))),
        }
    }
}

impl From<Cadence> for Freq {
    fn from(cadence: Cadence) -> Self {
        match cadence {
            Cadence::Daily => Freq::Daily,
            Cadence::Weekly => Freq::Weekly,
            Cadence::Monthly => Freq::Monthly,
            Cadence::Yearly => Freq::Yearly,
        }
    }
}

impl std::fmt::Display for Freq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Freq::Daily => "DAILY",
            Freq::Weekly => "WEEKLY",
            Freq::Monthly => "MONTHLY",
            Freq::Yearly => "YEARLY",
        };
        f.write_str(label)
    }
}

fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "SU",
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
    }
}

fn parse_weekday_code(code: &str) -> PlannerResult<Weekday> {
    match code {
        "SU" => Ok(Weekday::Sun),
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        _ => Err(PlannerError::validation(format!("invalid weekday: {code}"))),
    }
}

/// Converts between RRULE strings and [`RecurrencePlan`].
pub struct RRuleParser;

impl RRuleParser {
    pub fn parse(rrule: &str) -> PlannerResult<RecurrencePlan> {
        let rrule = rrule.trim();
        let rrule = rrule.strip_prefix("RRULE:").unwrap_or(rrule);
        if rrule.is_empty() {
            return Err(PlannerError::validation("RRULE string cannot be empty"));
        }

        let mut params = HashMap::new();
        for part in rrule.split(';').map(str::trim).filter(|part| !part.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                PlannerError::validation_with_details("invalid RRULE part", json!({ "part": part }))
            })?;
            params.insert(key.trim().to_uppercase(), value.trim().to_string());
        }

        let freq = params
            .get("FREQ")
            .ok_or_else(|| PlannerError::validation("FREQ parameter is required"))?
            .parse::<Freq>()?;

        let by_day = params.get("BYDAY").map(|raw| parse_by_day(raw)).transpose()?;
        let by_month_day = params
            .get("BYMONTHDAY")
            .map(|raw| parse_number_list::<i8>("BYMONTHDAY", raw))
            .transpose()?;
        let by_month = params
            .get("BYMONTH")
            .map(|raw| parse_number_list::<u32>("BYMONTH", raw))
            .transpose()?;
        let by_set_pos = params
            .get("BYSETPOS")
            .map(|raw| parse_number_list::<i32>("BYSETPOS", raw))
            .transpose()?;

        check_combination(freq, by_day.as_deref(), by_month_day.is_some(), by_month.is_some())?;

        let mut plan = RecurrencePlan::new(match freq {
            Freq::Daily => RecurrenceFrequency::Daily,
            Freq::Weekly => RecurrenceFrequency::Weekly,
            Freq::Monthly => RecurrenceFrequency::Monthly,
            Freq::Yearly => RecurrenceFrequency::Yearly,
        });

        if let Some(raw) = params.get("INTERVAL") {
            let interval = raw
                .parse::<u32>()
                .map_err(|_| PlannerError::validation(format!("invalid INTERVAL: {raw}")))?;
            plan = plan.with_interval(interval)?;
        }
        if let Some(raw) = params.get("COUNT") {
            let count = raw
                .parse::<u32>()
                .map_err(|_| PlannerError::validation(format!("invalid COUNT: {raw}")))?;
            plan = plan.with_occurrences(count)?;
        }
        if let Some(raw) = params.get("UNTIL") {
            plan = plan.with_end_date(parse_until_date(raw)?)?;
        }

        if let Some(entries) = by_day {
            if freq == Freq::Weekly {
                plan = plan.with_selected_days(entries.iter().map(|entry| entry.weekday).collect());
            } else {
                plan = plan.with_ordinal_weekdays(entries)?;
            }
        }
        if let Some(days) = by_month_day {
            plan = plan.with_days_of_month(days)?;
        }
        if let Some(months) = by_month {
            plan = plan.with_months_of_year(months)?;
        }
        if let Some(positions) = by_set_pos {
            plan = plan.with_set_pos(positions)?;
        }

        Ok(plan)
    }

    pub fn to_string(plan: &RecurrencePlan) -> PlannerResult<String> {
        let cadence = plan
            .cadence()
            .ok_or_else(|| PlannerError::validation("a non-repeating plan has no RRULE"))?;
        let mut parts = vec![format!("FREQ={}", Freq::from(cadence))];

        if plan.interval != 1 {
            parts.push(format!("INTERVAL={}", plan.interval));
        }
        if let Some(count) = plan.repeat_occurrences {
            parts.push(format!("COUNT={count}"));
        }
        if let Some(until) = plan.repeat_end_date {
            parts.push(format!("UNTIL={}", until.format("%Y%m%d")));
        }

        let by_day: Vec<String> = if cadence == Cadence::Weekly {
            plan.selected_days
                .iter()
                .map(|day| weekday_code(*day).to_string())
                .collect()
        } else {
            plan.ordinals_of_weekdays
                .iter()
                .map(|entry| match entry.ordinal {
                    0 => weekday_code(entry.weekday).to_string(),
                    ordinal => format!("{ordinal}{}", weekday_code(entry.weekday)),
                })
                .collect()
        };
        if !by_day.is_empty() {
            parts.push(format!("BYDAY={}", by_day.join(",")));
        }
        push_list(&mut parts, "BYMONTHDAY", &plan.days_of_month);
        push_list(&mut parts, "BYMONTH", &plan.months_of_year);
        push_list(&mut parts, "BYSETPOS", &plan.set_pos);

        Ok(parts.join(";"))
    }
}

impl RecurrencePlan {
    pub fn from_rrule(rrule: &str) -> PlannerResult<Self> {
        RRuleParser::parse(rrule)
    }

    pub fn to_rrule(&self) -> PlannerResult<String> {
        RRuleParser::to_string(self)
    }
}

fn push_list<T: ToString>(parts: &mut Vec<String>, key: &str, values: &[T]) {
    if values.is_empty() {
        return;
    }
    let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
    parts.push(format!("{key}={}", joined.join(",")));
}

fn check_combination(
    freq: Freq,
    by_day: Option<&[OrdinalWeekday]>,
    has_month_day: bool,
    has_month: bool,
) -> PlannerResult<()> {
    match freq {
        Freq::Daily if by_day.is_some() || has_month_day || has_month => Err(
            PlannerError::validation("DAILY frequency cannot use BYDAY, BYMONTHDAY, or BYMONTH"),
        ),
        Freq::Weekly if has_month_day || has_month => Err(PlannerError::validation(
            "WEEKLY frequency cannot use BYMONTHDAY or BYMONTH",
        )),
        Freq::Weekly if by_day.is_some_and(|entries| entries.iter().any(|e| e.ordinal != 0)) => {
            Err(PlannerError::validation(
                "WEEKLY frequency cannot use positional BYDAY values",
            ))
        }
        Freq::Monthly if by_day.is_some() && has_month_day => Err(PlannerError::validation(
            "MONTHLY frequency cannot use both BYDAY and BYMONTHDAY",
        )),
        Freq::Monthly if has_month => Err(PlannerError::validation(
            "MONTHLY frequency cannot use BYMONTH",
        )),
        _ => Ok(()),
    }
}

fn parse_by_day(raw: &str) -> PlannerResult<Vec<OrdinalWeekday>> {
    let mut entries = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        let normalized = token.to_uppercase();
        if normalized.len() < 2 || !normalized.is_char_boundary(normalized.len() - 2) {
            return Err(PlannerError::validation(format!("invalid BYDAY entry: {token}")));
        }
        let (number, code) = normalized.split_at(normalized.len() - 2);
        let weekday = parse_weekday_code(code)?;
        let ordinal = if number.is_empty() {
            0
        } else {
            let value = number
                .parse::<i8>()
                .map_err(|_| PlannerError::validation(format!("invalid BYDAY position: {token}")))?;
            if value == 0 {
                return Err(PlannerError::validation(format!(
                    "BYDAY position cannot be 0: {token}"
                )));
            }
            value
        };
        entries.push(OrdinalWeekday::new(ordinal, weekday));
    }
    if entries.is_empty() {
        return Err(PlannerError::validation("BYDAY cannot be empty"));
    }
    Ok(entries)
}

fn parse_number_list<T: FromStr>(key: &str, raw: &str) -> PlannerResult<Vec<T>> {
    let values = raw
        .split(',')
        .map(str::trim)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| PlannerError::validation(format!("invalid {key} value: {value}")))
        })
        .collect::<PlannerResult<Vec<T>>>()?;
    if values.is_empty() {
        return Err(PlannerError::validation(format!("{key} cannot be empty")));
    }
    Ok(values)
}

/// Accepts `YYYYMMDD` and `YYYYMMDDTHHMMSS[Z]`; only the date is kept.
fn parse_until_date(raw: &str) -> PlannerResult<NaiveDate> {
    let date_part = match raw.len() {
        8 => raw,
        15 | 16 if raw.as_bytes().get(8) == Some(&b'T') => &raw[..8],
        _ => {
            return Err(PlannerError::validation(
                "UNTIL must be in YYYYMMDD or YYYYMMDDTHHMMSSZ format",
            ))
        }
    };
    NaiveDate::parse_from_str(date_part, "%Y%m%d").map_err(|err| {
        PlannerError::validation_with_details(
            "invalid UNTIL date",
            json!({ "value": raw, "error": err.to_string() }),
        )
    })
}
