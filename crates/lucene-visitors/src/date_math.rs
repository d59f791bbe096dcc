use crate::context::VisitorContext;
use crate::visitor::{VisitError, Visitor};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, Timelike, Utc,
};
use chrono::offset::TimeZone;
use lucene_parser::ast::{QueryDocument, QueryNode, RangeNode, TermNode};
use lucene_parser::{Node, QueryText};

/// Failure to evaluate a date-math expression. Evaluation failures are
/// silent at the visitor level: the original string is preserved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateMathError {
    #[error("invalid date math anchor: `{0}`")]
    InvalidAnchor(String),
    #[error("invalid date math operation: `{0}`")]
    InvalidOperation(String),
    #[error("date math evaluation out of range: `{0}`")]
    OutOfRange(String),
}

/// Which end of a range a value sits on. Rounding (`/unit`) truncates to the
/// start of the unit for lower bounds and to the last instant of the unit
/// for upper bounds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Unit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl Unit {
    fn from_char(c: char) -> Option<Unit> {
        Some(match c {
            'y' => Unit::Year,
            'M' => Unit::Month,
            'w' => Unit::Week,
            'd' => Unit::Day,
            'h' | 'H' => Unit::Hour,
            'm' => Unit::Minute,
            's' => Unit::Second,
            _ => return None,
        })
    }
}

/// Evaluates date-math expressions against a fixed base instant.
///
/// ```txt
/// expr      := anchor operation*
/// anchor    := "now" | <date-literal> "||"
/// operation := ('+'|'-') <int>? unit | '/' unit
/// unit      := y | M | w | d | h | H | m | s
/// ```
#[derive(Debug, Clone)]
pub struct DateMathEvaluator {
    base: DateTime<FixedOffset>,
}

impl DateMathEvaluator {
    pub fn new(base: DateTime<FixedOffset>) -> Self {
        Self { base }
    }

    /// Resolve `expr` to an instant. Operations apply left to right;
    /// `rounding` selects which end of the rounded unit `/unit` truncates to.
    pub fn evaluate(
        &self,
        expr: &str,
        rounding: Rounding,
    ) -> Result<DateTime<FixedOffset>, DateMathError> {
        let (anchor, operations) = if let Some(rest) = expr.strip_prefix("now") {
            (self.base, rest)
        } else if let Some(split) = expr.find("||") {
            (
                parse_anchor(&expr[..split], *self.base.offset())?,
                &expr[split + 2..],
            )
        } else {
            return Err(DateMathError::InvalidAnchor(expr.to_string()));
        };
        apply_operations(anchor, operations, rounding)
    }
}

fn apply_operations(
    anchor: DateTime<FixedOffset>,
    operations: &str,
    rounding: Rounding,
) -> Result<DateTime<FixedOffset>, DateMathError> {
    let invalid = || DateMathError::InvalidOperation(operations.to_string());
    let out_of_range = || DateMathError::OutOfRange(operations.to_string());

    let mut current = anchor;
    let mut chars = operations.chars().peekable();
    while let Some(op) = chars.next() {
        match op {
            '+' | '-' => {
                let mut digits = String::new();
                while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    if let Some(digit) = chars.next() {
                        digits.push(digit);
                    }
                }
                let amount: i64 = if digits.is_empty() {
                    1
                } else {
                    digits.parse().map_err(|_| invalid())?
                };
                let amount = if op == '-' { -amount } else { amount };
                let unit = chars.next().and_then(Unit::from_char).ok_or_else(invalid)?;
                current = shift(current, amount, unit).ok_or_else(out_of_range)?;
            }
            '/' => {
                let unit = chars.next().and_then(Unit::from_char).ok_or_else(invalid)?;
                current = round(current, unit, rounding).ok_or_else(out_of_range)?;
            }
            _ => return Err(invalid()),
        }
    }
    Ok(current)
}

fn shift(dt: DateTime<FixedOffset>, amount: i64, unit: Unit) -> Option<DateTime<FixedOffset>> {
    match unit {
        Unit::Year => shift_months(dt, amount.checked_mul(12)?),
        Unit::Month => shift_months(dt, amount),
        Unit::Week => dt.checked_add_signed(Duration::try_weeks(amount)?),
        Unit::Day => dt.checked_add_signed(Duration::try_days(amount)?),
        Unit::Hour => dt.checked_add_signed(Duration::try_hours(amount)?),
        Unit::Minute => dt.checked_add_signed(Duration::try_minutes(amount)?),
        Unit::Second => dt.checked_add_signed(Duration::try_seconds(amount)?),
    }
}

fn shift_months(dt: DateTime<FixedOffset>, months: i64) -> Option<DateTime<FixedOffset>> {
    let magnitude = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        dt.checked_add_months(Months::new(magnitude))
    } else {
        dt.checked_sub_months(Months::new(magnitude))
    }
}

fn round(dt: DateTime<FixedOffset>, unit: Unit, rounding: Rounding) -> Option<DateTime<FixedOffset>> {
    let down = round_down(dt, unit)?;
    match rounding {
        Rounding::Down => Some(down),
        // the last millisecond still inside the unit
        Rounding::Up => shift(down, 1, unit)?.checked_sub_signed(Duration::try_milliseconds(1)?),
    }
}

fn round_down(dt: DateTime<FixedOffset>, unit: Unit) -> Option<DateTime<FixedOffset>> {
    let offset = *dt.offset();
    let naive = dt.naive_local();
    let date = naive.date();
    let rounded: NaiveDateTime = match unit {
        Unit::Second => naive.with_nanosecond(0)?,
        Unit::Minute => naive.with_second(0)?.with_nanosecond(0)?,
        Unit::Hour => naive
            .with_minute(0)?
            .with_second(0)?
            .with_nanosecond(0)?,
        Unit::Day => date.and_hms_opt(0, 0, 0)?,
        Unit::Week => {
            let monday =
                date - Duration::try_days(i64::from(date.weekday().num_days_from_monday()))?;
            monday.and_hms_opt(0, 0, 0)?
        }
        Unit::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_hms_opt(0, 0, 0)?,
        Unit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_hms_opt(0, 0, 0)?,
    };
    offset.from_local_datetime(&rounded).single()
}

fn parse_anchor(
    literal: &str,
    default_offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, DateMathError> {
    let invalid = || DateMathError::InvalidAnchor(literal.to_string());
    let (body, offset) = split_offset(literal, default_offset).ok_or_else(invalid)?;
    let naive = parse_naive(body).ok_or_else(invalid)?;
    offset.from_local_datetime(&naive).single().ok_or_else(invalid)
}

/// Split a trailing `Z` or `±HH:MM` from a date literal.
fn split_offset(literal: &str, default: FixedOffset) -> Option<(&str, FixedOffset)> {
    if let Some(body) = literal.strip_suffix('Z') {
        return Some((body, FixedOffset::east_opt(0)?));
    }
    if literal.len() > 6 && literal.contains('T') {
        let (body, suffix) = literal.split_at(literal.len() - 6);
        let bytes = suffix.as_bytes();
        let digits = |range: &str| range.bytes().all(|b| b.is_ascii_digit());
        if matches!(bytes[0], b'+' | b'-')
            && digits(&suffix[1..3])
            && bytes[3] == b':'
            && digits(&suffix[4..6])
        {
            let hours: i32 = suffix[1..3].parse().ok()?;
            let minutes: i32 = suffix[4..6].parse().ok()?;
            let seconds = hours * 3600 + minutes * 60;
            let offset = if bytes[0] == b'-' {
                FixedOffset::west_opt(seconds)?
            } else {
                FixedOffset::east_opt(seconds)?
            };
            return Some((body, offset));
        }
    }
    Some((literal, default))
}

fn parse_naive(body: &str) -> Option<NaiveDateTime> {
    if body.contains('T') {
        NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S").ok()
    } else {
        parse_date(body)?.and_hms_opt(0, 0, 0)
    }
}

fn parse_date(body: &str) -> Option<NaiveDate> {
    match body.len() {
        // YYYY
        4 => NaiveDate::from_ymd_opt(body.parse().ok()?, 1, 1),
        // YYYY-MM
        7 => {
            let (year, month) = body.split_once('-')?;
            NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
        }
        // YYYY-MM-DD
        10 => NaiveDate::parse_from_str(body, "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn format_instant(instant: &DateTime<FixedOffset>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

/// Only strings that look like date math are candidates: starting with
/// `now`, containing `||`, or starting with four or more digits followed by
/// an operator and a unit. Everything else passes through byte-identical.
fn is_candidate(value: &str) -> bool {
    value.starts_with("now") || value.contains("||") || has_date_operations(value)
}

fn has_date_operations(value: &str) -> bool {
    let digits = value.bytes().take_while(u8::is_ascii_digit).count();
    if digits < 4 {
        return false;
    }
    let mut chars = value[digits..].chars();
    if !matches!(chars.next(), Some('+' | '-' | '/')) {
        return false;
    }
    let mut rest = chars.skip_while(char::is_ascii_digit);
    rest.next().and_then(Unit::from_char).is_some()
}

/// Evaluates date-math expressions in terms and range bounds.
///
/// `now` is taken from the configured base time; with only a time zone
/// configured, the current wall-clock time converted into that zone. Range
/// minimums round down, range maximums round up (the short-form comparator
/// stores its value on the side the operator implies, so polarity follows
/// the operator); bare terms round down. Strings that fail the candidate
/// heuristic or fail to evaluate are left untouched.
#[derive(Debug, Clone, Default)]
pub struct DateMathVisitor {
    base_time: Option<DateTime<FixedOffset>>,
    time_zone: Option<FixedOffset>,
    resolved_base: Option<DateTime<FixedOffset>>,
}

impl DateMathVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the instant `now` evaluates to.
    pub fn with_base_time(mut self, base_time: DateTime<FixedOffset>) -> Self {
        self.base_time = Some(base_time);
        self
    }

    /// Evaluate `now` as the current wall-clock time in `time_zone`. Ignored
    /// when a base time is set.
    pub fn with_time_zone(mut self, time_zone: FixedOffset) -> Self {
        self.time_zone = Some(time_zone);
        self
    }

    fn now(&self) -> DateTime<FixedOffset> {
        if let Some(base) = self.base_time {
            return base;
        }
        match self.time_zone {
            Some(zone) => Utc::now().with_timezone(&zone),
            None => Utc::now().into(),
        }
    }

    fn evaluator(&self) -> DateMathEvaluator {
        DateMathEvaluator::new(self.resolved_base.unwrap_or_else(|| self.now()))
    }
}

fn rewrite(evaluator: &DateMathEvaluator, text: &mut QueryText, rounding: Rounding) {
    if !is_candidate(text.as_str()) {
        return;
    }
    if let Ok(instant) = evaluator.evaluate(text.as_str(), rounding) {
        text.set(format_instant(&instant));
    }
}

impl Visitor for DateMathVisitor {
    fn visit_document(
        &mut self,
        document: &mut QueryDocument,
        ctx: &mut VisitorContext,
    ) -> Result<(), VisitError> {
        // one `now` per traversal, so every node in the document agrees
        self.resolved_base = Some(self.now());
        crate::visitor::walk::walk_document(self, document, ctx)
    }

    fn visit_term(
        &mut self,
        term: &mut Node<TermNode>,
        _ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        if is_candidate(term.term.as_str()) {
            let evaluator = self.evaluator();
            rewrite(&evaluator, &mut term.make_mut().term, Rounding::Down);
        }
        Ok(None)
    }

    fn visit_range(
        &mut self,
        range: &mut Node<RangeNode>,
        _ctx: &mut VisitorContext,
    ) -> Result<Option<QueryNode>, VisitError> {
        let evaluator = self.evaluator();
        let inner = range.make_mut();
        if let Some(min) = inner.min.as_mut() {
            rewrite(&evaluator, min, Rounding::Down);
        }
        if let Some(max) = inner.max.as_mut() {
            rewrite(&evaluator, max, Rounding::Up);
        }
        Ok(None)
    }
}
