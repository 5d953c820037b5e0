use chrono::NaiveDate;
use serde_json::Value;

use super::dropdown::Dropdown;
use super::error::ClientError;

pub const UNREACHABLE_MESSAGE: &str = "Server unreachable!";
pub const PASSWORD_MIN_LEN: usize = 8;

/// A validated field value, ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Quantity(i64),
    Date(NaiveDate),
    Choice(String),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Quantity(n) => Value::from(*n),
            FieldValue::Date(date) => Value::String(date.format("%Y/%m/%d").to_string()),
            // Choices backed by record ids are submitted as numbers
            FieldValue::Choice(choice) => match choice.parse::<i64>() {
                Ok(id) => Value::from(id),
                Err(_) => Value::String(choice.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState {
    Pristine,
    Validating,
    Valid(FieldValue),
    Invalid(String),
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text { min: usize, max: usize },
    Password,
    Quantity,
    Date,
    /// Checked by a feedback endpoint; the reply text contains `!` when rejected
    Remote { endpoint: String },
    Select(Dropdown),
}

/// Outcome of a local check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Valid(FieldValue, Option<String>),
    Invalid(String),
    Remote,
}

impl FieldKind {
    pub fn check(&self, raw: &str, noun: &str) -> Check {
        match self {
            FieldKind::Text { min, max } => check_text(raw, noun, *min, *max),
            FieldKind::Password => check_password(raw),
            FieldKind::Quantity => check_quantity(raw, noun),
            FieldKind::Date => check_date(raw, noun),
            FieldKind::Remote { .. } => Check::Remote,
            FieldKind::Select(dropdown) => {
                if dropdown.contains(raw) {
                    Check::Valid(FieldValue::Choice(raw.to_string()), None)
                } else {
                    Check::Invalid(format!("Select a {}!", noun))
                }
            }
        }
    }

    /// Value of an already trusted raw string, without running any check.
    fn trusted_value(&self, raw: &str) -> FieldValue {
        match self {
            FieldKind::Quantity => raw
                .trim()
                .parse()
                .map(FieldValue::Quantity)
                .unwrap_or_else(|_| FieldValue::Text(raw.to_string())),
            FieldKind::Date => parse_date(raw)
                .map(FieldValue::Date)
                .unwrap_or_else(|| FieldValue::Text(raw.to_string())),
            FieldKind::Select(_) => FieldValue::Choice(raw.to_string()),
            _ => FieldValue::Text(raw.to_string()),
        }
    }
}

fn check_text(raw: &str, noun: &str, min: usize, max: usize) -> Check {
    let len = raw.chars().count();
    if len < min {
        Check::Invalid(format!("{} too short!", noun))
    } else if len > max {
        Check::Invalid(format!("{} too long!", noun))
    } else {
        Check::Valid(FieldValue::Text(raw.to_string()), Some(format!("Valid {}", noun)))
    }
}

fn is_password_symbol(c: char) -> bool {
    matches!(c, '!'..='/' | ':'..='@' | '['..='`' | '{'..='~')
}

fn check_password(raw: &str) -> Check {
    if raw.chars().count() < PASSWORD_MIN_LEN {
        return Check::Invalid(format!("At least {} Characters needed!", PASSWORD_MIN_LEN));
    }
    if let Some(c) = raw.chars().find(|c| !c.is_ascii_alphanumeric() && !is_password_symbol(*c)) {
        return Check::Invalid(format!("Invalid Character: {}!", c));
    }
    if raw.chars().filter(char::is_ascii_digit).count() < 2 {
        return Check::Invalid("At least 2 Digits needed!".to_string());
    }
    if !raw.chars().any(is_password_symbol) {
        return Check::Invalid("At least 1 Symbol needed!".to_string());
    }
    Check::Valid(FieldValue::Text(raw.to_string()), Some("Valid Password".to_string()))
}

fn check_quantity(raw: &str, noun: &str) -> Check {
    match raw.trim().parse::<i64>() {
        Err(_) => Check::Invalid(format!("{} is not a number!", noun)),
        Ok(n) if n <= 0 => Check::Invalid(format!("{} must be a positive number!", noun)),
        Ok(n) => Check::Valid(FieldValue::Quantity(n), Some(format!("Valid {}", noun))),
    }
}

/// `YYYY/M/D` with a four digit year and one or two digit month and day
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split('/').collect();
    let digits = |s: &str, lens: &[usize]| lens.contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit());
    match parts.as_slice() {
        [y, m, d] if digits(y, &[4]) && digits(m, &[1, 2]) && digits(d, &[1, 2]) => {
            NaiveDate::parse_from_str(raw, "%Y/%m/%d").ok()
        }
        _ => None,
    }
}

fn check_date(raw: &str, noun: &str) -> Check {
    match parse_date(raw) {
        Some(date) => Check::Valid(FieldValue::Date(date), Some(format!("Valid {}", noun))),
        None => Check::Invalid(format!("Invalid {}", noun)),
    }
}

/// A feedback call the owner of the field must issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCheck {
    pub generation: u64,
    pub endpoint: String,
    pub param: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Done,
    Remote(RemoteCheck),
}

/// One input of a form.
///
/// Every change of `raw` bumps `generation`; results computed for an older
/// generation are ignored.
#[derive(Debug, Clone)]
pub struct Field {
    id: String,
    label: String,
    noun: String,
    kind: FieldKind,
    raw: String,
    state: FieldState,
    message: Option<String>,
    precompiled: Option<String>,
    generation: u64,
}

impl Field {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            noun: label.clone(),
            label,
            kind,
            raw: String::new(),
            state: FieldState::Pristine,
            message: None,
            precompiled: None,
            generation: 0,
        }
    }

    /// Noun used in messages when it differs from the label
    pub fn noun(mut self, noun: impl Into<String>) -> Self {
        self.noun = noun.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn noun_text(&self) -> &str {
        &self.noun
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn state(&self) -> &FieldState {
        &self.state
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn dropdown(&self) -> Option<&Dropdown> {
        match &self.kind {
            FieldKind::Select(dropdown) => Some(dropdown),
            _ => None,
        }
    }

    pub fn dropdown_mut(&mut self) -> Option<&mut Dropdown> {
        match &mut self.kind {
            FieldKind::Select(dropdown) => Some(dropdown),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.state, FieldState::Valid(_))
    }

    pub fn value(&self) -> Option<&FieldValue> {
        match &self.state {
            FieldState::Valid(value) => Some(value),
            _ => None,
        }
    }

    fn is_precompiled(&self) -> bool {
        self.precompiled.as_deref() == Some(self.raw.as_str())
    }

    /// True once the raw value differs from what the form was loaded with
    pub fn changed(&self) -> bool {
        !self.is_precompiled() && self.state != FieldState::Pristine
    }

    /// Records new raw input and returns the generation it belongs to.
    pub fn input(&mut self, raw: impl Into<String>) -> u64 {
        self.raw = raw.into();
        self.generation += 1;
        if self.is_precompiled() {
            self.state = FieldState::Valid(self.kind.trusted_value(&self.raw));
            self.message = None;
        } else {
            self.state = FieldState::Validating;
        }
        self.generation
    }

    /// Runs the check for the current raw value.
    pub fn validate(&mut self) -> Validation {
        if self.is_precompiled() {
            self.state = FieldState::Valid(self.kind.trusted_value(&self.raw));
            return Validation::Done;
        }
        match self.kind.check(&self.raw, &self.noun) {
            Check::Valid(value, message) => {
                self.state = FieldState::Valid(value);
                self.message = message;
                Validation::Done
            }
            Check::Invalid(message) => {
                self.state = FieldState::Invalid(message.clone());
                self.message = Some(message);
                Validation::Done
            }
            Check::Remote => {
                self.state = FieldState::Validating;
                let endpoint = match &self.kind {
                    FieldKind::Remote { endpoint } => endpoint.clone(),
                    _ => String::new(),
                };
                Validation::Remote(RemoteCheck {
                    generation: self.generation,
                    endpoint,
                    param: self.id.clone(),
                    value: self.raw.clone(),
                })
            }
        }
    }

    /// Applies a feedback reply. Returns false when the reply is stale.
    pub fn apply_feedback(&mut self, generation: u64, result: Result<String, ClientError>) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "Discarding feedback for {} (generation {} != {})",
                self.id,
                generation,
                self.generation
            );
            return false;
        }
        match result {
            Ok(feedback) if feedback.contains('!') => {
                self.state = FieldState::Invalid(feedback.clone());
                self.message = Some(feedback);
            }
            Ok(feedback) => {
                self.state = FieldState::Valid(FieldValue::Text(self.raw.clone()));
                self.message = Some(feedback);
            }
            Err(e) => {
                tracing::warn!("Feedback for {} failed: {}", self.id, e);
                self.state = FieldState::Unreachable;
                self.message = Some(UNREACHABLE_MESSAGE.to_string());
            }
        }
        true
    }

    /// Loads a server-provided value. It counts as valid without any check.
    pub fn precompile(&mut self, value: impl Into<String>) -> u64 {
        let value = value.into();
        self.precompiled = Some(value.clone());
        self.raw = value;
        self.generation += 1;
        self.state = FieldState::Valid(self.kind.trusted_value(&self.raw));
        self.message = None;
        self.generation
    }

    pub fn render(&self) -> (String, Tone) {
        match &self.state {
            FieldState::Pristine => (String::new(), Tone::Neutral),
            FieldState::Validating => ("Checking...".to_string(), Tone::Neutral),
            FieldState::Valid(_) => (self.message.clone().unwrap_or_default(), Tone::Success),
            FieldState::Invalid(message) => (message.clone(), Tone::Error),
            FieldState::Unreachable => (UNREACHABLE_MESSAGE.to_string(), Tone::Error),
        }
    }
}
