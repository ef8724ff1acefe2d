//! Person record, field validation, and the derived ideal weight.

use core::ops::RangeInclusive;
use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use roster_core::{Entity, FieldErrors, PersonId};

use crate::cpf::Cpf;
use crate::measure::{Centi, DecimalInput};

pub const NAME_MAX_LEN: usize = 150;

/// Accepted height in meters (hundredths).
pub const HEIGHT_RANGE: RangeInclusive<Centi> = Centi::from_hundredths(50)..=Centi::from_hundredths(250);

/// Accepted weight in kilograms (hundredths).
pub const WEIGHT_RANGE: RangeInclusive<Centi> =
    Centi::from_hundredths(200)..=Centi::from_hundredths(30_000);

const DATE_FORMAT: &str = "%Y-%m-%d";

const MSG_REQUIRED: &str = "This field is required.";
const MSG_BLANK: &str = "This field may not be blank.";
const MSG_NULL: &str = "This field may not be null.";
const MSG_NOT_STRING: &str = "Not a valid string.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    /// Wire code: `M` / `F`.
    pub fn code(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }

    /// Human label used in CSV exports.
    pub fn label(self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }

    /// Accepts codes and labels (English or Portuguese), case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "m" | "male" | "masculino" => Some(Sex::Male),
            "f" | "female" | "feminino" => Some(Sex::Female),
            _ => None,
        }
    }
}

/// Ideal weight for a height and sex, rounded half away from zero to 2 places.
///
/// Male: `72.7 * h - 58`; female: `62.1 * h - 44.7`. Evaluated exactly in
/// thousandths of a kilogram before rounding.
pub fn ideal_weight(height: Centi, sex: Sex) -> Centi {
    let (slope_tenths, intercept_thousandths) = match sex {
        Sex::Male => (727, 58_000),
        Sex::Female => (621, 44_700),
    };
    let thousandths = slope_tenths * height.hundredths() - intercept_thousandths;
    Centi::from_hundredths(div_round_half_away(thousandths, 10))
}

fn div_round_half_away(n: i64, d: i64) -> i64 {
    let half = d / 2;
    if n >= 0 { (n + half) / d } else { (n - half) / d }
}

/// Validated person attributes (everything except identity and timestamps).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonFields {
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub cpf: Cpf,
    pub sex: Sex,
    pub height: Centi,
    pub weight: Centi,
}

/// A stored person record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub cpf: Cpf,
    pub sex: Sex,
    pub height: Centi,
    pub weight: Centi,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    pub fn new(id: PersonId, fields: PersonFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: fields.name,
            date_of_birth: fields.date_of_birth,
            cpf: fields.cpf,
            sex: fields.sex,
            height: fields.height,
            weight: fields.weight,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn fields(&self) -> PersonFields {
        PersonFields {
            name: self.name.clone(),
            date_of_birth: self.date_of_birth,
            cpf: self.cpf.clone(),
            sex: self.sex,
            height: self.height,
            weight: self.weight,
        }
    }

    /// Replace all attributes, keeping identity and `created_at`.
    pub fn apply(&mut self, fields: PersonFields, now: DateTime<Utc>) {
        self.name = fields.name;
        self.date_of_birth = fields.date_of_birth;
        self.cpf = fields.cpf;
        self.sex = fields.sex;
        self.height = fields.height;
        self.weight = fields.weight;
        self.updated_at = now;
    }

    /// Never stored; recomputed on every read.
    pub fn ideal_weight(&self) -> Centi {
        ideal_weight(self.height, self.sex)
    }
}

impl Entity for Person {
    type Id = PersonId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Raw text field as received. JSON numbers are accepted and read as their
/// decimal text; `null` and other JSON types become field errors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextInput {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
    Other(IgnoredAny),
}

impl TextInput {
    /// The value as text, or the message reported for the field.
    pub fn to_text(&self) -> Result<Cow<'_, str>, &'static str> {
        match self {
            TextInput::Text(s) => Ok(Cow::Borrowed(s)),
            TextInput::Integer(v) => Ok(Cow::Owned(v.to_string())),
            TextInput::Float(v) => Ok(Cow::Owned(v.to_string())),
            TextInput::Null => Err(MSG_NULL),
            TextInput::Other(_) => Err(MSG_NOT_STRING),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TextInput::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for TextInput {
    fn from(value: &str) -> Self {
        TextInput::Text(value.to_string())
    }
}

impl From<String> for TextInput {
    fn from(value: String) -> Self {
        TextInput::Text(value)
    }
}

/// Unvalidated person input, as posted to the API or read from a CSV row.
///
/// Every field is optional so that the same type serves create, full update
/// and partial update; which fields are required is decided by the caller.
/// An explicit `null` is a supplied value, not an absent one.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PersonInput {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<TextInput>,
    #[serde(default, deserialize_with = "present")]
    pub date_of_birth: Option<TextInput>,
    #[serde(default, deserialize_with = "present")]
    pub cpf: Option<TextInput>,
    #[serde(default, deserialize_with = "present")]
    pub sex: Option<TextInput>,
    #[serde(default, deserialize_with = "present")]
    pub height: Option<DecimalInput>,
    #[serde(default, deserialize_with = "present")]
    pub weight: Option<DecimalInput>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl PersonInput {
    /// Validate as a complete record: every field must be present.
    pub fn validate(&self) -> Result<PersonFields, FieldErrors> {
        self.resolve(None)
    }

    /// Merge over `current` and validate the result (partial update).
    pub fn merge_into(&self, current: &PersonFields) -> Result<PersonFields, FieldErrors> {
        self.resolve(Some(current))
    }

    fn resolve(&self, current: Option<&PersonFields>) -> Result<PersonFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = field(&mut errors, "name", self.name.as_ref(), current.map(|c| c.name.clone()), parse_name);
        let date_of_birth = field(
            &mut errors,
            "date_of_birth",
            self.date_of_birth.as_ref(),
            current.map(|c| c.date_of_birth),
            parse_date,
        );
        let cpf = field(&mut errors, "cpf", self.cpf.as_ref(), current.map(|c| c.cpf.clone()), |raw| {
            Cpf::parse(raw).map_err(|e| e.to_string())
        });
        let sex = field(&mut errors, "sex", self.sex.as_ref(), current.map(|c| c.sex), |raw| {
            Sex::parse(raw).ok_or_else(|| format!("\"{}\" is not a valid choice.", raw.trim()))
        });
        let height = decimal_field(&mut errors, "height", self.height.as_ref(), current.map(|c| c.height), &HEIGHT_RANGE);
        let weight = decimal_field(&mut errors, "weight", self.weight.as_ref(), current.map(|c| c.weight), &WEIGHT_RANGE);

        match (name, date_of_birth, cpf, sex, height, weight) {
            (Some(name), Some(date_of_birth), Some(cpf), Some(sex), Some(height), Some(weight))
                if errors.is_empty() =>
            {
                Ok(PersonFields {
                    name,
                    date_of_birth,
                    cpf,
                    sex,
                    height,
                    weight,
                })
            }
            _ => Err(errors),
        }
    }
}

fn field<T>(
    errors: &mut FieldErrors,
    name: &str,
    raw: Option<&TextInput>,
    fallback: Option<T>,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Option<T> {
    let Some(raw) = raw else {
        if fallback.is_none() {
            errors.add(name, MSG_REQUIRED);
        }
        return fallback;
    };

    let text = match raw.to_text() {
        Ok(text) => text,
        Err(message) => {
            errors.add(name, message);
            return None;
        }
    };
    if text.trim().is_empty() {
        errors.add(name, MSG_BLANK);
        return None;
    }

    match parse(&*text) {
        Ok(value) => Some(value),
        Err(message) => {
            errors.add(name, message);
            None
        }
    }
}

fn decimal_field(
    errors: &mut FieldErrors,
    name: &str,
    raw: Option<&DecimalInput>,
    fallback: Option<Centi>,
    range: &RangeInclusive<Centi>,
) -> Option<Centi> {
    let raw = match raw {
        Some(raw) if raw.is_blank() => {
            errors.add(name, MSG_REQUIRED);
            return None;
        }
        Some(raw) => raw,
        None => {
            if fallback.is_none() {
                errors.add(name, MSG_REQUIRED);
            }
            return fallback;
        }
    };

    let value = match raw.parse() {
        Ok(v) => v,
        Err(e) => {
            errors.add(name, e.to_string());
            return None;
        }
    };

    if value < *range.start() {
        errors.add(name, format!("Ensure this value is greater than or equal to {}.", range.start()));
        None
    } else if value > *range.end() {
        errors.add(name, format!("Ensure this value is less than or equal to {}.", range.end()));
        None
    } else {
        Some(value)
    }
}

fn parse_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.chars().count() > NAME_MAX_LEN {
        return Err(format!("Ensure this field has no more than {NAME_MAX_LEN} characters."));
    }
    Ok(name.to_string())
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.".to_string())
}
