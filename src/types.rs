//! Core data model types for streaming aggregation.
//!
//! A [`RawRecord`] is one line of the input file. Decoding turns it into a
//! [`ProfileRecord`], which projectors reduce to the small values the folds consume.
//! Each fold finishes into an [`Aggregate`], the only shape a sink ever sees.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// One line of text read from the source file, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line number within the file.
    pub line: usize,
    /// Line contents without the trailing newline.
    pub text: String,
}

/// A decoded profile line.
///
/// Only the fields the projectors read are kept; everything else on the line is
/// dropped during decoding. Fields are optional here so that a missing key fails
/// only the pipelines that need it.
///
/// `sex` keeps an absent key (`None`) apart from a present null value (`Some(None)`):
/// the first is a missing field, the second is just another marker that is neither
/// `F` nor `M`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileRecord {
    /// Line the record was decoded from.
    #[serde(skip)]
    pub line: usize,
    pub username: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub sex: Option<Option<String>>,
    pub mail: Option<String>,
    pub birthdate: Option<NaiveDate>,
}

impl ProfileRecord {
    pub fn username(&self) -> AnalysisResult<&str> {
        self.username.as_deref().ok_or_else(|| self.missing("username"))
    }

    /// `Ok(None)` when the key is present with a null value.
    pub fn sex(&self) -> AnalysisResult<Option<&str>> {
        self.sex
            .as_ref()
            .map(Option::as_deref)
            .ok_or_else(|| self.missing("sex"))
    }

    pub fn mail(&self) -> AnalysisResult<&str> {
        self.mail.as_deref().ok_or_else(|| self.missing("mail"))
    }

    pub fn birthdate(&self) -> AnalysisResult<NaiveDate> {
        self.birthdate.ok_or_else(|| self.missing("birthdate"))
    }

    fn missing(&self, field: &'static str) -> AnalysisError {
        AnalysisError::MissingField {
            line: self.line,
            field,
        }
    }
}

// Deserializes a key that is present, so a null value becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Marker of [`Category::Female`], also its key in [`Aggregate::UsernameLengths`].
pub const FEMALE_MARKER: &str = "F";
/// Marker of [`Category::Male`], also its key in [`Aggregate::UsernameLengths`].
pub const MALE_MARKER: &str = "M";

/// Sex marker of a profile, as used to bucket username lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Marker `"F"`.
    Female,
    /// Marker `"M"`.
    Male,
    /// Any other marker, including a null one. Neither summed nor counted, and never
    /// reported.
    Other,
}

impl Category {
    /// Map a verbatim `sex` value to a category. Matching is exact and case-sensitive.
    pub fn from_marker(marker: &str) -> Self {
        match marker {
            FEMALE_MARKER => Category::Female,
            MALE_MARKER => Category::Male,
            _ => Category::Other,
        }
    }
}

/// The three statistics computed over a profile file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    /// Average username length per sex.
    Usernames,
    /// Email-domain frequency.
    EmailDomains,
    /// Birth-year frequency.
    BirthYears,
}

impl Statistic {
    /// Every statistic, in report order.
    pub const ALL: [Statistic; 3] = [
        Statistic::Usernames,
        Statistic::EmailDomains,
        Statistic::BirthYears,
    ];

    /// Stable snake_case name, used in logs and output file names.
    pub fn name(self) -> &'static str {
        match self {
            Statistic::Usernames => "usernames",
            Statistic::EmailDomains => "email_domains",
            Statistic::BirthYears => "birth_years",
        }
    }

    /// Human-readable chart title.
    pub fn title(self) -> &'static str {
        match self {
            Statistic::Usernames => "Average length of username per sex",
            Statistic::EmailDomains => "Users' email domains",
            Statistic::BirthYears => "Users' years of birth",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A finished aggregate, handed immutably to a sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "statistic", content = "values", rename_all = "snake_case")]
pub enum Aggregate {
    /// `{category -> average username length}`, keys `F` and `M`.
    UsernameLengths(BTreeMap<String, f64>),
    /// `{domain -> count}`, unordered.
    EmailDomains(HashMap<String, u64>),
    /// `{year -> count}`, ascending by year.
    BirthYears(BTreeMap<i32, u64>),
}

impl Aggregate {
    /// The statistic this aggregate answers.
    pub fn statistic(&self) -> Statistic {
        match self {
            Aggregate::UsernameLengths(_) => Statistic::Usernames,
            Aggregate::EmailDomains(_) => Statistic::EmailDomains,
            Aggregate::BirthYears(_) => Statistic::BirthYears,
        }
    }

    /// Number of keys in the aggregate.
    pub fn len(&self) -> usize {
        match self {
            Aggregate::UsernameLengths(m) => m.len(),
            Aggregate::EmailDomains(m) => m.len(),
            Aggregate::BirthYears(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
