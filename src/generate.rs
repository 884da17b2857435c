//! Synthetic profile data for feeding the pipelines.
//!
//! [`ProfileGenerator`] is an endless, seedable iterator of simple profiles. [`generate_file`]
//! drains it into a file until the file reaches a minimum size, in either record format the
//! ingestion layer understands.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{Days, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::{AnalysisError, AnalysisResult};
use crate::execution::CancellationToken;
use crate::ingestion::RecordFormat;

const FEMALE_NAMES: &[&str] = &[
    "Mary", "Patricia", "Jennifer", "Linda", "Elizabeth", "Barbara", "Susan", "Jessica", "Sarah",
    "Karen", "Nancy", "Lisa", "Ashley", "Kimberly", "Emily", "Donna", "Michelle", "Amanda",
];
const MALE_NAMES: &[&str] = &[
    "James", "Robert", "John", "Michael", "David", "William", "Richard", "Joseph", "Thomas",
    "Christopher", "Charles", "Daniel", "Matthew", "Anthony", "Mark", "Steven", "Paul", "Andrew",
];
const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Lee",
];
const STREETS: &[&str] = &["Main", "Oak", "Pine", "Maple", "Cedar", "Elm", "Washington", "Lake"];
const STREET_KINDS: &[&str] = &["St", "Ave", "Rd", "Blvd", "Ln", "Way"];
const CITIES: &[(&str, &str)] = &[
    ("Springfield", "IL"),
    ("Riverside", "CA"),
    ("Franklin", "TN"),
    ("Georgetown", "TX"),
    ("Salem", "OR"),
    ("Madison", "WI"),
];
const FREE_EMAIL_DOMAINS: &[&str] = &["gmail.com", "yahoo.com", "hotmail.com"];

/// Oldest generated age, in years.
const MAX_AGE_YEARS: u64 = 115;

/// One generated profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedProfile {
    pub username: String,
    pub name: String,
    pub sex: String,
    pub address: String,
    pub mail: String,
    pub birthdate: NaiveDate,
}

impl GeneratedProfile {
    /// Encode as one line (without newline) in `format`.
    pub fn to_line(&self, format: RecordFormat) -> AnalysisResult<String> {
        match format {
            RecordFormat::Json => serde_json::to_string(self)
                .map_err(|e| AnalysisError::config(format!("cannot encode profile: {e}"))),
            RecordFormat::Literal => {
                use chrono::Datelike;
                Ok(format!(
                    "{{'username': {}, 'name': {}, 'sex': {}, 'address': {}, 'mail': {}, 'birthdate': datetime.date({}, {}, {})}}",
                    quote(&self.username),
                    quote(&self.name),
                    quote(&self.sex),
                    quote(&self.address),
                    quote(&self.mail),
                    self.birthdate.year(),
                    self.birthdate.month(),
                    self.birthdate.day(),
                ))
            }
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Endless iterator of random simple profiles.
pub struct ProfileGenerator {
    rng: StdRng,
    today: NaiveDate,
}

impl ProfileGenerator {
    /// Generator with a fixed seed, for reproducible data.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            today: Utc::now().date_naive(),
        }
    }

    /// Generator seeded from the thread-local RNG.
    pub fn new() -> Self {
        Self::seeded(rand::rng().random())
    }

    /// Fix the date ages are counted back from.
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn pick<'a>(&mut self, options: &'a [&'a str]) -> &'a str {
        options.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn username(&mut self, first: &str, last: &str) -> String {
        let name = match self.rng.random_range(0..4u8) {
            0 => format!("{last}{first}"),
            1 => format!("{first}{:02}", self.rng.random_range(0..100u32)),
            2 => format!("{}{last}", first.chars().next().unwrap_or('x')),
            _ => format!("{first}{last}"),
        };
        name.to_lowercase()
    }

    fn birthdate(&mut self) -> NaiveDate {
        let span = MAX_AGE_YEARS * 365 + MAX_AGE_YEARS / 4;
        let back = self.rng.random_range(0..=span);
        self.today
            .checked_sub_days(Days::new(back))
            .unwrap_or(self.today)
    }
}

impl Default for ProfileGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for ProfileGenerator {
    type Item = GeneratedProfile;

    fn next(&mut self) -> Option<Self::Item> {
        let female = self.rng.random_bool(0.5);
        let first = if female {
            self.pick(FEMALE_NAMES)
        } else {
            self.pick(MALE_NAMES)
        };
        let last = self.pick(LAST_NAMES);

        let username = self.username(first, last);
        let mail_first = if self.rng.random_bool(0.5) {
            self.pick(FEMALE_NAMES)
        } else {
            self.pick(MALE_NAMES)
        };
        let mail_last = self.pick(LAST_NAMES);
        let mail_user = self.username(mail_first, mail_last);
        let domain = self.pick(FREE_EMAIL_DOMAINS);

        let (city, state) = *CITIES.choose(&mut self.rng).unwrap_or(&CITIES[0]);
        let number = self.rng.random_range(1..10_000u32);
        let street = self.pick(STREETS);
        let kind = self.pick(STREET_KINDS);
        let zip = self.rng.random_range(501..99_951u32);
        let address = format!("{number} {street} {kind}\n{city}, {state} {zip:05}");

        Some(GeneratedProfile {
            username,
            name: format!("{first} {last}"),
            sex: if female { "F" } else { "M" }.to_string(),
            address,
            mail: format!("{mail_user}@{domain}"),
            birthdate: self.birthdate(),
        })
    }
}

/// Multiplier for a file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    B,
    KB,
    MB,
    GB,
}

impl SizeUnit {
    pub fn bytes(self) -> u64 {
        match self {
            SizeUnit::B => 1,
            SizeUnit::KB => 1024,
            SizeUnit::MB => 1024 * 1024,
            SizeUnit::GB => 1024 * 1024 * 1024,
        }
    }
}

/// What [`generate_file`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateStats {
    pub records: u64,
    pub bytes: u64,
}

/// Write profiles from `generator` to `path` until it holds at least `min_bytes` bytes.
///
/// An existing file is truncated. Failure to create the file is a
/// [`AnalysisError::Path`]; cancellation flushes what was written and returns
/// [`AnalysisError::Interrupted`], leaving a short file behind.
pub fn generate_file(
    path: impl AsRef<Path>,
    min_bytes: u64,
    format: RecordFormat,
    generator: impl Iterator<Item = GeneratedProfile>,
    cancel: &CancellationToken,
) -> AnalysisResult<GenerateStats> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| AnalysisError::Path {
        path: path.to_path_buf(),
        source,
    })?;
    let mut w = BufWriter::new(file);

    let mut stats = GenerateStats {
        records: 0,
        bytes: 0,
    };
    for profile in generator {
        if stats.bytes >= min_bytes {
            break;
        }
        if cancel.is_cancelled() {
            w.flush()?;
            return Err(AnalysisError::Interrupted {
                records: stats.records,
            });
        }
        let line = profile.to_line(format)?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
        stats.bytes += line.len() as u64 + 1;
        stats.records += 1;
    }
    w.flush()?;
    Ok(stats)
}
