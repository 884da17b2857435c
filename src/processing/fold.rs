//! Incremental folds over a record stream.
//!
//! Each [`Aggregator`] is a strict left fold: it starts empty, takes one projected value per
//! record, and is finalized exactly once when the stream is exhausted. [`fold_records`] drives
//! an aggregator over any record iterator, emitting a progress count at a fixed cadence and
//! stopping early if the run is cancelled.

use std::collections::{BTreeMap, HashMap};

use crate::error::{AnalysisError, AnalysisResult};
use crate::execution::CancellationToken;
use crate::types::{Aggregate, Category, ProfileRecord, Statistic, FEMALE_MARKER, MALE_MARKER};

use super::project;

/// Default number of folded records between progress signals.
pub const DEFAULT_PROGRESS_EVERY: u64 = 10_000;

/// A running aggregate for one statistic.
pub trait Aggregator {
    /// Projected value consumed per record.
    type Input;

    /// Statistic this aggregator produces.
    fn statistic(&self) -> Statistic;

    /// Derive this aggregator's input from a decoded record.
    fn project(&self, record: &ProfileRecord) -> AnalysisResult<Self::Input>;

    /// Fold one value into the accumulator.
    fn add_input(&mut self, value: Self::Input);

    /// Finalize into an immutable aggregate.
    fn finish(self) -> AnalysisResult<Aggregate>;
}

/// Running username-length sums and counts for `F` and `M`.
///
/// Records with any other marker are neither summed nor counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorizedSum {
    female_sum: u64,
    female_count: u64,
    male_sum: u64,
    male_count: u64,
}

impl CategorizedSum {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for CategorizedSum {
    type Input = (u64, Category);

    fn statistic(&self) -> Statistic {
        Statistic::Usernames
    }

    fn project(&self, record: &ProfileRecord) -> AnalysisResult<Self::Input> {
        project::username_length_and_category(record)
    }

    fn add_input(&mut self, (length, category): Self::Input) {
        match category {
            Category::Female => {
                self.female_sum += length;
                self.female_count += 1;
            }
            Category::Male => {
                self.male_sum += length;
                self.male_count += 1;
            }
            Category::Other => {}
        }
    }

    fn finish(self) -> AnalysisResult<Aggregate> {
        let female = average(self.female_sum, self.female_count, FEMALE_MARKER)?;
        let male = average(self.male_sum, self.male_count, MALE_MARKER)?;

        let mut out = BTreeMap::new();
        out.insert(FEMALE_MARKER.to_string(), female);
        out.insert(MALE_MARKER.to_string(), male);
        Ok(Aggregate::UsernameLengths(out))
    }
}

fn average(sum: u64, count: u64, category: &'static str) -> AnalysisResult<f64> {
    if count == 0 {
        return Err(AnalysisError::DivisionByZero { category });
    }
    Ok(sum as f64 / count as f64)
}

/// Occurrence count per email domain. Order is not meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainFrequency {
    counts: HashMap<String, u64>,
}

impl DomainFrequency {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for DomainFrequency {
    type Input = String;

    fn statistic(&self) -> Statistic {
        Statistic::EmailDomains
    }

    fn project(&self, record: &ProfileRecord) -> AnalysisResult<Self::Input> {
        project::email_domain(record)
    }

    fn add_input(&mut self, domain: String) {
        *self.counts.entry(domain).or_insert(0) += 1;
    }

    fn finish(self) -> AnalysisResult<Aggregate> {
        Ok(Aggregate::EmailDomains(self.counts))
    }
}

/// Occurrence count per birth year, sorted ascending on finish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearFrequency {
    counts: HashMap<i32, u64>,
}

impl YearFrequency {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Aggregator for YearFrequency {
    type Input = i32;

    fn statistic(&self) -> Statistic {
        Statistic::BirthYears
    }

    fn project(&self, record: &ProfileRecord) -> AnalysisResult<Self::Input> {
        project::birth_year(record)
    }

    fn add_input(&mut self, year: i32) {
        *self.counts.entry(year).or_insert(0) += 1;
    }

    fn finish(self) -> AnalysisResult<Aggregate> {
        Ok(Aggregate::BirthYears(self.counts.into_iter().collect()))
    }
}

/// Options for [`fold_records`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldOptions {
    /// Emit a progress count every this many folded records. Must be > 0.
    pub progress_every: u64,
}

impl Default for FoldOptions {
    fn default() -> Self {
        Self {
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

/// A finished fold.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldOutcome {
    pub aggregate: Aggregate,
    /// Number of records folded.
    pub records: u64,
}

/// Fold `records` into `aggregator`.
///
/// The first decode or projection error aborts the fold. `on_progress` receives the cumulative
/// count every `opts.progress_every` records; it only observes and cannot affect the result.
/// The token is checked before every record, and cancellation yields
/// [`AnalysisError::Interrupted`].
pub fn fold_records<A, I, P>(
    records: I,
    mut aggregator: A,
    opts: &FoldOptions,
    cancel: &CancellationToken,
    mut on_progress: P,
) -> AnalysisResult<FoldOutcome>
where
    A: Aggregator,
    I: IntoIterator<Item = AnalysisResult<ProfileRecord>>,
    P: FnMut(u64),
{
    if opts.progress_every == 0 {
        return Err(AnalysisError::config("progress_every must be > 0"));
    }

    let mut folded: u64 = 0;
    for record in records {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Interrupted { records: folded });
        }
        let record = record?;
        let value = aggregator.project(&record)?;
        aggregator.add_input(value);

        folded += 1;
        if folded % opts.progress_every == 0 {
            on_progress(folded);
        }
    }

    Ok(FoldOutcome {
        aggregate: aggregator.finish()?,
        records: folded,
    })
}

/// Fold `records` with the aggregator for `statistic`.
pub fn fold_statistic<I, P>(
    statistic: Statistic,
    records: I,
    opts: &FoldOptions,
    cancel: &CancellationToken,
    on_progress: P,
) -> AnalysisResult<FoldOutcome>
where
    I: IntoIterator<Item = AnalysisResult<ProfileRecord>>,
    P: FnMut(u64),
{
    match statistic {
        Statistic::Usernames => {
            fold_records(records, CategorizedSum::new(), opts, cancel, on_progress)
        }
        Statistic::EmailDomains => {
            fold_records(records, DomainFrequency::new(), opts, cancel, on_progress)
        }
        Statistic::BirthYears => {
            fold_records(records, YearFrequency::new(), opts, cancel, on_progress)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        fold_records, fold_statistic, Aggregator, CategorizedSum, DomainFrequency, FoldOptions,
        YearFrequency,
    };
    use crate::error::{AnalysisError, AnalysisResult};
    use crate::execution::CancellationToken;
    use crate::types::{Aggregate, Category, ProfileRecord, Statistic};
    use chrono::NaiveDate;

    fn profile(line: usize, username: &str, sex: &str, mail: &str, year: i32) -> ProfileRecord {
        ProfileRecord {
            line,
            username: Some(username.to_string()),
            sex: Some(Some(sex.to_string())),
            mail: Some(mail.to_string()),
            birthdate: NaiveDate::from_ymd_opt(year, 1, 1),
        }
    }

    fn ok_stream(records: Vec<ProfileRecord>) -> Vec<AnalysisResult<ProfileRecord>> {
        records.into_iter().map(Ok).collect()
    }

    #[test]
    fn categorized_sum_averages_per_category() {
        let mut acc = CategorizedSum::new();
        for (len, cat) in [
            (3, Category::Female),
            (5, Category::Female),
            (10, Category::Male),
            (99, Category::Other),
        ] {
            acc.add_input((len, cat));
        }
        match acc.finish().unwrap() {
            Aggregate::UsernameLengths(m) => {
                assert_eq!(m.len(), 2);
                assert_eq!(m["F"], 4.0);
                assert_eq!(m["M"], 10.0);
            }
            other => panic!("unexpected aggregate: {other:?}"),
        }
    }

    #[test]
    fn categorized_sum_without_a_category_is_division_by_zero() {
        let mut acc = CategorizedSum::new();
        acc.add_input((4, Category::Male));
        assert!(matches!(
            acc.finish(),
            Err(AnalysisError::DivisionByZero { category: "F" })
        ));

        let mut acc = CategorizedSum::new();
        acc.add_input((4, Category::Female));
        acc.add_input((4, Category::Other));
        assert!(matches!(
            acc.finish(),
            Err(AnalysisError::DivisionByZero { category: "M" })
        ));
    }

    #[test]
    fn domain_frequency_counts_sum_to_input_length() {
        let inputs = ["gmail", "yahoo", "gmail", "hotmail", "gmail", ""];
        let mut acc = DomainFrequency::new();
        for d in inputs {
            acc.add_input(d.to_string());
        }
        match acc.finish().unwrap() {
            Aggregate::EmailDomains(m) => {
                assert_eq!(m.values().sum::<u64>(), inputs.len() as u64);
                assert_eq!(m.len(), 4);
                assert_eq!(m["gmail"], 3);
                assert_eq!(m[""], 1);
            }
            other => panic!("unexpected aggregate: {other:?}"),
        }
    }

    #[test]
    fn year_frequency_is_sorted_ascending() {
        let mut acc = YearFrequency::new();
        for y in [2001, 1950, 1990, 1950, 2024, 1908] {
            acc.add_input(y);
        }
        match acc.finish().unwrap() {
            Aggregate::BirthYears(m) => {
                let keys: Vec<i32> = m.keys().copied().collect();
                assert_eq!(keys, vec![1908, 1950, 1990, 2001, 2024]);
                assert!(keys.windows(2).all(|w| w[0] < w[1]));
                assert_eq!(m[&1950], 2);
            }
            other => panic!("unexpected aggregate: {other:?}"),
        }
    }

    #[test]
    fn progress_fires_on_cadence_across_all_categories() {
        let records: Vec<_> = (0..25)
            .map(|i| {
                let sex = match i % 3 {
                    0 => "F",
                    1 => "M",
                    _ => "X",
                };
                profile(i + 1, "user", sex, "u@gmail.com", 1990)
            })
            .collect();

        let mut seen = Vec::new();
        let out = fold_records(
            ok_stream(records),
            CategorizedSum::new(),
            &FoldOptions { progress_every: 10 },
            &CancellationToken::new(),
            |n| seen.push(n),
        )
        .unwrap();

        assert_eq!(seen, vec![10, 20]);
        assert_eq!(out.records, 25);
    }

    #[test]
    fn first_error_aborts_the_fold() {
        let mut stream = ok_stream(vec![
            profile(1, "ann", "F", "ann@gmail.com", 1990),
            profile(2, "bob", "M", "bob@gmail.com", 1985),
        ]);
        stream.push(Err(AnalysisError::Decode {
            line: 3,
            message: "bad".to_string(),
        }));
        stream.push(Ok(profile(4, "cat", "F", "cat@gmail.com", 1970)));

        let err = fold_statistic(
            Statistic::BirthYears,
            stream,
            &FoldOptions::default(),
            &CancellationToken::new(),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Decode { line: 3, .. }));
    }

    #[test]
    fn cancelled_token_interrupts_before_folding() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fold_statistic(
            Statistic::EmailDomains,
            ok_stream(vec![profile(1, "ann", "F", "ann@gmail.com", 1990)]),
            &FoldOptions::default(),
            &cancel,
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Interrupted { records: 0 }));
    }

    #[test]
    fn zero_progress_cadence_is_rejected() {
        let err = fold_records(
            Vec::new(),
            DomainFrequency::new(),
            &FoldOptions { progress_every: 0 },
            &CancellationToken::new(),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Config { .. }));
    }

    #[test]
    fn aggregators_know_their_statistic() {
        assert_eq!(CategorizedSum::new().statistic(), Statistic::Usernames);
        assert_eq!(DomainFrequency::new().statistic(), Statistic::EmailDomains);
        assert_eq!(YearFrequency::new().statistic(), Statistic::BirthYears);
    }
}
