//! Field projection for [`crate::types::ProfileRecord`].
//!
//! Each projector derives the one value a specific fold needs and fails with
//! [`crate::AnalysisError::MissingField`] if the record does not carry it.

use crate::error::AnalysisResult;
use crate::types::{Category, ProfileRecord};

/// `(username length in characters, category from the sex marker)`.
pub fn username_length_and_category(record: &ProfileRecord) -> AnalysisResult<(u64, Category)> {
    let length = record.username()?.chars().count() as u64;
    let category = record.sex()?.map_or(Category::Other, Category::from_marker);
    Ok((length, category))
}

/// Email domain of the `mail` field, see [`extract_domain`].
pub fn email_domain(record: &ProfileRecord) -> AnalysisResult<String> {
    Ok(extract_domain(record.mail()?))
}

/// Calendar year of the `birthdate` field.
pub fn birth_year(record: &ProfileRecord) -> AnalysisResult<i32> {
    use chrono::Datelike;
    Ok(record.birthdate()?.year())
}

/// Take the text between the first `@` and the first `.com`, then strip `@` from both ends.
///
/// This is a heuristic, not an address parser. Positions are counted in characters, a
/// missing marker counts as position `-1`, and negative positions wrap from the end of the
/// string. So `.org` addresses lose their last character (`bob@example.org` gives `example.or`) and an address
/// without `@` gives an empty string. Callers relying on exact domains should normalise
/// their data first.
pub fn extract_domain(mail: &str) -> String {
    let len = mail.chars().count() as isize;
    let position = |needle: &str| -> isize {
        mail.find(needle)
            .map(|byte| mail[..byte].chars().count() as isize)
            .unwrap_or(-1)
    };

    let start = clamp_slice_index(position("@"), len);
    let end = clamp_slice_index(position(".com"), len);
    if start >= end {
        return String::new();
    }

    let slice: String = mail.chars().skip(start).take(end - start).collect();
    slice.trim_matches('@').to_string()
}

fn clamp_slice_index(i: isize, len: isize) -> usize {
    let resolved = if i < 0 { (i + len).max(0) } else { i.min(len) };
    resolved as usize
}

#[cfg(test)]
mod tests {
    use super::{birth_year, email_domain, extract_domain, username_length_and_category};
    use crate::error::AnalysisError;
    use crate::types::{Category, ProfileRecord};
    use chrono::NaiveDate;

    fn record(username: &str, sex: &str, mail: &str, y: i32, m: u32, d: u32) -> ProfileRecord {
        ProfileRecord {
            line: 1,
            username: Some(username.to_string()),
            sex: Some(Some(sex.to_string())),
            mail: Some(mail.to_string()),
            birthdate: NaiveDate::from_ymd_opt(y, m, d),
        }
    }

    #[test]
    fn projects_username_length_in_characters() {
        let rec = record("zoë_ünal", "F", "z@gmail.com", 1990, 1, 1);
        assert_eq!(
            username_length_and_category(&rec).unwrap(),
            (8, Category::Female)
        );
    }

    #[test]
    fn projects_birth_year_and_domain() {
        let rec = record("bob12", "M", "bob12@hotmail.com", 1985, 6, 15);
        assert_eq!(birth_year(&rec).unwrap(), 1985);
        assert_eq!(email_domain(&rec).unwrap(), "hotmail");
    }

    #[test]
    fn missing_field_fails_only_its_projector() {
        let rec = ProfileRecord {
            line: 4,
            username: Some("ann".to_string()),
            sex: Some(Some("F".to_string())),
            mail: None,
            birthdate: None,
        };
        assert!(username_length_and_category(&rec).is_ok());
        assert!(matches!(
            email_domain(&rec),
            Err(AnalysisError::MissingField { line: 4, field: "mail" })
        ));
        assert!(matches!(
            birth_year(&rec),
            Err(AnalysisError::MissingField { line: 4, field: "birthdate" })
        ));
    }

    #[test]
    fn null_sex_is_an_other_category() {
        let rec = ProfileRecord {
            line: 2,
            username: Some("cy".to_string()),
            sex: Some(None),
            ..Default::default()
        };
        assert_eq!(
            username_length_and_category(&rec).unwrap(),
            (2, Category::Other)
        );

        let absent = ProfileRecord {
            sex: None,
            ..rec
        };
        assert!(matches!(
            username_length_and_category(&absent),
            Err(AnalysisError::MissingField { line: 2, field: "sex" })
        ));
    }

    #[test]
    fn domain_heuristic_for_com_addresses() {
        assert_eq!(extract_domain("ann@gmail.com"), "gmail");
        assert_eq!(extract_domain("first.last@yahoo.com"), "yahoo");
        assert_eq!(extract_domain("x@@gmail.com"), "gmail");
    }

    #[test]
    fn domain_heuristic_degrades_without_com() {
        assert_eq!(extract_domain("bob@example.org"), "example.or");
        assert_eq!(extract_domain("bob@example.net"), "example.ne");
        assert_eq!(extract_domain("no-at-sign.com"), "");
        assert_eq!(extract_domain("plain"), "");
        assert_eq!(extract_domain(""), "");
    }

    #[test]
    fn domain_heuristic_when_com_precedes_at() {
        assert_eq!(extract_domain("a.com@b.org"), "");
        assert_eq!(extract_domain("x.company@mail.com"), "");
    }
}
