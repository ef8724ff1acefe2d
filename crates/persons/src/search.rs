//! Exact-field filters plus a free-text search over name and CPF.

use chrono::NaiveDate;

use roster_core::FieldErrors;

use crate::person::{Person, Sex};

/// Equality constraint on one field. Multiple filters are ANDed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExactFilter {
    Name(String),
    /// Compared against the normalized (digits only) CPF.
    Cpf(String),
    Sex(Sex),
    DateOfBirth(NaiveDate),
}

impl ExactFilter {
    fn matches(&self, person: &Person) -> bool {
        match self {
            ExactFilter::Name(name) => person.name == *name,
            ExactFilter::Cpf(digits) => person.cpf.as_str() == digits,
            ExactFilter::Sex(sex) => person.sex == *sex,
            ExactFilter::DateOfBirth(date) => person.date_of_birth == *date,
        }
    }

    fn cache_key(&self) -> String {
        match self {
            ExactFilter::Name(v) => format!("name={v}"),
            ExactFilter::Cpf(v) => format!("cpf={v}"),
            ExactFilter::Sex(v) => format!("sex={}", v.code()),
            ExactFilter::DateOfBirth(v) => format!("date_of_birth={v}"),
        }
    }
}

/// Result ordering. Ties keep the store's insertion order, except under
/// `CreatedDesc` where the latest insert comes first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ordering {
    CreatedAsc,
    #[default]
    CreatedDesc,
    NameAsc,
    NameDesc,
}

impl Ordering {
    /// `created_at`, `-created_at`, `name`, `-name`. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "created_at" => Some(Ordering::CreatedAsc),
            "-created_at" => Some(Ordering::CreatedDesc),
            "name" => Some(Ordering::NameAsc),
            "-name" => Some(Ordering::NameDesc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Ordering::CreatedAsc => "created_at",
            Ordering::CreatedDesc => "-created_at",
            Ordering::NameAsc => "name",
            Ordering::NameDesc => "-name",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    exact: Vec<ExactFilter>,
    search: Option<String>,
    ordering: Ordering,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exact(mut self, filter: ExactFilter) -> Self {
        self.exact.push(filter);
        self
    }

    /// Blank terms are ignored.
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        let term = term.trim();
        self.search = if term.is_empty() { None } else { Some(term.to_string()) };
        self
    }

    pub fn with_ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Build from query-string pairs.
    ///
    /// Recognized keys: `search`, `ordering`, `name`, `cpf`, `sex`,
    /// `date_of_birth`. Other keys (pagination, cache busters) are ignored, as
    /// is an unknown ordering.
    pub fn from_params<'a, I>(params: I) -> Result<Self, FieldErrors>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Self::new();
        let mut errors = FieldErrors::new();

        for (key, value) in params {
            match key {
                "search" => filter = filter.with_search(value),
                "ordering" => {
                    if let Some(ordering) = Ordering::parse(value) {
                        filter.ordering = ordering;
                    }
                }
                "name" if !value.is_empty() => filter.exact.push(ExactFilter::Name(value.to_string())),
                "cpf" if !value.is_empty() => {
                    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
                    filter.exact.push(ExactFilter::Cpf(digits));
                }
                "sex" if !value.is_empty() => match Sex::parse(value) {
                    Some(sex) => filter.exact.push(ExactFilter::Sex(sex)),
                    None => errors.add(
                        "sex",
                        format!("Select a valid choice. {value} is not one of the available choices."),
                    ),
                },
                "date_of_birth" if !value.is_empty() => {
                    match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
                        Ok(date) => filter.exact.push(ExactFilter::DateOfBirth(date)),
                        Err(_) => errors.add("date_of_birth", "Enter a valid date."),
                    }
                }
                _ => {}
            }
        }

        errors.into_result().map(|()| filter)
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn ordering(&self) -> Ordering {
        self.ordering
    }

    /// Exact filters AND (name contains term, case-insensitive OR cpf equals
    /// the term once CPF punctuation is stripped).
    pub fn matches(&self, person: &Person) -> bool {
        if !self.exact.iter().all(|f| f.matches(person)) {
            return false;
        }
        match &self.search {
            None => true,
            Some(term) => {
                let name_hit = person.name.to_lowercase().contains(&term.to_lowercase());
                name_hit || cpf_term(term).is_some_and(|digits| person.cpf.as_str() == digits)
            }
        }
    }

    /// Filter and order `records`, which must arrive in insertion order.
    pub fn apply(&self, records: Vec<Person>) -> Vec<Person> {
        let mut out: Vec<Person> = records.into_iter().filter(|p| self.matches(p)).collect();
        match self.ordering {
            Ordering::CreatedAsc => out.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            Ordering::CreatedDesc => {
                out.reverse();
                out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            Ordering::NameAsc => out.sort_by(|a, b| a.name.cmp(&b.name)),
            Ordering::NameDesc => out.sort_by(|a, b| b.name.cmp(&a.name)),
        }
        out
    }

    /// Stable key identifying this query, for result caching.
    pub fn cache_key(&self) -> String {
        let mut parts: Vec<String> = self.exact.iter().map(ExactFilter::cache_key).collect();
        parts.sort();
        if let Some(term) = &self.search {
            parts.push(format!("search={term}"));
        }
        parts.push(format!("ordering={}", self.ordering.as_str()));
        parts.join("&")
    }
}

/// Digits of a term written as a CPF: digits plus `.`, `-` and spaces only.
fn cpf_term(term: &str) -> Option<String> {
    let is_cpf_char = |c: char| c.is_ascii_digit() || c == '.' || c == '-' || c.is_whitespace();
    if !term.chars().all(is_cpf_char) {
        return None;
    }
    let digits: String = term.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpf::Cpf;
    use crate::measure::Centi;
    use chrono::{Duration, TimeZone, Utc};
    use roster_core::PersonId;

    fn person(name: &str, cpf: &str, sex: Sex, minute: i64) -> Person {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
        Person {
            id: PersonId::new(),
            name: name.to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            cpf: Cpf::parse(cpf).unwrap(),
            sex,
            height: Centi::from_hundredths(170),
            weight: Centi::from_hundredths(7000),
            created_at: at,
            updated_at: at,
        }
    }

    fn sample() -> Vec<Person> {
        vec![
            person("Alice Wonder", "11144477735", Sex::Female, 0),
            person("Bob Builder", "52998224725", Sex::Male, 1),
            person("Carol wonderland", "39053344705", Sex::Female, 2),
        ]
    }

    fn names(people: &[Person]) -> Vec<&str> {
        people.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn search_matches_name_substring_case_insensitively() {
        let result = SearchFilter::new().with_search("Wonder").apply(sample());
        assert_eq!(names(&result), vec!["Carol wonderland", "Alice Wonder"]);
    }

    #[test]
    fn empty_search_returns_everything_newest_first() {
        let result = SearchFilter::new().with_search("  ").apply(sample());
        assert_eq!(names(&result), vec!["Carol wonderland", "Bob Builder", "Alice Wonder"]);
    }

    #[test]
    fn search_matches_exact_cpf_after_stripping() {
        let result = SearchFilter::new().with_search("529.982.247-25").apply(sample());
        assert_eq!(names(&result), vec!["Bob Builder"]);

        // Partial CPF is not a match.
        let result = SearchFilter::new().with_search("529982").apply(sample());
        assert!(result.is_empty());

        // Digits inside a wider term do not select by CPF.
        let result = SearchFilter::new().with_search("Bob 52998224725").apply(sample());
        assert!(result.is_empty());
        let result = SearchFilter::new().with_search("cpf:52998224725").apply(sample());
        assert!(result.is_empty());
        let result = SearchFilter::new().with_search("529 982 247 25").apply(sample());
        assert_eq!(names(&result), vec!["Bob Builder"]);
    }

    #[test]
    fn exact_filters_are_anded_with_search() {
        let result = SearchFilter::new()
            .with_exact(ExactFilter::Sex(Sex::Female))
            .with_search("alice")
            .apply(sample());
        assert_eq!(names(&result), vec!["Alice Wonder"]);

        let result = SearchFilter::new()
            .with_exact(ExactFilter::Sex(Sex::Male))
            .with_search("alice")
            .apply(sample());
        assert!(result.is_empty());
    }

    #[test]
    fn from_params_parses_known_keys() {
        let filter = SearchFilter::from_params([
            ("sex", "F"),
            ("search", "wonder"),
            ("ordering", "name"),
            ("page", "2"),
        ])
        .unwrap();
        let result = filter.apply(sample());
        assert_eq!(names(&result), vec!["Alice Wonder", "Carol wonderland"]);
    }

    #[test]
    fn from_params_rejects_unknown_sex() {
        let errors = SearchFilter::from_params([("sex", "X")]).unwrap_err();
        assert!(errors.get("sex").is_some());
    }

    #[test]
    fn created_at_ties_follow_insertion_order() {
        let people = vec![
            person("First", "11144477735", Sex::Male, 0),
            person("Second", "52998224725", Sex::Male, 0),
        ];

        // Newest first: the later insert wins a tie.
        let result = SearchFilter::new().apply(people.clone());
        assert_eq!(names(&result), vec!["Second", "First"]);

        let result = SearchFilter::new().with_ordering(Ordering::CreatedAsc).apply(people);
        assert_eq!(names(&result), vec!["First", "Second"]);
    }

    #[test]
    fn cache_key_is_order_independent() {
        let a = SearchFilter::from_params([("sex", "M"), ("name", "Bob")]).unwrap();
        let b = SearchFilter::from_params([("name", "Bob"), ("sex", "m")]).unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), SearchFilter::new().cache_key());
    }
}
