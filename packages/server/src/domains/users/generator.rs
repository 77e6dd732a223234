//! Synthetic user generation.
//!
//! Emails are synthesised from the name and birth year, so a small name
//! pool collides quickly; the generator tracks emitted emails per call and
//! gives up after a run of consecutive collisions instead of spinning.

use std::collections::HashSet;

use chrono::{Days, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use super::models::user::{Gender, NewUser};
use crate::domains::cities::City;

/// Consecutive email collisions tolerated before a generation call
/// returns short.
pub const MAX_EMPTY_ITERATIONS: usize = 100;

const MIN_AGE_DAYS: u64 = 10 * 365;
const MAX_AGE_DAYS: u64 = 75 * 365;

const MALE_FIRST_NAMES: &[&str] = &[
    "Adam", "Alex", "Anthony", "Arthur", "Brian", "Carl", "Daniel", "David", "Dennis", "Eric",
    "Felix", "George", "Henry", "Igor", "Ivan", "Jack", "James", "John", "Leo", "Louis", "Mark",
    "Martin", "Michael", "Nick", "Oliver", "Oscar", "Paul", "Peter", "Robert", "Samuel", "Simon",
    "Stephen", "Thomas", "Victor", "Walter",
];

const FEMALE_FIRST_NAMES: &[&str] = &[
    "Alice", "Anna", "Beatrice", "Camille", "Clara", "Diana", "Elena", "Emily", "Emma", "Eva",
    "Grace", "Hannah", "Helen", "Irene", "Iris", "Julia", "Karen", "Laura", "Lily", "Linda",
    "Maria", "Marie", "Martha", "Mary", "Nina", "Nora", "Olivia", "Rachel", "Rose", "Sarah",
    "Sofia", "Susan", "Vera", "Violet", "Zoe",
];

const LAST_NAMES: &[&str] = &[
    "Adams", "Baker", "Bell", "Brooks", "Brown", "Carter", "Clark", "Collins", "Cook", "Cooper",
    "Davis", "Edwards", "Evans", "Fisher", "Foster", "Garcia", "Gray", "Green", "Hall", "Harris",
    "Hill", "Hughes", "Johnson", "Jones", "Kelly", "King", "Lewis", "Martin", "Miller", "Moore",
    "Morgan", "Morris", "Murphy", "Parker", "Reed", "Rogers", "Smith", "Taylor", "Turner",
    "Walker", "Ward", "Watson", "White", "Wilson", "Wright",
];

const HOBBIES: &[&str] = &[
    "astronomy", "baking", "board games", "bouldering", "chess", "cooking", "cycling", "dancing",
    "drawing", "fishing", "gardening", "hiking", "kayaking", "knitting", "painting",
    "photography", "pottery", "reading", "running", "sailing", "singing", "swimming", "tennis",
    "travelling", "woodworking", "yoga",
];

const EMAIL_DOMAINS: &[&str] = &[
    "example.com",
    "mail.example.com",
    "inbox.example.org",
    "post.example.net",
];

/// Lowercase a name into an email-safe slug.
fn transliterate(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub struct UserGenerator {
    male_first_names: &'static [&'static str],
    female_first_names: &'static [&'static str],
    last_names: &'static [&'static str],
    hobbies: &'static [&'static str],
    email_domains: &'static [&'static str],
    max_empty_iterations: usize,
}

impl Default for UserGenerator {
    fn default() -> Self {
        Self {
            male_first_names: MALE_FIRST_NAMES,
            female_first_names: FEMALE_FIRST_NAMES,
            last_names: LAST_NAMES,
            hobbies: HOBBIES,
            email_domains: EMAIL_DOMAINS,
            max_empty_iterations: MAX_EMPTY_ITERATIONS,
        }
    }
}

impl UserGenerator {
    #[cfg(test)]
    fn with_pools(
        male_first_names: &'static [&'static str],
        female_first_names: &'static [&'static str],
        last_names: &'static [&'static str],
        max_empty_iterations: usize,
    ) -> Self {
        Self {
            male_first_names,
            female_first_names,
            last_names,
            max_empty_iterations,
            ..Self::default()
        }
    }

    /// Produce up to `count` candidates with call-unique emails.
    ///
    /// Returns short when `max_empty_iterations` consecutive candidates
    /// collide with already-emitted emails.
    pub fn generate(&self, count: i64, cities: &[City], password: &str) -> Vec<NewUser> {
        let count = usize::try_from(count).unwrap_or(0);
        let mut rng = rand::thread_rng();
        let mut seen = HashSet::with_capacity(count);
        let mut users = Vec::with_capacity(count);
        let mut empty_iterations = 0;

        while users.len() < count {
            let user = self.random_user(cities, password, &mut rng);

            if seen.insert(user.email.clone()) {
                users.push(user);
                empty_iterations = 0;
                continue;
            }

            empty_iterations += 1;
            if empty_iterations >= self.max_empty_iterations {
                tracing::warn!(
                    generated = users.len(),
                    requested = count,
                    "email pool exhausted, returning short batch"
                );
                break;
            }
        }

        users
    }

    fn random_user(&self, cities: &[City], password: &str, rng: &mut impl Rng) -> NewUser {
        let (first_name, gender) = if rng.gen_bool(0.5) {
            (
                *self.male_first_names.choose(rng).expect("non-empty pool"),
                Gender::Male,
            )
        } else {
            (
                *self.female_first_names.choose(rng).expect("non-empty pool"),
                Gender::Female,
            )
        };
        let last_name = *self.last_names.choose(rng).expect("non-empty pool");

        let birthdate = self.random_birthdate(rng);
        let domain = *self.email_domains.choose(rng).expect("non-empty pool");
        let email = format!(
            "{}-{}-{}@{}",
            transliterate(first_name),
            transliterate(last_name),
            birthdate.format("%Y"),
            domain
        );

        // An empty city list yields city_id 0, which the batch sink drops
        // with a per-record error.
        let city_id = cities.choose(rng).map(|city| city.id).unwrap_or(0);

        NewUser {
            email,
            password: password.to_string(),
            city_id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            birthdate,
            gender,
            interests: self.random_interests(rng),
        }
    }

    /// Uniform birthdate between 75 and 10 years ago.
    fn random_birthdate(&self, rng: &mut impl Rng) -> NaiveDate {
        let days_back = rng.gen_range(MIN_AGE_DAYS..=MAX_AGE_DAYS);
        Utc::now().date_naive() - Days::new(days_back)
    }

    fn random_interests(&self, rng: &mut impl Rng) -> String {
        let count = rng.gen_range(1..=5);
        self.hobbies
            .choose_multiple(rng, count)
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cities() -> Vec<City> {
        vec![
            City {
                id: 1,
                name: "Berlin".to_string(),
            },
            City {
                id: 2,
                name: "Oslo".to_string(),
            },
        ]
    }

    #[test]
    fn test_generates_requested_count() {
        let generator = UserGenerator::default();
        let users = generator.generate(200, &cities(), "pw");
        assert_eq!(users.len(), 200);
    }

    #[test]
    fn test_emails_are_unique_within_call() {
        let generator = UserGenerator::default();
        let users = generator.generate(500, &cities(), "pw");
        let emails: HashSet<_> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails.len(), users.len());
    }

    #[test]
    fn test_candidates_pass_validation() {
        let generator = UserGenerator::default();
        for user in generator.generate(50, &cities(), "pw") {
            assert!(user.validate().is_ok(), "invalid candidate: {user:?}");
            assert!(user.email.contains('@'));
            assert!(!user.interests.is_empty());
        }
    }

    #[test]
    fn test_birthdate_within_age_window() {
        let generator = UserGenerator::default();
        let today = Utc::now().date_naive();
        for user in generator.generate(100, &cities(), "pw") {
            assert!(user.birthdate <= today - Days::new(MIN_AGE_DAYS));
            assert!(user.birthdate >= today - Days::new(MAX_AGE_DAYS + 1));
        }
    }

    #[test]
    fn test_returns_short_when_pool_exhausted() {
        // One name per gender and one surname: only a handful of distinct
        // emails exist (one per birth year and domain), far fewer than 10k.
        let generator = UserGenerator::with_pools(&["Bob"], &["Eve"], &["Only"], 100);
        let users = generator.generate(10_000, &cities(), "pw");
        assert!(!users.is_empty());
        assert!(users.len() < 10_000);
    }

    #[test]
    fn test_empty_city_list_yields_invalid_city() {
        let generator = UserGenerator::default();
        let users = generator.generate(5, &[], "pw");
        assert!(users.iter().all(|u| u.city_id == 0));
    }

    #[test]
    fn test_transliterate_slugs() {
        assert_eq!(transliterate("Mary Ann"), "maryann");
        assert_eq!(transliterate("O'Brien"), "obrien");
        assert_eq!(transliterate("Smith"), "smith");
    }
}
