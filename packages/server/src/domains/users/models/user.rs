use std::collections::HashSet;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
            Gender::Unknown => "UNKNOWN",
        }
    }
}

/// Stored user row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub city_id: i16,
    pub first_name: String,
    pub last_name: String,
    pub birthdate: NaiveDate,
    pub gender: Gender,
    pub interests: String,
}

/// Candidate user, not yet persisted. Carries the plaintext password;
/// ownership moves into the batch sink, which hashes before writing.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub city_id: i16,
    pub first_name: String,
    pub last_name: String,
    pub birthdate: NaiveDate,
    pub gender: Gender,
    pub interests: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), String> {
        if !EMAIL_RE.is_match(&self.email) {
            return Err("invalid email format".to_string());
        }

        if self.password.is_empty() {
            return Err("password is required".to_string());
        }

        if self.city_id <= 0 {
            return Err("invalid city ID".to_string());
        }

        if self.first_name.is_empty() {
            return Err("first name is required".to_string());
        }

        if self.last_name.is_empty() {
            return Err("last name is required".to_string());
        }

        if self.birthdate >= Utc::now().date_naive() {
            return Err("birthdate must be in the past".to_string());
        }

        Ok(())
    }
}

/// Candidate whose password has already been hashed.
#[derive(Debug, Clone)]
pub struct HashedUser {
    pub email: String,
    pub password_hash: String,
    pub city_id: i16,
    pub first_name: String,
    pub last_name: String,
    pub birthdate: NaiveDate,
    pub gender: Gender,
    pub interests: String,
}

impl HashedUser {
    pub fn new(user: NewUser, password_hash: String) -> Self {
        Self {
            email: user.email,
            password_hash,
            city_id: user.city_id,
            first_name: user.first_name,
            last_name: user.last_name,
            birthdate: user.birthdate,
            gender: user.gender,
            interests: user.interests,
        }
    }
}

impl User {
    pub async fn find_by_id(id: i64, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, email, password_hash, city_id, first_name, last_name,
                   birthdate, gender, interests
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    /// Insert one user. Returns `None` when the email is already taken.
    pub async fn insert(user: &HashedUser, pool: &PgPool) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO users (email, password_hash, city_id, first_name, last_name,
                               birthdate, gender, interests)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.city_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.birthdate)
        .bind(user.gender)
        .bind(&user.interests)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Which of the given emails already exist.
    pub async fn check_existing_emails(
        emails: &[String],
        pool: &PgPool,
    ) -> Result<HashSet<String>> {
        if emails.is_empty() {
            return Ok(HashSet::new());
        }

        let rows: Vec<(String,)> = sqlx::query_as("SELECT email FROM users WHERE email = ANY($1)")
            .bind(emails)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(|(email,)| email).collect())
    }

    /// Bulk insert with conflict-skip on email.
    ///
    /// The returned count is the number of rows Postgres actually wrote,
    /// which is the only trustworthy progress figure for the caller.
    pub async fn insert_batch(users: &[HashedUser], pool: &PgPool) -> Result<u64> {
        if users.is_empty() {
            return Ok(0);
        }

        let mut emails = Vec::with_capacity(users.len());
        let mut password_hashes = Vec::with_capacity(users.len());
        let mut city_ids = Vec::with_capacity(users.len());
        let mut first_names = Vec::with_capacity(users.len());
        let mut last_names = Vec::with_capacity(users.len());
        let mut birthdates = Vec::with_capacity(users.len());
        let mut genders = Vec::with_capacity(users.len());
        let mut interests = Vec::with_capacity(users.len());

        for user in users {
            emails.push(user.email.clone());
            password_hashes.push(user.password_hash.clone());
            city_ids.push(user.city_id);
            first_names.push(user.first_name.clone());
            last_names.push(user.last_name.clone());
            birthdates.push(user.birthdate);
            genders.push(user.gender.as_str().to_string());
            interests.push(user.interests.clone());
        }

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, city_id, first_name, last_name,
                               birthdate, gender, interests)
            SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[], $3::SMALLINT[], $4::TEXT[],
                                 $5::TEXT[], $6::DATE[], $7::TEXT[], $8::TEXT[])
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(&emails)
        .bind(&password_hashes)
        .bind(&city_ids)
        .bind(&first_names)
        .bind(&last_names)
        .bind(&birthdates)
        .bind(&genders)
        .bind(&interests)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_user() -> NewUser {
        NewUser {
            email: "jane-doe-1990@example.com".to_string(),
            password: "secret".to_string(),
            city_id: 1,
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            gender: Gender::Female,
            interests: "chess, hiking".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_valid_user() {
        assert!(valid_user().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        for email in ["", "not-an-email", "a@b", "two@@example.com", "a b@c.de"] {
            let mut user = valid_user();
            user.email = email.to_string();
            assert!(user.validate().is_err(), "accepted {email:?}");
        }
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let mut user = valid_user();
        user.password.clear();
        assert_eq!(user.validate().unwrap_err(), "password is required");

        let mut user = valid_user();
        user.first_name.clear();
        assert_eq!(user.validate().unwrap_err(), "first name is required");

        let mut user = valid_user();
        user.last_name.clear();
        assert_eq!(user.validate().unwrap_err(), "last name is required");
    }

    #[test]
    fn test_validate_rejects_bad_city() {
        let mut user = valid_user();
        user.city_id = 0;
        assert_eq!(user.validate().unwrap_err(), "invalid city ID");
    }

    #[test]
    fn test_validate_rejects_future_birthdate() {
        let mut user = valid_user();
        user.birthdate = Utc::now().date_naive() + chrono::Days::new(1);
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_gender_wire_strings() {
        assert_eq!(
            serde_json::to_string(&Gender::Male).unwrap(),
            "\"MALE\"".to_string()
        );
        assert_eq!(
            serde_json::from_str::<Gender>("\"FEMALE\"").unwrap(),
            Gender::Female
        );
        assert_eq!(Gender::Unknown.as_str(), "UNKNOWN");
    }
}
