//! User service: single-user creation plus the bulk pipeline the
//! randomizing job engine feeds.
//!
//! Batch semantics: a bad candidate is dropped with a per-record reason and
//! never fails the batch. Only infrastructure failures (a query or the
//! bulk insert itself) surface as errors.

use anyhow::Context;
use futures::future::join_all;

use super::generator::UserGenerator;
use super::models::user::{HashedUser, NewUser, User};
use crate::common::{ServiceError, ServiceResult};
use crate::domains::cities::City;
use crate::kernel::password::hash_password;
use crate::kernel::DbCluster;

/// Outcome of a bulk insert. `inserted_count + rejected.len()` never
/// exceeds the input size; conflict-skipped rows count as neither.
#[derive(Debug, Default)]
pub struct BatchInsertReport {
    pub inserted_count: i64,
    pub rejected: Vec<RejectedUser>,
}

#[derive(Debug)]
pub struct RejectedUser {
    pub user: NewUser,
    pub reason: String,
}

pub struct UserService {
    db: DbCluster,
    generator: UserGenerator,
    synthetic_password: String,
}

impl UserService {
    pub fn new(db: DbCluster, synthetic_password: String) -> Self {
        Self {
            db,
            generator: UserGenerator::default(),
            synthetic_password,
        }
    }

    /// Create one user from an API request.
    pub async fn create(&self, user: NewUser) -> ServiceResult<i64> {
        user.validate().map_err(ServiceError::BadRequest)?;

        let city = City::find_by_id(user.city_id, self.db.writes())
            .await
            .context("failed to check if city exists")?;
        if city.is_none() {
            return Err(ServiceError::bad_request(format!(
                "city with ID {} is not found",
                user.city_id
            )));
        }

        let password_hash = hash_password(user.password.clone()).await?;
        let inserted = User::insert(&HashedUser::new(user, password_hash), self.db.writes())
            .await
            .context("failed to create user")?;

        inserted.ok_or_else(|| ServiceError::conflict("email is already taken"))
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<User> {
        if id <= 0 {
            return Err(ServiceError::bad_request("user ID must be greater than 0"));
        }

        let user = User::find_by_id(id, self.db.reads())
            .await
            .context("failed to read user info")?;

        user.ok_or_else(|| ServiceError::not_found("user not found"))
    }

    /// Generate `count` synthetic candidates. The city list is loaded once
    /// per call so every batch sees a fresh snapshot.
    pub async fn generate_random(&self, count: i64) -> ServiceResult<Vec<NewUser>> {
        let cities = City::get_all(self.db.writes())
            .await
            .context("failed to load cities")?;

        Ok(self
            .generator
            .generate(count, &cities, &self.synthetic_password))
    }

    /// Validate, cross-check, hash and bulk-insert a batch of candidates.
    pub async fn create_batch(&self, users: Vec<NewUser>) -> ServiceResult<BatchInsertReport> {
        let (valid, mut rejected) = partition_valid(users);

        let survivors = self.drop_conflicting(valid, &mut rejected).await?;
        let hashed = hash_batch(survivors, &mut rejected).await;

        let inserted = User::insert_batch(&hashed, self.db.writes())
            .await
            .context("failed to bulk insert users")?;

        Ok(BatchInsertReport {
            inserted_count: inserted as i64,
            rejected,
        })
    }

    /// Drop candidates whose email is taken or whose city is unknown.
    async fn drop_conflicting(
        &self,
        valid: Vec<NewUser>,
        rejected: &mut Vec<RejectedUser>,
    ) -> ServiceResult<Vec<NewUser>> {
        let emails: Vec<String> = valid.iter().map(|u| u.email.clone()).collect();
        let mut city_ids: Vec<i16> = valid.iter().map(|u| u.city_id).collect();
        city_ids.sort_unstable();
        city_ids.dedup();

        let existing_emails = User::check_existing_emails(&emails, self.db.writes())
            .await
            .context("failed to check existing emails")?;
        let known_cities = City::check_existing_ids(&city_ids, self.db.writes())
            .await
            .context("failed to check existing cities")?;

        let mut survivors = Vec::with_capacity(valid.len());
        for user in valid {
            if existing_emails.contains(&user.email) {
                rejected.push(RejectedUser {
                    user,
                    reason: "email is already taken".to_string(),
                });
            } else if !known_cities.contains(&user.city_id) {
                let reason = format!("city with ID {} is not found", user.city_id);
                rejected.push(RejectedUser { user, reason });
            } else {
                survivors.push(user);
            }
        }

        Ok(survivors)
    }
}

/// Split candidates into valid ones and per-record rejections.
fn partition_valid(users: Vec<NewUser>) -> (Vec<NewUser>, Vec<RejectedUser>) {
    let mut valid = Vec::with_capacity(users.len());
    let mut rejected = Vec::new();

    for user in users {
        match user.validate() {
            Ok(()) => valid.push(user),
            Err(reason) => rejected.push(RejectedUser { user, reason }),
        }
    }

    (valid, rejected)
}

/// Hash passwords on the blocking pool, several at a time. A hash failure
/// rejects that record only.
async fn hash_batch(users: Vec<NewUser>, rejected: &mut Vec<RejectedUser>) -> Vec<HashedUser> {
    let results = join_all(users.into_iter().map(|user| async {
        let hash = hash_password(user.password.clone()).await;
        (user, hash)
    }))
    .await;

    let mut hashed = Vec::with_capacity(results.len());
    for (user, result) in results {
        match result {
            Ok(password_hash) => hashed.push(HashedUser::new(user, password_hash)),
            Err(err) => rejected.push(RejectedUser {
                user,
                reason: format!("failed to hash password: {err}"),
            }),
        }
    }

    hashed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::domains::users::models::user::Gender;

    fn user(email: &str, city_id: i16) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "pw".to_string(),
            city_id,
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            gender: Gender::Female,
            interests: String::new(),
        }
    }

    #[test]
    fn test_partition_valid_splits_by_validation() {
        let users = vec![
            user("good@example.com", 1),
            user("bad-email", 1),
            user("no-city@example.com", 0),
        ];

        let (valid, rejected) = partition_valid(users);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].email, "good@example.com");
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].reason, "invalid email format");
        assert_eq!(rejected[1].reason, "invalid city ID");
    }

    #[test]
    fn test_partition_valid_keeps_everything_valid() {
        let users = vec![user("a@example.com", 1), user("b@example.com", 2)];
        let (valid, rejected) = partition_valid(users);
        assert_eq!(valid.len(), 2);
        assert!(rejected.is_empty());
    }

    #[tokio::test]
    async fn test_hash_batch_hashes_all() {
        let mut rejected = Vec::new();
        let hashed = hash_batch(vec![user("a@example.com", 1)], &mut rejected).await;
        assert_eq!(hashed.len(), 1);
        assert!(rejected.is_empty());
        assert!(bcrypt::verify("pw", &hashed[0].password_hash).unwrap());
    }
}
