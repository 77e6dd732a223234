use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domains::users::{Gender, NewUser, User};
use crate::server::app::AppState;
use crate::server::error::ApiResult;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub city_id: i16,
    pub first_name: String,
    pub last_name: String,
    pub birthdate: NaiveDate,
    pub gender: Gender,
    #[serde(default)]
    pub interests: String,
}

#[derive(Serialize)]
pub struct CreateUserResponse {
    pub user_id: i64,
}

pub async fn create_user_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<CreateUserResponse>)> {
    let user = NewUser {
        email: req.email,
        password: req.password,
        city_id: req.city_id,
        first_name: req.first_name,
        last_name: req.last_name,
        birthdate: req.birthdate,
        gender: req.gender,
        interests: req.interests,
    };

    let user_id = state.users.create(user).await?;
    Ok((StatusCode::CREATED, Json(CreateUserResponse { user_id })))
}

/// Public profile; the password hash stays server-side.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub city_id: i16,
    pub first_name: String,
    pub last_name: String,
    pub birthdate: NaiveDate,
    pub gender: Gender,
    pub interests: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            city_id: user.city_id,
            first_name: user.first_name,
            last_name: user.last_name,
            birthdate: user.birthdate,
            gender: user.gender,
            interests: user.interests,
        }
    }
}

pub async fn get_user_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.users.get_by_id(id).await?;
    Ok(Json(UserResponse::from(user)))
}
