use std::collections::HashSet;

use anyhow::Result;
use serde::Serialize;
use sqlx::PgPool;

use crate::common::pagination::{fetch_limit, trim_results};

/// Reference city a user belongs to.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct City {
    pub id: i16,
    pub name: String,
}

/// Name-keyset page request for the city list endpoint.
#[derive(Debug, Clone, Default)]
pub struct ListCitiesRequest {
    pub search: Option<String>,
    pub limit: u64,
    pub cursor: i16,
}

#[derive(Debug, Clone)]
pub struct CityPage {
    pub items: Vec<City>,
    pub has_next: bool,
}

impl City {
    pub async fn find_by_id(id: i16, pool: &PgPool) -> Result<Option<Self>> {
        let city = sqlx::query_as::<_, Self>("SELECT id, name FROM cities WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(city)
    }

    /// Full city list, loaded once per generated batch.
    pub async fn get_all(pool: &PgPool) -> Result<Vec<Self>> {
        let cities = sqlx::query_as::<_, Self>("SELECT id, name FROM cities ORDER BY id")
            .fetch_all(pool)
            .await?;
        Ok(cities)
    }

    /// Which of the given ids exist. Input order and duplicates are irrelevant.
    pub async fn check_existing_ids(ids: &[i16], pool: &PgPool) -> Result<HashSet<i16>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows: Vec<(i16,)> = sqlx::query_as("SELECT id FROM cities WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn list(req: &ListCitiesRequest, pool: &PgPool) -> Result<CityPage> {
        let search = req
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let rows = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name
            FROM cities
            WHERE id > $1
              AND ($2::TEXT IS NULL OR name ILIKE $2)
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(req.cursor)
        .bind(search)
        .bind(fetch_limit(req.limit))
        .fetch_all(pool)
        .await?;

        let (items, has_next) = trim_results(rows, req.limit);
        Ok(CityPage { items, has_next })
    }
}
