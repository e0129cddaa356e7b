use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::School;
use crate::db::types::SchoolStatus;

const COLUMNS: &str = "\
    id, name, code, address, latitude, longitude, allowed_radius_m, status, \
    created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<School>, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!("SELECT {COLUMNS} FROM schools WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<School, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!("SELECT {COLUMNS} FROM schools WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn exists_by_code(
    pool: &PgPool,
    code: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM schools WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateSchool<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub code: &'a str,
    pub address: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub allowed_radius_m: f64,
    pub status: SchoolStatus,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateSchool<'_>) -> Result<School, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!(
        "INSERT INTO schools (
            id, name, code, address, latitude, longitude, allowed_radius_m, status,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.code)
    .bind(params.address)
    .bind(params.latitude)
    .bind(params.longitude)
    .bind(params.allowed_radius_m)
    .bind(params.status)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateSchool {
    pub name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub allowed_radius_m: Option<f64>,
    pub status: Option<SchoolStatus>,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateSchool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE schools SET
            name = COALESCE($1, name),
            address = COALESCE($2, address),
            latitude = COALESCE($3, latitude),
            longitude = COALESCE($4, longitude),
            allowed_radius_m = COALESCE($5, allowed_radius_m),
            status = COALESCE($6, status),
            updated_at = $7
         WHERE id = $8",
    )
    .bind(params.name)
    .bind(params.address)
    .bind(params.latitude)
    .bind(params.longitude)
    .bind(params.allowed_radius_m)
    .bind(params.status)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn list(
    pool: &PgPool,
    status: Option<SchoolStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<School>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM schools WHERE TRUE"));

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY name OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<School>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    status: Option<SchoolStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM schools WHERE TRUE");

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}
