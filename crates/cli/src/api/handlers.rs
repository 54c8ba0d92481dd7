//! Route handlers
//!
//! | Method | Path              | Store call             |
//! |--------|-------------------|------------------------|
//! | GET    | `/data/`          | `list` (all sensors)   |
//! | GET    | `/data/summary/`  | `list` (type/unit/time)|
//! | GET    | `/data/{sensor}`  | `list` (one sensor)    |
//! | POST   | `/data/`          | `create`               |
//! | PUT    | `/data/{id}`      | `update`               |
//! | DELETE | `/data/{id}`      | `delete`               |

use actix_web::{delete, get, post, put, web, Responder};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use store::{NewReading, Page, ReadingFilter, SqliteStore, StoredReading, DEFAULT_LIMIT};
use tracing::{debug, info};

use super::ApiError;

type Rows = web::Json<Vec<StoredReading>>;

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

#[derive(Deserialize, Debug)]
struct PageQuery {
    #[serde(default)]
    skip: u64,
    #[serde(default = "default_limit")]
    limit: u64,
}

impl PageQuery {
    fn page(&self) -> Result<Page, ApiError> {
        Ok(Page::new(self.skip, self.limit)?)
    }
}

#[derive(Deserialize, Debug)]
struct SummaryQuery {
    #[serde(rename = "type")]
    sensor_type: Option<String>,
    unit: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(default)]
    skip: u64,
    #[serde(default = "default_limit")]
    limit: u64,
}

fn parse_time(name: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    raw.map(|raw| {
        contracts::parse_utc(raw)
            .ok_or_else(|| ApiError::Invalid(format!("invalid {name}: {raw}")))
    })
    .transpose()
}

#[get("/")]
async fn index() -> impl Responder {
    web::Json("API is up and running. Query results under '/data/'.")
}

#[get("/data/")]
async fn read_data(
    query: web::Query<PageQuery>,
    store: web::Data<SqliteStore>,
) -> Result<Rows, ApiError> {
    let rows = store.list(ReadingFilter::new(), query.page()?).await?;
    debug!(rows = rows.len(), "GET /data/");
    Ok(web::Json(rows))
}

#[get("/data/summary/")]
async fn read_data_summary(
    query: web::Query<SummaryQuery>,
    store: web::Data<SqliteStore>,
) -> Result<Rows, ApiError> {
    let page = Page::new(query.skip, query.limit)?;
    let filter = ReadingFilter {
        sensor_id: None,
        sensor_type: query.sensor_type.clone(),
        unit: query.unit.clone(),
        start_time: parse_time("start_time", query.start_time.as_deref())?,
        end_time: parse_time("end_time", query.end_time.as_deref())?,
    };
    let rows = store.list(filter, page).await?;
    debug!(rows = rows.len(), "GET /data/summary/");
    Ok(web::Json(rows))
}

#[get("/data/{sensor_id}")]
async fn read_data_by_sensor(
    sensor_id: web::Path<i64>,
    query: web::Query<PageQuery>,
    store: web::Data<SqliteStore>,
) -> Result<Rows, ApiError> {
    let filter = ReadingFilter::new().sensor(sensor_id.into_inner());
    let rows = store.list(filter, query.page()?).await?;
    Ok(web::Json(rows))
}

#[post("/data/")]
async fn create_data(
    body: web::Json<NewReading>,
    store: web::Data<SqliteStore>,
) -> Result<web::Json<StoredReading>, ApiError> {
    let created = store.create(body.into_inner()).await?;
    info!(id = created.id, sensor_id = created.sensor_id, "Reading created");
    Ok(web::Json(created))
}

#[put("/data/{id}")]
async fn update_data(
    id: web::Path<i64>,
    body: web::Json<NewReading>,
    store: web::Data<SqliteStore>,
) -> Result<web::Json<StoredReading>, ApiError> {
    let updated = store.update(id.into_inner(), body.into_inner()).await?;
    info!(id = updated.id, "Reading updated");
    Ok(web::Json(updated))
}

#[delete("/data/{id}")]
async fn delete_data(
    id: web::Path<i64>,
    store: web::Data<SqliteStore>,
) -> Result<web::Json<StoredReading>, ApiError> {
    let deleted = store.delete(id.into_inner()).await?;
    info!(id = deleted.id, "Reading deleted");
    Ok(web::Json(deleted))
}

/// Register every route; `summary` goes before the `{sensor_id}` pattern
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(read_data)
        .service(read_data_summary)
        .service(read_data_by_sensor)
        .service(create_data)
        .service(update_data)
        .service(delete_data);
}
