use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::models::workshop::{ResponseFormat, Workshop};

/// One database transaction, scoped to a single inbound request. Registry
/// operations take it explicitly; the caller decides when to commit.
pub type UnitOfWork = Transaction<'static, Sqlite>;

const WORKSHOP_COLUMNS: &str = "id_workshop, is_active, name, city, address, vehicle_types, \
     url_available_times, response_type, url_booking, booking_http_method, booking_body";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Single-connection in-memory database. Every handle shares the same data
    /// for as long as the pool is alive.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn begin(&self) -> Result<UnitOfWork, sqlx::Error> {
        self.pool.begin().await
    }
}

/// Column values for a new row; `is_active` is always true on insert.
pub struct NewWorkshop {
    pub name: String,
    pub city: String,
    pub address: String,
    pub vehicle_types: String,
    pub url_available_times: String,
    pub response_type: ResponseFormat,
    pub url_booking: String,
    pub booking_http_method: String,
    pub booking_body: String,
}

// -- Workshop Operations --

pub async fn list_workshops(
    conn: &mut SqliteConnection,
    active_only: bool,
) -> Result<Vec<Workshop>, sqlx::Error> {
    let sql = if active_only {
        format!("SELECT {WORKSHOP_COLUMNS} FROM workshops WHERE is_active = TRUE ORDER BY id_workshop")
    } else {
        format!("SELECT {WORKSHOP_COLUMNS} FROM workshops ORDER BY id_workshop")
    };
    sqlx::query_as::<_, Workshop>(&sql).fetch_all(conn).await
}

pub async fn get_workshop(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Workshop>, sqlx::Error> {
    sqlx::query_as::<_, Workshop>(&format!(
        "SELECT {WORKSHOP_COLUMNS} FROM workshops WHERE id_workshop = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn insert_workshop(
    conn: &mut SqliteConnection,
    new: &NewWorkshop,
) -> Result<Workshop, sqlx::Error> {
    sqlx::query_as::<_, Workshop>(&format!(
        r#"INSERT INTO workshops (is_active, name, city, address, vehicle_types, url_available_times,
                                  response_type, url_booking, booking_http_method, booking_body)
           VALUES (TRUE, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           RETURNING {WORKSHOP_COLUMNS}"#
    ))
    .bind(&new.name)
    .bind(&new.city)
    .bind(&new.address)
    .bind(&new.vehicle_types)
    .bind(&new.url_available_times)
    .bind(new.response_type.as_str())
    .bind(&new.url_booking)
    .bind(&new.booking_http_method)
    .bind(&new.booking_body)
    .fetch_one(conn)
    .await
}

/// Overwrite every mutable column of an existing row. Returns `None` if the
/// row disappeared.
pub async fn update_workshop(
    conn: &mut SqliteConnection,
    workshop: &Workshop,
) -> Result<Option<Workshop>, sqlx::Error> {
    sqlx::query_as::<_, Workshop>(&format!(
        r#"UPDATE workshops
           SET name = ?, city = ?, address = ?, vehicle_types = ?, url_available_times = ?,
               response_type = ?, url_booking = ?, booking_http_method = ?, booking_body = ?
           WHERE id_workshop = ?
           RETURNING {WORKSHOP_COLUMNS}"#
    ))
    .bind(&workshop.name)
    .bind(&workshop.city)
    .bind(&workshop.address)
    .bind(&workshop.vehicle_types)
    .bind(&workshop.url_available_times)
    .bind(workshop.response_type.as_str())
    .bind(&workshop.url_booking)
    .bind(&workshop.booking_http_method)
    .bind(&workshop.booking_body)
    .bind(workshop.id_workshop)
    .fetch_optional(conn)
    .await
}

/// Flip `is_active` and return the new value, or `None` for an unknown id.
pub async fn toggle_workshop(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<bool>, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "UPDATE workshops SET is_active = NOT is_active WHERE id_workshop = ? RETURNING is_active",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}
