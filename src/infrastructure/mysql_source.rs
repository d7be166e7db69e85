// MySQL measurement source
use crate::application::measurement_source::{FetchError, MeasurementSource};
use crate::domain::measurement::{Label, Quantity, SourceRow};
use crate::infrastructure::config::{ColumnMapping, MysqlSettings};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row};
use std::time::Duration;

pub struct MysqlSource {
    pool: MySqlPool,
    query: String,
    columns: ColumnMapping,
}

impl MysqlSource {
    /// Builds a lazy pool; nothing connects until the first fetch.
    pub fn new(settings: &MysqlSettings) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.database)
            .username(&settings.user)
            .password(&settings.password);

        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .connect_lazy_with(options);

        Self {
            pool,
            query: settings.query.clone(),
            columns: settings.columns.clone(),
        }
    }

    fn read_row(&self, row: &MySqlRow) -> Result<SourceRow, FetchError> {
        let label = decode_label(row, &self.columns.label)?;
        let mut readings = [None; 4];
        for quantity in Quantity::ALL {
            readings[quantity.index()] = decode_number(row, self.columns.value_column(quantity))?;
        }
        Ok(SourceRow::new(label, readings))
    }
}

fn map_sqlx_error(e: sqlx::Error) -> FetchError {
    match e {
        sqlx::Error::ColumnNotFound(column) => FetchError::missing_columns(&[column.as_str()]),
        sqlx::Error::ColumnDecode { index, source } => {
            FetchError::SchemaMismatch(format!("column {} could not be decoded: {}", index, source))
        }
        other => FetchError::ConnectionFailure(other.to_string()),
    }
}

/// Typed access to one column of a result row, one method per SQL type family.
trait ColumnReader {
    fn read_f64(&self, column: &str) -> Result<Option<f64>, sqlx::Error>;
    fn read_f32(&self, column: &str) -> Result<Option<f32>, sqlx::Error>;
    fn read_decimal(&self, column: &str) -> Result<Option<Decimal>, sqlx::Error>;
    fn read_i64(&self, column: &str) -> Result<Option<i64>, sqlx::Error>;
    fn read_u64(&self, column: &str) -> Result<Option<u64>, sqlx::Error>;
    fn read_timestamp(&self, column: &str) -> Result<DateTime<Utc>, sqlx::Error>;
    fn read_naive_timestamp(&self, column: &str) -> Result<NaiveDateTime, sqlx::Error>;
    fn read_text(&self, column: &str) -> Result<String, sqlx::Error>;
}

impl ColumnReader for MySqlRow {
    fn read_f64(&self, column: &str) -> Result<Option<f64>, sqlx::Error> {
        self.try_get(column)
    }

    fn read_f32(&self, column: &str) -> Result<Option<f32>, sqlx::Error> {
        self.try_get(column)
    }

    fn read_decimal(&self, column: &str) -> Result<Option<Decimal>, sqlx::Error> {
        self.try_get(column)
    }

    fn read_i64(&self, column: &str) -> Result<Option<i64>, sqlx::Error> {
        self.try_get(column)
    }

    fn read_u64(&self, column: &str) -> Result<Option<u64>, sqlx::Error> {
        self.try_get(column)
    }

    fn read_timestamp(&self, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
        self.try_get(column)
    }

    fn read_naive_timestamp(&self, column: &str) -> Result<NaiveDateTime, sqlx::Error> {
        self.try_get(column)
    }

    fn read_text(&self, column: &str) -> Result<String, sqlx::Error> {
        self.try_get(column)
    }
}

/// Numbers come back as DOUBLE, FLOAT, DECIMAL or a signed/unsigned integer
/// depending on the schema. Aggregates such as AVG(int) are DECIMAL.
fn decode_number(row: &impl ColumnReader, column: &str) -> Result<Option<f64>, FetchError> {
    if let Ok(value) = row.read_f64(column) {
        return Ok(value);
    }
    if let Ok(value) = row.read_f32(column) {
        return Ok(value.map(f64::from));
    }
    if let Ok(value) = row.read_decimal(column) {
        return value
            .map(|d| {
                d.to_f64()
                    .ok_or_else(|| FetchError::SchemaMismatch(format!("column {} holds {} which is out of range", column, d)))
            })
            .transpose();
    }
    if let Ok(value) = row.read_i64(column) {
        return Ok(value.map(|v| v as f64));
    }
    row.read_u64(column)
        .map(|value| value.map(|v| v as f64))
        .map_err(map_sqlx_error)
}

fn decode_label(row: &impl ColumnReader, column: &str) -> Result<Label, FetchError> {
    if let Ok(ts) = row.read_timestamp(column) {
        return Ok(Label::Timestamp(ts));
    }
    if let Ok(naive) = row.read_naive_timestamp(column) {
        return Ok(Label::Timestamp(naive.and_utc()));
    }
    if let Some(n) = decode_number(row, column).ok().flatten() {
        return Ok(Label::Number(n));
    }
    row.read_text(column).map(Label::Text).map_err(map_sqlx_error)
}

#[async_trait]
impl MeasurementSource for MysqlSource {
    fn name(&self) -> &str {
        "mysql"
    }

    async fn fetch_rows(&self) -> Result<Vec<SourceRow>, FetchError> {
        let rows = sqlx::query(&self.query)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };

        let available: Vec<&str> = first.columns().iter().map(|c| c.name()).collect();
        let missing = self.columns.missing(&available);
        if !missing.is_empty() {
            return Err(FetchError::missing_columns(&missing));
        }

        rows.iter().map(|row| self.read_row(row)).collect()
    }
}
