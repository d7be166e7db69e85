// InfluxDB measurement source
use crate::application::measurement_source::{FetchError, MeasurementSource};
use crate::domain::measurement::{Label, Quantity, SourceRow};
use crate::infrastructure::config::{ColumnMapping, InfluxSettings};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct InfluxSource {
    client: reqwest::Client,
    host: String,
    token: String,
    database: String,
    retention_policy: String,
    query: String,
    columns: ColumnMapping,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    columns: Vec<String>,
    values: Vec<Vec<serde_json::Value>>,
}

impl InfluxSource {
    pub fn new(settings: &InfluxSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: settings.host.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            database: settings.database.clone(),
            retention_policy: settings.retention_policy.clone(),
            query: settings.query.clone(),
            columns: settings.columns.clone(),
        }
    }

    fn build_query_url(&self) -> String {
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.retention_policy),
            urlencoding::encode(&self.query)
        )
    }

    async fn execute_query(&self) -> Result<InfluxQLResponse, FetchError> {
        let response = self
            .client
            .get(self.build_query_url())
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::ConnectionFailure(format!("request to InfluxDB failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::ConnectionFailure(format!(
                "InfluxDB query failed with status {}: {}",
                status, body
            )));
        }

        response
            .json::<InfluxQLResponse>()
            .await
            .map_err(|e| FetchError::SchemaMismatch(format!("unreadable InfluxDB response: {}", e)))
    }
}

/// Flatten every series of the first result into rows
fn rows_from_response(response: InfluxQLResponse, columns: &ColumnMapping) -> Result<Vec<SourceRow>, FetchError> {
    let Some(result) = response.results.into_iter().next() else {
        return Ok(Vec::new());
    };
    if let Some(error) = result.error {
        return Err(FetchError::SchemaMismatch(format!("InfluxDB query error: {}", error)));
    }

    let mut rows = Vec::new();
    for series in result.series.unwrap_or_default() {
        let missing = columns.missing(&series.columns);
        if !missing.is_empty() {
            return Err(FetchError::missing_columns(&missing));
        }

        let position = |name: &str| series.columns.iter().position(|c| c == name);
        let label_idx = position(&columns.label);
        let value_idx: Vec<Option<usize>> = Quantity::ALL
            .iter()
            .map(|q| position(columns.value_column(*q)))
            .collect();

        for values in &series.values {
            let label = match label_idx.and_then(|i| values.get(i)) {
                Some(serde_json::Value::String(s)) => match chrono::DateTime::parse_from_rfc3339(s) {
                    Ok(time) => Label::Timestamp(time.to_utc()),
                    Err(_) => Label::Text(s.clone()),
                },
                Some(serde_json::Value::Number(n)) => Label::Number(n.as_f64().unwrap_or(f64::NAN)),
                _ => continue,
            };

            let mut readings = [None; 4];
            for (slot, idx) in readings.iter_mut().zip(&value_idx) {
                *slot = idx.and_then(|i| values.get(i)).and_then(serde_json::Value::as_f64);
            }
            rows.push(SourceRow::new(label, readings));
        }
    }

    Ok(rows)
}

#[async_trait]
impl MeasurementSource for InfluxSource {
    fn name(&self) -> &str {
        "influx"
    }

    async fn fetch_rows(&self) -> Result<Vec<SourceRow>, FetchError> {
        let response = self.execute_query().await?;
        let rows = rows_from_response(response, &self.columns)?;
        tracing::debug!("InfluxDB returned {} rows", rows.len());
        Ok(rows)
    }
}
