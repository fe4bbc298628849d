//! Demo connector exposing the current weather of one city.
//!
//! Publishes a single table, `meteorology.public.weather`, and answers every
//! scan with one row fetched from wttr.in.

use async_trait::async_trait;
use protocol::{
    Column, ComparisonType, FetchError, Handler, HandlerError, Kind, Operator, Plan, RequestContext,
    RowWriter, Statement, Table, Value,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CITY: &str = "Amsterdam";

const WTTR_URL: &str = "https://wttr.in";

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected weather response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("weather response has no current conditions")]
    NoConditions,
}

/// Subset of the `?format=j1` response that the table exposes.
#[derive(Debug, Deserialize)]
struct Report {
    current_condition: Vec<Conditions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Conditions {
    #[serde(rename = "temp_C")]
    pub temperature: String,
    pub humidity: String,
}

impl Conditions {
    fn parse(body: &str) -> Result<Self, WeatherError> {
        let report: Report = serde_json::from_str(body)?;
        report
            .current_condition
            .into_iter()
            .next()
            .ok_or(WeatherError::NoConditions)
    }
}

pub struct WeatherConnector {
    city: String,
    base_url: String,
    client: reqwest::Client,
}

impl WeatherConnector {
    pub fn new(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            base_url: WTTR_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn table() -> Table {
        Table::new("meteorology", "public", "weather")
            .with_column(
                Column::new("city", Kind::String).with_operator(
                    Operator::new(Statement::Equal)
                        .comparing(ComparisonType::VariableConstant)
                        .required(),
                ),
            )
            .with_column(Column::new("temperature", Kind::String))
            .with_column(Column::new("humidity", Kind::String))
    }

    async fn current(&self) -> Result<Conditions, WeatherError> {
        let url = format!("{}/{}", self.base_url, self.city);
        let body = self
            .client
            .get(url)
            .query(&[("format", "j1")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Conditions::parse(&body)
    }
}

#[async_trait]
impl Handler for WeatherConnector {
    async fn ping(&self, _ctx: &RequestContext) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn fetch(&self, _ctx: &RequestContext) -> Result<Vec<Table>, FetchError> {
        Ok(vec![Self::table()])
    }

    async fn scan(
        &self,
        ctx: &RequestContext,
        _plan: &Plan,
        writer: &dyn RowWriter,
    ) -> Result<(), HandlerError> {
        let conditions = self.current().await?;
        debug!(
            id = ctx.id().as_u32(),
            city = %self.city,
            temperature = %conditions.temperature,
            "weather fetched"
        );
        writer
            .write(vec![
                Value::from(self.city.as_str()),
                Value::from(conditions.temperature),
                Value::from(conditions.humidity),
            ])
            .await?;
        Ok(())
    }
}
