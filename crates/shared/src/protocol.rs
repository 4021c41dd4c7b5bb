use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{CustomerId, Row};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            db: None,
        }
    }

    pub fn with_db(mut self, db: Option<String>) -> Self {
        self.db = db;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub sql: String,
    #[serde(default)]
    pub result: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// `GET /customers` body. The documented shape is an envelope, but the
/// backend router returns the bare list, so both are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CustomersResponse {
    Envelope { customers: Vec<CustomerRecord> },
    Bare(Vec<CustomerRecord>),
}

impl CustomersResponse {
    pub fn into_customers(self) -> Vec<CustomerRecord> {
        match self {
            Self::Envelope { customers } | Self::Bare(customers) => customers,
        }
    }
}

/// Parses an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let raw = raw.trim();
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_err),
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(|err| {
        serde::de::Error::custom(format!("invalid created_at timestamp '{raw}': {err}"))
    })
}
