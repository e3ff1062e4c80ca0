//! Request parameter parsing and validation.
//!
//! Pair and token ids are 20-byte hex addresses; everything else downstream
//! assumes they are well-formed, so the boundary rejects anything that is not.

use api_types::ErrorResponse;
use axum::http::StatusCode;
use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters for the bulk pairs endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PairsQuery {
    /// Comma-separated pair ids.
    pub ids: String,
}

/// Query parameters for the hourly rates endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct HourlyRatesQuery {
    /// Series start as unix seconds; defaults to one week ago.
    pub start: Option<u64>,
    /// Ignore blocks above this number (indexer head guard).
    pub latest_block: Option<u64>,
}

/// Query parameters for the token price endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct TokenPricesQuery {
    /// Series start as unix seconds; defaults to one day ago.
    pub start: Option<u64>,
    /// Sample spacing in seconds; defaults to one hour.
    pub interval: Option<u64>,
    /// Ignore blocks above this number (indexer head guard).
    pub latest_block: Option<u64>,
}

/// Query parameters for the block resolution endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ResolveBlocksQuery {
    /// Comma-separated unix timestamps.
    pub timestamps: String,
}

fn invalid_params(detail: impl Into<String>) -> ErrorResponse {
    ErrorResponse::new("invalid-params", "Bad Request", StatusCode::BAD_REQUEST, detail)
}

/// Parse and validate one pair/token id, normalizing to lowercase.
pub fn parse_entity_id(raw: &str) -> Result<String, ErrorResponse> {
    let hex_part = raw.strip_prefix("0x").ok_or_else(|| {
        invalid_params(format!("id must start with 0x: {raw}"))
    })?;
    let bytes = hex::decode(hex_part)
        .map_err(|e| invalid_params(format!("id is not valid hex: {e}")))?;
    if bytes.len() != 20 {
        return Err(invalid_params(format!(
            "id must be a 20-byte address, got {} bytes",
            bytes.len()
        )));
    }
    Ok(raw.to_ascii_lowercase())
}

/// Parse a comma-separated id list, validating each entry and capping the
/// count.
pub fn parse_id_list(csv: &str, max: usize) -> Result<Vec<String>, ErrorResponse> {
    let ids: Vec<&str> = csv.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    if ids.is_empty() {
        return Err(invalid_params("ids must contain at least one entry"));
    }
    if ids.len() > max {
        return Err(invalid_params(format!("at most {max} ids per request, got {}", ids.len())));
    }
    ids.into_iter().map(parse_entity_id).collect()
}

/// Parse a comma-separated timestamp list, capping the count.
pub fn parse_timestamp_list(csv: &str, max: usize) -> Result<Vec<u64>, ErrorResponse> {
    let raw: Vec<&str> = csv.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    if raw.is_empty() {
        return Err(invalid_params("timestamps must contain at least one entry"));
    }
    if raw.len() > max {
        return Err(invalid_params(format!(
            "at most {max} timestamps per request, got {}",
            raw.len()
        )));
    }
    raw.into_iter()
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| invalid_params(format!("not a unix timestamp: {s}")))
        })
        .collect()
}
