use payroll_core::RepositoryError;
use rust_decimal::Decimal;

/// Parse a decimal stored as TEXT.
pub fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    value.trim().parse::<Decimal>().map_err(|e| {
        RepositoryError::Database(format!(
            "Invalid decimal '{}' in column '{}': {}",
            value, column, e
        ))
    })
}

/// Parse a JSON document column.
pub fn parse_json<T: serde::de::DeserializeOwned>(
    column: &str,
    value: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(value).map_err(|e| {
        RepositoryError::Database(format!("Invalid JSON in column '{}': {}", column, e))
    })
}

pub fn to_json<T: serde::Serialize>(column: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| {
        RepositoryError::Database(format!("Cannot encode column '{}': {}", column, e))
    })
}
