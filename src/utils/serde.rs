/*!
 * Serde helpers for task record fields.
 *
 * Task records are flat JSON maps written by any node (and occasionally by
 * maintenance tooling), so timestamp and frequency fields may arrive as
 * numbers, numeric strings or null.
 */

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize an optional epoch-millisecond value that may be a number or string.
///
/// - Missing/null returns `None`
/// - Integer numbers are taken as-is
/// - Floating-point numbers are truncated
/// - Numeric strings are parsed
///
/// # Usage with serde
///
/// ```rust
/// use serde::Deserialize;
/// use tasker_cluster::utils::serde::deserialize_optional_millis;
///
/// #[derive(Deserialize)]
/// struct Record {
///     #[serde(default, deserialize_with = "deserialize_optional_millis")]
///     run_at: Option<i64>,
/// }
/// ```
pub fn deserialize_optional_millis<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Some(f as i64))
            } else {
                Err(D::Error::custom(format!("Invalid numeric value: {n}")))
            }
        }
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .parse::<i64>()
            .map(Some)
            .or_else(|_| s.parse::<f64>().map(|f| Some(f as i64)))
            .map_err(|_| D::Error::custom(format!("Cannot parse '{s}' as numeric"))),
        Some(other) => Err(D::Error::custom(format!(
            "Expected numeric value, found: {other}"
        ))),
    }
}

/// Deserialize a non-negative frequency, treating null/missing as zero.
pub fn deserialize_frequency<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = deserialize_optional_millis(deserializer)?;
    Ok(millis.map(|m| m.max(0) as u64).unwrap_or(0))
}
