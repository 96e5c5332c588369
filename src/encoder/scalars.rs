//! Fixed adapters for scalar kinds that have no direct JSON counterpart.

use serde_json::{Number, Value};
use time::macros::format_description;

use super::EncodingError;
use super::value::{Decimal, EncodeValue};

/// Encode a scalar-adapter kind, or return `None` when `value` is not one.
pub(crate) fn encode_scalar(value: &EncodeValue) -> Option<Result<Value, EncodingError>> {
    let encoded = match value {
        EncodeValue::Bytes(bytes) => std::str::from_utf8(bytes)
            .map(|text| Value::String(text.to_string()))
            .map_err(EncodingError::from),
        EncodeValue::Date(date) => date
            .format(format_description!("[year]-[month]-[day]"))
            .map(Value::String)
            .map_err(|err| EncodingError::format("date", err)),
        EncodeValue::Time(time) => {
            let formatted = if time.nanosecond() == 0 {
                time.format(format_description!("[hour]:[minute]:[second]"))
            } else {
                time.format(format_description!(
                    "[hour]:[minute]:[second].[subsecond digits:6]"
                ))
            };
            formatted
                .map(Value::String)
                .map_err(|err| EncodingError::format("time", err))
        }
        EncodeValue::DateTime(datetime) => {
            let formatted = if datetime.nanosecond() == 0 {
                datetime.format(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second]"
                ))
            } else {
                datetime.format(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]"
                ))
            };
            formatted
                .map(Value::String)
                .map_err(|err| EncodingError::format("datetime", err))
        }
        EncodeValue::OffsetDateTime(datetime) => {
            let formatted = if datetime.nanosecond() == 0 {
                datetime.format(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
                ))
            } else {
                datetime.format(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6][offset_hour sign:mandatory]:[offset_minute]"
                ))
            };
            formatted
                .map(Value::String)
                .map_err(|err| EncodingError::format("datetime", err))
        }
        EncodeValue::Duration(duration) => float(duration.as_seconds_f64()),
        EncodeValue::Decimal(decimal) => encode_decimal(decimal),
        EncodeValue::Uuid(uuid) => Ok(Value::String(uuid.hyphenated().to_string())),
        EncodeValue::Path(path) => Ok(Value::String(path.to_string_lossy().into_owned())),
        EncodeValue::Pattern(pattern) => Ok(Value::String(pattern.as_str().to_string())),
        EncodeValue::Secret(secret) => secret
            .expose()
            .map(|text| Value::String(text.into_owned()))
            .map_err(EncodingError::from),
        _ => return None,
    };
    Some(encoded)
}

/// Integer when the decimal has no fractional exponent, float otherwise.
fn encode_decimal(decimal: &Decimal) -> Result<Value, EncodingError> {
    if let Some(integer) = decimal.to_integer() {
        if let Ok(signed) = i64::try_from(integer) {
            return Ok(Value::from(signed));
        }
        if let Ok(unsigned) = u64::try_from(integer) {
            return Ok(Value::from(unsigned));
        }
    }
    float(decimal.to_f64())
}

pub(crate) fn float(value: f64) -> Result<Value, EncodingError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or(EncodingError::NonFiniteFloat(value))
}
