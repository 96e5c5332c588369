//! Structural encoder: flattens rich in-memory values into JSON-safe trees.
//!
//! [`encode`] walks an [`EncodeValue`] depth-first. Each node is handled by the
//! first rule that applies:
//!
//! 1. a converter registered in [`CustomEncoders`] for the node's type,
//! 2. a fixed scalar adapter (dates, decimals, paths, secrets, ...),
//! 3. records, with field filters applied once at the record level,
//! 4. plain field sets,
//! 5. JSON primitives, returned as-is,
//! 6. mappings, filtered by key,
//! 7. sequences and sets,
//! 8. opaque values exposing a scalar view,
//! 9. opaque values exposing a mapping or attribute view.
//!
//! Anything left over is an [`EncodingError::Unsupported`].

mod registry;
mod scalars;
pub mod value;

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;

pub use registry::CustomEncoders;
pub use value::{
    Decimal, Encode, EncodeValue, EnumValue, FieldSet, Opaque, ParseDecimalError, ROOT_FIELD,
    Record, RecordField, Secret, StringList,
};

/// Key prefix treated as internal housekeeping state when [`EncodeOptions::skip_reserved_keys`] is set.
pub const RESERVED_KEY_PREFIX: &str = "_sa";

/// Maximum nesting depth before encoding is abandoned.
///
/// Every container level and every custom-converter application counts as one level,
/// so plain JSON trees nested deeper than this are rejected too.
pub const MAX_DEPTH: usize = 256;

/// Errors raised when a value cannot be flattened into JSON.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// No encoding rule applied; `failures` lists every fallback that was tried.
    #[error("no JSON encoding for value of type '{type_name}': {}", failures.join("; "))]
    Unsupported {
        /// Type name of the offending value.
        type_name: String,
        /// Failure reported by each fallback, in order.
        failures: Vec<String>,
    },
    /// Binary data was not valid UTF-8 text.
    #[error("byte string is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    /// JSON has no representation for NaN or infinities.
    #[error("non-finite float {0} cannot be represented in JSON")]
    NonFiniteFloat(f64),
    /// A mapping key encoded to something other than a JSON scalar.
    #[error("mapping key of type '{0}' cannot be used as a JSON object key")]
    UnsupportedKey(String),
    /// Date or time formatting failed.
    #[error("failed to format {kind}: {message}")]
    Format {
        /// Kind of value being formatted.
        kind: &'static str,
        /// Formatter error message.
        message: String,
    },
    /// Nesting exceeded [`MAX_DEPTH`], usually a converter that never terminates.
    #[error("value nesting exceeds {0} levels")]
    DepthExceeded(usize),
}

impl EncodingError {
    pub(crate) fn format(kind: &'static str, err: time::error::Format) -> Self {
        Self::Format {
            kind,
            message: err.to_string(),
        }
    }
}

/// Options controlling which fields appear in the output.
///
/// `include` and `exclude` only apply at the first mapping level they reach; the
/// remaining flags propagate through the whole tree.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Keep only these field or key names.
    pub include: Option<BTreeSet<String>>,
    /// Drop these field or key names.
    pub exclude: Option<BTreeSet<String>>,
    /// Emit record fields under their alias.
    pub by_alias: bool,
    /// Drop record fields that were never explicitly set.
    pub exclude_unset: bool,
    /// Drop record fields equal to their declared default.
    pub exclude_defaults: bool,
    /// Drop null record fields and null mapping values.
    pub exclude_none: bool,
    /// Converters consulted before every built-in rule.
    pub custom_encoders: CustomEncoders,
    /// Drop mapping keys starting with [`RESERVED_KEY_PREFIX`].
    pub skip_reserved_keys: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            include: None,
            exclude: None,
            by_alias: true,
            exclude_unset: false,
            exclude_defaults: false,
            exclude_none: false,
            custom_encoders: CustomEncoders::default(),
            skip_reserved_keys: true,
        }
    }
}

impl EncodeOptions {
    /// Restrict output to the named keys.
    pub fn include<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Remove the named keys from the output.
    pub fn exclude<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Options passed below the first mapping level: everything but the key filters.
    fn propagating(&self) -> Self {
        Self {
            include: None,
            exclude: None,
            ..self.clone()
        }
    }

    fn allows_key(&self, key: &EncodeValue) -> bool {
        let name = match key {
            EncodeValue::String(name) => Some(name.as_str()),
            _ => None,
        };
        if self.skip_reserved_keys
            && name.is_some_and(|name| name.starts_with(RESERVED_KEY_PREFIX))
        {
            return false;
        }
        if let Some(include) = &self.include
            && !name.is_some_and(|name| include.contains(name))
        {
            return false;
        }
        if let Some(exclude) = &self.exclude
            && name.is_some_and(|name| exclude.contains(name))
        {
            return false;
        }
        true
    }
}

/// Convert `value` into a JSON tree using `options`.
///
/// Fails with [`EncodingError::DepthExceeded`] once nesting passes [`MAX_DEPTH`] levels.
pub fn encode(value: &EncodeValue, options: &EncodeOptions) -> Result<Value, EncodingError> {
    encode_at(value, options, 0)
}

/// Convert any [`Encode`] implementor with default options.
pub fn to_json<T: Encode + ?Sized>(value: &T) -> Result<Value, EncodingError> {
    encode(&value.to_encode_value(), &EncodeOptions::default())
}

fn encode_at(
    value: &EncodeValue,
    options: &EncodeOptions,
    depth: usize,
) -> Result<Value, EncodingError> {
    if depth > MAX_DEPTH {
        return Err(EncodingError::DepthExceeded(MAX_DEPTH));
    }
    let next = depth + 1;

    if let Some(converted) = options.custom_encoders.convert(value) {
        return encode_at(&converted, options, next);
    }

    if let Some(encoded) = scalars::encode_scalar(value) {
        return encoded;
    }

    match value {
        EncodeValue::Record(record) => {
            let entries = record_entries(record, options, depth)?;
            let behaviour = options.propagating();
            match unwrap_root(entries) {
                Ok(root) => encode_at(&root, &behaviour, next),
                Err(entries) => encode_at(&EncodeValue::Map(entries), &behaviour, next),
            }
        }
        EncodeValue::FieldSet(fields) => {
            let entries = fields
                .fields
                .iter()
                .map(|(name, value)| (EncodeValue::String(name.clone()), value.clone()))
                .collect();
            encode_at(&EncodeValue::Map(entries), options, next)
        }
        EncodeValue::Null => Ok(Value::Null),
        EncodeValue::Bool(flag) => Ok(Value::Bool(*flag)),
        EncodeValue::Int(int) => Ok(Value::from(*int)),
        EncodeValue::UInt(uint) => Ok(Value::from(*uint)),
        EncodeValue::Float(float) => scalars::float(*float),
        EncodeValue::String(text) => Ok(Value::String(text.clone())),
        EncodeValue::Enum(member) => encode_at(&member.value, options, next),
        EncodeValue::Map(entries) => encode_map(entries, options, next),
        EncodeValue::Seq(items) | EncodeValue::Set(items) => items
            .iter()
            .map(|item| encode_at(item, options, next))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        EncodeValue::Opaque(opaque) => {
            if let Some(scalar) = opaque.as_scalar() {
                return encode_at(&scalar, options, next);
            }
            let mut failures = Vec::new();
            let entries = match opaque.as_mapping() {
                Ok(entries) => entries,
                Err(mapping_failure) => {
                    failures.push(mapping_failure);
                    match opaque.attributes() {
                        Ok(attributes) => attributes
                            .into_iter()
                            .map(|(name, value)| (EncodeValue::String(name), value))
                            .collect(),
                        Err(attribute_failure) => {
                            failures.push(attribute_failure);
                            return Err(EncodingError::Unsupported {
                                type_name: opaque.type_name().to_string(),
                                failures,
                            });
                        }
                    }
                }
            };
            encode_at(&EncodeValue::Map(entries), options, next)
        }
        // Scalar-adapter kinds were handled above.
        other => Err(EncodingError::Unsupported {
            type_name: other.type_name().to_string(),
            failures: vec!["no scalar adapter produced a value".to_string()],
        }),
    }
}

/// Dump record fields honoring the filter flags.
fn record_entries(
    record: &Record,
    options: &EncodeOptions,
    depth: usize,
) -> Result<Vec<(EncodeValue, EncodeValue)>, EncodingError> {
    let mut entries = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        if let Some(include) = &options.include
            && !include.contains(&field.name)
        {
            continue;
        }
        if let Some(exclude) = &options.exclude
            && exclude.contains(&field.name)
        {
            continue;
        }
        if options.exclude_unset && !field.explicitly_set {
            continue;
        }
        if options.exclude_none && field.value.is_null() {
            continue;
        }
        if options.exclude_defaults && is_default(field, options, depth)? {
            continue;
        }

        let key = match (&field.alias, options.by_alias) {
            (Some(alias), true) => alias.clone(),
            _ => field.name.clone(),
        };
        entries.push((EncodeValue::String(key), field.value.clone()));
    }
    Ok(entries)
}

fn is_default(
    field: &RecordField,
    options: &EncodeOptions,
    depth: usize,
) -> Result<bool, EncodingError> {
    let Some(default) = &field.default else {
        return Ok(false);
    };
    let behaviour = options.propagating();
    Ok(encode_at(&field.value, &behaviour, depth + 1)?
        == encode_at(default, &behaviour, depth + 1)?)
}

fn unwrap_root(
    mut entries: Vec<(EncodeValue, EncodeValue)>,
) -> Result<EncodeValue, Vec<(EncodeValue, EncodeValue)>> {
    let position = entries
        .iter()
        .position(|(key, _)| matches!(key, EncodeValue::String(name) if name == ROOT_FIELD));
    match position {
        Some(idx) => Ok(entries.swap_remove(idx).1),
        None => Err(entries),
    }
}

fn encode_map(
    entries: &[(EncodeValue, EncodeValue)],
    options: &EncodeOptions,
    depth: usize,
) -> Result<Value, EncodingError> {
    let behaviour = options.propagating();
    let mut encoded = Map::new();
    for (key, value) in entries {
        if !options.allows_key(key) || (options.exclude_none && value.is_null()) {
            continue;
        }
        let key = json_key(encode_at(key, &behaviour, depth)?)?;
        let value = encode_at(value, &behaviour, depth)?;
        encoded.insert(key, value);
    }
    Ok(Value::Object(encoded))
}

fn json_key(key: Value) -> Result<String, EncodingError> {
    match key {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Array(_) => Err(EncodingError::UnsupportedKey("seq".to_string())),
        Value::Object(_) => Err(EncodingError::UnsupportedKey("map".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode_default(value: impl Into<EncodeValue>) -> Value {
        encode(&value.into(), &EncodeOptions::default()).expect("encodes")
    }

    #[derive(Debug)]
    struct Handle {
        id: u32,
    }

    impl Opaque for Handle {
        fn type_name(&self) -> &str {
            "Handle"
        }

        fn attributes(&self) -> Result<Vec<(String, EncodeValue)>, String> {
            Ok(vec![("id".to_string(), EncodeValue::from(self.id))])
        }
    }

    #[derive(Debug)]
    struct Pairs;

    impl Opaque for Pairs {
        fn type_name(&self) -> &str {
            "Pairs"
        }

        fn as_mapping(&self) -> Result<Vec<(EncodeValue, EncodeValue)>, String> {
            Ok(vec![(EncodeValue::Int(1), EncodeValue::from("one"))])
        }
    }

    #[derive(Debug)]
    struct Socket;

    impl Opaque for Socket {
        fn type_name(&self) -> &str {
            "Socket"
        }

        fn ancestors(&self) -> &[&'static str] {
            &["Stream"]
        }
    }

    #[test]
    fn json_primitive_trees_are_unchanged() {
        let payload = json!({
            "text": "hello",
            "count": 3,
            "ratio": 0.5,
            "flag": true,
            "missing": null,
            "items": ["a", 1, false, {"nested": [null]}],
        });
        assert_eq!(encode_default(payload.clone()), payload);
    }

    #[test]
    fn reserved_keys_are_dropped_at_every_level() {
        let record = Record::new("Row")
            .field("_sa_instance_state", "internal")
            .field("name", "visible")
            .field(
                "child",
                EncodeValue::map([("_sa_session", "x"), ("value", "y")]),
            );
        assert_eq!(
            encode_default(record),
            json!({"name": "visible", "child": {"value": "y"}})
        );
    }

    #[test]
    fn reserved_keys_survive_when_flag_is_off() {
        let options = EncodeOptions {
            skip_reserved_keys: false,
            ..EncodeOptions::default()
        };
        let value = EncodeValue::map([("_sa_state", 1)]);
        assert_eq!(encode(&value, &options).expect("encodes"), json!({"_sa_state": 1}));
    }

    #[test]
    fn enum_members_encode_to_declared_value() {
        let member = EnumValue::new("Colour", "RED", "red");
        assert_eq!(encode_default(member), json!("red"));
        let numeric = EnumValue::new("Level", "HIGH", 3_i64);
        assert_eq!(encode_default(numeric), json!(3));
    }

    #[test]
    fn nested_secrets_become_plain_strings() {
        let value = EncodeValue::map([(
            "credentials",
            EncodeValue::Seq(vec![
                Secret::new("token-a").into(),
                Secret::from_bytes(b"token-b".to_vec()).into(),
            ]),
        )]);
        assert_eq!(
            encode_default(value),
            json!({"credentials": ["token-a", "token-b"]})
        );
    }

    #[test]
    fn include_and_exclude_stop_at_first_mapping_level() {
        let value = EncodeValue::map([
            ("keep", EncodeValue::map([("drop", 1), ("other", 2)])),
            ("drop", EncodeValue::from(3_i64)),
        ]);
        let options = EncodeOptions::default().exclude(["drop"]);
        assert_eq!(
            encode(&value, &options).expect("encodes"),
            json!({"keep": {"drop": 1, "other": 2}})
        );

        let options = EncodeOptions::default().include(["keep"]);
        assert_eq!(
            encode(&value, &options).expect("encodes"),
            json!({"keep": {"drop": 1, "other": 2}})
        );
    }

    #[test]
    fn sequences_carry_key_filters_to_each_element() {
        let value = EncodeValue::Seq(vec![
            EncodeValue::map([("a", 1), ("b", 2)]),
            EncodeValue::map([("a", 3), ("c", 4)]),
        ]);
        let options = EncodeOptions::default().include(["a"]);
        assert_eq!(
            encode(&value, &options).expect("encodes"),
            json!([{"a": 1}, {"a": 3}])
        );
    }

    #[test]
    fn record_filters_apply_once() {
        let record = Record::new("Payload")
            .with(RecordField::new("dataset_name", "docs").alias("datasetName"))
            .with(RecordField::defaulted("node_set", EncodeValue::Null))
            .with(RecordField::new("limit", 10_i64).default_value(10_i64))
            .field("extra", EncodeValue::map([("inner", EncodeValue::Null)]));

        assert_eq!(
            encode_default(record.clone()),
            json!({"datasetName": "docs", "node_set": null, "limit": 10, "extra": {"inner": null}})
        );

        let options = EncodeOptions {
            by_alias: false,
            exclude_defaults: true,
            ..EncodeOptions::default()
        };
        assert_eq!(
            encode(&record.clone().into(), &options).expect("encodes"),
            json!({"dataset_name": "docs", "extra": {"inner": null}})
        );

        let options = EncodeOptions {
            exclude_unset: true,
            exclude_none: true,
            ..EncodeOptions::default()
        };
        assert_eq!(
            encode(&record.into(), &options).expect("encodes"),
            json!({"datasetName": "docs", "limit": 10, "extra": {}})
        );
    }

    #[test]
    fn record_include_does_not_reach_nested_records() {
        let inner = Record::new("Inner").field("id", 1_i64).field("name", "n");
        let outer = Record::new("Outer").field("id", 2_i64).field("inner", inner);
        let options = EncodeOptions::default().include(["id", "inner"]);
        assert_eq!(
            encode(&outer.into(), &options).expect("encodes"),
            json!({"id": 2, "inner": {"id": 1, "name": "n"}})
        );
    }

    #[test]
    fn root_records_unwrap_their_value() {
        let wrapper = Record::root("Ids", vec!["a", "b"]);
        assert_eq!(encode_default(wrapper), json!(["a", "b"]));
    }

    #[test]
    fn field_sets_honor_key_filters() {
        let fields = FieldSet::new("Point").field("x", 1_i64).field("y", 2_i64);
        let options = EncodeOptions::default().exclude(["y"]);
        assert_eq!(encode(&fields.into(), &options).expect("encodes"), json!({"x": 1}));
    }

    #[test]
    fn sets_become_sequences() {
        let set: BTreeSet<&str> = ["b", "a"].into_iter().collect();
        assert_eq!(encode_default(set), json!(["a", "b"]));
    }

    #[test]
    fn non_string_keys_are_stringified() {
        let value = EncodeValue::Map(vec![
            (EncodeValue::Int(1), EncodeValue::from("one")),
            (EncodeValue::Bool(true), EncodeValue::from("yes")),
        ]);
        assert_eq!(encode_default(value), json!({"1": "one", "true": "yes"}));
    }

    #[test]
    fn sequence_keys_are_rejected() {
        let value = EncodeValue::Map(vec![(EncodeValue::Seq(vec![]), EncodeValue::Null)]);
        let err = encode(&value, &EncodeOptions::default()).expect_err("must fail");
        assert!(matches!(err, EncodingError::UnsupportedKey(_)));
    }

    #[test]
    fn custom_encoder_takes_precedence() {
        let options = EncodeOptions {
            custom_encoders: CustomEncoders::new()
                .register("uuid", |_| EncodeValue::from("redacted-id")),
            ..EncodeOptions::default()
        };
        let value = EncodeValue::map([("id", uuid::Uuid::nil())]);
        assert_eq!(
            encode(&value, &options).expect("encodes"),
            json!({"id": "redacted-id"})
        );
    }

    #[test]
    fn custom_encoder_matches_ancestors() {
        let options = EncodeOptions {
            custom_encoders: CustomEncoders::new().register("Stream", |value| {
                EncodeValue::from(format!("<{}>", value.type_name()))
            }),
            ..EncodeOptions::default()
        };
        assert_eq!(
            encode(&EncodeValue::opaque(Socket), &options).expect("encodes"),
            json!("<Socket>")
        );
    }

    #[test]
    fn runaway_converter_hits_depth_limit() {
        let options = EncodeOptions {
            custom_encoders: CustomEncoders::new().register("str", |value| value.clone()),
            ..EncodeOptions::default()
        };
        let err = encode(&EncodeValue::from("loop"), &options).expect_err("must fail");
        assert!(matches!(err, EncodingError::DepthExceeded(MAX_DEPTH)));
    }

    fn nested_arrays(levels: usize) -> Value {
        (0..levels).fold(json!("leaf"), |inner, _| json!([inner]))
    }

    #[test]
    fn json_trees_within_depth_limit_pass_through() {
        let tree = nested_arrays(MAX_DEPTH);
        assert_eq!(encode_default(EncodeValue::from(tree.clone())), tree);

        let err = encode(
            &EncodeValue::from(nested_arrays(MAX_DEPTH + 1)),
            &EncodeOptions::default(),
        )
        .expect_err("too deep");
        assert!(matches!(err, EncodingError::DepthExceeded(MAX_DEPTH)));
    }

    #[test]
    fn opaque_values_fall_back_to_mapping_then_attributes() {
        assert_eq!(encode_default(EncodeValue::opaque(Pairs)), json!({"1": "one"}));
        assert_eq!(
            encode_default(EncodeValue::opaque(Handle { id: 7 })),
            json!({"id": 7})
        );
    }

    #[test]
    fn opaque_without_views_reports_every_failure() {
        let err = encode(&EncodeValue::opaque(Socket), &EncodeOptions::default())
            .expect_err("must fail");
        match err {
            EncodingError::Unsupported {
                type_name,
                failures,
            } => {
                assert_eq!(type_name, "Socket");
                assert_eq!(failures.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let err = encode(&EncodeValue::Float(f64::NAN), &EncodeOptions::default())
            .expect_err("must fail");
        assert!(matches!(err, EncodingError::NonFiniteFloat(_)));
    }
}
