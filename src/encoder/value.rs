//! Closed value model consumed by the structural encoder.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Field name carried by single-root wrapper records.
pub const ROOT_FIELD: &str = "__root__";

/// Any value the encoder knows how to flatten into JSON.
#[derive(Debug, Clone)]
pub enum EncodeValue {
    /// JSON `null`.
    Null,
    /// Boolean primitive.
    Bool(bool),
    /// Signed integer primitive.
    Int(i64),
    /// Unsigned integer primitive.
    UInt(u64),
    /// Floating-point primitive.
    Float(f64),
    /// String primitive.
    String(String),
    /// Binary data, decoded as UTF-8 text.
    Bytes(Vec<u8>),
    /// Calendar date.
    Date(Date),
    /// Wall-clock time.
    Time(Time),
    /// Date and time without an offset.
    DateTime(PrimitiveDateTime),
    /// Date and time with a UTC offset.
    OffsetDateTime(OffsetDateTime),
    /// Signed duration, encoded as seconds.
    Duration(Duration),
    /// Arbitrary-precision decimal.
    Decimal(Decimal),
    /// UUID, encoded in hyphenated form.
    Uuid(Uuid),
    /// Enumerated constant, encoded as its underlying value.
    Enum(EnumValue),
    /// Filesystem path.
    Path(PathBuf),
    /// Compiled pattern, encoded as its source.
    Pattern(Regex),
    /// Credential wrapper, encoded as its plain text.
    Secret(Secret),
    /// Ordered sequence.
    Seq(Vec<EncodeValue>),
    /// Set-like collection, encoded as a sequence in iteration order.
    Set(Vec<EncodeValue>),
    /// Mapping with arbitrary keys, in insertion order.
    Map(Vec<(EncodeValue, EncodeValue)>),
    /// Schema-validated record.
    Record(Record),
    /// Loosely-structured record.
    FieldSet(FieldSet),
    /// Value outside the closed set; see [`Opaque`].
    Opaque(Arc<dyn Opaque>),
}

impl EncodeValue {
    /// Wrap raw bytes.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Wrap an [`Opaque`] implementation.
    pub fn opaque(value: impl Opaque + 'static) -> Self {
        Self::Opaque(Arc::new(value))
    }

    /// Build a mapping from string keys.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<EncodeValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (Self::String(key.into()), value.into()))
                .collect(),
        )
    }

    /// Name used for custom-encoder lookups and error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) | Self::OffsetDateTime(_) => "datetime",
            Self::Duration(_) => "duration",
            Self::Decimal(_) => "decimal",
            Self::Uuid(_) => "uuid",
            Self::Enum(value) => value.type_name.as_str(),
            Self::Path(_) => "path",
            Self::Pattern(_) => "pattern",
            Self::Secret(_) => "secret",
            Self::Seq(_) => "seq",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Record(record) => record.name.as_str(),
            Self::FieldSet(fields) => fields.name.as_str(),
            Self::Opaque(value) => value.type_name(),
        }
    }

    /// Whether this is the `null` primitive.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Values that know how to describe themselves to the encoder.
pub trait Encode {
    /// Produce the encoder input for this value.
    fn to_encode_value(&self) -> EncodeValue;
}

impl Encode for EncodeValue {
    fn to_encode_value(&self) -> EncodeValue {
        self.clone()
    }
}

/// Extension point for values outside the closed [`EncodeValue`] set.
///
/// The encoder tries, in order: a registered custom converter for
/// [`Opaque::type_name`] or one of [`Opaque::ancestors`], the scalar view from
/// [`Opaque::as_scalar`], the mapping view, and finally the attribute view. When
/// every view fails the encoder reports all collected failures.
pub trait Opaque: fmt::Debug + Send + Sync {
    /// Concrete type name.
    fn type_name(&self) -> &str;

    /// Broader type names this value also answers to, nearest first.
    fn ancestors(&self) -> &[&'static str] {
        &[]
    }

    /// A scalar adapter value standing in for this one (e.g. a path-like handle).
    fn as_scalar(&self) -> Option<EncodeValue> {
        None
    }

    /// Mapping coercion.
    fn as_mapping(&self) -> Result<Vec<(EncodeValue, EncodeValue)>, String> {
        Err(format!("'{}' object is not a mapping", self.type_name()))
    }

    /// Visible attributes.
    fn attributes(&self) -> Result<Vec<(String, EncodeValue)>, String> {
        Err(format!("'{}' object exposes no attributes", self.type_name()))
    }
}

/// Enumerated constant: a symbolic name plus the value it stands for.
#[derive(Debug, Clone)]
pub struct EnumValue {
    /// Enumeration type name.
    pub type_name: String,
    /// Symbolic member name.
    pub name: String,
    /// Declared value; this is what gets encoded.
    pub value: Box<EncodeValue>,
}

impl EnumValue {
    /// Describe an enumeration member.
    pub fn new(
        type_name: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<EncodeValue>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            value: Box::new(value.into()),
        }
    }
}

/// Decimal number stored as `mantissa * 10^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    mantissa: i128,
    exponent: i32,
}

impl Decimal {
    /// Build from a mantissa and base-10 exponent.
    pub const fn new(mantissa: i128, exponent: i32) -> Self {
        Self { mantissa, exponent }
    }

    /// Digits without the exponent applied.
    pub const fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Base-10 exponent; negative values carry fractional digits.
    pub const fn exponent(&self) -> i32 {
        self.exponent
    }

    /// True when no fractional exponent is present, so `1` is integral and `1.0` is not.
    pub const fn is_integral(&self) -> bool {
        self.exponent >= 0
    }

    /// Exact integer value, when integral and within `i128`.
    pub fn to_integer(&self) -> Option<i128> {
        if !self.is_integral() {
            return None;
        }
        10_i128
            .checked_pow(self.exponent.unsigned_abs())
            .and_then(|scale| self.mantissa.checked_mul(scale))
    }

    /// Nearest `f64`.
    pub fn to_f64(&self) -> f64 {
        format!("{}e{}", self.mantissa, self.exponent)
            .parse()
            .unwrap_or_else(|_| self.mantissa as f64 * 10_f64.powi(self.exponent))
    }
}

/// Error returned when a string is not a decimal literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal literal: {0:?}")]
pub struct ParseDecimalError(String);

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDecimalError(s.to_string());
        let trimmed = s.trim();
        let (number, exponent) = match trimmed.find(['e', 'E']) {
            Some(idx) => {
                let exponent: i32 = trimmed[idx + 1..].parse().map_err(|_| invalid())?;
                (&trimmed[..idx], exponent)
            }
            None => (trimmed, 0),
        };
        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number.strip_prefix('+').unwrap_or(number)),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let combined = format!("{whole}{fraction}");
        let magnitude: i128 = combined.parse().map_err(|_| invalid())?;
        let fraction_len = i32::try_from(fraction.len()).map_err(|_| invalid())?;
        Ok(Self {
            mantissa: if negative { -magnitude } else { magnitude },
            exponent: exponent.checked_sub(fraction_len).ok_or_else(invalid)?,
        })
    }
}

/// Credential wrapper that never prints its contents through `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(SecretInner);

#[derive(Clone, PartialEq, Eq)]
enum SecretInner {
    Text(String),
    Bytes(Vec<u8>),
}

impl Secret {
    /// Wrap secret text.
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretInner::Text(value.into()))
    }

    /// Wrap secret bytes.
    pub fn from_bytes(value: impl Into<Vec<u8>>) -> Self {
        Self(SecretInner::Bytes(value.into()))
    }

    /// Reveal the wrapped value as text.
    pub fn expose(&self) -> Result<Cow<'_, str>, std::str::Utf8Error> {
        match &self.0 {
            SecretInner::Text(text) => Ok(Cow::Borrowed(text)),
            SecretInner::Bytes(bytes) => std::str::from_utf8(bytes).map(Cow::Borrowed),
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(**********)")
    }
}

/// Schema-validated record: named fields with aliases, defaults, and set-tracking.
#[derive(Debug, Clone)]
pub struct Record {
    pub(crate) name: String,
    pub(crate) fields: Vec<RecordField>,
}

impl Record {
    /// Start an empty record of the given type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Thin wrapper around a single unnamed root value.
    pub fn root(name: impl Into<String>, value: impl Into<EncodeValue>) -> Self {
        Self::new(name).field(ROOT_FIELD, value)
    }

    /// Append an explicitly-set field.
    pub fn field(self, name: impl Into<String>, value: impl Into<EncodeValue>) -> Self {
        self.with(RecordField::new(name, value))
    }

    /// Append a fully described field.
    pub fn with(mut self, field: RecordField) -> Self {
        self.fields.push(field);
        self
    }

    /// Record type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in order.
    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }
}

/// One field of a [`Record`].
#[derive(Debug, Clone)]
pub struct RecordField {
    /// Field name.
    pub name: String,
    /// External name used when encoding by alias.
    pub alias: Option<String>,
    /// Current value.
    pub value: EncodeValue,
    /// Declared default, compared against when excluding defaults.
    pub default: Option<EncodeValue>,
    /// Whether the value was supplied explicitly rather than defaulted.
    pub explicitly_set: bool,
}

impl RecordField {
    /// Explicitly-set field without alias or default.
    pub fn new(name: impl Into<String>, value: impl Into<EncodeValue>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            value: value.into(),
            default: None,
            explicitly_set: true,
        }
    }

    /// Field left at its declared default.
    pub fn defaulted(name: impl Into<String>, default: impl Into<EncodeValue>) -> Self {
        let default = default.into();
        Self {
            name: name.into(),
            alias: None,
            value: default.clone(),
            default: Some(default),
            explicitly_set: false,
        }
    }

    /// Set the external name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Declare a default without changing the value.
    pub fn default_value(mut self, default: impl Into<EncodeValue>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Plain field set without schema metadata.
#[derive(Debug, Clone)]
pub struct FieldSet {
    pub(crate) name: String,
    pub(crate) fields: Vec<(String, EncodeValue)>,
}

impl FieldSet {
    /// Start an empty field set of the given type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<EncodeValue>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// One string or many, always sent as a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringList(Vec<String>);

impl StringList {
    /// Borrow the normalized items.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Take the normalized items.
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for StringList {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for StringList {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for StringList {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl From<Vec<&str>> for StringList {
    fn from(value: Vec<&str>) -> Self {
        Self(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for StringList {
    fn from(value: &[&str]) -> Self {
        Self(value.iter().map(|item| item.to_string()).collect())
    }
}

impl From<StringList> for EncodeValue {
    fn from(value: StringList) -> Self {
        Self::Seq(value.0.into_iter().map(Self::String).collect())
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for EncodeValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => UInt,
    u64 => UInt,
    f32 => Float,
    f64 => Float,
    String => String,
    &str => String,
    Date => Date,
    Time => Time,
    PrimitiveDateTime => DateTime,
    OffsetDateTime => OffsetDateTime,
    Duration => Duration,
    Decimal => Decimal,
    Uuid => Uuid,
    EnumValue => Enum,
    PathBuf => Path,
    &Path => Path,
    Regex => Pattern,
    Secret => Secret,
    Record => Record,
    FieldSet => FieldSet,
}

impl From<usize> for EncodeValue {
    fn from(value: usize) -> Self {
        Self::UInt(value as u64)
    }
}

impl<T: Into<EncodeValue>> From<Option<T>> for EncodeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<EncodeValue>> From<Vec<T>> for EncodeValue {
    fn from(value: Vec<T>) -> Self {
        Self::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<EncodeValue>> From<BTreeSet<T>> for EncodeValue {
    fn from(value: BTreeSet<T>) -> Self {
        Self::Set(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<EncodeValue>> From<BTreeMap<K, V>> for EncodeValue {
    fn from(value: BTreeMap<K, V>) -> Self {
        Self::map(value)
    }
}

impl<K: Into<String>, V: Into<EncodeValue>> From<HashMap<K, V>> for EncodeValue {
    fn from(value: HashMap<K, V>) -> Self {
        Self::map(value)
    }
}

impl From<Value> for EncodeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Self::Int(int)
                } else if let Some(uint) = number.as_u64() {
                    Self::UInt(uint)
                } else {
                    Self::Float(number.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(text) => Self::String(text),
            Value::Array(items) => Self::Seq(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::map(map),
        }
    }
}
