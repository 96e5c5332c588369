//! Caller-supplied converters keyed by type name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::value::EncodeValue;

type Converter = Arc<dyn Fn(&EncodeValue) -> EncodeValue + Send + Sync>;

/// Registry of custom converters consulted before any built-in encoding rule.
///
/// Converters are matched by [`EncodeValue::type_name`]; opaque values also match
/// on their declared ancestors. The converter output is encoded again, so it must
/// not produce another value of the same type.
#[derive(Clone, Default)]
pub struct CustomEncoders {
    by_type: HashMap<String, Converter>,
}

impl CustomEncoders {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter for `type_name`, replacing any previous one.
    pub fn register<F>(mut self, type_name: impl Into<String>, converter: F) -> Self
    where
        F: Fn(&EncodeValue) -> EncodeValue + Send + Sync + 'static,
    {
        self.by_type.insert(type_name.into(), Arc::new(converter));
        self
    }

    /// True when no converters are registered.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Apply the converter for the value's exact type, falling back to its ancestors.
    pub(crate) fn convert(&self, value: &EncodeValue) -> Option<EncodeValue> {
        if self.by_type.is_empty() {
            return None;
        }
        if let Some(converter) = self.by_type.get(value.type_name()) {
            return Some(converter(value));
        }
        let EncodeValue::Opaque(opaque) = value else {
            return None;
        };
        opaque
            .ancestors()
            .iter()
            .find_map(|ancestor| self.by_type.get(*ancestor))
            .map(|converter| converter(value))
    }
}

impl fmt::Debug for CustomEncoders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.by_type.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("CustomEncoders")
            .field("types", &types)
            .finish()
    }
}
