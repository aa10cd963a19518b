// Recursive parameter-to-value binder

use super::convert::{convert_enum, convert_temporal, ConversionTable};
use super::descriptor::{CompositeDescriptor, TypeDescriptor, TypeKind};
use super::value::Value;
use crate::logging::{trace, warn};
use crate::params::ParameterSpace;
use serde::{Deserialize, Serialize};

/// Binder limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// Highest accepted `[index]`; larger indices are ignored.
    pub max_index: usize,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self { max_index: 4096 }
    }
}

/// Rebuilds typed values from a flat [`ParameterSpace`].
///
/// Keys follow the `name.field` / `name[index]` convention and compose, so
/// `order.lines[1].sku` addresses the `sku` field of the second line of the
/// `order` argument.
///
/// Conversion never fails the bind: blank, missing or malformed scalars
/// degrade to the type's zero value (with a warning for malformed input).
/// A non-instantiable composite binds to [`Value::Null`].
#[derive(Debug, Clone, Default)]
pub struct Binder {
    conversions: ConversionTable,
    config: BinderConfig,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversions(mut self, conversions: ConversionTable) -> Self {
        self.conversions = conversions;
        self
    }

    pub fn with_config(mut self, config: BinderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn conversions(&self) -> &ConversionTable {
        &self.conversions
    }

    pub fn conversions_mut(&mut self) -> &mut ConversionTable {
        &mut self.conversions
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Bind `ty` from the parameters found under `prefix`.
    pub fn bind(&self, ty: &TypeDescriptor, params: &ParameterSpace, prefix: &str) -> Value {
        match &ty.kind {
            TypeKind::Scalar(_) | TypeKind::Enum(_) | TypeKind::Temporal(_) => {
                let raw = lookup(params, prefix).and_then(|values| values.first());
                self.convert(ty, raw.map(String::as_str), prefix)
            }
            TypeKind::Array(element) | TypeKind::Collection(element) => {
                Value::Array(self.bind_sequence(element, params, prefix))
            }
            TypeKind::Composite(composite) => self.bind_composite(ty, composite, params, prefix),
        }
    }

    /// Convert one raw value for a scalar, enum or temporal target.
    ///
    /// `key` only labels log output. Sequence and composite targets yield
    /// `Null`.
    pub fn convert(&self, ty: &TypeDescriptor, raw: Option<&str>, key: &str) -> Value {
        let raw = raw.filter(|r| !r.trim().is_empty());

        match &ty.kind {
            TypeKind::Scalar(scalar) => {
                let Some(raw) = raw else {
                    return ConversionTable::zero_value(scalar);
                };
                self.conversions.convert(scalar, raw).unwrap_or_else(|e| {
                    warn!(key, error = %e, "Conversion failed, using zero value");
                    ConversionTable::zero_value(scalar)
                })
            }
            TypeKind::Enum(constants) => {
                let Some(raw) = raw else {
                    return Value::Null;
                };
                convert_enum(constants, raw).unwrap_or_else(|| {
                    warn!(key, value = raw, ty = %ty, "No matching enum constant");
                    Value::Null
                })
            }
            TypeKind::Temporal(temporal) => {
                let Some(raw) = raw else {
                    return Value::Null;
                };
                convert_temporal(*temporal, raw).unwrap_or_else(|e| {
                    warn!(key, error = %e, "Conversion failed, using null");
                    Value::Null
                })
            }
            TypeKind::Array(_) | TypeKind::Collection(_) | TypeKind::Composite(_) => Value::Null,
        }
    }

    fn bind_sequence(
        &self,
        element: &TypeDescriptor,
        params: &ParameterSpace,
        prefix: &str,
    ) -> Vec<Value> {
        let Some(max_index) = self.max_index(params, prefix) else {
            return Vec::new();
        };
        trace!(prefix, max_index, "Binding sequence");

        (0..=max_index)
            .map(|i| self.bind(element, params, &format!("{}[{}]", prefix, i)))
            .collect()
    }

    /// Largest `N` among keys `prefix[N]`, `prefix[N].…` and `prefix[N][…`.
    fn max_index(&self, params: &ParameterSpace, prefix: &str) -> Option<usize> {
        let mut max: Option<usize> = None;
        for key in params.keys() {
            let Some(index) = parse_index(key, prefix) else {
                continue;
            };
            if index > self.config.max_index {
                warn!(key, limit = self.config.max_index, "Ignoring index above limit");
                continue;
            }
            max = Some(max.map_or(index, |m| m.max(index)));
        }
        max
    }

    fn bind_composite(
        &self,
        ty: &TypeDescriptor,
        composite: &CompositeDescriptor,
        params: &ParameterSpace,
        prefix: &str,
    ) -> Value {
        if !composite.instantiable {
            warn!(ty = %ty, prefix, "Type cannot be instantiated, binding null");
            return Value::Null;
        }

        let fields = composite
            .fields
            .iter()
            .map(|field| {
                let value = if field.ty.is_sequence() {
                    // sequence fields of a composite are left unbound
                    Value::Null
                } else {
                    let child = if prefix.is_empty() {
                        field.name.clone()
                    } else {
                        format!("{}.{}", prefix, field.name)
                    };
                    self.bind(&field.ty, params, &child)
                };
                (field.name.clone(), value)
            })
            .collect();

        Value::Object(fields)
    }
}

/// Values for `key`, accepting `a_b` in the space as a synonym for `a.b`.
fn lookup<'a>(params: &'a ParameterSpace, key: &str) -> Option<&'a [String]> {
    params.get(key).or_else(|| {
        params
            .iter()
            .find(|(candidate, _)| candidate.replace('_', ".") == key)
            .map(|(_, values)| values)
    })
}

fn parse_index(key: &str, prefix: &str) -> Option<usize> {
    let rest = key.strip_prefix(prefix)?.strip_prefix('[')?;
    let close = rest.find(']')?;
    let digits = &rest[..close];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let tail = &rest[close + 1..];
    if !(tail.is_empty() || tail.starts_with('.') || tail.starts_with('[')) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::descriptor::ScalarType;

    fn space(pairs: &[(&str, &str)]) -> ParameterSpace {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("list[3]", "list"), Some(3));
        assert_eq!(parse_index("list[12].name", "list"), Some(12));
        assert_eq!(parse_index("list[2][0]", "list"), Some(2));
        assert_eq!(parse_index("list[x]", "list"), None);
        assert_eq!(parse_index("list[]", "list"), None);
        assert_eq!(parse_index("list[1]x", "list"), None);
        assert_eq!(parse_index("lists[1]", "list"), None);
        assert_eq!(parse_index("[4]", ""), Some(4));
    }

    #[test]
    fn test_underscore_alias() {
        let binder = Binder::new();
        let params = space(&[("emp_name", "Ann")]);
        let value = binder.bind(&TypeDescriptor::string(), &params, "emp.name");
        assert_eq!(value, Value::Str("Ann".into()));
    }

    #[test]
    fn test_exact_key_beats_alias() {
        let binder = Binder::new();
        let params = space(&[("emp_name", "alias"), ("emp.name", "exact")]);
        let value = binder.bind(&TypeDescriptor::string(), &params, "emp.name");
        assert_eq!(value, Value::Str("exact".into()));
    }

    #[test]
    fn test_first_value_wins() {
        let binder = Binder::new();
        let params = space(&[("n", "1"), ("n", "2")]);
        let value = binder.bind(&TypeDescriptor::scalar(ScalarType::Int), &params, "n");
        assert_eq!(value, Value::Int(1));
    }

    #[test]
    fn test_index_limit() {
        let binder = Binder::new().with_config(BinderConfig { max_index: 2 });
        let params = space(&[("xs[1]", "a"), ("xs[1000000]", "b")]);
        let ty = TypeDescriptor::array_of(TypeDescriptor::string());
        let value = binder.bind(&ty, &params, "xs");
        assert_eq!(value.as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_convert_blank_is_zero() {
        let binder = Binder::new();
        let int = TypeDescriptor::scalar(ScalarType::Int);
        assert_eq!(binder.convert(&int, Some("   "), "k"), Value::Int(0));
        assert_eq!(binder.convert(&int, None, "k"), Value::Int(0));
        assert_eq!(binder.convert(&TypeDescriptor::string(), Some(""), "k"), Value::Null);
    }
}
