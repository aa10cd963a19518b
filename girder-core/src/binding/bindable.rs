// Typed bridge between Rust types and binder descriptors

use super::descriptor::{ScalarType, TemporalType, TypeDescriptor};
use super::value::Value;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// A type the binder can rebuild from request parameters.
///
/// `descriptor` tells the binder what to bind; `from_value` turns the bound
/// [`Value`] back into `Self`. It returns `None` when the value does not fit,
/// which for most types means the binder produced `Null`.
///
/// Structs and enums get implementations from [`bindable!`](crate::bindable)
/// and [`bindable_enum!`](crate::bindable_enum).
pub trait Bindable: Sized {
    fn descriptor() -> TypeDescriptor;

    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! scalar_bindable {
    ($($ty:ty => $scalar:ident, $variant:ident;)*) => {
        $(
            impl Bindable for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::scalar(ScalarType::$scalar)
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

scalar_bindable! {
    bool => Bool, Bool;
    i8 => Byte, Byte;
    i16 => Short, Short;
    i32 => Int, Int;
    i64 => Long, Long;
    f32 => Float, Float;
    f64 => Double, Double;
    char => Char, Char;
}

impl Bindable for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::string()
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }
}

impl Bindable for NaiveDate {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::temporal(TemporalType::Date)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Date(d) => Some(d),
            Value::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }
}

impl Bindable for NaiveDateTime {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::temporal(TemporalType::LocalDateTime)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }
}

impl Bindable for Decimal {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::temporal(TemporalType::BigDecimal)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }
}

impl Bindable for i128 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::temporal(TemporalType::BigInteger)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::BigInteger(n) => Some(n),
            _ => None,
        }
    }
}

/// `Null` becomes `Some(None)`, so an absent value is not a failure.
impl<T: Bindable> Bindable for Option<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Bound as a collection. Every element must convert; use `Vec<Option<T>>`
/// when holes (`null` elements) are expected.
impl<T: Bindable> Bindable for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::collection_of(T::descriptor())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

/// Implement [`Bindable`] for a plain struct.
///
/// List every field with its type. Field types must be `Bindable + Default`;
/// a field whose bound value does not convert keeps its default.
///
/// ```
/// use girder_core::bindable;
///
/// #[derive(Debug, Default)]
/// struct Employee {
///     name: Option<String>,
///     age: i32,
/// }
///
/// bindable!(Employee { name: Option<String>, age: i32 });
/// ```
///
/// A struct that embeds a parent type flattens the parent's fields after its
/// own, mirroring [`TypeDescriptor::extends`]:
///
/// ```
/// # use girder_core::bindable;
/// # #[derive(Debug, Default)]
/// # struct Person { name: Option<String> }
/// # bindable!(Person { name: Option<String> });
/// #[derive(Debug, Default)]
/// struct Manager {
///     person: Person,
///     reports: i32,
/// }
///
/// bindable!(Manager extends Person as person { reports: i32 });
/// ```
#[macro_export]
macro_rules! bindable {
    ($ty:ident { $($field:ident : $fty:ty),* $(,)? }) => {
        impl $crate::binding::Bindable for $ty {
            fn descriptor() -> $crate::binding::TypeDescriptor {
                $crate::binding::TypeDescriptor::composite(stringify!($ty))
                    $(.field(
                        stringify!($field),
                        <$fty as $crate::binding::Bindable>::descriptor(),
                    ))*
            }

            #[allow(unused_mut)]
            fn from_value(mut value: $crate::binding::Value) -> Option<Self> {
                if !matches!(value, $crate::binding::Value::Object(_)) {
                    return None;
                }
                Some(Self {
                    $($field: value.take_as::<$fty>(stringify!($field)).unwrap_or_default(),)*
                })
            }
        }
    };
    ($ty:ident extends $parent:ty as $base:ident { $($field:ident : $fty:ty),* $(,)? }) => {
        impl $crate::binding::Bindable for $ty {
            fn descriptor() -> $crate::binding::TypeDescriptor {
                $crate::binding::TypeDescriptor::composite(stringify!($ty))
                    $(.field(
                        stringify!($field),
                        <$fty as $crate::binding::Bindable>::descriptor(),
                    ))*
                    .extends(&<$parent as $crate::binding::Bindable>::descriptor())
            }

            #[allow(unused_mut)]
            fn from_value(mut value: $crate::binding::Value) -> Option<Self> {
                if !matches!(value, $crate::binding::Value::Object(_)) {
                    return None;
                }
                $(let $field = value.take_as::<$fty>(stringify!($field)).unwrap_or_default();)*
                let $base = <$parent as $crate::binding::Bindable>::from_value(value)?;
                Some(Self { $base, $($field,)* })
            }
        }
    };
}

/// Implement [`Bindable`] for a fieldless enum, one constant per variant name.
///
/// ```
/// use girder_core::bindable_enum;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Status { Active, Retired }
///
/// bindable_enum!(Status { Active, Retired });
/// ```
#[macro_export]
macro_rules! bindable_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::binding::Bindable for $ty {
            fn descriptor() -> $crate::binding::TypeDescriptor {
                $crate::binding::TypeDescriptor::enumeration(
                    stringify!($ty),
                    [$(stringify!($variant)),+],
                )
            }

            fn from_value(value: $crate::binding::Value) -> Option<Self> {
                match value.as_str()? {
                    $(name if name == stringify!($variant) => Some($ty::$variant),)+
                    _ => None,
                }
            }
        }
    };
}
