//! Argument binding.
//!
//! Rebuilds handler arguments from the flat, multi-valued request parameters.
//! Targets are described by a [`TypeDescriptor`], either written by hand or
//! derived from a Rust type through [`Bindable`]:
//!
//! ```
//! use girder_core::binding::{Bindable, Binder, Value};
//! use girder_core::params::ParameterSpace;
//! use girder_core::bindable;
//!
//! #[derive(Debug, Default)]
//! struct Emp {
//!     name: Option<String>,
//!     age: i32,
//! }
//! bindable!(Emp { name: Option<String>, age: i32 });
//!
//! let params = ParameterSpace::parse("emp.name=Bob&emp.age=abc");
//! let value = Binder::new().bind(&Emp::descriptor(), &params, "emp");
//! let emp = Emp::from_value(value).unwrap();
//! assert_eq!(emp.name.as_deref(), Some("Bob"));
//! assert_eq!(emp.age, 0);
//! ```

mod bindable;
mod binder;
mod convert;
mod descriptor;
mod value;

pub use bindable::Bindable;
pub use binder::{Binder, BinderConfig};
pub use convert::{
    convert_enum, convert_temporal, ConversionError, ConversionTable, Converter, DATE_FORMATS,
};
pub use descriptor::{
    CompositeDescriptor, FieldDescriptor, ScalarType, TemporalType, TypeDescriptor, TypeKind,
};
pub use value::Value;
