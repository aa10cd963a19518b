use chrono::NaiveDate;
use girder_core::binding::{
    Bindable, Binder, ConversionError, ConversionTable, ScalarType, TemporalType, TypeDescriptor,
    Value,
};
use girder_core::params::ParameterSpace;
use girder_core::{bindable, bindable_enum};
use rust_decimal::Decimal;
use std::str::FromStr;

fn space(pairs: &[(&str, &str)]) -> ParameterSpace {
    pairs.iter().copied().collect()
}

#[derive(Debug, Default, PartialEq)]
struct Emp {
    name: Option<String>,
    age: i32,
}

bindable!(Emp { name: Option<String>, age: i32 });

#[derive(Debug, Clone, Copy, PartialEq)]
enum Status {
    Active,
    Retired,
}

bindable_enum!(Status { Active, Retired });

#[derive(Debug, Default, PartialEq)]
struct Line {
    sku: Option<String>,
    qty: i32,
}

bindable!(Line { sku: Option<String>, qty: i32 });

#[test]
fn test_sparse_array_keeps_holes() {
    let params = space(&[("list[0]", "a"), ("list[2]", "b")]);
    let ty = TypeDescriptor::array_of(TypeDescriptor::string());

    let value = Binder::new().bind(&ty, &params, "list");
    assert_eq!(
        value,
        Value::Array(vec![Value::Str("a".into()), Value::Null, Value::Str("b".into())])
    );
}

#[test]
fn test_sparse_int_collection_defaults_to_zero() {
    let params = space(&[("ids[0]", "4"), ("ids[3]", "9")]);
    let ids: Vec<i32> = Vec::from_value(Binder::new().bind(&Vec::<i32>::descriptor(), &params, "ids"))
        .unwrap();
    assert_eq!(ids, vec![4, 0, 0, 9]);
}

#[test]
fn test_missing_sequence_is_empty() {
    let value = Binder::new().bind(
        &TypeDescriptor::collection_of(TypeDescriptor::string()),
        &space(&[("other[0]", "x")]),
        "list",
    );
    assert_eq!(value, Value::Array(Vec::new()));
}

#[test]
fn test_blank_or_missing_scalars() {
    let binder = Binder::new();
    let int = TypeDescriptor::scalar(ScalarType::Int);
    let params = space(&[("blank", "")]);

    assert_eq!(binder.bind(&int, &params, "blank"), Value::Int(0));
    assert_eq!(binder.bind(&int, &params, "missing"), Value::Int(0));
    assert_eq!(binder.bind(&TypeDescriptor::string(), &params, "blank"), Value::Null);
    assert_eq!(binder.bind(&TypeDescriptor::string(), &params, "missing"), Value::Null);
    assert_eq!(
        binder.bind(&TypeDescriptor::scalar(ScalarType::Char), &params, "missing"),
        Value::Char('\0')
    );
}

#[test]
fn test_malformed_scalars_fall_back_to_zero() {
    let binder = Binder::new();
    let params = space(&[("n", "12x"), ("d", "NaN-ish"), ("flag", "yes")]);

    assert_eq!(binder.bind(&TypeDescriptor::scalar(ScalarType::Long), &params, "n"), Value::Long(0));
    assert_eq!(
        binder.bind(&TypeDescriptor::scalar(ScalarType::Double), &params, "d"),
        Value::Double(0.0)
    );
    assert_eq!(binder.bind(&TypeDescriptor::scalar(ScalarType::Bool), &params, "flag"), Value::Bool(false));
}

#[test]
fn test_enum_matching() {
    let binder = Binder::new();
    let ty = TypeDescriptor::enumeration("Mode", ["FAST", "Fast", "Slow"]);

    let exact = binder.bind(&ty, &space(&[("m", "Fast")]), "m");
    assert_eq!(exact, Value::Enum("Fast".into()));

    let folded = binder.bind(&ty, &space(&[("m", "slow")]), "m");
    assert_eq!(folded, Value::Enum("Slow".into()));

    let unmatched = binder.bind(&ty, &space(&[("m", "warp")]), "m");
    assert_eq!(unmatched, Value::Null);

    let status = Status::from_value(binder.bind(&Status::descriptor(), &space(&[("s", "retired")]), "s"));
    assert_eq!(status, Some(Status::Retired));
}

#[test]
fn test_composite_with_bad_number() {
    let params = space(&[("emp.name", "Bob"), ("emp.age", "abc")]);
    let value = Binder::new().bind(&Emp::descriptor(), &params, "emp");

    assert_eq!(value.get("name"), Some(&Value::Str("Bob".into())));
    assert_eq!(value.get("age"), Some(&Value::Int(0)));
    assert_eq!(
        Emp::from_value(value),
        Some(Emp {
            name: Some("Bob".into()),
            age: 0
        })
    );
}

#[test]
fn test_composite_without_prefix_uses_bare_names() {
    let params = space(&[("name", "Eve"), ("age", "31")]);
    let emp = Emp::from_value(Binder::new().bind(&Emp::descriptor(), &params, "")).unwrap();
    assert_eq!(emp.name.as_deref(), Some("Eve"));
    assert_eq!(emp.age, 31);
}

#[test]
fn test_array_of_composites() {
    let params = space(&[
        ("lines[0].sku", "A-1"),
        ("lines[0].qty", "2"),
        ("lines[2].sku", "C-3"),
    ]);
    let lines: Vec<Line> =
        Vec::from_value(Binder::new().bind(&Vec::<Line>::descriptor(), &params, "lines")).unwrap();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], Line { sku: Some("A-1".into()), qty: 2 });
    assert_eq!(lines[1], Line { sku: None, qty: 0 });
    assert_eq!(lines[2].sku.as_deref(), Some("C-3"));
}

#[test]
fn test_abstract_composite_binds_null() {
    let ty = TypeDescriptor::abstract_composite("Shape").field("sides", TypeDescriptor::scalar(ScalarType::Int));
    let value = Binder::new().bind(&ty, &space(&[("shape.sides", "3")]), "shape");
    assert_eq!(value, Value::Null);
}

#[test]
fn test_nested_null_composite_leaves_field_null() {
    let ty = TypeDescriptor::composite("Order")
        .field("id", TypeDescriptor::scalar(ScalarType::Long))
        .field("shape", TypeDescriptor::abstract_composite("Shape"));
    let value = Binder::new().bind(&ty, &space(&[("order.id", "5")]), "order");

    assert_eq!(value.get("id"), Some(&Value::Long(5)));
    assert_eq!(value.get("shape"), Some(&Value::Null));
}

#[test]
fn test_date_formats_in_order() {
    let binder = Binder::new();
    let ty = TypeDescriptor::temporal(TemporalType::Date);
    let date = |raw: &str| binder.bind(&ty, &space(&[("d", raw)]), "d");

    let march_fifth = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    assert_eq!(date("2024-03-05"), march_fifth);
    assert_eq!(date("05/03/2024"), march_fifth);
    assert_eq!(date("2024/03/05"), march_fifth);
    // not a valid dd/MM/yyyy date, so MM/dd/yyyy applies
    assert_eq!(date("12/31/2024"), Value::Date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
    assert_eq!(date("tomorrow"), Value::Null);
}

#[test]
fn test_big_numbers() {
    let binder = Binder::new();
    let params = space(&[
        ("price", "12.50"),
        ("huge", "170141183460469231731687303715884105727"),
        ("bad", "1.2.3"),
        ("wider", "1234567890123456789012345678901234567890"),
    ]);

    assert_eq!(
        binder.bind(&Decimal::descriptor(), &params, "price"),
        Value::Decimal(Decimal::from_str("12.50").unwrap())
    );
    assert_eq!(binder.bind(&i128::descriptor(), &params, "huge"), Value::BigInteger(i128::MAX));
    assert_eq!(binder.bind(&Decimal::descriptor(), &params, "bad"), Value::Null);
    assert_eq!(binder.bind(&i128::descriptor(), &params, "wider"), Value::Null);
}

#[test]
fn test_custom_converter() {
    let mut conversions = ConversionTable::new();
    conversions.register(ScalarType::Custom("Cents".into()), |raw| {
        let (whole, cents) = raw
            .split_once('.')
            .ok_or_else(|| ConversionError::invalid(raw, "Cents", "expected d.cc"))?;
        let whole: i64 = whole.parse().map_err(|e| ConversionError::invalid(raw, "Cents", e))?;
        let cents: i64 = cents.parse().map_err(|e| ConversionError::invalid(raw, "Cents", e))?;
        Ok(Value::Long(whole * 100 + cents))
    });
    let binder = Binder::new().with_conversions(conversions);
    let ty = TypeDescriptor::custom("Cents");

    assert_eq!(binder.bind(&ty, &space(&[("p", "3.25")]), "p"), Value::Long(325));
    assert_eq!(binder.bind(&ty, &space(&[("p", "oops")]), "p"), Value::Null);
    assert_eq!(binder.bind(&ty, &space(&[]), "p"), Value::Null);
}

#[test]
fn test_unregistered_custom_type_is_null() {
    let value = Binder::new().bind(&TypeDescriptor::custom("Money"), &space(&[("m", "5")]), "m");
    assert_eq!(value, Value::Null);
}

#[test]
fn test_bound_value_serializes_to_json() {
    let params = space(&[("emp.name", "Bob"), ("emp.age", "40")]);
    let value = Binder::new().bind(&Emp::descriptor(), &params, "emp");
    assert_eq!(value.to_json(), serde_json::json!({"name": "Bob", "age": 40}));
}
