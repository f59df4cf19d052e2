//! `$compute` fixtures, including custom functions in the expressions.

mod common;

use common::ensure_custom_function;
use odata_parser::{parse_compute, CustomFunction, ODataError};

#[test]
fn compute_items() {
    ensure_custom_function("zeroArgFunc", &[0]);
    ensure_custom_function("oneArgFunc", &[1]);
    ensure_custom_function("twoArgFunc", &[2]);

    let passing: &[&[&str]] = &[
        &["oldField as newField"],
        &["1 as newField"],
        &["one add 2 as newField"],
        &["one add two as extra/newField"],
        &["zeroArgFunc() as newField"],
        &["oneArgFunc(one) as newField"],
        &["twoArgFunc(one, two) as newField"],
        &[
            "twoArgFunc(one, two) as newField",
            "tolower(three) as  newFieldTwo",
        ],
    ];
    for items in passing {
        let value = items.join(",");
        let result = parse_compute(&value)
            .unwrap_or_else(|e| panic!("expected '{value}' to parse: {e}"));
        assert_eq!(result.len(), items.len(), "item count for '{value}'");
    }

    let failing: &[&[&str]] = &[
        &["one add two as newField2"],
        &["one add two newField2"],
        &[""],
        &["as"],
        &["as newField"],
        &["zeroArgFunc() as "],
    ];
    for items in failing {
        let value = items.join(",");
        assert!(
            parse_compute(&value).is_err(),
            "expected '{value}' to be rejected"
        );
    }
}

#[test]
fn custom_function_arity_applies_in_compute() {
    ensure_custom_function("threeArgFunc", &[3]);
    assert!(parse_compute("threeArgFunc(a, b, c) as newField").is_ok());
    assert!(matches!(
        parse_compute("threeArgFunc(a, b) as newField"),
        Err(ODataError::InvalidCompute(_))
    ));
}

#[test]
fn custom_function_registration_is_validated() {
    ensure_custom_function("registeredOnce", &[1]);
    // A second registration of the same name conflicts.
    assert!(matches!(
        odata_parser::define_custom_functions(&[CustomFunction {
            name: "registeredOnce".to_string(),
            arities: vec![1],
        }]),
        Err(ODataError::CustomFunctionConflict(_))
    ));
    // Built-in names are taken.
    assert!(matches!(
        odata_parser::define_custom_functions(&[CustomFunction {
            name: "contains".to_string(),
            arities: vec![2],
        }]),
        Err(ODataError::CustomFunctionConflict(_))
    ));
    // An empty arity list is rejected.
    assert!(odata_parser::define_custom_functions(&[CustomFunction {
        name: "noArities".to_string(),
        arities: vec![],
    }])
    .is_err());
}
