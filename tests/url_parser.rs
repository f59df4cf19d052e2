//! Request-level fixtures: query splitting, percent decoding, string
//! unescaping, compliance modes.

mod common;

use common::{assert_tree_shape, ensure_custom_function, ExpectedNode};
use odata_parser::TokenKind as K;
use odata_parser::{
    parse_request, parse_request_with, ComplianceConfig, ODataError, OrderByDirection, Request,
};

fn parse(path: &str, query: &str) -> Result<Request, ODataError> {
    parse_request(path, query)
}

#[test]
fn path_segments_and_encoded_expand() {
    // $expand=DirectReports($select=FirstName,LastName;$levels=4), with
    // the nested punctuation percent-encoded.
    let request = parse(
        "Employees(1)/Sales.Manager",
        "$expand=DirectReports%28$select%3DFirstName%2CLastName%3B$levels%3D4%29",
    )
    .unwrap();

    let first = request.first_segment.as_ref().unwrap();
    assert_eq!(first.name, "Employees");
    assert_eq!(first.identifier.as_ref().unwrap().as_value(), Some("1"));
    let next = first.next.as_ref().unwrap();
    assert_eq!(next.name, "Sales.Manager");

    let expand = request.query.expand.as_ref().unwrap();
    assert_eq!(expand[0].path[0].value, "DirectReports");
    let select = expand[0].select.as_ref().unwrap();
    assert_eq!(select[0].segments[0].value, "FirstName");
    assert_eq!(select[1].segments[0].value, "LastName");
    assert_eq!(expand[0].levels, Some(4));
}

#[test]
fn strict_validation() {
    assert!(parse("Employees(1)/Sales.Manager", "$filter=FirstName eq 'Bob'").is_ok());

    // Extraneous single quote.
    assert!(parse("Employees(1)/Sales.Manager", "$filter=FirstName eq' 'Bob'").is_err());

    // A custom option alongside a system one is fine, even in strict mode.
    assert!(parse(
        "Employees(1)/Sales.Manager",
        "$filter=FirstName eq 'Bob'&at=Version eq '123'"
    )
    .is_ok());

    // The broken filter still fails when a valid custom option follows.
    assert!(parse(
        "Employees(1)/Sales.Manager",
        "$filter=FirstName eq' 'Bob'&at=Version eq '123'"
    )
    .is_err());

    assert!(parse("Employees(1)/Sales.Manager", "$select=3DFirstName").is_ok());

    assert!(parse(
        "Employees(1)/Sales.Manager",
        "$filter=Name in ('Bob','Alice')&$select=Name,Address%3B$expand=Address($select=City)"
    )
    .is_ok());

    // A query option cannot be wrapped in parentheses.
    assert!(parse(
        "Employees(1)/Sales.Manager",
        "$filter=Name in ('Bob','Alice')&($select=Name,Address%3B$expand=Address($select=City))"
    )
    .is_err());

    assert!(parse("Employees(1)/Sales.Manager", "$select=LastName&$expand=Address").is_ok());
    assert!(
        parse(
            "Employees(1)/Sales.Manager",
            "$select=FirstName,LastName&$expand=Address"
        )
        .is_ok()
    );
}

#[test]
fn duplicate_options() {
    let query = "$select=3DFirstName&$select=3DFirstName";
    // Lenient mode takes the first occurrence.
    assert!(
        parse_request_with("Employees(1)/Sales.Manager", query, ComplianceConfig::IGNORE_ALL)
            .is_ok()
    );
    // Strict mode rejects the duplicate.
    assert!(matches!(
        parse("Employees(1)/Sales.Manager", query),
        Err(ODataError::DuplicateOption(_))
    ));
}

#[test]
fn keywords_without_prefix() {
    let query = "orderby=FirstName";
    assert!(
        parse_request_with("Employees(1)/Sales.Manager", query, ComplianceConfig::IGNORE_ALL)
            .is_ok()
    );
    assert!(matches!(
        parse("Employees(1)/Sales.Manager", query),
        Err(ODataError::UnsupportedOption(_))
    ));
}

struct UnescapeCase {
    query: &'static str,
    // Substring the error must carry; None for success.
    error: Option<&'static str>,
    filter_tree: Option<&'static [ExpectedNode]>,
    order_by: &'static [(&'static str, OrderByDirection)],
    compute_fields: &'static [&'static str],
}

impl UnescapeCase {
    fn passing(query: &'static str, filter_tree: &'static [ExpectedNode]) -> Self {
        UnescapeCase {
            query,
            error: None,
            filter_tree: Some(filter_tree),
            order_by: &[],
            compute_fields: &[],
        }
    }
}

#[test]
fn unescape_string_tokens() {
    ensure_custom_function("discount", &[1]);
    let abc_filter: &[ExpectedNode] = &[
        ("eq", 0, K::Logical),
        ("Description", 1, K::Literal),
        ("'abc'", 1, K::String),
    ];
    let cases: &[UnescapeCase] = &[
        // Unescaped single quotes: 'ab'c' has two consecutive literal
        // values and an unterminated 'c.
        UnescapeCase {
            query: "$filter=Description eq 'ab'c'",
            error: Some("Token ''' is invalid"),
            filter_tree: None,
            order_by: &[],
            compute_fields: &[],
        },
        UnescapeCase::passing("$filter=Description eq 'abc'", abc_filter),
        // Two consecutive single quotes encode one quote.
        UnescapeCase::passing(
            "$filter=Description eq 'ab''c'",
            &[
                ("eq", 0, K::Logical),
                ("Description", 1, K::Literal),
                ("'ab'c'", 1, K::String),
            ],
        ),
        // %27 decodes to a single quote before tokenization.
        UnescapeCase::passing(
            "$filter=Description eq 'O%27%27Neil'",
            &[
                ("eq", 0, K::Logical),
                ("Description", 1, K::Literal),
                ("'O'Neil'", 1, K::String),
            ],
        ),
        // All quotes percent-encoded, outer ones included.
        UnescapeCase::passing(
            "$filter=Description eq %27O%27%27Neil%27",
            &[
                ("eq", 0, K::Logical),
                ("Description", 1, K::Literal),
                ("'O'Neil'", 1, K::String),
            ],
        ),
        // Non-ASCII string content parses anyway.
        UnescapeCase::passing(
            "$filter=Description eq '♺⛺⛵⚡'",
            &[
                ("eq", 0, K::Logical),
                ("Description", 1, K::Literal),
                ("'♺⛺⛵⚡'", 1, K::String),
            ],
        ),
        // Percent-encoded string body.
        UnescapeCase::passing(
            "$filter=Description eq '%34%35%36'",
            &[
                ("eq", 0, K::Logical),
                ("Description", 1, K::Literal),
                ("'456'", 1, K::String),
            ],
        ),
        UnescapeCase {
            query: "$filter=Description eq 'abc'&$orderby=Title",
            error: None,
            filter_tree: Some(abc_filter),
            order_by: &[("Title", OrderByDirection::Ascending)],
            compute_fields: &[],
        },
        UnescapeCase {
            query: "$filter=Description eq 'abc'&$orderby=Author asc,Title desc",
            error: None,
            filter_tree: Some(abc_filter),
            order_by: &[
                ("Author", OrderByDirection::Ascending),
                ("Title", OrderByDirection::Descending),
            ],
            compute_fields: &[],
        },
        UnescapeCase {
            query: "$orderby=ProductDesc",
            error: None,
            filter_tree: None,
            order_by: &[("ProductDesc", OrderByDirection::Ascending)],
            compute_fields: &[],
        },
        UnescapeCase {
            query: "$filter=Description eq 'abc'&$orderby=part_x0020_number asc",
            error: None,
            filter_tree: Some(abc_filter),
            order_by: &[("part number", OrderByDirection::Ascending)],
            compute_fields: &[],
        },
        UnescapeCase {
            query: "$orderby=Tags(Key='Environment')/Value desc",
            error: None,
            filter_tree: None,
            order_by: &[("Tags(Key='Environment')/Value", OrderByDirection::Descending)],
            compute_fields: &[],
        },
        // %2B decodes to '+', which is not a valid field prefix.
        UnescapeCase {
            query: "$orderby=%2BName",
            error: Some("Token '+Name' is invalid"),
            filter_tree: None,
            order_by: &[],
            compute_fields: &[],
        },
        UnescapeCase {
            query: "$orderby=-Name",
            error: Some("Token '-Name' is invalid"),
            filter_tree: None,
            order_by: &[],
            compute_fields: &[],
        },
        UnescapeCase {
            query: "$compute=Price mul Quantity as TotalPrice",
            error: None,
            filter_tree: None,
            order_by: &[],
            compute_fields: &["TotalPrice"],
        },
        UnescapeCase {
            query: "$compute=Price mul Quantity as TotalPrice,A add B as C",
            error: None,
            filter_tree: None,
            order_by: &[],
            compute_fields: &["TotalPrice", "C"],
        },
        UnescapeCase {
            query: "$expand=Details($compute=Price mul Quantity as TotalPrice)",
            error: None,
            filter_tree: None,
            order_by: &[],
            compute_fields: &[],
        },
        UnescapeCase {
            query: "$compute=discount(Item/Price) as SalePrice",
            error: None,
            filter_tree: None,
            order_by: &[],
            compute_fields: &["SalePrice"],
        },
        UnescapeCase {
            query: "$compute=Price mul Quantity",
            error: Some("Invalid $compute query option"),
            filter_tree: None,
            order_by: &[],
            compute_fields: &[],
        },
        UnescapeCase {
            query: "$compute=Price bad Quantity as TotalPrice",
            error: Some("Invalid $compute query option"),
            filter_tree: None,
            order_by: &[],
            compute_fields: &[],
        },
        UnescapeCase {
            query: "$compute=Price mul Quantity as as TotalPrice",
            error: Some("Invalid $compute query option"),
            filter_tree: None,
            order_by: &[],
            compute_fields: &[],
        },
        UnescapeCase {
            query: "$compute=Price mul Quantity as TotalPrice as TotalPrice2",
            error: Some("Invalid $compute query option"),
            filter_tree: None,
            order_by: &[],
            compute_fields: &[],
        },
        UnescapeCase {
            query: "$compute=TotalPrice as Price mul Quantity",
            error: Some("Invalid $compute query option"),
            filter_tree: None,
            order_by: &[],
            compute_fields: &[],
        },
    ];

    for case in cases {
        let result = parse("/Books", case.query);
        match (&result, case.error) {
            (Err(e), Some(expected)) => {
                let message = e.to_string();
                assert!(
                    message.contains(expected),
                    "query '{}': error '{message}' does not contain '{expected}'",
                    case.query
                );
                continue;
            }
            (Err(e), None) => panic!("query '{}' failed: {e}", case.query),
            (Ok(_), Some(_)) => panic!("query '{}' should have failed", case.query),
            (Ok(_), None) => {}
        }
        let request = result.unwrap();
        if let Some(expected) = case.filter_tree {
            let filter = request.query.filter.as_ref().expect("missing filter");
            assert_tree_shape(case.query, filter, expected);
        }
        if !case.order_by.is_empty() {
            let order_by = request.query.order_by.as_ref().expect("missing orderby");
            let actual: Vec<(&str, OrderByDirection)> = order_by
                .iter()
                .map(|item| (item.field.value.as_str(), item.direction))
                .collect();
            assert_eq!(actual, case.order_by, "orderby mismatch for '{}'", case.query);
        }
        if !case.compute_fields.is_empty() {
            let compute = request.query.compute.as_ref().expect("missing compute");
            let actual: Vec<&str> = compute.iter().map(|item| item.field.as_str()).collect();
            assert_eq!(
                actual, case.compute_fields,
                "compute mismatch for '{}'",
                case.query
            );
        }
    }
}

#[test]
fn serializes_parsed_queries() {
    let request = parse("/Books", "$filter=Title eq 'Dune'&$top=5").unwrap();
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["query"]["top"], 5);
    assert_eq!(json["query"]["filter"]["token"]["value"], "eq");
}
