#![allow(non_snake_case)]

use super::*;
use serde_json::json;
use test_case::test_case;

fn props(value: serde_json::Value) -> Properties {
    serde_json::from_value(value).unwrap()
}

fn greeter() -> Properties {
    props(json!({
        "objectClass": ["org.example.Greeter", "org.example.Named"],
        "service.id": 7,
        "service.ranking": 10,
        "lang": "en-GB",
        "display name": "Hello World",
        "enabled": true
    }))
}

// Parsing

#[test]
fn Filter___parse_equality___returns_equal() {
    let filter = Filter::parse("(lang=en)").unwrap();

    assert_eq!(
        filter,
        Filter::Equal {
            key: "lang".into(),
            value: "en".into()
        }
    );
}

#[test]
fn Filter___parse_nested___builds_tree() {
    let filter = Filter::parse("(&(a=1)(|(b=2)(!(c=*))))").unwrap();

    let Filter::And(parts) = filter else {
        panic!("expected conjunction");
    };
    assert_eq!(parts.len(), 2);
    assert!(matches!(&parts[1], Filter::Or(inner) if inner.len() == 2));
}

#[test]
fn Filter___parse_wildcard___returns_substring() {
    let filter = Filter::parse("(lang=en*)").unwrap();

    assert_eq!(
        filter,
        Filter::Substring {
            key: "lang".into(),
            parts: vec!["en".into(), "".into()]
        }
    );
}

#[test]
fn Filter___parse_escaped_star___keeps_literal() {
    let filter = Filter::parse(r"(name=a\*b)").unwrap();

    assert_eq!(
        filter,
        Filter::Equal {
            key: "name".into(),
            value: "a*b".into()
        }
    );
}

#[test_case("" ; "empty")]
#[test_case("lang=en" ; "missing parens")]
#[test_case("(lang=en" ; "unterminated")]
#[test_case("(=en)" ; "missing attribute")]
#[test_case("(&)" ; "empty conjunction")]
#[test_case("(lang=en))" ; "trailing characters")]
#[test_case("(lang>en)" ; "incomplete operator")]
#[test_case("(n>=1*)" ; "wildcard in ordering")]
fn Filter___parse_invalid___returns_invalid_filter(input: &str) {
    let result = Filter::parse(input);

    assert!(matches!(result, Err(DmError::InvalidFilter(_))));
}

#[test]
fn Filter___display___round_trips_through_parse() {
    let text = "(&(objectClass=org.example.Greeter)(|(lang=en*)(!(x=*)))(n>=3))";

    let filter = Filter::parse(text).unwrap();

    assert_eq!(filter.to_string(), text);
}

// Matching

#[test_case("(objectClass=org.example.Named)", true ; "array element")]
#[test_case("(objectClass=org.example.Other)", false ; "array miss")]
#[test_case("(LANG=en-GB)", true ; "key case insensitive")]
#[test_case("(lang=en*)", true ; "prefix wildcard")]
#[test_case("(lang=*GB)", true ; "suffix wildcard")]
#[test_case("(lang=*-*)", true ; "middle wildcard")]
#[test_case("(lang=fr*)", false ; "wildcard miss")]
#[test_case("(display name~=helloworld)", true ; "approx ignores case and space")]
#[test_case("(service.ranking>=10)", true ; "numeric greater equal")]
#[test_case("(service.ranking<=9)", false ; "numeric less equal miss")]
#[test_case("(service.id=7)", true ; "numeric equal")]
#[test_case("(enabled=TRUE)", true ; "bool equal")]
#[test_case("(missing=*)", false ; "absent key")]
#[test_case("(lang=*)", true ; "presence")]
#[test_case("(!(lang=de))", true ; "negation")]
#[test_case("(&(lang=en-GB)(enabled=false))", false ; "conjunction miss")]
#[test_case("(|(lang=de)(enabled=true))", true ; "disjunction hit")]
fn Filter___matches___evaluates_against_properties(filter: &str, expected: bool) {
    let filter = Filter::parse(filter).unwrap();

    assert_eq!(filter.matches(&greeter()), expected);
}

#[test]
fn Filter___interface_and_filter___flattens_conjunction() {
    let extra = Filter::parse("(&(a=1)(b=2))").unwrap();

    let combined = Filter::interface("org.example.Greeter").and(extra);

    let Filter::And(parts) = combined else {
        panic!("expected conjunction");
    };
    assert_eq!(parts.len(), 3);
}

#[test]
fn Filter___numeric_compare_with_text_value___does_not_match() {
    let filter = Filter::parse("(service.ranking>=high)").unwrap();

    assert!(!filter.matches(&greeter()));
}
