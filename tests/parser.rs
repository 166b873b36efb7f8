use serde_json::json;
use simple_logger::SimpleLogger;
use test_case::test_case;

use css3_syntax::{
    canonicalize, parse_a_component_value, parse_a_declaration, parse_a_list_of_declarations,
    parse_a_list_of_rules, parse_a_rule, parse_a_stylesheet, tokenize, ComponentValue,
    DeclarationListItem, Error, Rule, ToSource, Token,
};

fn block_declarations(rule: &Rule) -> Vec<DeclarationListItem> {
    let Rule::QualifiedRule(qualified) = rule else {
        panic!("expected a qualified rule");
    };

    let mut tokens = Vec::new();
    fn flatten(values: &[ComponentValue], tokens: &mut Vec<Token>) {
        for value in values {
            match value {
                ComponentValue::PreservedToken(token) => tokens.push(token.clone()),
                ComponentValue::SimpleBlock(block) => {
                    tokens.push(block.opener.clone());
                    flatten(&block.value, tokens);
                    tokens.push(block.mirror());
                }
                ComponentValue::Function(function) => {
                    tokens.push(Token::Function(function.name.clone()));
                    flatten(&function.value, tokens);
                    tokens.push(Token::RParen);
                }
            }
        }
    }
    flatten(&qualified.block.value, &mut tokens);

    parse_a_list_of_declarations(tokens)
}

#[test]
fn stylesheet_with_one_qualified_rule() {
    let _ = SimpleLogger::new().init();

    let stylesheet = parse_a_stylesheet("div { color: lime; }");
    assert_eq!(stylesheet.rules.len(), 1);

    let json = stylesheet.to_json();
    assert_eq!(json["type"], "STYLESHEET");
    assert_eq!(
        json["value"][0]["prelude"],
        json!([
            {"token": "IDENT", "value": "div"},
            {"token": "WHITESPACE"},
        ])
    );

    let declarations = block_declarations(&stylesheet.rules[0]);
    assert_eq!(
        declarations[0].to_json(),
        json!({
            "type": "DECLARATION",
            "name": "color",
            "value": [
                {"token": "WHITESPACE"},
                {"token": "IDENT", "value": "lime"},
            ],
            "important": false,
        })
    );
}

#[test]
fn at_rule_without_block() {
    let stylesheet = parse_a_stylesheet("@import \"a.css\";");

    assert_eq!(
        stylesheet.to_json(),
        json!({
            "type": "STYLESHEET",
            "value": [{
                "type": "AT-RULE",
                "name": "import",
                "prelude": [
                    {"token": "WHITESPACE"},
                    {"token": "STRING", "value": "a.css"},
                ],
                "value": null,
            }],
        })
    );
}

#[test]
fn important_declaration() {
    let stylesheet = parse_a_stylesheet("a{width:10px !important}");
    let declarations = block_declarations(&stylesheet.rules[0]);

    assert_eq!(
        declarations,
        vec![DeclarationListItem::Declaration(
            parse_a_declaration("width:10px !important").unwrap()
        )]
    );
    assert_eq!(
        declarations[0].to_json(),
        json!({
            "type": "DECLARATION",
            "name": "width",
            "value": [
                {"token": "DIMENSION", "value": 10, "type": "integer", "repr": "10", "unit": "px"},
            ],
            "important": true,
        })
    );
}

#[test]
fn percentage_declaration() {
    let declaration = parse_a_declaration("b:1.5e2%").unwrap();
    assert_eq!(
        declaration.to_json(),
        json!({
            "type": "DECLARATION",
            "name": "b",
            "value": [
                {"token": "PERCENTAGE", "value": 150, "repr": "1.5e2"},
            ],
            "important": false,
        })
    );
}

#[test]
fn custom_property_declaration() {
    let declaration = parse_a_declaration("--b:1").unwrap();
    assert_eq!(declaration.name, "--b");
    assert_eq!(
        declaration.value,
        vec![ComponentValue::PreservedToken(Token::Number {
            value: 1.0,
            kind: css3_syntax::NumberKind::Integer,
            repr: "1".to_string(),
        })]
    );
}

#[test]
fn restricted_entry_points_reject_trailing_content() {
    assert!(parse_a_rule("a{} b{}").is_err());
    assert!(parse_a_rule(" a{} ").is_ok());
    assert_eq!(parse_a_rule(""), Err(Error::UnexpectedEof));

    assert!(parse_a_component_value(" [x] ").is_ok());
    assert!(parse_a_component_value("[x] y").is_err());
    assert_eq!(parse_a_component_value("  "), Err(Error::UnexpectedEof));

    assert!(parse_a_declaration("12px: x").is_err());
}

#[test]
fn list_of_rules_accepts_prebuilt_tokens() {
    let tokens = tokenize("a{}@x;");
    let rules = parse_a_list_of_rules(tokens);

    assert_eq!(rules.len(), 2);
    assert!(matches!(rules[0], Rule::QualifiedRule(_)));
    assert!(matches!(rules[1], Rule::AtRule(_)));
}

// parse(serialize(parse(s))) must equal parse(s), and serialization must be
// idempotent from the second pass on
#[test_case("div { color: lime; }"; "simple rule")]
#[test_case("@import \"a.css\";"; "blockless at rule")]
#[test_case("@media screen and (max-width: 600px) { a { color: #00f } }"; "nested at rule")]
#[test_case("a{width:10px !important}"; "important")]
#[test_case("a{b:1.5e2%}"; "percentage")]
#[test_case("a { background: url( foo.png ) no-repeat }"; "url value")]
#[test_case("a[href^=\"https\"] ~ b { x: calc( (1 + 2) * var(--y) ) }"; "match tokens and functions")]
#[test_case("a { font-family: \"Times New Roman\", serif }"; "quoted strings")]
#[test_case("#id.class { margin: 0 auto; padding: .5em 1.5E2px }"; "hashes and numbers")]
#[test_case("@font-face { font-family: x; src: url(\"y.woff\") } p { q: r }"; "multiple rules")]
#[test_case("a { --indirection: var(--x, 1denced) }"; "custom properties")]
fn round_trip(input: &str) {
    let first = parse_a_stylesheet(input);
    let source = first.to_source().unwrap();

    let second = parse_a_stylesheet(source.as_str());
    assert_eq!(second, first, "re-parsing {source:?}");

    let again = second.to_source().unwrap();
    assert_eq!(again, source, "serialization is not idempotent");
}

#[test]
fn canonical_records_for_the_default_grammar() {
    let stylesheet = parse_a_stylesheet(
        "@import \"a.css\"; @media print { b { x: 1 } } c { y: 2 } @bogus { }",
    );
    let canonical = canonicalize(&stylesheet, None, None);

    assert_eq!(canonical["type"], "stylesheet");
    assert_eq!(canonical["rules"].as_array().unwrap().len(), 3);
    assert_eq!(canonical["rules"][0]["name"], "import");
    assert_eq!(canonical["rules"][1]["name"], "media");
    assert_eq!(canonical["rules"][1]["rules"][0]["type"], "qualified-rule");
    assert_eq!(canonical["rules"][2]["type"], "qualified-rule");
    assert!(canonical["rules"][2]["declarations"]["y"].is_object());

    let errors = canonical["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["error"], "unrecognized rule @bogus");
}

#[test]
fn bad_string_reconsumes_the_newline() {
    let tokens = tokenize("'line\nrest");
    assert_eq!(tokens[0], Token::BadString);
    assert_eq!(tokens[1], Token::Whitespace);
}

#[test]
fn url_tokens_survive_the_round_trip() {
    let value = parse_a_component_value("url( a\\ b.png )").unwrap();
    let ComponentValue::PreservedToken(Token::Url(url)) = &value else {
        panic!("expected a url token");
    };
    assert_eq!(url, "a b.png");

    let source = value.to_source().unwrap();
    let reparsed = parse_a_component_value(source.as_str()).unwrap();
    assert_eq!(reparsed, value);
}
