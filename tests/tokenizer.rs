use serde_json::json;
use test_case::test_case;

use css3_syntax::{escape_ident, tokenize, HashKind, NumberKind, Token};

#[test]
fn simple_stylesheet_tokens() {
    let tokens = tokenize("div { color: lime; }");

    assert_eq!(
        tokens,
        vec![
            Token::Ident("div".to_string()),
            Token::Whitespace,
            Token::LCurly,
            Token::Whitespace,
            Token::Ident("color".to_string()),
            Token::Colon,
            Token::Whitespace,
            Token::Ident("lime".to_string()),
            Token::Semicolon,
            Token::Whitespace,
            Token::RCurly,
        ]
    );
}

#[test_case("url( foo.png )", Token::Url("foo.png".to_string()); "unquoted url")]
#[test_case("#abc", Token::Hash { value: "abc".to_string(), kind: HashKind::Id }; "id hash")]
#[test_case("#0a", Token::Hash { value: "0a".to_string(), kind: HashKind::Unrestricted }; "unrestricted hash")]
#[test_case("'\\0a foo'", Token::QuotedString("\nfoo".to_string()); "hex escape consumes trailing space")]
#[test_case("1.5e2", Token::Number { value: 150.0, kind: NumberKind::Number, repr: "1.5e2".to_string() }; "scientific notation")]
#[test_case("--b", Token::Ident("--b".to_string()); "custom property name")]
fn single_token(input: &str, expected: Token) {
    assert_eq!(tokenize(input), vec![expected]);
}

#[test]
fn unterminated_comment_leaves_no_tokens() {
    assert!(tokenize("/* unterminated").is_empty());
}

// CR, CRLF and FF all fold into LF; no NUL survives preprocessing
#[test_case("a\r\nb"; "crlf")]
#[test_case("a\rb"; "bare cr")]
#[test_case("a\u{000C}b"; "form feed")]
fn preprocessing_normalizes_newlines(input: &str) {
    let tokens = tokenize(input);
    assert_eq!(
        tokens,
        vec![
            Token::Ident("a".to_string()),
            Token::Whitespace,
            Token::Ident("b".to_string()),
        ]
    );
}

#[test]
fn preprocessing_replaces_nul() {
    let tokens = tokenize("a\u{0000}b");
    assert_eq!(tokens, vec![Token::Ident("a\u{FFFD}b".to_string())]);
}

#[test]
fn whitespace_runs_collapse_to_one_token() {
    let tokens = tokenize("a \t \n\n\t b \n c");
    let whitespace = tokens
        .iter()
        .filter(|t| **t == Token::Whitespace)
        .count();
    assert_eq!(whitespace, 2);
    assert_eq!(tokens.len(), 5);
}

// tokenization does O(n) work; a large adversarial input must terminate
#[test]
fn bounded_work_on_large_inputs() {
    let input = "{}[]()@#\\!$^*".repeat(2000);
    let tokens = tokenize(&input);
    assert!(!tokens.is_empty());
}

#[test_case("simple"; "plain name")]
#[test_case("3col"; "leading digit")]
#[test_case("-5x"; "dash then digit")]
#[test_case("--x"; "double dash")]
#[test_case("a b"; "embedded space")]
#[test_case("a.b!c"; "punctuation")]
#[test_case("h\u{00E9}llo\u{1F47D}"; "non-ascii")]
#[test_case("\u{0001}ctl\u{007F}"; "control characters")]
fn escape_ident_round_trips_through_the_tokenizer(value: &str) {
    let escaped = escape_ident(value).unwrap();
    let tokens = tokenize(&escaped);
    assert_eq!(tokens, vec![Token::Ident(value.to_string())]);
}

#[test]
fn token_json_projection() {
    let tokens = tokenize("a{width:10px !important}");
    let json: Vec<_> = tokens.iter().map(Token::to_json).collect();

    assert_eq!(
        json,
        vec![
            json!({"token": "IDENT", "value": "a"}),
            json!({"token": "{"}),
            json!({"token": "IDENT", "value": "width"}),
            json!({"token": "COLON"}),
            json!({"token": "DIMENSION", "value": 10, "type": "integer", "repr": "10", "unit": "px"}),
            json!({"token": "WHITESPACE"}),
            json!({"token": "DELIM", "value": "!"}),
            json!({"token": "IDENT", "value": "important"}),
            json!({"token": "}"}),
        ]
    );
}

#[test]
fn number_and_unit_split() {
    // the unit is consumed by the numeric dispatch, never by consume-number
    assert_eq!(
        tokenize("10px"),
        vec![Token::Dimension {
            value: 10.0,
            kind: NumberKind::Integer,
            repr: "10".to_string(),
            unit: "px".to_string(),
        }]
    );

    // a dangling exponent is not part of the number; it starts an ident
    // sequence and becomes the unit
    assert_eq!(
        tokenize("10E-"),
        vec![Token::Dimension {
            value: 10.0,
            kind: NumberKind::Integer,
            repr: "10".to_string(),
            unit: "E-".to_string(),
        }]
    );
}
