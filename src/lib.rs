//! Tokenizer and parser for the [CSS Syntax Module Level 3](https://www.w3.org/TR/css-syntax-3/).
//!
//! The pipeline runs source text through input preprocessing into a code
//! point stream, tokenizes it with three code points of lookahead, and parses
//! the token stream into stylesheets, rules, declarations, blocks and
//! functions. Trees serialize back to source through [`ToSource`] and can be
//! cross-checked against a declarative at-rule grammar with
//! [`canonicalize()`].
//!
//! The free functions below follow the entry points the specification
//! defines. Each accepts source text, a token vector, or a pre-built
//! [`TokenStream`]:
//!
//! ```
//! use css3_syntax::parse_a_stylesheet;
//!
//! let stylesheet = parse_a_stylesheet("div { color: lime; }");
//! assert_eq!(stylesheet.rules.len(), 1);
//! ```

pub mod byte_stream;
pub mod canonicalize;
pub mod error_logger;
pub mod errors;
pub mod location;
pub mod parser;
pub mod serialize;
pub mod tokenizer;
pub mod tokens;

use std::cell::RefCell;
use std::rc::Rc;

use crate::byte_stream::ByteStream;
use crate::error_logger::ErrorLogger;
use crate::tokenizer::Tokenizer;

pub use crate::canonicalize::{Grammar, QualifiedGrammar, DEFAULT_GRAMMAR};
pub use crate::errors::Error;
pub use crate::parser::{
    AtRule, ComponentValue, Declaration, DeclarationListItem, Function, Parser, QualifiedRule,
    Rule, SimpleBlock, Stylesheet, TokenStream,
};
pub use crate::serialize::{escape_hash, escape_ident, escape_string, ToSource};
pub use crate::tokens::{HashKind, NumberKind, Token};

/// Tokenizes source text into a token vector. The terminating EOF token is
/// implicit: a [`TokenStream`] built from the result conjures it up when read
/// past the end.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut stream = ByteStream::new();
    stream.read_from_str(input);

    let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
    Tokenizer::new(&mut stream, error_logger).tokenize()
}

/// parse-a-stylesheet
pub fn parse_a_stylesheet(input: impl Into<TokenStream>) -> Stylesheet {
    Parser::new(input).parse_stylesheet()
}

/// parse-a-list-of-rules
pub fn parse_a_list_of_rules(input: impl Into<TokenStream>) -> Vec<Rule> {
    Parser::new(input).parse_list_of_rules()
}

/// parse-a-rule. Fails when the input is not exactly one rule surrounded by
/// whitespace.
pub fn parse_a_rule(input: impl Into<TokenStream>) -> Result<Rule, Error> {
    Parser::new(input).parse_rule()
}

/// parse-a-declaration. Fails when the input is not ident-prefixed or lacks
/// a colon.
pub fn parse_a_declaration(input: impl Into<TokenStream>) -> Result<Declaration, Error> {
    Parser::new(input).parse_declaration()
}

/// parse-a-list-of-declarations. At-rules mixed into the list are returned
/// alongside the declarations.
pub fn parse_a_list_of_declarations(input: impl Into<TokenStream>) -> Vec<DeclarationListItem> {
    Parser::new(input).parse_list_of_declarations()
}

/// parse-a-component-value. Fails on empty input and trailing content.
pub fn parse_a_component_value(input: impl Into<TokenStream>) -> Result<ComponentValue, Error> {
    Parser::new(input).parse_component_value()
}

/// parse-a-list-of-component-values
pub fn parse_a_list_of_component_values(input: impl Into<TokenStream>) -> Vec<ComponentValue> {
    Parser::new(input).parse_list_of_component_values()
}

/// parse-a-comma-separated-list-of-component-values
pub fn parse_a_comma_separated_list_of_component_values(
    input: impl Into<TokenStream>,
) -> Vec<Vec<ComponentValue>> {
    Parser::new(input).parse_comma_separated_list_of_component_values()
}

pub use crate::canonicalize::{canonicalize, canonicalize_rule};
