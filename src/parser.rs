use std::cell::RefCell;
use std::rc::Rc;

use log::trace;
use serde_json::{json, Value};

use crate::byte_stream::ByteStream;
use crate::error_logger::{ErrorLogger, ParseError};
use crate::errors::Error;
use crate::tokenizer::Tokenizer;
use crate::tokens::Token;

// =================================================================================================
// TokenStream is a random-access view over a finite token vector. Reading past
// the end always yields a fresh EOF token, which is also how the parser sees
// the end of the input.

#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    index: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> TokenStream {
        TokenStream { tokens, index: 0 }
    }

    /// Peek the next token without consuming it
    pub fn next(&self) -> Token {
        self.lookahead(0)
    }

    /// Peek `n` tokens past the next one
    pub fn lookahead(&self, n: usize) -> Token {
        self.tokens.get(self.index + n).cloned().unwrap_or(Token::Eof)
    }

    /// Advance by one token and return it
    pub fn consume(&mut self) -> Token {
        let token = self.next();
        if self.index < self.tokens.len() {
            self.index += 1;
        }

        token
    }

    /// Push the last consumed token back so the next read yields it again
    pub fn reconsume(&mut self) {
        if self.index > 0 {
            self.index -= 1;
        }
    }
}

impl From<Vec<Token>> for TokenStream {
    fn from(tokens: Vec<Token>) -> Self {
        TokenStream::new(tokens)
    }
}

impl From<&str> for TokenStream {
    fn from(input: &str) -> Self {
        let mut stream = ByteStream::new();
        stream.read_from_str(input);

        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
        TokenStream::new(Tokenizer::new(&mut stream, error_logger).tokenize())
    }
}

impl From<&String> for TokenStream {
    fn from(input: &String) -> Self {
        TokenStream::from(input.as_str())
    }
}

// =================================================================================================
// Parse tree nodes. All of them are plain data, immutable once the parser has
// produced them.

#[derive(Debug, Clone, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    AtRule(AtRule),
    QualifiedRule(QualifiedRule),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    /// Name without the `@` marker
    pub name: String,
    pub prelude: Vec<ComponentValue>,
    pub block: Option<SimpleBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedRule {
    pub prelude: Vec<ComponentValue>,
    pub block: SimpleBlock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: Vec<ComponentValue>,
    pub important: bool,
}

/// The CSS grammar allows at-rules mixed in with a declaration list, so
/// consuming a list of declarations yields both shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationListItem {
    Declaration(Declaration),
    AtRule(AtRule),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleBlock {
    /// The `{`, `[` or `(` token that opened the block
    pub opener: Token,
    pub value: Vec<ComponentValue>,
}

impl SimpleBlock {
    fn new(opener: Token) -> SimpleBlock {
        SimpleBlock {
            opener,
            value: Vec::new(),
        }
    }

    /// The closing token matching the opener
    pub fn mirror(&self) -> Token {
        self.opener.mirror().unwrap_or(Token::Eof)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub value: Vec<ComponentValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentValue {
    PreservedToken(Token),
    Function(Function),
    SimpleBlock(SimpleBlock),
}

// =================================================================================================

/// CSS parser according to the [w3 specification](https://www.w3.org/TR/css-syntax-3/#parsing)
///
/// The parser owns a token stream and shares an error logger with whoever
/// tokenized the input; recoverable parse errors land there while parsing
/// continues.
pub struct Parser {
    stream: TokenStream,
    error_logger: Rc<RefCell<ErrorLogger>>,
}

impl Parser {
    /// Create a parser over an already-built token stream (or anything that
    /// converts into one, such as source text or a token vector)
    pub fn new(input: impl Into<TokenStream>) -> Parser {
        Parser {
            stream: input.into(),
            error_logger: Rc::new(RefCell::new(ErrorLogger::new())),
        }
    }

    /// Tokenize `input` and parse the result. Tokenizer parse errors share
    /// the parser's error logger.
    pub fn from_source(input: &str) -> Parser {
        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));

        let mut stream = ByteStream::new();
        stream.read_from_str(input);
        let tokens = Tokenizer::new(&mut stream, Rc::clone(&error_logger)).tokenize();

        Parser {
            stream: TokenStream::new(tokens),
            error_logger,
        }
    }

    /// The recoverable parse errors recorded so far
    pub fn errors(&self) -> Vec<ParseError> {
        self.error_logger.borrow().errors().to_vec()
    }

    // =============================================================================================
    // These are the public parse_* entry points

    /// 5.3.3. [Parse a stylesheet](https://www.w3.org/TR/css-syntax-3/#parse-stylesheet)
    pub fn parse_stylesheet(&mut self) -> Stylesheet {
        trace!("parse_stylesheet");

        Stylesheet {
            rules: self.consume_list_of_rules(true),
        }
    }

    /// 5.3.4. [Parse a list of rules](https://www.w3.org/TR/css-syntax-3/#parse-list-of-rules)
    ///
    /// Unlike the top level of a stylesheet, CDO/CDC are not skipped here.
    pub fn parse_list_of_rules(&mut self) -> Vec<Rule> {
        trace!("parse_list_of_rules");

        self.consume_list_of_rules(false)
    }

    /// 5.3.5. [Parse a rule](https://www.w3.org/TR/css-syntax-3/#parse-rule)
    ///
    /// Fails when the input holds anything but a single rule surrounded by
    /// whitespace.
    pub fn parse_rule(&mut self) -> Result<Rule, Error> {
        trace!("parse_rule");

        self.skip_whitespace();

        let rule = match self.stream.next() {
            Token::Eof => return Err(Error::UnexpectedEof),
            Token::AtKeyword(_) => Rule::AtRule(self.consume_at_rule()),
            _ => match self.consume_qualified_rule() {
                Some(qualified_rule) => Rule::QualifiedRule(qualified_rule),
                None => return Err(Error::Syntax("expected a rule".to_string())),
            },
        };

        self.skip_whitespace();

        if self.stream.next() == Token::Eof {
            Ok(rule)
        } else {
            Err(Error::Syntax("unexpected tokens after rule".to_string()))
        }
    }

    /// 5.3.6. [Parse a declaration](https://www.w3.org/TR/css-syntax-3/#parse-declaration)
    ///
    /// Fails when the input is not ident-prefixed or has no colon.
    pub fn parse_declaration(&mut self) -> Result<Declaration, Error> {
        trace!("parse_declaration");

        self.skip_whitespace();

        if !matches!(self.stream.next(), Token::Ident(_)) {
            return Err(Error::Syntax(
                "declaration does not start with an identifier".to_string(),
            ));
        }

        let mut values = vec![self.consume_component_value()];
        while self.stream.next() != Token::Eof {
            values.push(self.consume_component_value());
        }

        self.consume_declaration(values)
            .ok_or_else(|| Error::Syntax("invalid declaration".to_string()))
    }

    /// 5.3.8. [Parse a list of declarations](https://www.w3.org/TR/css-syntax-3/#parse-list-of-declarations)
    pub fn parse_list_of_declarations(&mut self) -> Vec<DeclarationListItem> {
        trace!("parse_list_of_declarations");

        self.consume_list_of_declarations()
    }

    /// 5.3.9. [Parse a component value](https://www.w3.org/TR/css-syntax-3/#parse-component-value)
    ///
    /// Fails on empty input and on trailing non-whitespace.
    pub fn parse_component_value(&mut self) -> Result<ComponentValue, Error> {
        trace!("parse_component_value");

        self.skip_whitespace();

        if self.stream.next() == Token::Eof {
            return Err(Error::UnexpectedEof);
        }

        let value = self.consume_component_value();

        self.skip_whitespace();

        if self.stream.next() == Token::Eof {
            Ok(value)
        } else {
            Err(Error::Syntax(
                "unexpected tokens after component value".to_string(),
            ))
        }
    }

    /// 5.3.10. [Parse a list of component values](https://www.w3.org/TR/css-syntax-3/#parse-list-of-component-values)
    pub fn parse_list_of_component_values(&mut self) -> Vec<ComponentValue> {
        trace!("parse_list_of_component_values");

        let mut values = Vec::new();
        while self.stream.next() != Token::Eof {
            values.push(self.consume_component_value());
        }

        values
    }

    /// 5.3.11. [Parse a comma-separated list of component values](https://www.w3.org/TR/css-syntax-3/#parse-comma-separated-list-of-component-values)
    ///
    /// Empty groups are preserved; a trailing comma yields a trailing empty
    /// group.
    pub fn parse_comma_separated_list_of_component_values(&mut self) -> Vec<Vec<ComponentValue>> {
        trace!("parse_comma_separated_list_of_component_values");

        let mut groups = Vec::new();
        let mut current = Vec::new();

        loop {
            match self.stream.next() {
                Token::Eof => {
                    groups.push(current);
                    return groups;
                }
                Token::Comma => {
                    self.stream.consume();
                    groups.push(std::mem::take(&mut current));
                }
                _ => current.push(self.consume_component_value()),
            }
        }
    }

    // =============================================================================================
    // Helper functions

    /// Eats up whitespace tokens until the next token is a non-whitespace
    fn skip_whitespace(&mut self) {
        while self.stream.next() == Token::Whitespace {
            self.stream.consume();
        }
    }

    fn parse_error(&mut self, message: &str) {
        self.error_logger.borrow_mut().add_error(None, message);
    }

    // =============================================================================================
    // These are the internal consume_* functions

    /// 5.4.1. [Consume a list of rules](https://www.w3.org/TR/css-syntax-3/#consume-list-of-rules)
    fn consume_list_of_rules(&mut self, top_level: bool) -> Vec<Rule> {
        let mut rules = Vec::new();

        loop {
            match self.stream.consume() {
                Token::Whitespace => continue,
                Token::Eof => break,
                Token::Cdo | Token::Cdc => {
                    if top_level {
                        continue;
                    }

                    self.stream.reconsume();
                    if let Some(qualified_rule) = self.consume_qualified_rule() {
                        rules.push(Rule::QualifiedRule(qualified_rule));
                    }
                }
                Token::AtKeyword(_) => {
                    self.stream.reconsume();
                    rules.push(Rule::AtRule(self.consume_at_rule()));
                }
                _ => {
                    self.stream.reconsume();
                    if let Some(qualified_rule) = self.consume_qualified_rule() {
                        rules.push(Rule::QualifiedRule(qualified_rule));
                    }
                }
            }
        }

        rules
    }

    /// 5.4.2. [Consume an at-rule](https://www.w3.org/TR/css-syntax-3/#consume-at-rule)
    fn consume_at_rule(&mut self) -> AtRule {
        let name = match self.stream.consume() {
            Token::AtKeyword(name) => name,
            _ => unreachable!("consume_at_rule requires an at-keyword"),
        };

        let mut rule = AtRule {
            name,
            prelude: Vec::new(),
            block: None,
        };

        loop {
            match self.stream.consume() {
                Token::Semicolon => return rule,
                Token::Eof => {
                    self.parse_error("unexpected end of input in at-rule");
                    return rule;
                }
                token @ Token::LCurly => {
                    rule.block = Some(self.consume_simple_block(token));
                    return rule;
                }
                _ => {
                    self.stream.reconsume();
                    rule.prelude.push(self.consume_component_value());
                }
            }
        }
    }

    /// 5.4.3. [Consume a qualified rule](https://www.w3.org/TR/css-syntax-3/#consume-qualified-rule)
    ///
    /// Returns None when the input runs out before the block; the rule is
    /// discarded in that case.
    fn consume_qualified_rule(&mut self) -> Option<QualifiedRule> {
        let mut prelude = Vec::new();

        loop {
            match self.stream.consume() {
                Token::Eof => {
                    self.parse_error("unexpected end of input in qualified rule");
                    return None;
                }
                token @ Token::LCurly => {
                    return Some(QualifiedRule {
                        prelude,
                        block: self.consume_simple_block(token),
                    });
                }
                _ => {
                    self.stream.reconsume();
                    prelude.push(self.consume_component_value());
                }
            }
        }
    }

    /// 5.4.4. [Consume a list of declarations](https://www.w3.org/TR/css-syntax-3/#consume-list-of-declarations)
    fn consume_list_of_declarations(&mut self) -> Vec<DeclarationListItem> {
        let mut items = Vec::new();

        loop {
            match self.stream.consume() {
                Token::Whitespace | Token::Semicolon => continue,
                Token::Eof => break,
                Token::AtKeyword(_) => {
                    self.stream.reconsume();
                    items.push(DeclarationListItem::AtRule(self.consume_at_rule()));
                }
                Token::Ident(_) => {
                    self.stream.reconsume();

                    let mut values = vec![self.consume_component_value()];
                    while !matches!(self.stream.next(), Token::Semicolon | Token::Eof) {
                        values.push(self.consume_component_value());
                    }

                    if let Some(declaration) = self.consume_declaration(values) {
                        items.push(DeclarationListItem::Declaration(declaration));
                    }
                }
                _ => {
                    self.parse_error("unexpected token in declaration list");
                    self.stream.reconsume();
                    while !matches!(self.stream.next(), Token::Semicolon | Token::Eof) {
                        self.consume_component_value();
                    }
                }
            }
        }

        items
    }

    /// 5.4.5. [Consume a declaration](https://www.w3.org/TR/css-syntax-3/#consume-declaration)
    ///
    /// Operates on the buffered component values of a single declaration,
    /// the first of which must be the name ident.
    fn consume_declaration(&mut self, values: Vec<ComponentValue>) -> Option<Declaration> {
        let mut values = values.into_iter();

        let name = match values.next() {
            Some(ComponentValue::PreservedToken(Token::Ident(name))) => name,
            _ => return None,
        };

        let mut rest: Vec<ComponentValue> = values.collect();

        // whitespace may separate the name from the colon
        let mut index = 0;
        while matches!(
            rest.get(index),
            Some(ComponentValue::PreservedToken(Token::Whitespace))
        ) {
            index += 1;
        }

        match rest.get(index) {
            Some(ComponentValue::PreservedToken(Token::Colon)) => index += 1,
            _ => {
                self.parse_error("expected colon in declaration");
                return None;
            }
        }

        // everything after the colon is the value, leading whitespace included
        let mut value = rest.split_off(index);

        strip_trailing_whitespace(&mut value);

        // the last `!` + `important` pair in tail position wins
        let mut bang = None;
        let mut seen_important = false;
        for index in (0..value.len()).rev() {
            match &value[index] {
                ComponentValue::PreservedToken(Token::Whitespace) => continue,
                ComponentValue::PreservedToken(Token::Ident(ident))
                    if !seen_important && ident.eq_ignore_ascii_case("important") =>
                {
                    seen_important = true;
                }
                ComponentValue::PreservedToken(Token::Delim('!')) if seen_important => {
                    bang = Some(index);
                    break;
                }
                _ => break,
            }
        }

        let important = bang.is_some();
        if let Some(index) = bang {
            value.truncate(index);
            strip_trailing_whitespace(&mut value);
        }

        Some(Declaration {
            name,
            value,
            important,
        })
    }

    /// 5.4.7. [Consume a component value](https://www.w3.org/TR/css-syntax-3/#consume-component-value)
    fn consume_component_value(&mut self) -> ComponentValue {
        match self.stream.consume() {
            token @ (Token::LCurly | Token::LBracket | Token::LParen) => {
                ComponentValue::SimpleBlock(self.consume_simple_block(token))
            }
            Token::Function(name) => ComponentValue::Function(self.consume_function(name)),
            token => ComponentValue::PreservedToken(token),
        }
    }

    /// 5.4.8. [Consume a simple block](https://www.w3.org/TR/css-syntax-3/#consume-simple-block)
    ///
    /// The closing token is consumed but not stored.
    fn consume_simple_block(&mut self, opener: Token) -> SimpleBlock {
        let mut block = SimpleBlock::new(opener);
        let closer = block.mirror();

        loop {
            match self.stream.next() {
                token if token == closer => {
                    self.stream.consume();
                    return block;
                }
                Token::Eof => {
                    self.parse_error("unexpected end of input in simple block");
                    return block;
                }
                _ => block.value.push(self.consume_component_value()),
            }
        }
    }

    /// 5.4.9. [Consume a function](https://www.w3.org/TR/css-syntax-3/#consume-function)
    fn consume_function(&mut self, name: String) -> Function {
        let mut function = Function {
            name,
            value: Vec::new(),
        };

        loop {
            match self.stream.next() {
                Token::RParen => {
                    self.stream.consume();
                    return function;
                }
                Token::Eof => {
                    self.parse_error("unexpected end of input in function");
                    return function;
                }
                _ => function.value.push(self.consume_component_value()),
            }
        }
    }
}

/// Flattens component values back into the token sequence they were parsed
/// from. Blocks and functions re-emit their opening and closing tokens, so
/// re-parsing the result reconstructs the same structure.
pub(crate) fn flatten_component_values(values: &[ComponentValue]) -> Vec<Token> {
    let mut tokens = Vec::new();
    for value in values {
        flatten_into(value, &mut tokens);
    }

    tokens
}

fn flatten_into(value: &ComponentValue, tokens: &mut Vec<Token>) {
    match value {
        ComponentValue::PreservedToken(token) => tokens.push(token.clone()),
        ComponentValue::SimpleBlock(block) => {
            tokens.push(block.opener.clone());
            for value in &block.value {
                flatten_into(value, tokens);
            }
            tokens.push(block.mirror());
        }
        ComponentValue::Function(function) => {
            tokens.push(Token::Function(function.name.clone()));
            for value in &function.value {
                flatten_into(value, tokens);
            }
            tokens.push(Token::RParen);
        }
    }
}

fn strip_trailing_whitespace(values: &mut Vec<ComponentValue>) {
    while matches!(
        values.last(),
        Some(ComponentValue::PreservedToken(Token::Whitespace))
    ) {
        values.pop();
    }
}

// =================================================================================================
// JSON projection

impl Stylesheet {
    pub fn to_json(&self) -> Value {
        json!({
            "type": "STYLESHEET",
            "value": self.rules.iter().map(Rule::to_json).collect::<Vec<_>>(),
        })
    }
}

impl Rule {
    pub fn to_json(&self) -> Value {
        match self {
            Rule::AtRule(at_rule) => at_rule.to_json(),
            Rule::QualifiedRule(qualified_rule) => qualified_rule.to_json(),
        }
    }
}

impl AtRule {
    pub fn to_json(&self) -> Value {
        json!({
            "type": "AT-RULE",
            "name": self.name,
            "prelude": values_to_json(&self.prelude),
            "value": self.block.as_ref().map(SimpleBlock::to_json).unwrap_or(Value::Null),
        })
    }
}

impl QualifiedRule {
    pub fn to_json(&self) -> Value {
        json!({
            "type": "QUALIFIED-RULE",
            "prelude": values_to_json(&self.prelude),
            "value": self.block.to_json(),
        })
    }
}

impl Declaration {
    pub fn to_json(&self) -> Value {
        json!({
            "type": "DECLARATION",
            "name": self.name,
            "value": values_to_json(&self.value),
            "important": self.important,
        })
    }
}

impl DeclarationListItem {
    pub fn to_json(&self) -> Value {
        match self {
            DeclarationListItem::Declaration(declaration) => declaration.to_json(),
            DeclarationListItem::AtRule(at_rule) => at_rule.to_json(),
        }
    }
}

impl SimpleBlock {
    pub fn to_json(&self) -> Value {
        let name = match self.opener {
            Token::LCurly => "{",
            Token::LBracket => "[",
            Token::LParen => "(",
            _ => "",
        };

        json!({
            "type": "BLOCK",
            "name": name,
            "value": values_to_json(&self.value),
        })
    }
}

impl Function {
    pub fn to_json(&self) -> Value {
        json!({
            "type": "FUNCTION",
            "name": self.name,
            "value": values_to_json(&self.value),
        })
    }
}

impl ComponentValue {
    pub fn to_json(&self) -> Value {
        match self {
            ComponentValue::PreservedToken(token) => token.to_json(),
            ComponentValue::Function(function) => function.to_json(),
            ComponentValue::SimpleBlock(block) => block.to_json(),
        }
    }
}

fn values_to_json(values: &[ComponentValue]) -> Vec<Value> {
    values.iter().map(ComponentValue::to_json).collect()
}
