use std::cell::RefCell;
use std::rc::Rc;

use crate::byte_stream::{
    ByteStream, Character, CHAR_LF, CHAR_REPLACEMENT, CHAR_SPACE, CHAR_TAB,
};
use crate::error_logger::ErrorLogger;
use crate::location::Location;
use crate::tokens::{HashKind, NumberKind, Token};

macro_rules! consume {
    ($self:expr, $token:expr) => {{
        $self.read_char();

        $token
    }};
}

/// CSS Tokenizer according to the [w3 specification](https://www.w3.org/TR/css-syntax-3/#tokenization)
pub struct Tokenizer<'stream> {
    stream: &'stream mut ByteStream,
    /// Current line, starting at 1
    line: u32,
    /// Current column, starting at 1
    column: u32,
    /// Sink for recoverable parse errors
    error_logger: Rc<RefCell<ErrorLogger>>,
}

impl<'stream> Tokenizer<'stream> {
    pub fn new(stream: &'stream mut ByteStream, error_logger: Rc<RefCell<ErrorLogger>>) -> Self {
        Self {
            stream,
            line: 1,
            column: 1,
            error_logger,
        }
    }

    /// Current position in the source, used for parse error reporting
    pub fn current_location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    /// Tokenizes the whole stream. The terminating EOF token is not part of
    /// the result; reading past the end of a token stream conjures it up.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let max_iterations = 2 * self.stream.length() + 1;
        let mut iterations = 0;

        loop {
            let token = self.consume_token();
            if token == Token::Eof {
                break;
            }

            tokens.push(token);

            // every token consumes at least one code point
            iterations += 1;
            debug_assert!(
                iterations <= max_iterations,
                "tokenizer made no progress after {iterations} iterations"
            );
        }

        tokens
    }

    /// 4.3.1. [Consume a token](https://www.w3.org/TR/css-syntax-3/#consume-token)
    pub fn consume_token(&mut self) -> Token {
        self.consume_comments();

        let current = match self.stream.current_char() {
            Character::Eof => return Token::Eof,
            Character::Ch(c) => c,
        };

        match current {
            c if is_whitespace(c) => self.consume_whitespace(),
            '"' | '\'' => self.consume_string_token(),
            '#' => {
                self.read_char();

                if self.is_name_char(0) || self.is_valid_escape(0) {
                    let kind = if self.would_start_identifier(0) {
                        HashKind::Id
                    } else {
                        HashKind::Unrestricted
                    };

                    return Token::Hash {
                        value: self.consume_ident_sequence(),
                        kind,
                    };
                }

                Token::Delim('#')
            }
            '$' => {
                self.read_char();
                if self.current_is('=') {
                    return consume!(self, Token::SuffixMatch);
                }

                Token::Delim('$')
            }
            '(' => consume!(self, Token::LParen),
            ')' => consume!(self, Token::RParen),
            '*' => {
                self.read_char();
                if self.current_is('=') {
                    return consume!(self, Token::SubstringMatch);
                }

                Token::Delim('*')
            }
            '+' | '.' => {
                if self.starts_with_number() {
                    return self.consume_numeric_token();
                }

                consume!(self, Token::Delim(current))
            }
            ',' => consume!(self, Token::Comma),
            '-' => {
                if self.starts_with_number() {
                    return self.consume_numeric_token();
                }

                if self.look_ahead_is(1, '-') && self.look_ahead_is(2, '>') {
                    self.read_char();
                    self.read_char();
                    self.read_char();
                    return Token::Cdc;
                }

                if self.would_start_identifier(0) {
                    return self.consume_ident_like_token();
                }

                consume!(self, Token::Delim('-'))
            }
            ':' => consume!(self, Token::Colon),
            ';' => consume!(self, Token::Semicolon),
            '<' => {
                if self.look_ahead_is(1, '!')
                    && self.look_ahead_is(2, '-')
                    && self.look_ahead_is(3, '-')
                {
                    self.read_char();
                    self.read_char();
                    self.read_char();
                    self.read_char();
                    return Token::Cdo;
                }

                consume!(self, Token::Delim('<'))
            }
            '@' => {
                self.read_char();

                if self.would_start_identifier(0) {
                    return Token::AtKeyword(self.consume_ident_sequence());
                }

                Token::Delim('@')
            }
            '[' => consume!(self, Token::LBracket),
            '\\' => {
                if self.is_valid_escape(0) {
                    return self.consume_ident_like_token();
                }

                self.parse_error("invalid escape");
                consume!(self, Token::Delim('\\'))
            }
            ']' => consume!(self, Token::RBracket),
            '^' => {
                self.read_char();
                if self.current_is('=') {
                    return consume!(self, Token::PrefixMatch);
                }

                Token::Delim('^')
            }
            '{' => consume!(self, Token::LCurly),
            '}' => consume!(self, Token::RCurly),
            '|' => {
                self.read_char();
                if self.current_is('=') {
                    return consume!(self, Token::DashMatch);
                }
                if self.current_is('|') {
                    return consume!(self, Token::Column);
                }

                Token::Delim('|')
            }
            '~' => {
                self.read_char();
                if self.current_is('=') {
                    return consume!(self, Token::IncludeMatch);
                }

                Token::Delim('~')
            }
            c if c.is_ascii_digit() => self.consume_numeric_token(),
            c if is_ident_start_char(c) => self.consume_ident_like_token(),
            c => consume!(self, Token::Delim(c)),
        }
    }

    /// 4.3.2. [Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comment)
    ///
    /// Comments leave no token behind. An unterminated comment is a parse
    /// error and drains the rest of the stream.
    fn consume_comments(&mut self) {
        while self.current_is('/') && self.look_ahead_is(1, '*') {
            let start = self.current_location();
            self.read_char();
            self.read_char();

            loop {
                match self.stream.current_char() {
                    Character::Eof => {
                        self.parse_error_at(start, "unterminated comment");
                        return;
                    }
                    Character::Ch('*') if self.look_ahead_is(1, '/') => {
                        self.read_char();
                        self.read_char();
                        break;
                    }
                    _ => {
                        self.read_char();
                    }
                }
            }
        }
    }

    /// A maximal run of whitespace collapses into a single token
    fn consume_whitespace(&mut self) -> Token {
        while matches!(self.stream.current_char(), Character::Ch(c) if is_whitespace(c)) {
            self.read_char();
        }

        Token::Whitespace
    }

    /// 4.3.3. [Consume a numeric token](https://www.w3.org/TR/css-syntax-3/#consume-numeric-token)
    ///
    /// Returns either a `<number-token>`, `<percentage-token>`, or `<dimension-token>`.
    fn consume_numeric_token(&mut self) -> Token {
        let (repr, value, kind) = self.consume_number();

        if self.would_start_identifier(0) {
            return Token::Dimension {
                value,
                kind,
                repr,
                unit: self.consume_ident_sequence(),
            };
        }

        if self.current_is('%') {
            self.read_char();
            return Token::Percentage { value, repr };
        }

        Token::Number { value, kind, repr }
    }

    /// 4.3.5. [Consume a string token](https://www.w3.org/TR/css-syntax-3/#consume-string-token)
    ///
    /// Returns either a `<string-token>` or `<bad-string-token>`.
    fn consume_string_token(&mut self) -> Token {
        let start = self.current_location();
        let ending = char::from(self.read_char());
        let mut value = String::new();

        loop {
            match self.stream.current_char() {
                Character::Eof => {
                    self.parse_error_at(start, "unterminated string");
                    return Token::QuotedString(value);
                }
                Character::Ch(CHAR_LF) => {
                    // the newline is not consumed; it tokenizes as whitespace
                    self.parse_error_at(start, "newline in string");
                    return Token::BadString;
                }
                Character::Ch(c) if c == ending => {
                    self.read_char();
                    return Token::QuotedString(value);
                }
                Character::Ch('\\') => match self.stream.next_char() {
                    // a backslash at EOF is ignored
                    Character::Eof => {
                        self.read_char();
                    }
                    // an escaped newline is a line continuation
                    Character::Ch(CHAR_LF) => {
                        self.read_char();
                        self.read_char();
                    }
                    _ => {
                        self.read_char();
                        value.push(self.consume_escaped_code_point());
                    }
                },
                Character::Ch(c) => {
                    self.read_char();
                    value.push(c);
                }
            }
        }
    }

    /// 4.3.4. [Consume an ident-like token](https://www.w3.org/TR/css-syntax-3/#consume-ident-like-token)
    ///
    /// Returns: `<ident-token>`, `<function-token>`, `<url-token>`, or `<bad-url-token>`.
    fn consume_ident_like_token(&mut self) -> Token {
        let value = self.consume_ident_sequence();

        if value.eq_ignore_ascii_case("url") && self.current_is('(') {
            self.read_char();

            while self.is_whitespace_at(0) && self.is_whitespace_at(1) {
                self.read_char();
            }

            if self.is_quote_at(0) || (self.is_whitespace_at(0) && self.is_quote_at(1)) {
                return Token::Function(value);
            }

            return self.consume_url_token();
        }

        if self.current_is('(') {
            self.read_char();
            return Token::Function(value);
        }

        Token::Ident(value)
    }

    /// 4.3.6. [Consume a url token](https://www.w3.org/TR/css-syntax-3/#consume-url-token)
    ///
    /// Returns either a `<url-token>` or a `<bad-url-token>`. Assumes the
    /// `url(` introducer has already been consumed.
    fn consume_url_token(&mut self) -> Token {
        let start = self.current_location();
        let mut value = String::new();

        while self.is_whitespace_at(0) {
            self.read_char();
        }

        loop {
            match self.stream.current_char() {
                Character::Eof => {
                    self.parse_error_at(start, "unterminated url");
                    return Token::Url(value);
                }
                Character::Ch(')') => {
                    self.read_char();
                    return Token::Url(value);
                }
                Character::Ch(c) if is_whitespace(c) => {
                    while self.is_whitespace_at(0) {
                        self.read_char();
                    }

                    match self.stream.current_char() {
                        Character::Eof => {
                            self.parse_error_at(start, "unterminated url");
                            return Token::Url(value);
                        }
                        Character::Ch(')') => {
                            self.read_char();
                            return Token::Url(value);
                        }
                        _ => {
                            self.parse_error_at(start, "unexpected characters in url");
                            self.consume_remnants_of_bad_url();
                            return Token::BadUrl;
                        }
                    }
                }
                Character::Ch('"') | Character::Ch('\'') | Character::Ch('(') => {
                    self.parse_error_at(start, "unexpected character in url");
                    self.consume_remnants_of_bad_url();
                    return Token::BadUrl;
                }
                Character::Ch(c) if is_non_printable(c) => {
                    self.parse_error_at(start, "non-printable character in url");
                    self.consume_remnants_of_bad_url();
                    return Token::BadUrl;
                }
                Character::Ch('\\') => {
                    if self.is_valid_escape(0) {
                        self.read_char();
                        value.push(self.consume_escaped_code_point());
                    } else {
                        self.parse_error_at(start, "invalid escape in url");
                        self.consume_remnants_of_bad_url();
                        return Token::BadUrl;
                    }
                }
                Character::Ch(c) => {
                    self.read_char();
                    value.push(c);
                }
            }
        }
    }

    /// 4.3.14. [Consume the remnants of a bad url](https://www.w3.org/TR/css-syntax-3/#consume-remnants-of-bad-url)
    ///
    /// Consumes enough of the input stream to reach a recovery point where
    /// normal tokenizing can resume.
    fn consume_remnants_of_bad_url(&mut self) {
        loop {
            match self.stream.current_char() {
                Character::Eof => return,
                Character::Ch(')') => {
                    self.read_char();
                    return;
                }
                _ if self.is_valid_escape(0) => {
                    self.read_char();
                    self.consume_escaped_code_point();
                }
                _ => {
                    self.read_char();
                }
            }
        }
    }

    /// 4.3.7. [Consume an escaped code point](https://www.w3.org/TR/css-syntax-3/#consume-an-escaped-code-point)
    ///
    /// Assumes the `\` has already been consumed and that the escape is valid.
    fn consume_escaped_code_point(&mut self) -> char {
        match self.stream.current_char() {
            Character::Eof => {
                self.parse_error("unexpected end of input after escape");
                CHAR_REPLACEMENT
            }
            Character::Ch(c) if c.is_ascii_hexdigit() => {
                let mut value: u32 = 0;
                let mut digits = 0;

                while digits < 6 {
                    match self.stream.current_char() {
                        Character::Ch(c) => match c.to_digit(16) {
                            Some(digit) => {
                                value = value * 16 + digit;
                                digits += 1;
                                self.read_char();
                            }
                            None => break,
                        },
                        Character::Eof => break,
                    }
                }

                // a single whitespace after the hex digits belongs to the escape
                if self.is_whitespace_at(0) {
                    self.read_char();
                }

                // zero, surrogates and out-of-range values all decode to U+FFFD
                if value == 0 {
                    return CHAR_REPLACEMENT;
                }
                char::from_u32(value).unwrap_or(CHAR_REPLACEMENT)
            }
            Character::Ch(c) => {
                self.read_char();
                c
            }
        }
    }

    /// 4.3.11. [Consume an ident sequence](https://www.w3.org/TR/css-syntax-3/#consume-name)
    ///
    /// Caller should ensure that the stream starts with an ident sequence
    /// before calling this algorithm.
    fn consume_ident_sequence(&mut self) -> String {
        let mut value = String::new();

        loop {
            match self.stream.current_char() {
                Character::Ch(c) if is_ident_char(c) => {
                    self.read_char();
                    value.push(c);
                }
                _ if self.is_valid_escape(0) => {
                    self.read_char();
                    value.push(self.consume_escaped_code_point());
                }
                _ => return value,
            }
        }
    }

    /// 4.3.12. [Consume a number](https://www.w3.org/TR/css-syntax-3/#consume-number)
    ///
    /// Returns `(repr, value, kind)`. A unit or `%` following the number is
    /// never consumed here; that is the numeric token dispatch's job.
    fn consume_number(&mut self) -> (String, f64, NumberKind) {
        let mut repr = String::new();
        let mut kind = NumberKind::Integer;

        if matches!(self.stream.current_char(), Character::Ch('+' | '-')) {
            repr.push(char::from(self.read_char()));
        }

        self.consume_digits(&mut repr);

        if self.current_is('.')
            && matches!(self.stream.next_char(), Character::Ch(c) if c.is_ascii_digit())
        {
            repr.push(char::from(self.read_char()));
            self.consume_digits(&mut repr);
            kind = NumberKind::Number;
        }

        let has_exponent = matches!(self.stream.current_char(), Character::Ch('e' | 'E'))
            && (matches!(self.stream.next_char(), Character::Ch(c) if c.is_ascii_digit())
                || (matches!(self.stream.next_char(), Character::Ch('+' | '-'))
                    && matches!(self.stream.look_ahead(2), Character::Ch(c) if c.is_ascii_digit())));

        if has_exponent {
            repr.push(char::from(self.read_char()));
            if matches!(self.stream.current_char(), Character::Ch('+' | '-')) {
                repr.push(char::from(self.read_char()));
            }
            self.consume_digits(&mut repr);
            kind = NumberKind::Number;
        }

        let value = convert_string_to_number(&repr);

        (repr, value, kind)
    }

    fn consume_digits(&mut self, repr: &mut String) {
        while let Character::Ch(c) = self.stream.current_char() {
            if !c.is_ascii_digit() {
                break;
            }

            self.read_char();
            repr.push(c);
        }
    }

    // =============================================================================================
    // Stream checks

    /// Reads a character, keeping the line/column bookkeeping in sync
    fn read_char(&mut self) -> Character {
        let c = self.stream.read_char();
        match c {
            Character::Ch(CHAR_LF) => {
                self.line += 1;
                self.column = 1;
            }
            Character::Ch(_) => self.column += 1,
            Character::Eof => {}
        }

        c
    }

    fn current_is(&self, c: char) -> bool {
        self.stream.current_char() == Character::Ch(c)
    }

    fn look_ahead_is(&self, offset: usize, c: char) -> bool {
        self.stream.look_ahead(offset) == Character::Ch(c)
    }

    fn is_whitespace_at(&self, offset: usize) -> bool {
        matches!(self.stream.look_ahead(offset), Character::Ch(c) if is_whitespace(c))
    }

    fn is_quote_at(&self, offset: usize) -> bool {
        matches!(self.stream.look_ahead(offset), Character::Ch('"' | '\''))
    }

    fn is_name_char(&self, offset: usize) -> bool {
        matches!(self.stream.look_ahead(offset), Character::Ch(c) if is_ident_char(c))
    }

    /// 4.3.8. [Check if two code points are a valid escape](https://www.w3.org/TR/css-syntax-3/#starts-with-a-valid-escape)
    fn is_valid_escape(&self, offset: usize) -> bool {
        self.look_ahead_is(offset, '\\') && !self.look_ahead_is(offset + 1, CHAR_LF)
    }

    /// 4.3.9. [Check if three code points would start an identifier](https://www.w3.org/TR/css-syntax-3/#would-start-an-identifier)
    fn would_start_identifier(&self, offset: usize) -> bool {
        match self.stream.look_ahead(offset) {
            Character::Ch('-') => match self.stream.look_ahead(offset + 1) {
                Character::Ch('-') => true,
                Character::Ch(c) if is_ident_start_char(c) => true,
                _ => self.is_valid_escape(offset + 1),
            },
            Character::Ch('\\') => self.is_valid_escape(offset),
            Character::Ch(c) => is_ident_start_char(c),
            Character::Eof => false,
        }
    }

    /// 4.3.10. [Check if three code points would start a number](https://www.w3.org/TR/css-syntax-3/#starts-with-a-number)
    fn starts_with_number(&self) -> bool {
        match self.stream.current_char() {
            Character::Ch('+' | '-') => match self.stream.next_char() {
                Character::Ch(c) if c.is_ascii_digit() => true,
                Character::Ch('.') => {
                    matches!(self.stream.look_ahead(2), Character::Ch(c) if c.is_ascii_digit())
                }
                _ => false,
            },
            Character::Ch('.') => {
                matches!(self.stream.next_char(), Character::Ch(c) if c.is_ascii_digit())
            }
            Character::Ch(c) => c.is_ascii_digit(),
            Character::Eof => false,
        }
    }

    fn parse_error(&mut self, message: &str) {
        let location = self.current_location();
        self.parse_error_at(location, message);
    }

    fn parse_error_at(&mut self, location: Location, message: &str) {
        self.error_logger
            .borrow_mut()
            .add_error(Some(location), message);
    }
}

/// def: [whitespace](https://www.w3.org/TR/css-syntax-3/#whitespace)
///
/// Preprocessing has already folded CR, CRLF and FF into LF.
fn is_whitespace(c: char) -> bool {
    matches!(c, CHAR_LF | CHAR_TAB | CHAR_SPACE)
}

/// def: [ident-start code point](https://www.w3.org/TR/css-syntax-3/#ident-start-code-point)
fn is_ident_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c >= '\u{0080}' || c == '_'
}

/// def: [ident code point](https://www.w3.org/TR/css-syntax-3/#ident-code-point)
fn is_ident_char(c: char) -> bool {
    is_ident_start_char(c) || c.is_ascii_digit() || c == '-'
}

/// def: [non-printable code point](https://www.w3.org/TR/css-syntax-3/#non-printable-code-point)
fn is_non_printable(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{0008}' | '\u{000B}' | '\u{000E}'..='\u{001F}' | '\u{007F}')
}

/// convert-a-string-to-a-number over the reprs `consume_number` produces,
/// which form a strict subset of Rust's float syntax; the IEEE-754 double
/// parse of the exact repr is the specified result.
fn convert_string_to_number(repr: &str) -> f64 {
    repr.parse().expect("number repr is a valid float")
}
