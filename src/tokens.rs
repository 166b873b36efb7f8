use serde_json::{json, Value};

/// Type flag of a [`Token::Number`] or [`Token::Dimension`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    /// The repr contains a fractional or exponent part
    Number,
    /// The repr is a plain integer
    Integer,
}

impl NumberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberKind::Number => "number",
            NumberKind::Integer => "integer",
        }
    }
}

/// Type flag of a [`Token::Hash`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    /// The hash value would start an identifier
    Id,
    /// Anything else
    Unrestricted,
}

impl HashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashKind::Id => "id",
            HashKind::Unrestricted => "unrestricted",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A [`<at-keyword-token>`](https://www.w3.org/TR/css-syntax-3/#at-keyword-token-diagram)
    ///
    /// The value does not include the `@` marker.
    AtKeyword(String),
    Ident(String),
    /// A function name. The `(` is implicit; its mirror is `)`.
    Function(String),
    Url(String),
    /// A `<bad-url-token>`. This token always indicates a parse error.
    BadUrl,
    Dimension {
        value: f64,
        kind: NumberKind,
        repr: String,
        unit: String,
    },
    Percentage {
        value: f64,
        repr: String,
    },
    Number {
        value: f64,
        kind: NumberKind,
        repr: String,
    },
    /// A [`<string-token>`](https://www.w3.org/TR/css-syntax-3/#string-token-diagram)
    ///
    /// The value does not include the quotes.
    QuotedString(String),
    /// A `<bad-string-token>`. This token always indicates a parse error.
    BadString,
    /// A [`<whitespace-token>`](https://www.w3.org/TR/css-syntax-3/#whitespace-token-diagram);
    /// a maximal run of whitespace collapses into a single one
    Whitespace,
    /// A [`<hash-token>`](https://www.w3.org/TR/css-syntax-3/#hash-token-diagram)
    ///
    /// The value does not include the `#` marker.
    Hash {
        value: String,
        kind: HashKind,
    },
    /// A `<delim-token>`
    Delim(char),
    /// A `~=` include-match token
    IncludeMatch,
    /// A `|=` dash-match token
    DashMatch,
    /// A `^=` prefix-match token
    PrefixMatch,
    /// A `$=` suffix-match token
    SuffixMatch,
    /// A `*=` substring-match token
    SubstringMatch,
    /// A `||` column token
    Column,
    /// A `<{-token>`
    LCurly,
    /// A `<}-token>`
    RCurly,
    /// A `<(-token>`
    LParen,
    /// A `<)-token>`
    RParen,
    /// A `<[-token>`
    LBracket,
    /// A `<]-token>`
    RBracket,
    Comma,
    Colon,
    Semicolon,
    /// A `<!--` CDO token
    Cdo,
    /// A `-->` CDC token
    Cdc,
    /// A `<EOF-token>`
    Eof,
}

impl Token {
    /// The closing delimiter matching an opening one. Openers are the block
    /// tokens `{`, `[`, `(` and function tokens (whose `(` is implicit).
    pub fn mirror(&self) -> Option<Token> {
        match self {
            Token::LCurly => Some(Token::RCurly),
            Token::LBracket => Some(Token::RBracket),
            Token::LParen | Token::Function(_) => Some(Token::RParen),
            _ => None,
        }
    }

    /// JSON projection of the token: `{"token": <type>, ...payload}`
    pub fn to_json(&self) -> Value {
        match self {
            Token::AtKeyword(value) => json!({"token": "AT-KEYWORD", "value": value}),
            Token::Ident(value) => json!({"token": "IDENT", "value": value}),
            Token::Function(value) => json!({"token": "FUNCTION", "value": value}),
            Token::Url(value) => json!({"token": "URL", "value": value}),
            Token::BadUrl => json!({"token": "BADURL"}),
            Token::Dimension {
                value,
                kind,
                repr,
                unit,
            } => json!({
                "token": "DIMENSION",
                "value": json_number(*value),
                "type": kind.as_str(),
                "repr": repr,
                "unit": unit,
            }),
            Token::Percentage { value, repr } => json!({
                "token": "PERCENTAGE",
                "value": json_number(*value),
                "repr": repr,
            }),
            Token::Number { value, kind, repr } => json!({
                "token": "NUMBER",
                "value": json_number(*value),
                "type": kind.as_str(),
                "repr": repr,
            }),
            Token::QuotedString(value) => json!({"token": "STRING", "value": value}),
            Token::BadString => json!({"token": "BADSTRING"}),
            Token::Whitespace => json!({"token": "WHITESPACE"}),
            Token::Hash { value, kind } => json!({
                "token": "HASH",
                "value": value,
                "type": kind.as_str(),
            }),
            Token::Delim(value) => json!({"token": "DELIM", "value": value.to_string()}),
            Token::IncludeMatch => json!({"token": "~="}),
            Token::DashMatch => json!({"token": "|="}),
            Token::PrefixMatch => json!({"token": "^="}),
            Token::SuffixMatch => json!({"token": "$="}),
            Token::SubstringMatch => json!({"token": "*="}),
            Token::Column => json!({"token": "||"}),
            Token::LCurly => json!({"token": "{"}),
            Token::RCurly => json!({"token": "}"}),
            Token::LParen => json!({"token": "("}),
            Token::RParen => json!({"token": ")"}),
            Token::LBracket => json!({"token": "["}),
            Token::RBracket => json!({"token": "]"}),
            Token::Comma => json!({"token": "COMMA"}),
            Token::Colon => json!({"token": "COLON"}),
            Token::Semicolon => json!({"token": "SEMICOLON"}),
            Token::Cdo => json!({"token": "CDO"}),
            Token::Cdc => json!({"token": "CDC"}),
            Token::Eof => json!({"token": "EOF"}),
        }
    }
}

/// Numbers with no fractional part project as JSON integers, the way a host
/// with a single number type would print them.
fn json_number(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(&value)
    {
        json!(value as i64)
    } else {
        json!(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_of_openers() {
        assert_eq!(Token::LCurly.mirror(), Some(Token::RCurly));
        assert_eq!(Token::LBracket.mirror(), Some(Token::RBracket));
        assert_eq!(Token::LParen.mirror(), Some(Token::RParen));
        assert_eq!(
            Token::Function("calc".to_string()).mirror(),
            Some(Token::RParen)
        );
        assert_eq!(Token::RCurly.mirror(), None);
        assert_eq!(Token::Comma.mirror(), None);
    }

    #[test]
    fn json_projection() {
        let token = Token::Dimension {
            value: 10.0,
            kind: NumberKind::Integer,
            repr: "10".to_string(),
            unit: "px".to_string(),
        };
        assert_eq!(
            token.to_json(),
            json!({"token": "DIMENSION", "value": 10, "type": "integer", "repr": "10", "unit": "px"})
        );

        let token = Token::Percentage {
            value: 150.0,
            repr: "1.5e2".to_string(),
        };
        assert_eq!(
            token.to_json(),
            json!({"token": "PERCENTAGE", "value": 150, "repr": "1.5e2"})
        );

        let token = Token::Hash {
            value: "abc".to_string(),
            kind: HashKind::Id,
        };
        assert_eq!(
            token.to_json(),
            json!({"token": "HASH", "value": "abc", "type": "id"})
        );
    }

    #[test]
    fn fractional_values_project_as_floats() {
        let token = Token::Number {
            value: 1.5,
            kind: NumberKind::Number,
            repr: "1.5".to_string(),
        };
        assert_eq!(
            token.to_json(),
            json!({"token": "NUMBER", "value": 1.5, "type": "number", "repr": "1.5"})
        );
    }
}
