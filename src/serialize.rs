use crate::errors::Error;
use crate::parser::{
    AtRule, ComponentValue, Declaration, DeclarationListItem, Function, QualifiedRule, Rule,
    SimpleBlock, Stylesheet,
};
use crate::tokens::{HashKind, Token};

/// Serialization back to CSS source text. The output re-tokenizes to the same
/// token sequence (up to whitespace collapsing) and re-parses to an
/// equivalent tree.
pub trait ToSource {
    fn to_source(&self) -> Result<String, Error>;
}

/// Escapes a string so it tokenizes as a single ident with exactly the given
/// value. Control characters and a leading digit (also after `-`) are
/// hex-escaped, name characters pass through, everything else is
/// backslash-escaped literally.
pub fn escape_ident(value: &str) -> Result<String, Error> {
    escape_name(value, true)
}

/// Like [`escape_ident`], but without the leading-digit rule: hash values are
/// not idents unless typed `id`.
pub fn escape_hash(value: &str) -> Result<String, Error> {
    escape_name(value, false)
}

fn escape_name(value: &str, protect_leading_digit: bool) -> Result<String, Error> {
    let first = value.chars().next();
    let mut result = String::with_capacity(value.len());

    for (index, c) in value.chars().enumerate() {
        if c == '\u{0000}' {
            return Err(Error::InvalidCharacter(
                "U+0000 cannot be serialized".to_string(),
            ));
        }

        let code = c as u32;
        let leading_digit = protect_leading_digit
            && c.is_ascii_digit()
            && (index == 0 || (index == 1 && first == Some('-')));

        if (0x01..=0x1F).contains(&code) || code == 0x7F || leading_digit {
            result.push_str(&format!("\\{code:x} "));
        } else if is_name_char(c) {
            result.push(c);
        } else {
            result.push('\\');
            result.push(c);
        }
    }

    Ok(result)
}

/// Escapes a string value for emission between double quotes
pub fn escape_string(value: &str) -> Result<String, Error> {
    let mut result = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '\u{0000}' => {
                return Err(Error::InvalidCharacter(
                    "U+0000 cannot be serialized".to_string(),
                ))
            }
            '\u{0001}'..='\u{001F}' | '\u{007F}' => {
                result.push_str(&format!("\\{:x} ", c as u32));
            }
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            _ => result.push(c),
        }
    }

    Ok(result)
}

/// Escapes a url value for emission in unquoted `url(...)` form, so it
/// re-tokenizes as a url token rather than a function
fn escape_url(value: &str) -> Result<String, Error> {
    let mut result = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '\u{0000}' => {
                return Err(Error::InvalidCharacter(
                    "U+0000 cannot be serialized".to_string(),
                ))
            }
            '\u{0001}'..='\u{001F}' | '\u{007F}' | ' ' => {
                result.push_str(&format!("\\{:x} ", c as u32));
            }
            '"' | '\'' | '(' | ')' | '\\' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }

    Ok(result)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c >= '\u{0080}'
}

impl ToSource for Token {
    fn to_source(&self) -> Result<String, Error> {
        let source = match self {
            Token::AtKeyword(value) => format!("@{}", escape_ident(value)?),
            Token::Ident(value) => escape_ident(value)?,
            Token::Function(value) => format!("{}(", escape_ident(value)?),
            Token::Url(value) => format!("url({})", escape_url(value)?),
            // enough malformed content to re-tokenize as a bad url
            Token::BadUrl => "url(BAD URL)".to_string(),
            Token::Dimension { repr, unit, .. } => {
                let mut unit = escape_ident(unit)?;

                // an `e` that reads as an exponent start is escaped to keep
                // the unit out of the number
                let mut chars = unit.chars();
                if matches!(chars.next(), Some('e' | 'E'))
                    && matches!(chars.next(), Some('-') | Some('0'..='9'))
                {
                    unit = format!("\\65 {}", &unit[1..]);
                }

                format!("{repr}{unit}")
            }
            Token::Percentage { repr, .. } => format!("{repr}%"),
            Token::Number { repr, .. } => repr.clone(),
            Token::QuotedString(value) => format!("\"{}\"", escape_string(value)?),
            // an unterminated-by-newline string; the newline collapses into
            // the whitespace that always follows a bad string
            Token::BadString => "\"bad string\n".to_string(),
            Token::Whitespace => " ".to_string(),
            Token::Hash { value, kind } => match kind {
                HashKind::Id => format!("#{}", escape_ident(value)?),
                HashKind::Unrestricted => format!("#{}", escape_hash(value)?),
            },
            // a lone backslash would escape whatever comes next
            Token::Delim('\\') => "\\\n".to_string(),
            Token::Delim(value) => value.to_string(),
            Token::IncludeMatch => "~=".to_string(),
            Token::DashMatch => "|=".to_string(),
            Token::PrefixMatch => "^=".to_string(),
            Token::SuffixMatch => "$=".to_string(),
            Token::SubstringMatch => "*=".to_string(),
            Token::Column => "||".to_string(),
            Token::LCurly => "{".to_string(),
            Token::RCurly => "}".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::LBracket => "[".to_string(),
            Token::RBracket => "]".to_string(),
            Token::Comma => ",".to_string(),
            Token::Colon => ":".to_string(),
            Token::Semicolon => ";".to_string(),
            Token::Cdo => "<!--".to_string(),
            Token::Cdc => "-->".to_string(),
            Token::Eof => String::new(),
        };

        Ok(source)
    }
}

impl ToSource for ComponentValue {
    fn to_source(&self) -> Result<String, Error> {
        match self {
            ComponentValue::PreservedToken(token) => token.to_source(),
            ComponentValue::Function(function) => function.to_source(),
            ComponentValue::SimpleBlock(block) => block.to_source(),
        }
    }
}

impl ToSource for SimpleBlock {
    fn to_source(&self) -> Result<String, Error> {
        let mut result = self.opener.to_source()?;
        result.push_str(&values_to_source(&self.value)?);
        result.push_str(&self.mirror().to_source()?);

        Ok(result)
    }
}

impl ToSource for Function {
    fn to_source(&self) -> Result<String, Error> {
        let mut result = format!("{}(", escape_ident(&self.name)?);
        result.push_str(&values_to_source(&self.value)?);
        result.push(')');

        Ok(result)
    }
}

impl ToSource for Declaration {
    fn to_source(&self) -> Result<String, Error> {
        let mut result = format!("{}:", escape_ident(&self.name)?);
        result.push_str(&values_to_source(&self.value)?);
        if self.important {
            result.push_str("!important");
        }

        Ok(result)
    }
}

impl ToSource for DeclarationListItem {
    fn to_source(&self) -> Result<String, Error> {
        match self {
            DeclarationListItem::Declaration(declaration) => declaration.to_source(),
            DeclarationListItem::AtRule(at_rule) => at_rule.to_source(),
        }
    }
}

impl ToSource for AtRule {
    fn to_source(&self) -> Result<String, Error> {
        let mut result = format!("@{}", escape_ident(&self.name)?);
        result.push_str(&values_to_source(&self.prelude)?);
        match &self.block {
            Some(block) => result.push_str(&block.to_source()?),
            None => result.push(';'),
        }

        Ok(result)
    }
}

impl ToSource for QualifiedRule {
    fn to_source(&self) -> Result<String, Error> {
        let mut result = values_to_source(&self.prelude)?;
        result.push_str(&self.block.to_source()?);

        Ok(result)
    }
}

impl ToSource for Rule {
    fn to_source(&self) -> Result<String, Error> {
        match self {
            Rule::AtRule(at_rule) => at_rule.to_source(),
            Rule::QualifiedRule(qualified_rule) => qualified_rule.to_source(),
        }
    }
}

impl ToSource for Stylesheet {
    fn to_source(&self) -> Result<String, Error> {
        let sources = self
            .rules
            .iter()
            .map(Rule::to_source)
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(sources.join("\n"))
    }
}

fn values_to_source(values: &[ComponentValue]) -> Result<String, Error> {
    let mut result = String::new();
    for value in values {
        result.push_str(&value.to_source()?);
    }

    Ok(result)
}
