use log::debug;

use crate::location::Location;

/// Parse error that defines an error (message) on the given position
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    /// Parse message
    pub message: String,
    /// Position of the error in the source. Errors raised while parsing a
    /// bare token stream carry no position.
    pub location: Option<Location>,
}

/// Collects the recoverable parse errors encountered during tokenizing and
/// parsing. Tokenizer and parser share a single logger so a full parse leaves
/// one consolidated list behind.
#[derive(Clone, Default)]
pub struct ErrorLogger {
    errors: Vec<ParseError>,
}

impl ErrorLogger {
    pub fn new() -> Self {
        ErrorLogger { errors: Vec::new() }
    }

    /// Returns the errors recorded so far
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Adds a new error to the error logger. An error that was already
    /// recorded at the same position with the same message is ignored.
    pub fn add_error(&mut self, location: Option<Location>, message: &str) {
        for error in &self.errors {
            if error.location == location && error.message == message {
                return;
            }
        }

        match location {
            Some(location) => debug!("parse error: {message} at {location}"),
            None => debug!("parse error: {message}"),
        }

        self.errors.push(ParseError {
            message: message.to_string(),
            location,
        });
    }
}
