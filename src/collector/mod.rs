use html::{Token, TokenError, Tokenizer};
use std::io::Read;
use tracing::{debug, span, warn, Level};

use crate::weather::WeatherInfoCollection;

mod rows;
pub mod schema;
#[cfg(test)]
mod tests;

pub use schema::{IconSource, ParseOptions, ParsePolicy, Period, TableSchema};
use schema::TAG_TABLE;

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("input ended inside the {0}")]
    UnexpectedEof(&'static str),
    #[error("table row has no header cell")]
    MissingHeaderCell,
    #[error("city row does not start with a city name")]
    MissingCity,
    #[error("{city}: {period} forecast image has no icon identifier")]
    MissingIcon { city: String, period: Period },
    #[error("{city}: {found} marker inside the {expected} forecast")]
    PeriodMismatch {
        city: String,
        expected: Period,
        found: Period,
    },
    #[error("{city}: expected {expected} {period} forecasts, found {found}")]
    DayCount {
        city: String,
        period: Period,
        expected: usize,
        found: usize,
    },
}

/// The single cursor shared by every extraction step.
///
/// Each step pulls tokens until its own terminator and leaves the cursor just
/// past it. Whether a problem stops the parse is decided here, by the policy.
pub(crate) struct TokenStream<'o> {
    tokens: Tokenizer,
    pub options: &'o ParseOptions,
}

impl<'o> TokenStream<'o> {
    pub fn new(tokens: Tokenizer, options: &'o ParseOptions) -> Self {
        Self { tokens, options }
    }

    /// The next token, or `None` once the input is exhausted.
    ///
    /// Under the lenient policy a tokenizer error is the end of input.
    pub fn next(&mut self) -> Result<Option<Token>, ParseError> {
        match self.tokens.next() {
            None => Ok(None),
            Some(Ok(token)) => Ok(Some(token)),
            Some(Err(e)) => {
                self.reject(e.into())?;
                Ok(None)
            }
        }
    }

    /// Fails with `error` under the strict policy, logs it otherwise
    pub fn reject(&self, error: ParseError) -> Result<(), ParseError> {
        match self.options.policy {
            ParsePolicy::Strict => Err(error),
            ParsePolicy::Lenient => {
                warn!(%error, offset = self.tokens.offset(), "Ignoring malformed table");
                Ok(())
            }
        }
    }
}

/// Parses the first weather table found in `reader`.
///
/// Returns `Ok(None)` when the input has no `<table>` at all.
pub fn parse_html(
    reader: impl Read,
    options: &ParseOptions,
) -> Result<Option<WeatherInfoCollection>, ParseError> {
    let span = span!(Level::DEBUG, "Parsing weekly weather");
    let _enter = span.enter();
    let mut stream = TokenStream::new(Tokenizer::from_reader(reader), options);
    locate_table(&mut stream)
}

#[cfg(test)]
pub fn parse_str(
    input: &str,
    options: &ParseOptions,
) -> Result<Option<WeatherInfoCollection>, ParseError> {
    let span = span!(Level::DEBUG, "Parsing weekly weather");
    let _enter = span.enter();
    let mut stream = TokenStream::new(Tokenizer::new(input), options);
    locate_table(&mut stream)
}

fn locate_table(stream: &mut TokenStream) -> Result<Option<WeatherInfoCollection>, ParseError> {
    while let Some(token) = stream.next()? {
        if token.is_start(TAG_TABLE) {
            debug!("Found weather table");
            return rows::walk_rows(stream).map(Some);
        }
    }
    debug!("No weather table in input");
    Ok(None)
}
