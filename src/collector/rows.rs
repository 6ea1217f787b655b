use html::{Tag, Token};
use tracing::{debug, trace};

use super::schema::{
    wanted_text, Period, DATE_HEADER_ATTRIBUTES, SEPARATOR, TAG_DATA_CELL, TAG_HEADER_CELL,
    TAG_IMAGE, TAG_ROW, TAG_TABLE_BODY,
};
use super::{ParseError, TokenStream};
use crate::weather::{Dates, Temperatures, WeatherInfoCollection, WeeklyWeatherInfo};

/// What ended an extraction step
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Stop {
    /// `</tr>`
    Row,
    /// `</tbody>`, nothing more to walk
    Body,
    /// The input ran out first
    Input,
}

fn stop_at(token: &Token) -> Option<Stop> {
    if token.is_end(TAG_ROW) {
        Some(Stop::Row)
    } else if token.is_end(TAG_TABLE_BODY) {
        Some(Stop::Body)
    } else {
        None
    }
}

enum Header {
    Cell(Tag),
    Missing(Stop),
}

/// Collects the text fragments of one date label or one reading
#[derive(Default)]
struct Fragments(String);

impl Fragments {
    fn push(&mut self, fragment: &str) {
        self.0.push(SEPARATOR);
        self.0.push_str(fragment);
    }

    /// Finishes the current value and starts a new one
    fn take(&mut self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        let value = std::mem::take(&mut self.0);
        Some(value[SEPARATOR.len_utf8()..].to_string())
    }
}

/// Walks the rows of the table body, dispatching each to the date or city extractor
pub(super) fn walk_rows(stream: &mut TokenStream) -> Result<WeatherInfoCollection, ParseError> {
    let mut collection = WeatherInfoCollection::new();
    loop {
        let token = match stream.next()? {
            Some(token) => token,
            None => {
                stream.reject(ParseError::UnexpectedEof("table body"))?;
                break;
            }
        };
        if token.is_end(TAG_TABLE_BODY) {
            break;
        }
        if !token.is_start(TAG_ROW) {
            continue;
        }
        let stop = match find_header_cell(stream)? {
            Header::Cell(th) if th.attributes.len() == DATE_HEADER_ATTRIBUTES => {
                date_row(stream, &mut collection)?
            }
            Header::Cell(_) => city_row(stream, &mut collection)?,
            Header::Missing(stop) => {
                if stop == Stop::Row {
                    stream.reject(ParseError::MissingHeaderCell)?;
                }
                stop
            }
        };
        match stop {
            Stop::Row => continue,
            Stop::Body => break,
            Stop::Input => {
                stream.reject(ParseError::UnexpectedEof("table body"))?;
                break;
            }
        }
    }
    debug!(
        cities = collection.len(),
        dates = collection.dates().len(),
        "Finished weather table"
    );
    Ok(collection)
}

/// Skips to the first `<th>` of the row; its attributes tell what the row holds
fn find_header_cell(stream: &mut TokenStream) -> Result<Header, ParseError> {
    while let Some(token) = stream.next()? {
        if let Some(stop) = stop_at(&token) {
            return Ok(Header::Missing(stop));
        }
        if let Token::StartTag(tag) = token {
            if tag.name == TAG_HEADER_CELL {
                return Ok(Header::Cell(tag));
            }
        }
    }
    Ok(Header::Missing(Stop::Input))
}

fn skip_row(stream: &mut TokenStream) -> Result<Stop, ParseError> {
    while let Some(token) = stream.next()? {
        if let Some(stop) = stop_at(&token) {
            return Ok(stop);
        }
    }
    Ok(Stop::Input)
}

fn date_row(
    stream: &mut TokenStream,
    collection: &mut WeatherInfoCollection,
) -> Result<Stop, ParseError> {
    if collection.has_dates() {
        trace!("Skipping repeated date row");
        return skip_row(stream);
    }
    let (dates, stop) = parse_dates(stream)?;
    debug!(?dates, "Dates");
    collection.set_dates(dates);
    Ok(stop)
}

/// Reads one label per header cell until the end of the row.
/// A label whose cell never closes is dropped.
fn parse_dates(stream: &mut TokenStream) -> Result<(Dates, Stop), ParseError> {
    let mut dates = Dates::new();
    let mut date = Fragments::default();
    while let Some(token) = stream.next()? {
        if let Some(stop) = stop_at(&token) {
            return Ok((dates, stop));
        }
        match &token {
            Token::EndTag(name) if name == TAG_HEADER_CELL => dates.extend(date.take()),
            Token::Text(text) => {
                if let Some(text) = wanted_text(text) {
                    date.push(text);
                }
            }
            _ => {}
        }
    }
    Ok((dates, Stop::Input))
}

/// A city takes two rows: its own row holds the daytime cells, the next one the nighttime cells
fn city_row(
    stream: &mut TokenStream,
    collection: &mut WeatherInfoCollection,
) -> Result<Stop, ParseError> {
    let (city, stop) = parse_city(stream)?;
    let (day, night, stop) = match stop {
        Some(stop) => (Temperatures::new(), Temperatures::new(), stop),
        None => {
            let (day, stop) = parse_temperatures(stream, Period::Day, &city)?;
            if stop == Stop::Row {
                let (night, stop) = parse_temperatures(stream, Period::Night, &city)?;
                (day, night, stop)
            } else {
                (day, Temperatures::new(), stop)
            }
        }
    };
    let info = WeeklyWeatherInfo::new(city, day, night);
    check_day_count(stream, &info)?;
    debug!(
        city = %info.city,
        day = info.day.len(),
        night = info.night.len(),
        "City"
    );
    if let Some(old) = collection.insert(info) {
        trace!(city = %old.city, "Replaced earlier record");
    }
    Ok(stop)
}

/// The city name is the token right after the header cell opens.
/// Also reports the end of the row if that token was the end tag.
fn parse_city(stream: &mut TokenStream) -> Result<(String, Option<Stop>), ParseError> {
    let token = stream.next()?;
    if let Some(text) = token.as_ref().and_then(Token::text) {
        return Ok((text.trim().to_string(), None));
    }
    stream.reject(ParseError::MissingCity)?;
    let stop = match &token {
        Some(token) => stop_at(token),
        None => Some(Stop::Input),
    };
    Ok((String::new(), stop))
}

/// Reads one `icon:temperature` reading per data cell until the end of the row
fn parse_temperatures(
    stream: &mut TokenStream,
    period: Period,
    city: &str,
) -> Result<(Temperatures, Stop), ParseError> {
    let mut readings = Temperatures::new();
    let mut reading = Fragments::default();
    while let Some(token) = stream.next()? {
        if let Some(stop) = stop_at(&token) {
            return Ok((readings, stop));
        }
        // Start or self-closing, `<img>` has no end tag
        if let Some(img) = token.tag().filter(|tag| tag.name == TAG_IMAGE) {
            let icon = stream
                .options
                .schema
                .icon
                .lookup(img)
                .map(str::trim)
                .filter(|icon| !icon.is_empty());
            match icon {
                Some(icon) => reading.push(icon),
                None => stream.reject(ParseError::MissingIcon {
                    city: city.to_string(),
                    period,
                })?,
            }
            continue;
        }
        match &token {
            Token::EndTag(name) if name == TAG_DATA_CELL => readings.extend(reading.take()),
            Token::Text(text) => {
                if text.contains(period.other().marker()) {
                    stream.reject(ParseError::PeriodMismatch {
                        city: city.to_string(),
                        expected: period,
                        found: period.other(),
                    })?;
                }
                if let Some(text) = wanted_text(text) {
                    reading.push(text);
                }
            }
            _ => {}
        }
    }
    Ok((readings, Stop::Input))
}

fn check_day_count(stream: &TokenStream, info: &WeeklyWeatherInfo) -> Result<(), ParseError> {
    let expected = stream.options.schema.forecast_days;
    for (period, readings) in [(Period::Day, &info.day), (Period::Night, &info.night)] {
        if readings.len() != expected {
            stream.reject(ParseError::DayCount {
                city: info.city.clone(),
                period,
                expected,
                found: readings.len(),
            })?;
        }
    }
    Ok(())
}
