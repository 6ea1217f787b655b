use html::Tag;
use std::fmt;

pub const TAG_TABLE: &str = "table";
pub const TAG_TABLE_BODY: &str = "tbody";
pub const TAG_ROW: &str = "tr";
pub const TAG_HEADER_CELL: &str = "th";
pub const TAG_DATA_CELL: &str = "td";
pub const TAG_IMAGE: &str = "img";

/// Label fragments that mark the daytime and nighttime halves of a city
pub const DAY_MARKER: &str = "白天";
pub const NIGHT_MARKER: &str = "晚上";

/// Joins the fragments of one date or one reading
pub const SEPARATOR: char = ':';

pub const FORECAST_DAYS: usize = 7;

/// Number of attributes on the first `<th>` of a date row
pub const DATE_HEADER_ATTRIBUTES: usize = 1;

/// Where the weather icon identifier lives on an `<img>` tag
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum IconSource {
    /// Value of the attribute with this name
    Attribute(String),
    /// Value of the attribute at this position, for markup that does not name it consistently
    Position(usize),
}

impl IconSource {
    pub fn lookup<'t>(&self, tag: &'t Tag) -> Option<&'t str> {
        match self {
            IconSource::Attribute(name) => tag.attribute(name),
            IconSource::Position(index) => tag.attribute_at(*index),
        }
    }
}

impl Default for IconSource {
    fn default() -> Self {
        Self::Attribute("alt".to_string())
    }
}

/// Which half of a city's forecast is being read
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Period {
    Day,
    Night,
}

impl Period {
    pub fn marker(self) -> &'static str {
        match self {
            Period::Day => DAY_MARKER,
            Period::Night => NIGHT_MARKER,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Period::Day => Period::Night,
            Period::Night => Period::Day,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Day => write!(f, "day"),
            Period::Night => write!(f, "night"),
        }
    }
}

/// The parts of the table layout that vary between sources
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TableSchema {
    pub forecast_days: usize,
    pub icon: IconSource,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            forecast_days: FORECAST_DAYS,
            icon: IconSource::default(),
        }
    }
}

/// What to do with markup that does not have the expected shape
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum ParsePolicy {
    /// Keep going and return whatever could be extracted
    #[default]
    Lenient,
    /// Stop at the first problem with a [`ParseError`](super::ParseError)
    Strict,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ParseOptions {
    pub schema: TableSchema,
    pub policy: ParsePolicy,
}

/// Trims a text fragment and drops it if it is empty or carries a period marker
pub fn wanted_text(text: &str) -> Option<&str> {
    let text = text.trim();
    if text.is_empty() || text.contains(DAY_MARKER) || text.contains(NIGHT_MARKER) {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
#[test]
fn test_wanted_text() {
    assert_eq!(wanted_text("  25°\n"), Some("25°"));
    assert_eq!(wanted_text(" \t "), None);
    assert_eq!(wanted_text("白天"), None);
    assert_eq!(wanted_text("周一晚上"), None);
}

#[cfg(test)]
#[test]
fn test_icon_lookup() {
    use html::Attribute;
    let img = Tag::new(
        "img",
        vec![
            Attribute::new("src", "/d01.png"),
            Attribute::new("width", "20"),
            Attribute::new("alt", "1"),
        ],
    );
    assert_eq!(IconSource::default().lookup(&img), Some("1"));
    assert_eq!(IconSource::Position(0).lookup(&img), Some("/d01.png"));
    assert_eq!(IconSource::Attribute("title".into()).lookup(&img), None);
}
