use std::collections::BTreeMap;
use std::fmt;

/// Forecast day labels in document order
pub type Dates = Vec<String>;
/// Per-day `icon:temperature` readings in document order
pub type Temperatures = Vec<String>;

/// One city's week of daytime and nighttime readings
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct WeeklyWeatherInfo {
    pub city: String,
    pub day: Temperatures,
    pub night: Temperatures,
}

impl WeeklyWeatherInfo {
    pub fn new(city: impl Into<String>, day: Temperatures, night: Temperatures) -> Self {
        Self {
            city: city.into(),
            day,
            night,
        }
    }
}

/// Everything extracted from one weather table.
///
/// The date labels are shared by every city. Cities are keyed by name, and a
/// later record for the same city replaces the earlier one.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct WeatherInfoCollection {
    dates: Dates,
    weathers: BTreeMap<String, WeeklyWeatherInfo>,
}

impl WeatherInfoCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    pub fn has_dates(&self) -> bool {
        !self.dates.is_empty()
    }

    /// Sets the date labels unless they are already set or `dates` is empty.
    /// Returns whether they were stored.
    pub fn set_dates(&mut self, dates: Dates) -> bool {
        if self.has_dates() || dates.is_empty() {
            return false;
        }
        self.dates = dates;
        true
    }

    /// Stores `info` under its city name, returning the record it replaced
    pub fn insert(&mut self, info: WeeklyWeatherInfo) -> Option<WeeklyWeatherInfo> {
        self.weathers.insert(info.city.clone(), info)
    }

    #[cfg(test)]
    pub fn get(&self, city: &str) -> Option<&WeeklyWeatherInfo> {
        self.weathers.get(city)
    }

    #[cfg(test)]
    pub fn cities(&self) -> impl Iterator<Item = &str> {
        self.weathers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeeklyWeatherInfo> {
        self.weathers.values()
    }

    pub fn len(&self) -> usize {
        self.weathers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weathers.is_empty()
    }
}

impl fmt::Display for WeatherInfoCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for info in self.iter() {
            writeln!(f, "{}", info.city)?;
            let days = self.dates.len().max(info.day.len()).max(info.night.len());
            for i in 0..days {
                let cell = |list: &[String]| list.get(i).cloned().unwrap_or_else(|| "-".into());
                writeln!(
                    f,
                    "  {:<12} day {:<16} night {}",
                    cell(&self.dates),
                    cell(&info.day),
                    cell(&info.night)
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[test]
fn test_dates_set_once() {
    let mut collection = WeatherInfoCollection::new();
    assert!(!collection.has_dates());
    assert!(!collection.set_dates(vec![]));
    assert!(!collection.has_dates());
    assert!(collection.set_dates(vec!["11/01".into()]));
    assert!(!collection.set_dates(vec!["12/01".into()]));
    assert_eq!(collection.dates(), ["11/01"]);
}

#[cfg(test)]
#[test]
fn test_insert_replaces_city() {
    let mut collection = WeatherInfoCollection::new();
    let first = WeeklyWeatherInfo::new("北京", vec!["0:25°".into()], vec![]);
    let second = WeeklyWeatherInfo::new("北京", vec!["1:20°".into()], vec![]);
    assert_eq!(collection.insert(first.clone()), None);
    assert_eq!(collection.insert(second.clone()), Some(first));
    assert_eq!(collection.len(), 1);
    assert_eq!(collection.get("北京"), Some(&second));
    assert_eq!(collection.cities().collect::<Vec<_>>(), ["北京"]);
}

#[cfg(test)]
#[test]
fn test_display() {
    let mut collection = WeatherInfoCollection::new();
    collection.set_dates(vec!["11/01".into(), "11/02".into()]);
    collection.insert(WeeklyWeatherInfo::new(
        "Oslo",
        vec!["0:5°".into()],
        vec!["1:-2°".into()],
    ));
    let target = format!(
        "Oslo\n  {:<12} day {:<16} night 1:-2°\n  {:<12} day {:<16} night -\n",
        "11/01", "0:5°", "11/02", "-"
    );
    assert_eq!(collection.to_string(), target);
}
