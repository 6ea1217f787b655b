use super::*;
use crate::weather::WeeklyWeatherInfo;
use html::TokenError;
use std::io::{self, Cursor, Read};

const DAYS: [&str; 7] = ["周一", "周二", "周三", "周四", "周五", "周六", "周日"];

fn lenient() -> ParseOptions {
    ParseOptions::default()
}

fn strict(forecast_days: usize) -> ParseOptions {
    ParseOptions {
        schema: TableSchema {
            forecast_days,
            ..Default::default()
        },
        policy: ParsePolicy::Strict,
    }
}

fn page(rows: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>一周天气</title><style>th {{ color: red }}</style></head>
<body>
<table class="weekly">
<tbody>
{}
</tbody>
</table>
</body>
</html>"#,
        rows
    )
}

fn date_row(dates: &[&str]) -> String {
    let cells: String = dates
        .iter()
        .map(|d| format!("<th>{}</th>", d))
        .collect();
    format!(r#"<tr><th colspan="2"></th>{}</tr>"#, cells)
}

/// Two rows: the city's own row with its daytime cells, then the nighttime row
fn city_rows(city: &str, day: &[(&str, &str)], night: &[(&str, &str)]) -> String {
    let cells = |readings: &[(&str, &str)], prefix: &str| -> String {
        readings
            .iter()
            .map(|(icon, temp)| {
                format!(
                    r#"<td><img src="/icons/{}{}.png" width="20" alt="{}"/>
                    {}</td>"#,
                    prefix, icon, icon, temp
                )
            })
            .collect()
    };
    format!(
        r#"<tr><th rowspan="2" class="city">{}</th><td>白天</td>{}</tr>
<tr><td>晚上</td>{}</tr>"#,
        city,
        cells(day, "d"),
        cells(night, "n")
    )
}

fn week(icon: &str, base: i32) -> Vec<(String, String)> {
    (0..7)
        .map(|i| (icon.to_string(), format!("{}°", base + i)))
        .collect()
}

fn as_refs(readings: &[(String, String)]) -> Vec<(&str, &str)> {
    readings
        .iter()
        .map(|(i, t)| (i.as_str(), t.as_str()))
        .collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_reference_scenario() {
    let input = page(&format!(
        "{}\n{}",
        date_row(&["11/01(一)", "11/02(二)"]),
        city_rows("北京", &[("0", "25°")], &[("1", "15°")])
    ));
    let collection = parse_str(&input, &lenient()).unwrap().unwrap();
    assert_eq!(collection.dates(), ["11/01(一)", "11/02(二)"]);
    assert_eq!(collection.len(), 1);
    assert_eq!(
        collection.get("北京"),
        Some(&WeeklyWeatherInfo::new(
            "北京",
            strings(&["0:25°"]),
            strings(&["1:15°"])
        ))
    );
}

#[test]
fn test_full_week() {
    let beijing_day = week("0", 20);
    let beijing_night = week("1", 10);
    let shanghai_day = week("2", 24);
    let shanghai_night = week("3", 18);
    let input = page(&format!(
        "{}\n{}\n{}",
        date_row(&DAYS),
        city_rows("北京", &as_refs(&beijing_day), &as_refs(&beijing_night)),
        city_rows("上海", &as_refs(&shanghai_day), &as_refs(&shanghai_night)),
    ));
    // Every row has the expected shape, so strict parsing agrees with lenient parsing
    let collection = parse_str(&input, &strict(7)).unwrap().unwrap();
    assert_eq!(parse_str(&input, &lenient()).unwrap().unwrap(), collection);

    assert_eq!(collection.dates(), DAYS);
    assert_eq!(collection.cities().collect::<Vec<_>>(), ["上海", "北京"]);
    for info in collection.iter() {
        assert_eq!(info.day.len(), 7);
        assert_eq!(info.night.len(), 7);
    }
    let beijing = collection.get("北京").unwrap();
    assert_eq!(beijing.day[0], "0:20°");
    assert_eq!(beijing.day[6], "0:26°");
    assert_eq!(beijing.night[3], "1:13°");
    assert_eq!(collection.get("上海").unwrap().night[6], "3:24°");
}

#[test]
fn test_no_table() {
    let input = "<html><body><p>维护中</p></body></html>";
    assert_eq!(parse_str(input, &lenient()), Ok(None));
    assert_eq!(parse_str(input, &strict(7)), Ok(None));
    assert_eq!(parse_str("", &lenient()), Ok(None));
    assert_eq!(parse_html("".as_bytes(), &lenient()), Ok(None));
}

#[test]
fn test_unterminated_markup_before_table() {
    let input = r#"<p>loading<img src="spinner.gif"#;
    assert_eq!(parse_str(input, &lenient()), Ok(None));
    assert!(matches!(
        parse_str(input, &strict(7)),
        Err(ParseError::Token(TokenError::UnexpectedEof { .. }))
    ));
}

#[test]
fn test_parsing_is_repeatable() {
    let input = page(&format!(
        "{}\n{}",
        date_row(&DAYS),
        city_rows("广州", &as_refs(&week("7", 28)), &as_refs(&week("8", 22)))
    ));
    let first = parse_str(&input, &lenient()).unwrap();
    let second = parse_html(input.as_bytes(), &lenient()).unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn test_first_date_row_wins() {
    let input = page(&format!(
        "{}\n{}\n{}",
        date_row(&["11/01", "11/02"]),
        city_rows("北京", &[("0", "25°")], &[("1", "15°")]),
        date_row(&["12/01", "12/02", "12/03"]),
    ));
    let collection = parse_str(&input, &lenient()).unwrap().unwrap();
    assert_eq!(collection.dates(), ["11/01", "11/02"]);
    assert_eq!(collection.len(), 1);
}

#[test]
fn test_duplicate_city_last_write_wins() {
    let input = page(&format!(
        "{}\n{}\n{}",
        date_row(&["11/01"]),
        city_rows("北京", &[("0", "25°")], &[("1", "15°")]),
        city_rows("北京", &[("4", "5°")], &[("5", "-3°")]),
    ));
    let collection = parse_str(&input, &lenient()).unwrap().unwrap();
    assert_eq!(collection.len(), 1);
    assert_eq!(
        collection.get("北京"),
        Some(&WeeklyWeatherInfo::new(
            "北京",
            strings(&["4:5°"]),
            strings(&["5:-3°"])
        ))
    );
}

#[test]
fn test_period_markers_never_extracted() {
    let rows = r#"<tr><th colspan="7"> 白天 </th><th>11/01<br/>周一白天</th><th>
        11/02
        <span>(二)</span>
    </th><th>晚上</th></tr>
<tr><th>北京</th><td>白天</td><td><img alt="0"/>白天<br/>25°</td></tr>
<tr><th>晚上</th><td>晚上</td><td><img alt="1"/>15°<span>晚上</span></td></tr>"#;
    let collection = parse_str(&page(rows), &lenient()).unwrap().unwrap();
    assert_eq!(collection.dates(), ["11/01", "11/02:(二)"]);
    let beijing = collection.get("北京").unwrap();
    assert_eq!(beijing.day, ["0:25°"]);
    assert_eq!(beijing.night, ["1:15°"]);

    let extracted = collection
        .dates()
        .iter()
        .chain(beijing.day.iter())
        .chain(beijing.night.iter());
    for value in extracted {
        assert!(!value.contains("白天") && !value.contains("晚上"), "{}", value);
    }
}

#[test]
fn test_unclosed_date_cell_is_dropped() {
    let rows = r#"<tr><th class="dates">11/01</th><th>11/02</tr>"#;
    let collection = parse_str(&page(rows), &lenient()).unwrap().unwrap();
    assert_eq!(collection.dates(), ["11/01"]);
    assert!(collection.is_empty());
}

#[test]
fn test_missing_city_name() {
    let rows = r#"<tr><th colspan="2">11/01</th></tr>
<tr><th><b>北京</b></th><td><img alt="0"/>25°</td></tr>
<tr><td><img alt="1"/>15°</td></tr>"#;
    let collection = parse_str(&page(rows), &lenient()).unwrap().unwrap();
    assert_eq!(
        collection.get(""),
        Some(&WeeklyWeatherInfo::new(
            "",
            strings(&["北京:0:25°"]),
            strings(&["1:15°"])
        ))
    );
    assert_eq!(parse_str(&page(rows), &strict(1)), Err(ParseError::MissingCity));
}

#[test]
fn test_city_row_without_cells() {
    let rows = r#"<tr><th colspan="2">11/01</th></tr>
<tr><th></tr>
<tr><th>上海</th><td><img alt="2"/>20°</td></tr>
<tr><td><img alt="3"/>12°</td></tr>"#;
    let collection = parse_str(&page(rows), &lenient()).unwrap().unwrap();
    assert_eq!(collection.get(""), Some(&WeeklyWeatherInfo::default()));
    assert_eq!(collection.get("上海").unwrap().night, ["3:12°"]);
}

#[test]
fn test_truncated_table() {
    let input = format!(
        "<table><tbody>{}\n{}",
        date_row(&["11/01"]),
        city_rows("北京", &[("0", "25°")], &[("1", "15°")])
    );
    let collection = parse_str(&input, &lenient()).unwrap().unwrap();
    assert_eq!(collection.dates(), ["11/01"]);
    assert_eq!(collection.get("北京").unwrap().night, ["1:15°"]);
    assert_eq!(
        parse_str(&input, &strict(1)),
        Err(ParseError::UnexpectedEof("table body"))
    );
}

#[test]
fn test_token_error_inside_table() {
    let input = format!(
        r#"<table><tbody>{}<tr><th>北京</th><td><img alt="0"/>25°</td><td><img alt="1"#,
        date_row(&["11/01", "11/02"])
    );
    let collection = parse_str(&input, &lenient()).unwrap().unwrap();
    assert_eq!(collection.dates(), ["11/01", "11/02"]);
    assert_eq!(
        collection.get("北京"),
        Some(&WeeklyWeatherInfo::new("北京", strings(&["0:25°"]), vec![]))
    );
    assert!(matches!(
        parse_str(&input, &strict(2)),
        Err(ParseError::Token(TokenError::UnexpectedEof { .. }))
    ));
}

/// Hands out its markup, then fails the way a dropped connection does
struct ResetReader(Cursor<Vec<u8>>);

impl Read for ResetReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::Other, "connection reset")),
            n => Ok(n),
        }
    }
}

fn reset_after(markup: &str) -> ResetReader {
    ResetReader(Cursor::new(markup.as_bytes().to_vec()))
}

#[test]
fn test_read_error_inside_table_body() {
    let markup = format!(
        "<table><tbody>{}\n{}\n<tr><th>上海</th><td>",
        date_row(&["11/01"]),
        city_rows("北京", &[("0", "25°")], &[("1", "15°")])
    );

    let collection = parse_html(reset_after(&markup), &lenient()).unwrap().unwrap();
    assert_eq!(collection.dates(), ["11/01"]);
    assert_eq!(
        collection.get("北京"),
        Some(&WeeklyWeatherInfo::new(
            "北京",
            strings(&["0:25°"]),
            strings(&["1:15°"])
        ))
    );
    assert_eq!(
        collection.get("上海"),
        Some(&WeeklyWeatherInfo::new("上海", vec![], vec![]))
    );

    assert_eq!(
        parse_html(reset_after(&markup), &strict(1)),
        Err(ParseError::Token(TokenError::Read(
            "connection reset".to_string()
        )))
    );
}

#[test]
fn test_missing_header_cell() {
    let rows = r#"<tr><td>广告</td></tr>
<tr><th colspan="2">11/01</th></tr>"#;
    let collection = parse_str(&page(rows), &lenient()).unwrap().unwrap();
    assert_eq!(collection.dates(), ["11/01"]);
    assert_eq!(
        parse_str(&page(rows), &strict(7)),
        Err(ParseError::MissingHeaderCell)
    );
}

#[test]
fn test_missing_icon() {
    let rows = r#"<tr><th>北京</th><td><img src="/d0.png"/>25°</td></tr>
<tr><td><img src="/n1.png" alt="1">15°</td></tr>"#;
    let collection = parse_str(&page(rows), &lenient()).unwrap().unwrap();
    let beijing = collection.get("北京").unwrap();
    assert_eq!(beijing.day, ["25°"]);
    // A plain start tag works as well as a self-closing one
    assert_eq!(beijing.night, ["1:15°"]);
    assert_eq!(
        parse_str(&page(rows), &strict(1)),
        Err(ParseError::MissingIcon {
            city: "北京".to_string(),
            period: Period::Day,
        })
    );
}

#[test]
fn test_positional_icon() {
    let rows = r#"<tr><th>北京</th><td><img src="/d0.png" width="20" title="晴"/>25°</td></tr>
<tr><td><img src="/n1.png" width="20" title="多云"/>15°</td></tr>"#;
    let options = ParseOptions {
        schema: TableSchema {
            forecast_days: 1,
            icon: IconSource::Position(2),
        },
        policy: ParsePolicy::Strict,
    };
    let collection = parse_str(&page(rows), &options).unwrap().unwrap();
    let beijing = collection.get("北京").unwrap();
    assert_eq!(beijing.day, ["晴:25°"]);
    assert_eq!(beijing.night, ["多云:15°"]);
}

#[test]
fn test_period_mismatch() {
    let rows = r#"<tr><th>北京</th><td>晚上</td><td><img alt="1"/>15°</td></tr>
<tr><td>白天</td><td><img alt="0"/>25°</td></tr>"#;
    let collection = parse_str(&page(rows), &lenient()).unwrap().unwrap();
    assert_eq!(collection.get("北京").unwrap().day, ["1:15°"]);
    assert_eq!(
        parse_str(&page(rows), &strict(1)),
        Err(ParseError::PeriodMismatch {
            city: "北京".to_string(),
            expected: Period::Day,
            found: Period::Night,
        })
    );
}

#[test]
fn test_day_count() {
    let input = page(&format!(
        "{}\n{}",
        date_row(&["11/01", "11/02"]),
        city_rows("北京", &[("0", "25°")], &[("1", "15°")])
    ));
    assert_eq!(
        parse_str(&input, &strict(7)),
        Err(ParseError::DayCount {
            city: "北京".to_string(),
            period: Period::Day,
            expected: 7,
            found: 1,
        })
    );
    // Lenient parsing keeps short weeks as they are
    let collection = parse_str(&input, &lenient()).unwrap().unwrap();
    assert_eq!(collection.get("北京").unwrap().day.len(), 1);
}

#[test]
fn test_demo_page() {
    let input = include_str!("../../demos/weekly.html");
    let collection = parse_html(input.as_bytes(), &strict(3)).unwrap().unwrap();
    assert_eq!(collection.dates(), ["11/01:(一)", "11/02:(二)", "11/03:(三)"]);
    assert_eq!(
        collection.get("北京"),
        Some(&WeeklyWeatherInfo::new(
            "北京",
            strings(&["0:12°", "1:10°", "7:8°"]),
            strings(&["0:1°", "1:-1°", "2:-3°"])
        ))
    );
    assert_eq!(collection.get("上海").unwrap().night, ["7:13°", "8:12°", "1:11°"]);
}
