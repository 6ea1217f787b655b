use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_till, take_till1, take_until, take_while, take_while1},
    character::complete::{
        alpha1, char, digit1, hex_digit1, multispace0, multispace1, one_of, satisfy,
    },
    combinator::{map, map_opt, not, recognize, verify},
    multi::many0,
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

use super::{Attribute, Tag, Token};

/// Elements whose contents are not markup
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

pub(crate) fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// Parse the next token of the document
pub(crate) fn token(input: &str) -> IResult<&str, Token> {
    alt((
        parse_text,
        parse_comment,
        parse_processing_instruction,
        parse_declaration,
        parse_close_tag,
        parse_bogus_close_tag,
        parse_open_tag,
        parse_bogus_open_tag,
        parse_stray_angle,
    ))(input)
}

/// Split off the contents of a raw text element up to (not including) `</end_tag`
pub(crate) fn raw_text<'a>(input: &'a str, end_tag: &str) -> (&'a str, &'a str) {
    // ASCII lowercasing keeps byte offsets intact
    let haystack = input.to_ascii_lowercase();
    let end = haystack
        .find(&format!("</{}", end_tag))
        .unwrap_or(input.len());
    (&input[end..], &input[..end])
}

/// Attempt to parse a string as a valid tag name
fn parse_tag_name(input: &str) -> IResult<&str, String> {
    let name = verify(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == ':'),
        |s: &str| s.starts_with(|c: char| c.is_ascii_alphabetic()),
    );
    map(name, |s: &str| s.to_ascii_lowercase())(input)
}

/// Parse the content up to the next tag, returning the decoded text
fn parse_text(input: &str) -> IResult<&str, Token> {
    let (remaining, res) = take_till1(|c: char| c == '<')(input)?;
    Ok((remaining, Token::Text(decode_entities(res))))
}

/// Parse a `<` that cannot start any tag, along with the text after it
fn parse_stray_angle(input: &str) -> IResult<&str, Token> {
    let starts_tag = satisfy(|c: char| c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?');
    let (remaining, res) = recognize(pair(
        terminated(char('<'), not(starts_tag)),
        take_till(|c: char| c == '<'),
    ))(input)?;
    Ok((remaining, Token::Text(decode_entities(res))))
}

fn parse_comment(input: &str) -> IResult<&str, Token> {
    let (remaining, res) = delimited(tag("<!--"), take_until("-->"), tag("-->"))(input)?;
    Ok((remaining, Token::Comment(res.to_string())))
}

/// `<?xml ...?>` is kept as a comment
fn parse_processing_instruction(input: &str) -> IResult<&str, Token> {
    let (remaining, res) = delimited(tag("<?"), take_until(">"), char('>'))(input)?;
    Ok((remaining, Token::Comment(res.to_string())))
}

fn parse_declaration(input: &str) -> IResult<&str, Token> {
    let (remaining, res) = delimited(tag("<!"), take_until(">"), char('>'))(input)?;
    Ok((remaining, Token::Doctype(res.trim().to_string())))
}

/// Parse a tag in the form `</name>`, returning `name`
fn parse_close_tag(input: &str) -> IResult<&str, Token> {
    let (remaining, (_, name, _, _)) =
        tuple((tag("</"), parse_tag_name, take_until(">"), char('>')))(input)?;
    Ok((remaining, Token::EndTag(name)))
}

/// `</3>` and friends are not end tags, keep them as comments
fn parse_bogus_close_tag(input: &str) -> IResult<&str, Token> {
    let (remaining, res) = delimited(tag("</"), take_until(">"), char('>'))(input)?;
    Ok((remaining, Token::Comment(res.to_string())))
}

/// Parse a tag in the form `<name attr=value ...>` or `<name attr=value .../>`
fn parse_open_tag(input: &str) -> IResult<&str, Token> {
    let (remaining, (_, name, attributes, _, end)) = tuple((
        char('<'),
        parse_tag_name,
        many0(preceded(multispace1, single_attr_parser)),
        multispace0,
        alt((tag("/>"), tag(">"))),
    ))(input)?;
    let element = Tag::new(name, attributes);
    if end == "/>" {
        Ok((remaining, Token::SelfClosingTag(element)))
    } else {
        Ok((remaining, Token::StartTag(element)))
    }
}

/// A start tag whose attributes make no sense; keep the name and drop the rest
fn parse_bogus_open_tag(input: &str) -> IResult<&str, Token> {
    let (remaining, (_, name, _, _)) =
        tuple((char('<'), parse_tag_name, take_until(">"), char('>')))(input)?;
    Ok((remaining, Token::StartTag(Tag::new(name, vec![]))))
}

// Attribute parsing below

fn parse_single_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('\''), take_while(|c: char| c != '\''), char('\''))(input)
}

fn parse_double_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c: char| c != '"'), char('"'))(input)
}

fn parse_unquoted(input: &str) -> IResult<&str, &str> {
    is_not(" \t\r\n\"'=<>`")(input)
}

fn value_parser(input: &str) -> IResult<&str, &str> {
    alt((parse_single_quoted, parse_double_quoted, parse_unquoted))(input)
}

fn name_parser(input: &str) -> IResult<&str, &str> {
    is_not(" \t\r\n\"'>/=")(input)
}

fn single_attr_parser(input: &str) -> IResult<&str, Attribute> {
    let equals = tuple((multispace0, char('='), multispace0));
    let mut key_value = separated_pair(name_parser, equals, value_parser);
    let (r, (k, v)) = if let Ok(res) = key_value(input) {
        res
    } else {
        let (r, k) = name_parser(input)?;
        (r, (k, ""))
    };
    Ok((r, Attribute::new(k.to_ascii_lowercase(), decode_entities(v))))
}

// Character references below

fn parse_numeric_reference(input: &str) -> IResult<&str, char> {
    let hex = map_opt(preceded(one_of("xX"), hex_digit1), |h: &str| {
        u32::from_str_radix(h, 16).ok().and_then(char::from_u32)
    });
    let decimal = map_opt(digit1, |d: &str| {
        d.parse::<u32>().ok().and_then(char::from_u32)
    });
    preceded(char('#'), alt((hex, decimal)))(input)
}

fn parse_named_reference(input: &str) -> IResult<&str, char> {
    map_opt(alpha1, |name: &str| match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    })(input)
}

fn parse_reference(input: &str) -> IResult<&str, char> {
    delimited(
        char('&'),
        alt((parse_numeric_reference, parse_named_reference)),
        char(';'),
    )(input)
}

/// Replaces the common named references and all numeric character references.
/// Anything that does not parse as a reference is kept verbatim.
pub(crate) fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        if let Ok((remaining, c)) = parse_reference(rest) {
            out.push(c);
            rest = remaining;
        } else {
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
#[test]
fn test_tag_parse() {
    let data = r#"<div>"#;
    let target = Token::StartTag(Tag::new("div", vec![]));
    assert_eq!(parse_open_tag(data).unwrap(), ("", target));

    let data = r#"<TD class=nothing>"#;
    let target = Token::StartTag(Tag::new("td", vec![Attribute::new("class", "nothing")]));
    assert_eq!(parse_open_tag(data).unwrap(), ("", target));

    let data = r#"<div attr1 attr2=two attr3='three' attr4 = "number four">"#;
    let target = Token::StartTag(Tag::new(
        "div",
        vec![
            Attribute::new("attr1", ""),
            Attribute::new("attr2", "two"),
            Attribute::new("attr3", "three"),
            Attribute::new("attr4", "number four"),
        ],
    ));
    assert_eq!(parse_open_tag(data).unwrap(), ("", target));
}

#[cfg(test)]
#[test]
fn test_self_closing_parse() {
    let data = r#"<img src="/icons/d01.png" alt="1" />rest"#;
    let target = Token::SelfClosingTag(Tag::new(
        "img",
        vec![
            Attribute::new("src", "/icons/d01.png"),
            Attribute::new("alt", "1"),
        ],
    ));
    assert_eq!(parse_open_tag(data).unwrap(), ("rest", target));
    assert_eq!(
        parse_open_tag("<br/>").unwrap(),
        ("", Token::SelfClosingTag(Tag::new("br", vec![])))
    );
}

#[cfg(test)]
#[test]
fn test_close_tag_parse() {
    assert_eq!(
        parse_close_tag("</TBody >x").unwrap(),
        ("x", Token::EndTag("tbody".to_string()))
    );
    assert!(parse_close_tag("</3>").is_err());
    assert_eq!(
        token("</3>").unwrap(),
        ("", Token::Comment("3".to_string()))
    );
}

#[cfg(test)]
#[test]
fn test_decode_entities() {
    assert_eq!(decode_entities("a &amp; b"), "a & b");
    assert_eq!(decode_entities("&lt;&#176;&#x4E00;&gt;"), "<°一>");
    assert_eq!(decode_entities("AT&T &bogus; &"), "AT&T &bogus; &");
}

#[cfg(test)]
#[test]
fn test_raw_text() {
    let (rest, text) = raw_text("if (a < b) {}</SCRIPT>", "script");
    assert_eq!(text, "if (a < b) {}");
    assert_eq!(rest, "</SCRIPT>");
}

