// Lexical helpers shared by the binding DSL parsers

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0_count,
    sequence::{delimited, pair, tuple},
    IResult,
};

/// Wraps a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Identifier: letter or underscore, then letters, digits, underscores
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Double-quoted string with `\"` and `\\` escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        // Empty string
        value(String::new(), tag("\"\"")),
        delimited(
            char('"'),
            escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", char('\\')), value("\"", char('"')))),
            ),
            char('"'),
        ),
    ))(input)
}

/// Unsigned or signed decimal number
pub fn number_literal(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

/// A field or query name: bare identifier or quoted string
pub fn name(input: &str) -> IResult<&str, String> {
    alt((identifier, string_literal))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("Order_Date rest"), Ok((" rest", "Order_Date".to_string())));
        assert!(identifier("1abc").is_err());
    }

    #[test]
    fn test_string_literal_escapes() {
        let (_, s) = string_literal(r#""Ship \"Mode\"""#).unwrap();
        assert_eq!(s, "Ship \"Mode\"");
        assert_eq!(string_literal("\"\"").unwrap().1, "");
    }

    #[test]
    fn test_number_literal() {
        assert_eq!(number_literal("42").unwrap().1, 42.0);
        assert_eq!(number_literal("-1.5)").unwrap(), (")", -1.5));
    }

    #[test]
    fn test_ws_wrapper() {
        let (rest, id) = ws(identifier)("   Region  , x").unwrap();
        assert_eq!(id, "Region");
        assert_eq!(rest, ", x");
    }
}
