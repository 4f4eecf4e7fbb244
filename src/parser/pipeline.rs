// Pipeline parser for the binding DSL

use super::ast::Command;
use super::field::field;
use super::lexer::{identifier, name, ws};
use crate::aesthetic::Channel;
use crate::binding::{AxisKind, ChartBinding};
use crate::chart_type::ChartType;
use crate::error::{BindingError, ChartResult};
use crate::field::AggregateFormula;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{eof, map, map_res, value},
    multi::{separated_list0, separated_list1},
    sequence::delimited,
    IResult,
};
use tracing::debug;

fn parens<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(ws(char('(')), inner, ws(char(')')))
}

/// Parse an axis command
/// Format: x(field, ...) / y(...) / group(...)
fn parse_axis(input: &str) -> IResult<&str, Command> {
    let (input, axis) = ws(alt((
        value(AxisKind::X, tag("x")),
        value(AxisKind::Y, tag("y")),
        value(AxisKind::Group, tag("group")),
    )))(input)?;
    let (input, fields) = parens(separated_list0(ws(char(',')), field))(input)?;
    Ok((input, Command::Axis(axis, fields)))
}

/// Parse a global aesthetic command
/// Format: color(field) / shape(field) / size(field) / text(field)
fn parse_aesthetic(input: &str) -> IResult<&str, Command> {
    let (input, channel) = ws(alt((
        value(Channel::Color, tag("color")),
        value(Channel::Shape, tag("shape")),
        value(Channel::Size, tag("size")),
        value(Channel::Text, tag("text")),
    )))(input)?;
    let (input, f) = parens(field)(input)?;
    Ok((input, Command::Aesthetic(channel, f)))
}

fn parse_command(input: &str) -> IResult<&str, Command> {
    alt((
        map(preceded_keyword("source", name), Command::Source),
        map(preceded_keyword("path", field), Command::Path),
        map(
            preceded_keyword(
                "type",
                map_res(ws(identifier), |s| s.parse::<ChartType>()),
            ),
            Command::ChartType,
        ),
        map(
            preceded_keyword(
                "aggregate",
                map_res(ws(identifier), |s| s.parse::<AggregateFormula>()),
            ),
            Command::Aggregate,
        ),
        value(Command::MultiStyle, ws(tag("multi_style"))),
        value(Command::Separated, ws(tag("separated"))),
        parse_aesthetic,
        parse_axis,
    ))(input)
}

fn preceded_keyword<'a, F, O>(
    keyword: &'static str,
    inner: F,
) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    nom::sequence::preceded(ws(tag(keyword)), parens(inner))
}

/// Parse a complete binding pipeline
/// Format: command | command | ...
pub fn parse_pipeline(input: &str) -> IResult<&str, Vec<Command>> {
    let (input, commands) = separated_list1(ws(char('|')), parse_command)(input)?;
    let (input, _) = ws(eof)(input)?;
    Ok((input, commands))
}

/// Parses a binding pipeline into a design-time binding.
pub fn parse_binding(input: &str) -> ChartResult<ChartBinding> {
    let (_, commands) = parse_pipeline(input).map_err(|e| BindingError::Parse(describe(e)))?;

    let mut binding = ChartBinding::default();
    for command in commands {
        match command {
            Command::Source(source) => binding.source = source,
            Command::Axis(kind, fields) => {
                for f in fields {
                    binding.axis_mut(kind).push(f);
                }
            }
            Command::Aesthetic(channel, f) => {
                binding.aesthetics.bind(channel, f);
            }
            Command::Path(f) => binding.path = Some(f),
            Command::ChartType(chart_type) => binding.chart_type = chart_type,
            Command::Aggregate(formula) => binding.aggregate.default_formula = formula,
            Command::MultiStyle => binding.multi_style = true,
            Command::Separated => binding.separated = true,
        }
    }

    debug!(
        source = binding.source.as_str(),
        x = binding.x.len(),
        y = binding.y.len(),
        "parsed binding"
    );
    Ok(binding)
}

fn describe(err: nom::Err<nom::error::Error<&str>>) -> String {
    match err {
        nom::Err::Incomplete(_) => "incomplete input".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let snippet: String = e.input.chars().take(32).collect();
            if snippet.trim().is_empty() {
                "unexpected end of input".to_string()
            } else {
                format!("unexpected input at '{}'", snippet.trim())
            }
        }
    }
}
