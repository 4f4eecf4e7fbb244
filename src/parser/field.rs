// Field expression parser for the binding DSL
//
//   Region                      plain dimension
//   "Ship Mode"                 quoted name
//   month(OrderDate)[ts]        date dimension at a level
//   sum(Sales)[running_total]   measure with modifiers
//   measure(Sales)              measure with the binding's default formula
//   $picked / sum($measures)    parameter-bound
//   expr("Sales_$year")         script-bound
//   drill(Country > State, depth: 1)

use super::lexer::{identifier, name, number_literal, string_literal, ws};
use crate::aesthetic::Channel;
use crate::chart_type::ChartType;
use crate::field::{
    AggregateFormula, Calculator, DataType, DateLevel, DimensionRef, FieldRef, FieldSource,
    MeasureRef, RankingOption, SortOrder,
};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{map, map_opt, map_res, opt, value},
    error::{Error, ErrorKind},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, preceded, tuple},
    IResult,
};

/// Column reference inside a field expression
#[derive(Debug, Clone, PartialEq)]
struct ColumnRef {
    name: String,
    source: FieldSource,
}

fn variable(input: &str) -> IResult<&str, ColumnRef> {
    map(preceded(char('$'), identifier), |n| ColumnRef {
        source: FieldSource::Variable { name: n.clone() },
        name: n,
    })(input)
}

fn script(input: &str) -> IResult<&str, ColumnRef> {
    let (input, _) = ws(tag("expr"))(input)?;
    let (input, text) = delimited(ws(char('(')), ws(string_literal), ws(char(')')))(input)?;
    Ok((
        input,
        ColumnRef {
            name: text.clone(),
            source: FieldSource::Script { text },
        },
    ))
}

fn column(input: &str) -> IResult<&str, ColumnRef> {
    map(name, |n| ColumnRef {
        name: n,
        source: FieldSource::Column,
    })(input)
}

fn column_ref(input: &str) -> IResult<&str, ColumnRef> {
    alt((variable, script, column))(input)
}

/// Parse a drill hierarchy
/// Format: drill(Country > State > City) or drill(Country > State, depth: 1)
fn drill(input: &str) -> IResult<&str, FieldRef> {
    let (input, _) = ws(tag("drill"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, levels) = separated_list1(ws(char('>')), ws(name))(input)?;
    let (input, depth) = opt(preceded(
        ws(char(',')),
        preceded(ws(tag("depth:")), ws(number_literal)),
    ))(input)?;
    let (input, _) = ws(char(')'))(input)?;

    let first = levels.first().cloned().unwrap_or_default();
    let dim = DimensionRef {
        source: FieldSource::Drill {
            levels,
            depth: depth.unwrap_or(0.0).max(0.0) as usize,
        },
        ..DimensionRef::new(first)
    };
    Ok((input, dim.into()))
}

enum Function {
    Measure(Option<AggregateFormula>),
    Date(DateLevel),
}

fn function(input: &str) -> IResult<&str, Function> {
    let (rest, id) = identifier(input)?;
    let func = if id.eq_ignore_ascii_case("measure") {
        Function::Measure(None)
    } else if let Ok(formula) = id.parse::<AggregateFormula>() {
        Function::Measure(Some(formula))
    } else if let Ok(level) = id.parse::<DateLevel>() {
        Function::Date(level)
    } else {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    };
    Ok((rest, func))
}

/// Parse an aggregate or date-level call
/// Format: sum(Sales), measure(Sales), year(OrderDate)
fn call(input: &str) -> IResult<&str, FieldRef> {
    let (input, func) = ws(function)(input)?;
    let (input, col) = delimited(ws(char('(')), ws(column_ref), ws(char(')')))(input)?;

    let field = match func {
        Function::Measure(formula) => FieldRef::from(MeasureRef {
            name: col.name,
            source: col.source,
            data_type: DataType::Double,
            formula,
            ..Default::default()
        }),
        Function::Date(level) => FieldRef::from(DimensionRef {
            name: col.name,
            source: col.source,
            data_type: DataType::Date,
            date_level: level,
            ..Default::default()
        }),
    };
    Ok((input, field))
}

fn base(input: &str) -> IResult<&str, FieldRef> {
    alt((
        drill,
        call,
        map(column_ref, |col| {
            FieldRef::from(DimensionRef {
                source: col.source,
                ..DimensionRef::new(col.name)
            })
        }),
    ))(input)
}

#[derive(Debug, Clone, PartialEq)]
enum Modifier {
    TimeSeries,
    Cube,
    RunningTotal,
    PercentOfTotal,
    Discrete,
    Secondary,
    Type(ChartType),
    Aesthetic(Channel, FieldRef),
    AxisSize(f64),
    Rank(RankingOption, u32, Option<MeasureRef>),
    Sort(SortOrder),
    SortBy(MeasureRef),
}

fn flag(id: String) -> Result<Modifier, String> {
    let modifier = match id.as_str() {
        "ts" | "time_series" => Modifier::TimeSeries,
        "cube" => Modifier::Cube,
        "running_total" => Modifier::RunningTotal,
        "percent_of_total" => Modifier::PercentOfTotal,
        "discrete" => Modifier::Discrete,
        "secondary" => Modifier::Secondary,
        _ => return Err(format!("unknown modifier '{}'", id)),
    };
    Ok(modifier)
}

fn channel_key(input: &str) -> IResult<&str, Channel> {
    alt((
        value(Channel::Color, tag("color:")),
        value(Channel::Shape, tag("shape:")),
        value(Channel::Size, tag("size:")),
        value(Channel::Text, tag("text:")),
    ))(input)
}

fn sort_order(input: &str) -> IResult<&str, SortOrder> {
    alt((
        value(SortOrder::Asc, tag("asc")),
        value(SortOrder::Desc, tag("desc")),
        value(SortOrder::None, tag("none")),
    ))(input)
}

fn measure_only(input: &str) -> IResult<&str, MeasureRef> {
    map_opt(field, |f| match f {
        FieldRef::Measure(m) => Some(m),
        FieldRef::Dimension(_) => None,
    })(input)
}

/// Parse a ranking modifier
/// Format: top: 5 or bottom: 3 by sum(Profit)
fn rank(input: &str) -> IResult<&str, Modifier> {
    let (input, option) = alt((
        value(RankingOption::Top, ws(tag("top:"))),
        value(RankingOption::Bottom, ws(tag("bottom:"))),
    ))(input)?;
    let (input, n) = ws(number_literal)(input)?;
    let (input, by) = opt(preceded(ws(tag("by")), measure_only))(input)?;
    Ok((input, Modifier::Rank(option, n.max(0.0) as u32, by)))
}

fn modifier(input: &str) -> IResult<&str, Modifier> {
    alt((
        preceded(
            ws(tag("type:")),
            map_res(ws(identifier), |s| s.parse::<ChartType>().map(Modifier::Type)),
        ),
        map(preceded(ws(tag("size:")), ws(number_literal)), Modifier::AxisSize),
        map(tuple((ws(channel_key), field)), |(channel, f)| {
            Modifier::Aesthetic(channel, f)
        }),
        rank,
        map(preceded(ws(tag("sort_by:")), measure_only), Modifier::SortBy),
        map(preceded(ws(tag("sort:")), ws(sort_order)), Modifier::Sort),
        map_res(ws(identifier), flag),
    ))(input)
}

/// Applies one modifier; false when it does not fit the field's role.
fn apply_modifier(field: &mut FieldRef, modifier: Modifier) -> bool {
    if let Modifier::AxisSize(size) = modifier {
        field.set_axis_size(Some(size));
        return true;
    }

    match (field, modifier) {
        (FieldRef::Dimension(d), Modifier::TimeSeries) => d.time_series = true,
        (FieldRef::Dimension(d), Modifier::Cube) => d.cube = true,
        (FieldRef::Dimension(d), Modifier::Rank(option, n, by)) => {
            d.ranking.option = option;
            d.ranking.n = n;
            d.ranking.by = by;
        }
        (FieldRef::Dimension(d), Modifier::Sort(order)) => d.sort.order = order,
        (FieldRef::Dimension(d), Modifier::SortBy(by)) => d.sort.by = Some(by),
        (FieldRef::Measure(m), Modifier::RunningTotal) => {
            m.calculator = Some(Calculator::RunningTotal)
        }
        (FieldRef::Measure(m), Modifier::PercentOfTotal) => {
            m.calculator = Some(Calculator::PercentOfTotal)
        }
        (FieldRef::Measure(m), Modifier::Discrete) => m.discrete = true,
        (FieldRef::Measure(m), Modifier::Secondary) => m.secondary = true,
        (FieldRef::Measure(m), Modifier::Type(chart_type)) => m.chart_type = chart_type,
        (FieldRef::Measure(m), Modifier::Aesthetic(channel, f)) => {
            m.aesthetics.bind(channel, f);
        }
        _ => return false,
    }
    true
}

/// Parse a field expression with optional `[...]` modifiers
pub fn field(input: &str) -> IResult<&str, FieldRef> {
    let (input, mut parsed) = ws(base)(input)?;
    let (rest, modifiers) = opt(delimited(
        ws(char('[')),
        separated_list0(ws(char(',')), modifier),
        ws(char(']')),
    ))(input)?;

    for m in modifiers.unwrap_or_default() {
        if !apply_modifier(&mut parsed, m) {
            return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
        }
    }
    Ok((rest, parsed))
}
