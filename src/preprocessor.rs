use crate::error::{BindingError, ChartResult};
use crate::schema::ParameterTable;
use std::iter::Peekable;
use std::str::Chars;

/// Expands `$name` references in a script template against the parameter
/// table. A lone `$` is kept literally; an undefined parameter is an error.
pub fn expand_script(input: &str, params: &dyn ParameterTable) -> ChartResult<String> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => {
                let var_name = consume_identifier(&mut chars);
                if var_name.is_empty() {
                    output.push('$');
                } else {
                    let value = params
                        .lookup(&var_name)
                        .ok_or_else(|| BindingError::UndefinedParameter(var_name.clone()))?;
                    output.push_str(&value.as_text());
                }
            }
            _ => output.push(c),
        }
    }

    Ok(output)
}

fn consume_identifier(chars: &mut Peekable<Chars>) -> String {
    let mut name = String::new();
    // Identifiers start with alpha or _
    if let Some(&c) = chars.peek() {
        if !c.is_alphabetic() && c != '_' {
            return name;
        }
    }

    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamValue;
    use std::collections::HashMap;

    fn params() -> HashMap<String, ParamValue> {
        let mut vars = HashMap::new();
        vars.insert("year".to_string(), ParamValue::Single("2024".to_string()));
        vars.insert("col".to_string(), ParamValue::Single("Region".to_string()));
        vars
    }

    #[test]
    fn test_expansion() {
        let output = expand_script("Sales_$year", &params()).unwrap();
        assert_eq!(output, "Sales_2024");
    }

    #[test]
    fn test_whole_name_expansion() {
        assert_eq!(expand_script("$col", &params()).unwrap(), "Region");
    }

    #[test]
    fn test_lone_dollar() {
        let output = expand_script("Cost ($)", &params()).unwrap();
        assert_eq!(output, "Cost ($)");
    }

    #[test]
    fn test_undefined_parameter() {
        let result = expand_script("Sales_$missing", &params());
        assert!(matches!(result, Err(BindingError::UndefinedParameter(name)) if name == "missing"));
    }
}
