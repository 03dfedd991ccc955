//! `{placeholder}` substitution in node arguments.

use std::collections::BTreeMap;

use crate::errors::ControlError;

/// Values available to argument templates.
#[derive(Clone, Debug, Default)]
pub struct TemplateVars(BTreeMap<&'static str, String>);

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &'static str, value: impl ToString) -> Self {
        self.0.insert(name, value.to_string());
        self
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Substitutes every `{name}` in `arg`. `{{` and `}}` escape literal braces.
pub fn render(arg: &str, vars: &TemplateVars) -> Result<String, ControlError> {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
        } else if let Some(body) = tail.strip_prefix('{') {
            let end = body.find('}').ok_or_else(|| unbalanced(arg))?;
            let name = &body[..end];
            let value = vars.get(name).ok_or_else(|| {
                ControlError::Configuration(format!("unknown placeholder {{{name}}} in {arg:?}"))
            })?;
            out.push_str(value);
            rest = &body[end + 1..];
        } else {
            return Err(unbalanced(arg));
        }
    }
    out.push_str(rest);
    Ok(out)
}

pub fn render_all(args: &[String], vars: &TemplateVars) -> Result<Vec<String>, ControlError> {
    args.iter().map(|a| render(a, vars)).collect()
}

fn unbalanced(arg: &str) -> ControlError {
    ControlError::Configuration(format!("unbalanced braces in argument {arg:?}"))
}
