use crate::{AlgebraNode, Operator};
use std::fmt::{Display, Formatter};

impl Display for AlgebraNode {
    /// Renders the node as an indented tree, one operator per line.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_indented(self, f, 0)
    }
}

fn fmt_indented(node: &AlgebraNode, f: &mut Formatter<'_>, indent: usize) -> std::fmt::Result {
    if indent > 0 {
        writeln!(f)?;
    }
    write!(f, "{:indent$}{}", "", node.kind(), indent = indent * 2)?;
    fmt_details(node.operator(), f)?;
    for child in node.children() {
        fmt_indented(child, f, indent + 1)?;
    }
    Ok(())
}

fn fmt_details(operator: &Operator, f: &mut Formatter<'_>) -> std::fmt::Result {
    match operator {
        Operator::Triple(pattern) => write!(
            f,
            ": {} {} {}",
            pattern.subject, pattern.predicate, pattern.object
        ),
        Operator::LeftJoin {
            expression: Some(expression),
            ..
        } => write!(f, ": {expression}"),
        Operator::Filter { expressions, .. } => {
            f.write_str(":")?;
            for (i, expression) in expressions.iter().enumerate() {
                let separator = if i == 0 { " " } else { ", " };
                write!(f, "{separator}{expression}")?;
            }
            Ok(())
        }
        Operator::Project { variables, .. } => {
            f.write_str(":")?;
            for variable in variables {
                write!(f, " {variable}")?;
            }
            Ok(())
        }
        Operator::Limit { limit, .. } => write!(f, ": {limit}"),
        Operator::Offset { offset, .. } => write!(f, ": {offset}"),
        Operator::Slice { offset, limit, .. } => match limit {
            Some(limit) => write!(f, ": offset={offset} limit={limit}"),
            None => write!(f, ": offset={offset}"),
        },
        Operator::Values {
            variables, rows, ..
        } => {
            f.write_str(": (")?;
            for (i, variable) in variables.iter().enumerate() {
                let separator = if i == 0 { "" } else { " " };
                write!(f, "{separator}{variable}")?;
            }
            f.write_str(")")?;
            for row in rows {
                write!(f, " {row}")?;
            }
            Ok(())
        }
        Operator::Assign {
            variable,
            expression,
            ..
        } => write!(f, ": {variable} := {expression}"),
        Operator::Minus {
            bound_overlap: true,
            ..
        } => f.write_str(": bound overlap"),
        Operator::Join(_)
        | Operator::LeftJoin {
            expression: None, ..
        }
        | Operator::Union(_)
        | Operator::Distinct(_)
        | Operator::WeakDistinct(_)
        | Operator::Exists { .. }
        | Operator::NotExists { .. }
        | Operator::Minus {
            bound_overlap: false,
            ..
        }
        | Operator::Ask(_)
        | Operator::Identity => Ok(()),
    }
}
