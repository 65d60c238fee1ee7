//! Row-wise boolean filter expressions over frame columns
//!
//! Evaluation is three-valued: a missing cell makes its comparison unknown, and an unknown
//! final value counts as no signal.

use std::collections::BTreeSet;
use std::ops::{BitAnd, BitOr, Not};

use crate::error::Result;
use crate::models::{CombinationMode, Column, Frame};

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Boolean column taken as-is
    Column(String),
    /// Numeric column strictly above a constant
    Gt(String, f64),
    /// Numeric column strictly below a constant
    Lt(String, f64),
    /// Numeric column strictly above another numeric column
    ColumnGt(String, String),
    All(Vec<FilterExpr>),
    Any(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

pub fn col(name: impl Into<String>) -> FilterExpr {
    FilterExpr::Column(name.into())
}

pub fn gt(name: impl Into<String>, threshold: f64) -> FilterExpr {
    FilterExpr::Gt(name.into(), threshold)
}

pub fn lt(name: impl Into<String>, threshold: f64) -> FilterExpr {
    FilterExpr::Lt(name.into(), threshold)
}

pub fn col_gt(left: impl Into<String>, right: impl Into<String>) -> FilterExpr {
    FilterExpr::ColumnGt(left.into(), right.into())
}

impl FilterExpr {
    /// Every column name the expression reads.
    pub fn columns(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut BTreeSet<String>) {
        match self {
            FilterExpr::Column(c) | FilterExpr::Gt(c, _) | FilterExpr::Lt(c, _) => {
                out.insert(c.clone());
            }
            FilterExpr::ColumnGt(a, b) => {
                out.insert(a.clone());
                out.insert(b.clone());
            }
            FilterExpr::All(items) | FilterExpr::Any(items) => {
                for item in items {
                    item.collect_columns(out);
                }
            }
            FilterExpr::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Check every referenced column exists with the kind the expression needs.
    pub fn validate(&self, frame: &Frame) -> Result<()> {
        match self {
            FilterExpr::Column(c) => frame.boolean(c).map(|_| ()),
            FilterExpr::Gt(c, _) | FilterExpr::Lt(c, _) => frame.numeric(c).map(|_| ()),
            FilterExpr::ColumnGt(a, b) => {
                frame.numeric(a)?;
                frame.numeric(b).map(|_| ())
            }
            FilterExpr::All(items) | FilterExpr::Any(items) => {
                items.iter().try_for_each(|item| item.validate(frame))
            }
            FilterExpr::Not(inner) => inner.validate(frame),
        }
    }

    /// Value at one row; `None` when an input is missing.
    pub fn evaluate(&self, frame: &Frame, row: usize) -> Option<bool> {
        match self {
            FilterExpr::Column(c) => match frame.column(c)? {
                Column::Bool(v) => *v.get(row)?,
                Column::Numeric(_) => None,
            },
            FilterExpr::Gt(c, threshold) => numeric_at(frame, c, row).map(|v| v > *threshold),
            FilterExpr::Lt(c, threshold) => numeric_at(frame, c, row).map(|v| v < *threshold),
            FilterExpr::ColumnGt(a, b) => {
                Some(numeric_at(frame, a, row)? > numeric_at(frame, b, row)?)
            }
            FilterExpr::All(items) => {
                CombinationMode::And.combine(items.iter().map(|i| i.evaluate(frame, row)))
            }
            FilterExpr::Any(items) => {
                CombinationMode::Or.combine(items.iter().map(|i| i.evaluate(frame, row)))
            }
            FilterExpr::Not(inner) => inner.evaluate(frame, row).map(|v| !v),
        }
    }

    /// Validate, then evaluate every row of `frame`.
    pub fn evaluate_all(&self, frame: &Frame) -> Result<Vec<Option<bool>>> {
        self.validate(frame)?;
        Ok((0..frame.len()).map(|row| self.evaluate(frame, row)).collect())
    }
}

fn numeric_at(frame: &Frame, name: &str, row: usize) -> Option<f64> {
    frame.column(name)?.as_numeric()?.get(row).copied().flatten()
}

impl BitAnd for FilterExpr {
    type Output = FilterExpr;

    fn bitand(self, rhs: FilterExpr) -> FilterExpr {
        match self {
            FilterExpr::All(mut items) => {
                items.push(rhs);
                FilterExpr::All(items)
            }
            lhs => FilterExpr::All(vec![lhs, rhs]),
        }
    }
}

impl BitOr for FilterExpr {
    type Output = FilterExpr;

    fn bitor(self, rhs: FilterExpr) -> FilterExpr {
        match self {
            FilterExpr::Any(mut items) => {
                items.push(rhs);
                FilterExpr::Any(items)
            }
            lhs => FilterExpr::Any(vec![lhs, rhs]),
        }
    }
}

impl Not for FilterExpr {
    type Output = FilterExpr;

    fn not(self) -> FilterExpr {
        FilterExpr::Not(Box::new(self))
    }
}
