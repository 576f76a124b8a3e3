/*
 * conditional.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * `@if` / `@else` evaluation.
 */

//! `@if` / `@else` evaluation.
//!
//! ```css
//! @if($theme == 'dark') { color: white; } @else { color: black; }
//! ```
//!
//! An expression is a single binary comparison; the operands are already
//! concrete because constant substitution runs first. There is no boolean
//! algebra and nothing is ever evaluated as host code.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;
use scaffold_error_reporting::DiagnosticMessageBuilder;
use thiserror::Error;

use crate::context::PipelineContext;
use crate::error::{Result, ScaffoldError};
use crate::pipeline::{Module, Phase};
use crate::scanner::{self, Delimiter, ScanError};

static IF_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"@if\s*\(").unwrap());
static ELSE_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*@else\s*\{").unwrap());
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?(?:\d+(?:\.\d+)?|\.\d+))([A-Za-z%]*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Greater,
    Less,
    GreaterEq,
    LessEq,
}

impl Operator {
    /// Operators in matching order: longer symbols before their prefixes.
    const ALL: [Operator; 8] = [
        Operator::StrictEq,
        Operator::StrictNotEq,
        Operator::Eq,
        Operator::NotEq,
        Operator::GreaterEq,
        Operator::LessEq,
        Operator::Greater,
        Operator::Less,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::StrictEq => "===",
            Operator::StrictNotEq => "!==",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::GreaterEq => ">=",
            Operator::LessEq => "<=",
        }
    }
}

/// A typed comparison operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Str(String),
    Bool(bool),
    Number { value: f64, unit: String },
}

impl Operand {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let bytes = raw.as_bytes();
        if bytes.len() >= 2
            && (bytes[0] == b'"' || bytes[0] == b'\'')
            && bytes[bytes.len() - 1] == bytes[0]
        {
            return Operand::Str(raw[1..raw.len() - 1].to_string());
        }
        match raw {
            "true" => return Operand::Bool(true),
            "false" => return Operand::Bool(false),
            _ => {}
        }
        if let Some(caps) = NUMBER.captures(raw) {
            if let Ok(value) = caps[1].parse::<f64>() {
                return Operand::Number {
                    value,
                    unit: caps[2].to_ascii_lowercase(),
                };
            }
        }
        Operand::Str(raw.to_string())
    }

    fn truthy(&self) -> bool {
        match self {
            Operand::Str(s) => !s.is_empty() && s != "0",
            Operand::Bool(b) => *b,
            Operand::Number { value, .. } => *value != 0.0,
        }
    }

    /// Text used for lexicographic comparison.
    fn text(&self) -> String {
        match self {
            Operand::Str(s) => s.clone(),
            Operand::Bool(b) => b.to_string(),
            Operand::Number { value, unit } => format!("{value}{unit}"),
        }
    }

    fn loose_eq(&self, other: &Operand) -> bool {
        match (self, other) {
            (
                Operand::Number { value: a, unit: ua },
                Operand::Number { value: b, unit: ub },
            ) => a == b && (ua == ub || ua.is_empty() || ub.is_empty()),
            (Operand::Bool(b), other) | (other, Operand::Bool(b)) => *b == other.truthy(),
            (a, b) => a.text() == b.text(),
        }
    }

    fn strict_eq(&self, other: &Operand) -> bool {
        match (self, other) {
            (
                Operand::Number { value: a, unit: ua },
                Operand::Number { value: b, unit: ub },
            ) => a == b && ua == ub,
            (Operand::Bool(a), Operand::Bool(b)) => a == b,
            (Operand::Str(a), Operand::Str(b)) => a == b,
            _ => false,
        }
    }

    fn compare(&self, other: &Operand) -> Ordering {
        match (self, other) {
            (Operand::Number { value: a, .. }, Operand::Number { value: b, .. }) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (a, b) => a.text().cmp(&b.text()),
        }
    }
}

/// `left <op> right`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub left: Operand,
    pub operator: Operator,
    pub right: Operand,
}

impl ConditionalExpression {
    /// Split on the first operator occurrence outside quotes.
    ///
    /// At a given position the longest operator wins, so `a === b` is a
    /// strict comparison, not `a == (= b)`.
    pub fn parse(expr: &str) -> Option<Self> {
        let bytes = expr.as_bytes();
        let mut quote: Option<u8> = None;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'"' || b == b'\'' => quote = Some(b),
                None => {
                    let rest = &expr[i..];
                    if let Some(op) = Operator::ALL.iter().find(|op| rest.starts_with(op.symbol())) {
                        return Some(Self {
                            left: Operand::parse(&expr[..i]),
                            operator: *op,
                            right: Operand::parse(&expr[i + op.symbol().len()..]),
                        });
                    }
                }
            }
            i += 1;
        }
        None
    }

    pub fn evaluate(&self) -> bool {
        let (l, r) = (&self.left, &self.right);
        match self.operator {
            Operator::Eq => l.loose_eq(r),
            Operator::NotEq => !l.loose_eq(r),
            Operator::StrictEq => l.strict_eq(r),
            Operator::StrictNotEq => !l.strict_eq(r),
            Operator::Greater => l.compare(r) == Ordering::Greater,
            Operator::Less => l.compare(r) == Ordering::Less,
            Operator::GreaterEq => l.compare(r) != Ordering::Less,
            Operator::LessEq => l.compare(r) != Ordering::Greater,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConditionalError {
    #[error("`@if({0})` has no comparison operator")]
    NoOperator(String),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl ConditionalError {
    pub fn into_error(self, ctx: &PipelineContext) -> ScaffoldError {
        match self {
            ConditionalError::NoOperator(expr) => ctx.fatal(
                DiagnosticMessageBuilder::fatal("Invalid conditional")
                    .with_code("S-4-1")
                    .problem(format!("`@if({expr})` has no comparison operator"))
                    .add_info("Supported operators: ==, !=, ===, !==, >, <, >=, <=")
                    .build(),
            ),
            ConditionalError::Scan(e) => ScaffoldError::Scan(e),
        }
    }
}

/// Replace every `@if(...){...}[@else{...}]` group with the selected body.
///
/// After each replacement the scan resumes at the replacement's start, so
/// conditionals nested in the selected body are evaluated too.
pub fn resolve(text: &str) -> std::result::Result<String, ConditionalError> {
    let mut out = text.to_string();
    let mut pos = 0;

    while let Some(m) = IF_HEADER.find_at(&out, pos) {
        let (start, paren) = (m.start(), m.end() - 1);
        if scanner::in_spans(&scanner::literal_spans(&out), start) {
            pos = m.end();
            continue;
        }
        let close_paren = scanner::find_close(&out, paren, Delimiter::Paren)?;

        let after = &out[close_paren + 1..];
        let brace = close_paren + 1 + (after.len() - after.trim_start().len());
        if out.as_bytes().get(brace) != Some(&b'{') {
            pos = paren + 1;
            continue;
        }
        let close_brace = scanner::find_close(&out, brace, Delimiter::Brace)?;
        let if_body = &out[brace + 1..close_brace];

        let mut end = close_brace + 1;
        let mut else_body = None;
        if let Some(e) = ELSE_HEADER.find(&out[end..]) {
            let else_brace = end + e.end() - 1;
            let else_close = scanner::find_close(&out, else_brace, Delimiter::Brace)?;
            else_body = Some(&out[else_brace + 1..else_close]);
            end = else_close + 1;
        }

        let expr = &out[paren + 1..close_paren];
        let condition = ConditionalExpression::parse(expr)
            .ok_or_else(|| ConditionalError::NoOperator(expr.trim().to_string()))?;
        let result = condition.evaluate();
        tracing::trace!(expr = expr.trim(), result, "Evaluated conditional");

        let replacement = if result {
            if_body.trim().to_string()
        } else {
            else_body.map(|b| b.trim().to_string()).unwrap_or_default()
        };
        out.replace_range(start..end, &replacement);
        pos = start;
    }

    Ok(out)
}

/// Evaluates conditionals left in the document after mixin expansion.
#[derive(Debug, Default)]
pub struct ConditionalsModule;

impl Module for ConditionalsModule {
    fn name(&self) -> &str {
        "conditionals"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Process]
    }

    fn run(&self, _phase: Phase, ctx: &mut PipelineContext) -> Result<()> {
        ctx.text = resolve(&ctx.text).map_err(|e| e.into_error(ctx))?;
        Ok(())
    }
}
