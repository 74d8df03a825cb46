use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
}

impl ThresholdOp {
    pub fn compare(self, observed: f64, expected: f64) -> bool {
        match self {
            ThresholdOp::Lt => observed < expected,
            ThresholdOp::Lte => observed <= expected,
            ThresholdOp::Gt => observed > expected,
            ThresholdOp::Gte => observed >= expected,
            ThresholdOp::Eq => (observed - expected).abs() <= f64::EPSILON,
        }
    }
}

impl fmt::Display for ThresholdOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThresholdOp::Lt => "<",
            ThresholdOp::Lte => "<=",
            ThresholdOp::Gt => ">",
            ThresholdOp::Gte => ">=",
            ThresholdOp::Eq => "==",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdAgg {
    Avg,
    Min,
    Max,
    Med,
    Count,
    Rate,
    /// Last value of a gauge or counter.
    Value,
    P(f64),
}

impl fmt::Display for ThresholdAgg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdAgg::Avg => f.write_str("avg"),
            ThresholdAgg::Min => f.write_str("min"),
            ThresholdAgg::Max => f.write_str("max"),
            ThresholdAgg::Med => f.write_str("med"),
            ThresholdAgg::Count => f.write_str("count"),
            ThresholdAgg::Rate => f.write_str("rate"),
            ThresholdAgg::Value => f.write_str("value"),
            ThresholdAgg::P(p) => write!(f, "p({p})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdExpr {
    pub agg: ThresholdAgg,
    pub op: ThresholdOp,
    pub value: f64,
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.agg, self.op, self.value)
    }
}

/// One parsed threshold: `expression` as written, applied to `metric`.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub metric: String,
    pub expression: String,
    pub expr: ThresholdExpr,
}

impl Threshold {
    pub fn parse(metric: impl Into<String>, expression: impl Into<String>) -> Result<Self> {
        let metric = metric.into();
        let expression = expression.into();
        if metric.is_empty() {
            return Err(Error::InvalidThreshold {
                metric,
                error: "metric name must not be empty".to_string(),
            });
        }

        let expr = parse_threshold_expr(&expression).map_err(|error| Error::InvalidThreshold {
            metric: metric.clone(),
            error,
        })?;
        Ok(Self {
            metric,
            expression,
            expr,
        })
    }
}

/// Parses `p(95)<500`, `rate<0.1`, `avg <= 200`, `count>0` and the like.
pub fn parse_threshold_expr(raw: &str) -> std::result::Result<ThresholdExpr, String> {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return Err("empty threshold".to_string());
    }

    // Two-char operators first so `<=` isn't read as `<`.
    let ops = [
        ("<=", ThresholdOp::Lte),
        (">=", ThresholdOp::Gte),
        ("==", ThresholdOp::Eq),
        ("<", ThresholdOp::Lt),
        (">", ThresholdOp::Gt),
    ];
    let (op_pos, op_len, op) = ops
        .iter()
        .find_map(|(tok, op)| s.find(tok).map(|pos| (pos, tok.len(), *op)))
        .ok_or_else(|| format!("missing operator in `{raw}`"))?;

    let (left, right_with_op) = s.split_at(op_pos);
    let right = &right_with_op[op_len..];
    if left.is_empty() || right.is_empty() {
        return Err(format!("expected `<aggregate><op><value>`, got `{raw}`"));
    }

    let agg = match left.to_ascii_lowercase().as_str() {
        "avg" => ThresholdAgg::Avg,
        "min" => ThresholdAgg::Min,
        "max" => ThresholdAgg::Max,
        "med" => ThresholdAgg::Med,
        "count" => ThresholdAgg::Count,
        "rate" => ThresholdAgg::Rate,
        "value" => ThresholdAgg::Value,
        other => {
            let Some(inner) = other.strip_prefix("p(").and_then(|v| v.strip_suffix(')')) else {
                return Err(format!("unknown aggregate `{left}` in `{raw}`"));
            };
            let p: f64 = inner
                .parse()
                .map_err(|_| format!("invalid percentile `{inner}` in `{raw}`"))?;
            if !(0.0..=100.0).contains(&p) {
                return Err(format!("percentile out of range (0..=100) in `{raw}`"));
            }
            ThresholdAgg::P(p)
        }
    };

    let value: f64 = right
        .parse()
        .map_err(|_| format!("invalid numeric value `{right}` in `{raw}`"))?;
    if !value.is_finite() {
        return Err(format!("threshold value must be finite in `{raw}`"));
    }

    Ok(ThresholdExpr { agg, op, value })
}
