use std::time::Duration;

/// Single rounded component in one of `us`, `ms`, `s`, `m`.
pub(crate) fn format_duration(d: Duration) -> String {
    const NS_PER_US: u128 = 1_000;
    const NS_PER_MS: u128 = 1_000_000;
    const NS_PER_S: u128 = 1_000_000_000;
    const NS_PER_MIN: u128 = 60 * NS_PER_S;

    fn round_div(value: u128, unit: u128) -> u128 {
        (value + (unit / 2)) / unit
    }

    let total_ns = d.as_nanos();
    if total_ns >= 10 * NS_PER_MIN {
        return format!("{}m", round_div(total_ns, NS_PER_MIN));
    }
    if total_ns >= NS_PER_S {
        return format!("{}s", round_div(total_ns, NS_PER_S));
    }
    if total_ns >= NS_PER_MS {
        return format!("{}ms", round_div(total_ns, NS_PER_MS));
    }
    format!("{}us", round_div(total_ns, NS_PER_US))
}

/// Trend values are milliseconds.
pub(crate) fn format_ms_opt(v: Option<f64>) -> String {
    match v {
        Some(ms) if ms.is_finite() && ms >= 1000.0 => format!("{:.2}s", ms / 1000.0),
        Some(ms) if ms.is_finite() && ms >= 1.0 => format!("{ms:.2}ms"),
        Some(ms) if ms.is_finite() => format!("{:.0}us", ms * 1000.0),
        _ => "-".to_string(),
    }
}

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.0}")
    } else {
        "0".to_string()
    }
}

pub(crate) fn format_percent(v: f64) -> String {
    if v.is_finite() {
        format!("{:.2}%", v * 100.0)
    } else {
        "-".to_string()
    }
}
