use std::time::Duration;

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.0}")
    } else {
        "0".to_string()
    }
}

pub(crate) fn format_ms(v: f64) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    if v >= 1000.0 {
        return format!("{:.2}s", v / 1000.0);
    }
    format!("{v:.2}ms")
}

pub(crate) fn format_ms_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), format_ms)
}

pub(crate) fn format_secs(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.1}s")
    } else {
        "-".to_string()
    }
}

pub(crate) fn format_pct(v: f64) -> String {
    if v.is_finite() {
        format!("{:+.1}%", v * 100.0)
    } else {
        "-".to_string()
    }
}

/// A single rounded component in one of `ms`, `s`, `m`. Keeps progress lines short.
pub(crate) fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();

    const MS_PER_S: u128 = 1_000;
    const MS_PER_M: u128 = 60_000;

    fn round_div(value: u128, unit: u128) -> u128 {
        (value + (unit / 2)) / unit
    }

    if total_ms >= 10 * MS_PER_M {
        return format!("{}m", round_div(total_ms, MS_PER_M));
    }
    if total_ms >= MS_PER_S {
        return format!("{}s", round_div(total_ms, MS_PER_S));
    }
    format!("{total_ms}ms")
}
