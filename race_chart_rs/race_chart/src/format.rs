/// Format a duration in seconds as `"{h}H {mm}M"` with minutes rounded.
///
/// A rounded minute count of 60 carries into the hour, so 3599 seconds reads
/// `"1H 00M"` rather than `"0H 60M"`.
pub fn format_time(seconds: f64) -> String {
    let s = if seconds.is_finite() && seconds >= 0.0 {
        seconds
    } else {
        0.0
    };
    let time_hours = s / 3600.0;
    let mut hours = time_hours.floor() as u64;
    let mut minutes = ((time_hours - hours as f64) * 60.0).round() as u64;
    if minutes >= 60 {
        hours += minutes / 60;
        minutes %= 60;
    }
    format!("{}H {:02}M", hours, minutes)
}

/// Plain year label: integral values without decimals.
pub fn format_year(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
