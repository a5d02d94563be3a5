/// `"1 packet"`, `"3 packets"`
pub fn counted(count: u32, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Milliseconds in the most readable unit: `"12.5 msec"`, `"1.25 sec"`.
pub fn readable_duration(ms: f64) -> String {
    if ms < 1000.0 {
        format!("{} msec", trim_decimal(ms, 3))
    } else {
        format!("{} sec", trim_decimal(ms / 1000.0, 3))
    }
}

pub fn percent(value: f64) -> String {
    format!("{}%", trim_decimal(value, 1))
}

fn trim_decimal(value: f64, places: usize) -> String {
    let formatted = format!("{value:.places$}");
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

pub(crate) fn with_last_error(mut message: String, last_error: Option<&str>) -> String {
    if let Some(last_error) = last_error {
        message.push_str(" Last error: ");
        message.push_str(last_error);
    }
    message
}
