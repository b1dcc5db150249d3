/// Format a float as Norwegian kroner with space-grouped thousands: 1 234,56 kr
pub fn kroner(val: f64) -> String {
    let negative = val < 0.0;
    let ore = format!("{:.2}", val.abs());
    let (int_part, dec_part) = ore.split_once('.').unwrap_or((ore.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative && ore != "0.00" {
        format!("-{grouped},{dec_part} kr")
    } else {
        format!("{grouped},{dec_part} kr")
    }
}

/// Counts are usually whole; show them without a trailing ",0".
pub fn count(val: f64) -> String {
    if val.fract() == 0.0 && val.abs() < 1e15 {
        format!("{}", val as i64)
    } else {
        format!("{val}").replace('.', ",")
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
