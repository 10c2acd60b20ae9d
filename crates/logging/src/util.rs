// crates/logging/src/util.rs
const UNITS: [&str; 6] = ["bytes", "KB", "MB", "GB", "TB", "PB"];

/// Signed size with a binary unit, rounded down: `+1023 bytes`, `-2 KB`.
/// Zero has no sign.
pub fn human_size(bytes: i64) -> String {
    let sign = match bytes {
        0 => "",
        b if b > 0 => "+",
        _ => "-",
    };
    let mut n = bytes.unsigned_abs();
    let mut unit = 0usize;
    while n >= 1024 && unit < UNITS.len() - 1 {
        n /= 1024;
        unit += 1;
    }
    format!("{sign}{n} {}", UNITS[unit])
}
