/// Pesos with thousands separators: $1,234.56. The sign goes outside the
/// currency symbol, matching how SAE prints negative amounts.
pub fn money(val: f64) -> String {
    let sign = if val < 0.0 { "-" } else { "" };
    let cents = (val.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}${grouped}.{frac:02}")
}

/// Hours with a trailing unit, trimming the fraction when whole: "5h", "4.5h"
pub fn hours(val: f64) -> String {
    if val.fract() == 0.0 {
        format!("{}h", val as i64)
    } else {
        format!("{val}h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "$1,234.56");
        assert_eq!(money(-500.00), "-$500.00");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(1000000.99), "$1,000,000.99");
        assert_eq!(money(96.5), "$96.50");
        assert_eq!(money(-1850.0), "-$1,850.00");
    }

    #[test]
    fn test_hours_formatting() {
        assert_eq!(hours(5.0), "5h");
        assert_eq!(hours(4.5), "4.5h");
        assert_eq!(hours(0.0), "0h");
    }
}
