use chrono::NaiveDate;

/// Group the integer part of a non-negative amount with commas: 1234567 -> "1,234,567".
fn group_thousands(int_part: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format an amount with its currency code and thousands separators: IDR 1,234.56
/// Whole amounts drop the decimals: IDR 1,500,000
pub fn money(currency: &str, val: f64) -> String {
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    // Sign follows what is shown: -0.001 prints as zero.
    let negative = val < 0.0 && cents.bytes().any(|b| b.is_ascii_digit() && b != b'0');

    let grouped = group_thousands(int_part);
    let body = if dec_part == "00" {
        grouped
    } else {
        format!("{grouped}.{dec_part}")
    };

    if negative {
        format!("-{currency} {body}")
    } else {
        format!("{currency} {body}")
    }
}

/// Quantities print without trailing zeros: 2 -> "2", 1.5 -> "1.5".
pub fn quantity(val: f64) -> String {
    let s = format!("{val:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

/// Reduce text to something safe as a single file name component. Anything
/// other than letters, digits, `-` and `_` becomes a dash; dash runs collapse.
pub fn file_component(raw: &str) -> String {
    let mut out = String::new();
    for c in raw.chars() {
        let c = if c.is_alphanumeric() || c == '_' { c } else { '-' };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    out.trim_end_matches('-').to_string()
}

/// Parse an API or form date. Accepts `YYYY-MM-DD` and anything that starts
/// with it (RFC 3339 timestamps).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Normalize to `YYYY-MM-DD`; unparseable input yields an empty string.
pub fn iso_date(raw: &str) -> String {
    parse_date(raw)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Display form used on the invoice: 02 Jan 2026.
pub fn display_date(raw: &str) -> String {
    parse_date(raw)
        .map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money("IDR", 1234.56), "IDR 1,234.56");
        assert_eq!(money("IDR", -500.00), "-IDR 500");
        assert_eq!(money("IDR", 0.0), "IDR 0");
        assert_eq!(money("USD", 1000000.99), "USD 1,000,000.99");
        assert_eq!(money("IDR", 42.10), "IDR 42.10");
        assert_eq!(money("IDR", -0.001), "IDR 0");
        assert_eq!(money("IDR", -0.004999), "IDR 0");
        assert_eq!(money("IDR", -0.006), "-IDR 0.01");
    }

    #[test]
    fn test_quantity_formatting() {
        assert_eq!(quantity(2.0), "2");
        assert_eq!(quantity(1.5), "1.5");
        assert_eq!(quantity(0.25), "0.25");
        assert_eq!(quantity(10.0), "10");
    }

    #[test]
    fn test_file_component() {
        assert_eq!(file_component("INV-2026-001"), "INV-2026-001");
        assert_eq!(file_component("../../../tmp/evil"), "tmp-evil");
        assert_eq!(file_component("a\\b/c"), "a-b-c");
        assert_eq!(file_component(".."), "");
        assert_eq!(file_component("PT Ümit Jaya"), "PT-Ümit-Jaya");
    }

    #[test]
    fn test_date_parsing() {
        assert_eq!(iso_date("2026-10-19T00:00:00Z"), "2026-10-19");
        assert_eq!(iso_date("2026-10-19"), "2026-10-19");
        assert_eq!(iso_date(""), "");
        assert_eq!(iso_date("19/10/2026"), "");
        assert_eq!(display_date("2026-01-02"), "02 Jan 2026");
        assert_eq!(display_date("soon"), "soon");
    }
}
