//! Display formatting for rendered widget values.

/// Groups the integer part with comma separators, keeping `decimals` fraction
/// digits.
pub fn grouped(value: f64, decimals: usize) -> String {
    let rounded = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match rounded.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (rounded.as_str(), None),
    };

    let mut out = String::new();
    let digits = int_part.len();
    for (index, ch) in int_part.chars().enumerate() {
        if index > 0 && (digits - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    if value < 0.0 && out.chars().any(|ch| ch != '0' && ch != ',' && ch != '.') {
        out.insert(0, '-');
    }
    out
}

/// Plain number: integers grouped without a fraction, everything else with two
/// fraction digits.
pub fn number(value: f64) -> String {
    if value.fract() == 0.0 {
        grouped(value, 0)
    } else {
        grouped(value, 2)
    }
}

pub fn currency(value: f64, symbol: &str, decimals: usize) -> String {
    if value < 0.0 {
        format!("-{}{}", symbol, grouped(value.abs(), decimals))
    } else {
        format!("{}{}", symbol, grouped(value, decimals))
    }
}

pub fn percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Header label for a column key: underscores become spaces, each word is
/// capitalized.
pub fn header_label(column: &str) -> String {
    column
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(number(0.0), "0");
        assert_eq!(number(1234.0), "1,234");
        assert_eq!(number(1234567.0), "1,234,567");
        assert_eq!(number(1234.5), "1,234.50");
        assert_eq!(number(-1234.0), "-1,234");
    }

    #[test]
    fn formats_currency_with_symbol_and_decimals() {
        assert_eq!(currency(1234.5, "$", 2), "$1,234.50");
        assert_eq!(currency(45000.0, "€", 0), "€45,000");
        assert_eq!(currency(-99.0, "$", 0), "-$99");
    }

    #[test]
    fn formats_percent_with_one_decimal() {
        assert_eq!(percent(4.567), "4.6%");
        assert_eq!(percent(0.0), "0.0%");
    }

    #[test]
    fn header_labels_replace_underscores_and_capitalize() {
        assert_eq!(header_label("created_at"), "Created At");
        assert_eq!(header_label("name"), "Name");
        assert_eq!(header_label("monthly_recurring_revenue"), "Monthly Recurring Revenue");
    }
}
