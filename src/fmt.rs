/// Group the integer digits of an already-rounded absolute value.
fn group_thousands(int_part: &str, sep: char) -> String {
    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(sep);
        }
        grouped.push(c);
    }
    grouped.chars().rev().collect()
}

/// Format a value with `decimals` places in Brazilian notation: 1.234,56
pub fn number(val: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, val.abs());
    let negative = val < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let mut out = group_thousands(int_part, '.');
    if !dec_part.is_empty() {
        out.push(',');
        out.push_str(dec_part);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

/// Format a float as a Brazilian real amount: R$ 1.234,56
pub fn money(val: f64) -> String {
    let body = number(val.abs(), 2);
    if val < 0.0 && body != "0,00" {
        format!("-R$ {body}")
    } else {
        format!("R$ {body}")
    }
}

/// Percentage with one decimal place: 3,5%
pub fn percent(val: f64) -> String {
    format!("{}%", number(val, 1))
}
