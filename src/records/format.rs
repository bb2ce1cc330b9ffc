//! Presentation strings shown in the inspector grid.

/// `(XXX) XXX-XXXX` for ten-digit numbers; anything else comes back as given.
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 10 {
        return phone.to_string();
    }
    format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..])
}

/// `MM/DD/YYYY`. Slash-delimited input is assumed formatted already and kept;
/// `YYYY-MM-DD` (optionally followed by a time part) is rearranged. Anything
/// else is returned untouched.
pub fn format_date(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains('/') {
        return trimmed.to_string();
    }

    let date_part = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);
    let mut parts = date_part.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(year), Some(month), Some(day))
            if !year.is_empty() && !month.is_empty() && !day.is_empty() =>
        {
            format!("{month}/{day}/{year}")
        }
        _ => trimmed.to_string(),
    }
}

/// `F'I"` from a number of inches. Values already containing a foot mark are kept.
pub fn format_height(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains('\'') {
        return trimmed.to_string();
    }

    let leading: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match leading.parse::<u32>() {
        Ok(total) => format!("{}'{}\"", total / 12, total % 12),
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_formats_ten_digits_only() {
        assert_eq!(format_phone("5551234567"), "(555) 123-4567");
        assert_eq!(format_phone("555.123.4567"), "(555) 123-4567");
        assert_eq!(format_phone("+1 555 123 4567"), "+1 555 123 4567");
        assert_eq!(format_phone("12345"), "12345");
        assert_eq!(format_phone(""), "");
    }

    #[test]
    fn dash_dates_are_rearranged() {
        assert_eq!(format_date("1980-04-09"), "04/09/1980");
        assert_eq!(format_date("1980-04-09T00:00:00.000Z"), "04/09/1980");
    }

    #[test]
    fn slash_dates_are_idempotent() {
        let once = format_date("1980-04-09");
        assert_eq!(format_date(&once), once);
        assert_eq!(format_date("04/09/1980"), "04/09/1980");
    }

    #[test]
    fn unrecognized_dates_pass_through() {
        assert_eq!(format_date("April 9"), "April 9");
        assert_eq!(format_date("1980--09"), "1980--09");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn heights() {
        assert_eq!(format_height("70"), "5'10\"");
        assert_eq!(format_height("72 in"), "6'0\"");
        assert_eq!(format_height("5'9\""), "5'9\"");
        assert_eq!(format_height("tall"), "tall");
    }
}
