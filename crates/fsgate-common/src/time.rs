use chrono::{DateTime, Utc};

/// RFC 1123 date for `Last-Modified` and friends. All HTTP dates are GMT.
pub fn http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an HTTP date header value. Returns `None` for anything that is
/// not a well-formed RFC 1123/2822 date, which callers use to decide
/// whether an `If-Range` value is a date or an entity tag.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Modification-time column format used by directory listings.
pub fn listing_date(dt: &DateTime<Utc>) -> String {
    dt.format("%d-%b-%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn http_date_round_trips() {
        let dt = Utc.with_ymd_and_hms(1994, 11, 15, 8, 12, 31).unwrap();
        let formatted = http_date(&dt);
        assert_eq!(formatted, "Tue, 15 Nov 1994 08:12:31 GMT");
        assert_eq!(parse_http_date(&formatted), Some(dt));
    }

    #[test]
    fn non_date_is_rejected() {
        assert_eq!(parse_http_date("W/\"100-1700000000000\""), None);
    }
}
