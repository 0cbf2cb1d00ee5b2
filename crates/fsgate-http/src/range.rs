use fsgate_common::time::parse_http_date;
use fsgate_common::types::FileInfo;

/// Clock slack allowed when comparing an `If-Range` date against the
/// object's modification time.
const IF_RANGE_SLACK_MS: i64 = 1000;

/// One validated byte span: inclusive bounds, `start <= end < total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// What the response body should carry, decided once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryPlan {
    /// Entire object (also covers the zero-length object, whose body is
    /// simply empty).
    Full,
    /// Malformed or out-of-bounds range set; the response must be 416
    /// with `Content-Range: bytes */<length>`.
    Unsatisfiable,
    Single(ByteRange),
    /// Ranges in request order, never coalesced, overlaps and
    /// duplicates preserved.
    Multi(Vec<ByteRange>),
}

/// Weak entity tag derived from length and modification time, cheap to
/// compute and good enough for conditional-range checks.
pub fn weak_etag(info: &FileInfo) -> String {
    format!("W/\"{}-{}\"", info.size, info.modified.timestamp_millis())
}

/// Resolve `If-Range` and `Range` against the object's current
/// metadata.
///
/// The `If-Range` value is treated as an HTTP date when it parses as
/// one, otherwise as an opaque entity tag. A failed precondition means
/// the client's view is stale, so the whole object is served and the
/// `Range` header ignored. One malformed range spec invalidates the
/// entire set.
pub fn resolve(if_range: Option<&str>, range: Option<&str>, info: &FileInfo) -> DeliveryPlan {
    if let Some(value) = if_range {
        match parse_http_date(value) {
            Some(client_time) => {
                if info.modified.timestamp_millis()
                    > client_time.timestamp_millis() + IF_RANGE_SLACK_MS
                {
                    return DeliveryPlan::Full;
                }
            }
            None => {
                if value.trim() != weak_etag(info) {
                    return DeliveryPlan::Full;
                }
            }
        }
    }

    let length = info.size;
    if length == 0 {
        return DeliveryPlan::Full;
    }

    let Some(header) = range else {
        return DeliveryPlan::Full;
    };
    // bytes is the only supported range unit.
    let Some(specs) = header.strip_prefix("bytes=") else {
        return DeliveryPlan::Unsatisfiable;
    };

    let mut ranges = Vec::new();
    for spec in specs.split(',') {
        match parse_spec(spec.trim(), length) {
            Some(parsed) => ranges.push(parsed),
            None => return DeliveryPlan::Unsatisfiable,
        }
    }

    match ranges.len() {
        0 => DeliveryPlan::Unsatisfiable,
        1 => DeliveryPlan::Single(ranges[0]),
        _ => DeliveryPlan::Multi(ranges),
    }
}

fn parse_spec(spec: &str, length: i64) -> Option<ByteRange> {
    let dash = spec.find('-')?;

    let (start, end) = if dash == 0 {
        // Suffix form `-N`: the last |N| bytes.
        let offset: i64 = spec.parse().ok()?;
        (length + offset, length - 1)
    } else {
        let start: i64 = spec[..dash].parse().ok()?;
        let end = if dash < spec.len() - 1 {
            spec[dash + 1..].parse().ok()?
        } else {
            length - 1
        };
        (start, end)
    };

    // An end past the last byte is clamped, not rejected.
    let end = end.min(length - 1);
    if start >= 0 && end >= 0 && start <= end {
        Some(ByteRange {
            start: start as u64,
            end: end as u64,
            total: length as u64,
        })
    } else {
        None
    }
}
