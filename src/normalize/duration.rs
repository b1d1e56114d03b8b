use regex::Regex;
use std::sync::LazyLock;

static ISO_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("duration regex")
});

/// Convert an ISO-8601 duration such as `PT1H30M` into whole minutes.
///
/// Seconds round up to the next minute. A duration with no component, or
/// only zero components, yields `None`.
pub fn parse_iso8601_duration_to_minutes(duration: &str) -> Option<u32> {
    let caps = ISO_DURATION_RE.captures(duration.trim())?;
    let part = |i: usize| -> u32 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    let (days, hours, minutes, seconds) = (part(1), part(2), part(3), part(4));
    if days == 0 && hours == 0 && minutes == 0 && seconds == 0 {
        return None;
    }

    let total = days
        .saturating_mul(24 * 60)
        .saturating_add(hours.saturating_mul(60))
        .saturating_add(minutes)
        .saturating_add(seconds.div_ceil(60));
    Some(total)
}
