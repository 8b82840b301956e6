//! Message compiler: body text plus an optional relative-countdown token.

pub const MAX_COUNTDOWN_HOURS: i64 = 999;
pub const MAX_COUNTDOWN_MINUTES: i64 = 999;

pub fn clamp(v: i64, min: i64, max: i64) -> i64 {
    v.max(min).min(max)
}

/// Discord-style relative timestamp, rendered by the destination client as a
/// live countdown: `<t:1719870000:R>`.
pub fn relative_timestamp(now_secs: i64, offset_secs: i64) -> String {
    format!("<t:{}:R>", now_secs + offset_secs)
}

/// Offset for the send-now composer: minutes 0-999, seconds 0-59.
pub fn countdown_offset(minutes: i64, seconds: i64) -> i64 {
    clamp(minutes, 0, MAX_COUNTDOWN_MINUTES) * 60 + clamp(seconds, 0, 59)
}

/// Delay for the schedule composer: hours 0-999, minutes/seconds 0-59.
pub fn schedule_delay(hours: i64, minutes: i64, seconds: i64) -> i64 {
    clamp(hours, 0, MAX_COUNTDOWN_HOURS) * 3600 + clamp(minutes, 0, 59) * 60 + clamp(seconds, 0, 59)
}

/// Build the outbound message body. The token is appended only when requested
/// and the offset is positive; empty parts are skipped.
pub fn compile_message(text: &str, offset_secs: i64, include_token: bool, now_secs: i64) -> String {
    let text = text.trim();
    let token = if include_token && offset_secs > 0 {
        Some(relative_timestamp(now_secs, offset_secs))
    } else {
        None
    };

    match token {
        Some(token) if text.is_empty() => token,
        Some(token) => format!("{text} {token}"),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_embeds_absolute_instant() {
        assert_eq!(relative_timestamp(1_700_000_000, 90), "<t:1700000090:R>");
    }

    #[test]
    fn compile_appends_token_after_text() {
        let out = compile_message("brb", 60, true, 1_700_000_000);
        assert_eq!(out, "brb <t:1700000060:R>");
    }

    #[test]
    fn compile_skips_token_when_offset_is_zero() {
        assert_eq!(compile_message("brb", 0, true, 1_700_000_000), "brb");
    }

    #[test]
    fn compile_skips_token_when_not_requested() {
        assert_eq!(compile_message("brb", 60, false, 1_700_000_000), "brb");
    }

    #[test]
    fn compile_trims_and_handles_empty_text() {
        assert_eq!(compile_message("  hi  ", 0, false, 0), "hi");
        assert_eq!(compile_message("", 30, true, 100), "<t:130:R>");
        assert_eq!(compile_message("   ", 0, false, 0), "");
    }

    #[test]
    fn countdown_fields_are_clamped() {
        assert_eq!(countdown_offset(2, 30), 150);
        assert_eq!(countdown_offset(-5, 120), 59);
        assert_eq!(countdown_offset(1_000, 0), 999 * 60);
        assert_eq!(schedule_delay(1, 1, 1), 3661);
        assert_eq!(schedule_delay(-1, 75, -3), 59 * 60);
    }
}
