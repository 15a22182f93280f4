//! Decoders for the hex-string scalar encoding used by plant controllers.
//!
//! Every numeric field on the wire is a hex string without prefix. Controllers
//! occasionally emit truncated or garbage fields, so all decoders here are
//! total: malformed input degrades to a neutral value instead of failing the
//! surrounding message.

use time::OffsetDateTime;

/// Offset between the Windows FILETIME epoch (1601-01-01) and the Unix epoch
/// (1970-01-01), in 100 ns ticks.
pub const FILETIME_UNIX_OFFSET: i128 = 116_444_736_000_000_000;

const TICKS_PER_MILLI: i128 = 10_000;

/// Decodes an unprefixed hex string into a word.
///
/// Empty input, input longer than 16 digits and input containing any
/// non-hex-digit character all decode to 0. Signs and whitespace are not
/// accepted even where `from_str_radix` would take them.
pub fn hex_word(text: &str) -> u64 {
    if text.is_empty() || text.len() > 16 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return 0;
    }
    u64::from_str_radix(text, 16).unwrap_or(0)
}

/// Decodes exactly eight hex digits into an `f32` by bit reinterpretation.
///
/// The wire carries the raw IEEE 754 representation, so no numeric parsing or
/// rounding is involved. Anything other than eight hex digits decodes to 0.0.
pub fn hex_f32(text: &str) -> f32 {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return 0.0;
    }
    match u32::from_str_radix(text, 16) {
        Ok(bits) => f32::from_bits(bits),
        Err(_) => 0.0,
    }
}

/// Decodes exactly sixteen hex digits of FILETIME ticks into Unix epoch
/// milliseconds.
///
/// The subtraction runs in `i128` so tick values near the `u64` range cannot
/// wrap. Malformed input falls back to the current wall clock, which keeps
/// downstream duration math ordered even when a controller drops the field.
pub fn filetime_ms(text: &str) -> i64 {
    if text.len() != 16 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return now_unix_ms();
    }
    match u64::from_str_radix(text, 16) {
        Ok(ticks) => ((ticks as i128 - FILETIME_UNIX_OFFSET) / TICKS_PER_MILLI) as i64,
        Err(_) => now_unix_ms(),
    }
}

/// Current wall clock as Unix epoch milliseconds.
pub fn now_unix_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_decodes_plain_hex() {
        assert_eq!(hex_word("0"), 0);
        assert_eq!(hex_word("1f"), 0x1F);
        assert_eq!(hex_word("00000083"), 0x83);
        assert_eq!(hex_word("FFFFFFFFFFFFFFFF"), u64::MAX);
    }

    #[test]
    fn word_degrades_to_zero() {
        assert_eq!(hex_word(""), 0);
        assert_eq!(hex_word("xyz"), 0);
        assert_eq!(hex_word("12 34"), 0);
        // from_str_radix would accept a leading sign, the wire never carries one
        assert_eq!(hex_word("+1"), 0);
        assert_eq!(hex_word("-1"), 0);
        // 17 digits overflows a u64 word
        assert_eq!(hex_word("10000000000000000"), 0);
    }

    #[test]
    fn f32_reinterprets_bits() {
        assert_eq!(hex_f32("3F800000"), 1.0);
        assert_eq!(hex_f32("C0200000"), -2.5);
        assert_eq!(hex_f32("00000000"), 0.0);
        assert_eq!(hex_f32("42C83333"), 100.1);
        assert!(hex_f32("7FC00000").is_nan());
    }

    #[test]
    fn f32_requires_exact_width() {
        assert_eq!(hex_f32(""), 0.0);
        assert_eq!(hex_f32("3F80"), 0.0);
        assert_eq!(hex_f32("3F8000000"), 0.0);
        assert_eq!(hex_f32("3F80000G"), 0.0);
    }

    #[test]
    fn filetime_converts_known_instant() {
        // 2021-01-01T00:00:00Z in FILETIME ticks
        let ticks: u64 = 132_539_328_000_000_000;
        let hex = format!("{ticks:016X}");
        assert_eq!(filetime_ms(&hex), 1_609_459_200_000);
    }

    #[test]
    fn filetime_preserves_ordering() {
        let earlier: u64 = 132_539_328_000_000_000;
        let later = earlier + 12_340_000; // 1234 ms in ticks
        let a = filetime_ms(&format!("{earlier:016X}"));
        let b = filetime_ms(&format!("{later:016X}"));
        assert_eq!(b - a, 1234);
    }

    #[test]
    fn filetime_epoch_itself_maps_to_unix_zero() {
        let hex = format!("{FILETIME_UNIX_OFFSET:016X}");
        assert_eq!(filetime_ms(&hex), 0);
    }

    #[test]
    fn malformed_filetime_falls_back_to_wall_clock() {
        let before = now_unix_ms();
        let decoded = filetime_ms("not-a-timestamp!");
        let after = now_unix_ms();
        assert!(decoded >= before && decoded <= after);

        let short = filetime_ms("1D6DFA2");
        assert!(short >= before);
    }
}
