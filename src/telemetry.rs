//! Telemetry line decoding and classification
//!
//! The device interleaves JSON telemetry with free-form debug output. Each
//! line is decoded, trimmed and either forwarded or skipped; skipping is an
//! ordinary outcome here, never an error.

use serde_json::Value;

/// Why a line was not forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing left after trimming
    Empty,
    /// Does not start with `{`, usually device debug output
    NotJsonObject,
    /// Starts like an object but is not valid JSON
    Malformed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Empty => write!(f, "empty"),
            SkipReason::NotJsonObject => write!(f, "not a JSON object"),
            SkipReason::Malformed => write!(f, "malformed JSON"),
        }
    }
}

/// A parsed payload ready to be posted
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    /// Decoded JSON, forwarded unmodified. Numbers keep their source text
    /// and objects keep their key order, so re-serializing is lossless.
    pub payload: Value,
    /// Byte length of the trimmed source line
    pub line_len: usize,
}

/// Outcome of classifying one line
#[derive(Debug, Clone, PartialEq)]
pub enum LineDecision {
    Forward(Telemetry),
    Skip(SkipReason),
}

/// Decode raw serial bytes as UTF-8, dropping any invalid sequences.
///
/// Serial links pick up electrical noise; a corrupted byte must not cost the
/// whole line, and it must not be replaced with U+FFFD either.
pub fn decode_lossy(raw: &[u8]) -> String {
    let mut text = String::with_capacity(raw.len());
    for chunk in raw.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Classify a raw line as forwardable telemetry or noise
pub fn classify(raw: &[u8]) -> LineDecision {
    let text = decode_lossy(raw);
    let line = text.trim();

    if line.is_empty() {
        return LineDecision::Skip(SkipReason::Empty);
    }
    if !line.starts_with('{') {
        return LineDecision::Skip(SkipReason::NotJsonObject);
    }

    match serde_json::from_str::<Value>(line) {
        Ok(payload) => LineDecision::Forward(Telemetry {
            payload,
            line_len: line.len(),
        }),
        Err(_) => LineDecision::Skip(SkipReason::Malformed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_drops_invalid_bytes() {
        assert_eq!(decode_lossy(b"{\"a\":\xff1}"), "{\"a\":1}");
        assert_eq!(decode_lossy(b"\xc3\x28ok"), "(ok");
        assert_eq!(decode_lossy("temp \u{b0}C".as_bytes()), "temp \u{b0}C");
        assert!(!decode_lossy(b"\x80\x81abc").contains('\u{fffd}'));
    }

    #[test]
    fn test_empty_and_whitespace_lines() {
        assert_eq!(classify(b""), LineDecision::Skip(SkipReason::Empty));
        assert_eq!(classify(b"   \t\r"), LineDecision::Skip(SkipReason::Empty));
        assert_eq!(classify(b"\xff\xfe"), LineDecision::Skip(SkipReason::Empty));
    }

    #[test]
    fn test_debug_output_is_skipped() {
        for line in ["WiFi scan started", "[1234] rssi=-70", "42", "\"{quoted}\""] {
            assert_eq!(
                classify(line.as_bytes()),
                LineDecision::Skip(SkipReason::NotJsonObject)
            );
        }
    }

    #[test]
    fn test_malformed_json_is_skipped() {
        for line in ["{", "{\"temp\": }", "{temp: 1}", "{\"a\":1} trailing"] {
            assert_eq!(classify(line.as_bytes()), LineDecision::Skip(SkipReason::Malformed));
        }
    }

    #[test]
    fn test_valid_object_is_forwarded() {
        let decision = classify(b"  {\"temp\": 21.5, \"ch\": [1,2,3]}\r\n");
        assert_eq!(
            decision,
            LineDecision::Forward(Telemetry {
                payload: json!({"temp": 21.5, "ch": [1, 2, 3]}),
                line_len: r#"{"temp": 21.5, "ch": [1,2,3]}"#.len(),
            })
        );
    }

    #[test]
    fn test_noise_inside_object_is_dropped_before_parsing() {
        match classify(b"{\"rssi\":\xff -61}") {
            LineDecision::Forward(t) => assert_eq!(t.payload, json!({"rssi": -61})),
            other => panic!("expected forward, got {:?}", other),
        }
    }

    fn forwarded_text(line: &str) -> String {
        match classify(line.as_bytes()) {
            LineDecision::Forward(t) => serde_json::to_string(&t.payload).unwrap(),
            other => panic!("expected forward, got {:?}", other),
        }
    }

    #[test]
    fn test_integers_beyond_u64_are_exact() {
        assert_eq!(
            forwarded_text(r#"{"id": 18446744073709551616}"#),
            r#"{"id":18446744073709551616}"#
        );
        assert_eq!(
            forwarded_text(r#"{"n": -99999999999999999999999}"#),
            r#"{"n":-99999999999999999999999}"#
        );
    }

    #[test]
    fn test_floats_keep_their_value() {
        let text = forwarded_text(r#"{"v": 2.2250738585072011e-308}"#);
        let echoed: Value = serde_json::from_str(&text).unwrap();
        let bits = |v: &Value| v["v"].as_f64().unwrap().to_bits();
        assert_eq!(bits(&echoed), "2.2250738585072011e-308".parse::<f64>().unwrap().to_bits());
        assert_eq!(text, r#"{"v":2.2250738585072011e-308}"#);

        let tiny = "-0.000000000000000000000000000000000000000000000000000001234567890123456789";
        let text = forwarded_text(&format!(r#"{{"v": {}}}"#, tiny));
        let echoed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(bits(&echoed), tiny.parse::<f64>().unwrap().to_bits());
    }

    #[test]
    fn test_key_order_is_preserved() {
        assert_eq!(
            forwarded_text(r#"{"ts": 1, "rssi": -61, "ch": 6, "a": null}"#),
            r#"{"ts":1,"rssi":-61,"ch":6,"a":null}"#
        );
    }
}
