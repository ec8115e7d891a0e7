//! `dcmsend` exit code table (spec.md §6). Any non-zero code is a delivery
//! failure; the code is passed through to telemetry as free text.

pub fn describe(code: i32) -> &'static str {
    match code {
        0 => "success",
        1 => "command-line syntax error",
        21 => "no input files",
        22 => "invalid input file",
        23 => "no valid input files",
        43 => "cannot write report file",
        60 => "cannot initialize network",
        61 => "cannot negotiate association",
        62 => "cannot send request",
        65 => "cannot add presentation context",
        _ => "unknown dcmsend error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve_to_named_reasons() {
        assert_eq!(describe(62), "cannot send request");
        assert_eq!(describe(0), "success");
    }

    #[test]
    fn unknown_code_has_a_fallback() {
        assert_eq!(describe(999), "unknown dcmsend error");
    }
}
