use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        HoloreelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(HoloreelError::decode("x").to_string().contains("decode error:"));
}

#[test]
fn header_mismatches_carry_expected_and_actual() {
    let err = HoloreelError::IdentifierMismatch {
        expected: *b"HLPR",
        actual: *b"NOPE",
    };
    let msg = err.to_string();
    assert!(msg.contains("identifier mismatch"));

    let err = HoloreelError::VersionMismatch {
        expected: 3,
        actual: 4,
    };
    let msg = err.to_string();
    assert!(msg.contains("expected 3"));
    assert!(msg.contains("got 4"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = HoloreelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
