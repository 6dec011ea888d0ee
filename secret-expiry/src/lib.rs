//! Expiration extraction from opaque binary payloads (C2).
//!
//! [`extract`] dispatches on the filename suffix to the decoder for that
//! format; an unrecognized suffix reports [`ExtractOutcome::Unknown`],
//! which is a distinct outcome from [`ExtractOutcome::Failed`] (a
//! recognized format that couldn't be parsed) even though callers treat
//! both the same way: no expiry, no error.

mod jks;
mod openpgp;
mod outcome;
mod pkcs12;
mod x509;

pub use outcome::ExtractOutcome;

/// Extract the minimum `notAfter` instant from `payload`, dispatching on
/// `filename`'s suffix. `passwords` is tried in order for PKCS#12 and
/// JKS/JCEKS payloads, with the empty password always appended; it is
/// read, never mutated.
pub fn extract(filename: &str, payload: &[u8], passwords: &[String]) -> ExtractOutcome {
    let suffix = filename.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match suffix.as_str() {
        "crt" | "pem" | "key" => {
            let mut certs = Vec::new();
            match x509::min_not_after(payload, &mut certs) {
                Some(t) => ExtractOutcome::Found(t),
                None => ExtractOutcome::Failed,
            }
        }
        "gpg" | "pgp" => openpgp::min_expiry(payload),
        "p12" | "pfx" => pkcs12::min_expiry(payload, passwords),
        "jceks" | "jks" => jks::min_expiry(payload, passwords),
        _ => ExtractOutcome::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_suffix_is_unknown() {
        assert_eq!(
            extract("secret.bin", b"whatever", &[]),
            ExtractOutcome::Unknown
        );
    }

    #[test]
    fn pem_cert_round_trips_through_dispatch() {
        let payload = include_bytes!("../tests/fixtures/single.pem");
        match extract("leaf.pem", payload, &[]) {
            ExtractOutcome::Found(t) => assert!(t > 0),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn der_cert_round_trips_through_dispatch() {
        let payload = include_bytes!("../tests/fixtures/single.der");
        match extract("leaf.crt", payload, &[]) {
            ExtractOutcome::Found(t) => assert!(t > 0),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn garbage_recognized_format_fails_not_panics() {
        assert_eq!(extract("broken.p12", b"garbage", &[]), ExtractOutcome::Failed);
        assert_eq!(extract("broken.jks", b"garbage", &[]), ExtractOutcome::Failed);
        assert_eq!(extract("broken.gpg", b"garbage", &[]), ExtractOutcome::Failed);
    }
}
