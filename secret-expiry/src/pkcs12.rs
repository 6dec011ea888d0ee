//! PKCS#12 (`.p12`, `.pfx`) expiry: try each candidate password, first
//! that opens the store wins, then take the minimum `notAfter` across its
//! certificate bags.

use p12::PFX;

use crate::outcome::ExtractOutcome;
use crate::x509;

pub fn min_expiry(payload: &[u8], passwords: &[String]) -> ExtractOutcome {
    let Ok(pfx) = PFX::parse(payload) else {
        return ExtractOutcome::Failed;
    };

    for password in candidate_passwords(passwords) {
        if !pfx.verify_mac(&password) {
            continue;
        }
        let Ok(der_certs) = pfx.cert_x509_bags(&password) else {
            continue;
        };
        return x509::min_not_after_of_der_certs(&der_certs);
    }

    ExtractOutcome::Failed
}

/// The caller's password list plus the implicit empty password, as a
/// freshly-owned iteration order — never mutates the caller's collection.
pub(crate) fn candidate_passwords(passwords: &[String]) -> Vec<String> {
    let mut out: Vec<String> = passwords.to_vec();
    out.push(String::new());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const P12: &[u8] = include_bytes!("../tests/fixtures/test.p12");

    #[test]
    fn correct_password_extracts_expiry() {
        match min_expiry(P12, &["testpass".to_string()]) {
            ExtractOutcome::Found(t) => assert!(t > 0),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn wrong_passwords_fail_without_panic() {
        assert_eq!(
            min_expiry(P12, &["wrong".to_string(), "also-wrong".to_string()]),
            ExtractOutcome::Failed
        );
    }

    #[test]
    fn empty_password_is_always_tried() {
        // The store requires "testpass"; confirm the implicit empty
        // password is appended rather than substituted.
        let candidates = candidate_passwords(&["testpass".to_string()]);
        assert_eq!(candidates, vec!["testpass".to_string(), String::new()]);
    }
}
