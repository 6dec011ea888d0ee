//! X.509 chain parsing: `.crt`, `.pem`, `.key` — minimum `notAfter` across
//! every certificate found in the payload.

use x509_parser::pem::Pem;
use x509_parser::prelude::FromDer;

use crate::outcome::ExtractOutcome;

const PEM_MARKER: &[u8] = b"-----BEGIN";

/// Recover the minimum `notAfter` across the chain, or `None` if the
/// payload parsed as neither PEM nor a single raw DER certificate.
pub fn min_not_after(payload: &[u8], der_certs: &mut Vec<Vec<u8>>) -> Option<i64> {
    if payload.windows(PEM_MARKER.len()).any(|w| w == PEM_MARKER) {
        min_not_after_pem(payload, der_certs)
    } else {
        min_not_after_der(payload, der_certs)
    }
}

fn min_not_after_pem(payload: &[u8], der_certs: &mut Vec<Vec<u8>>) -> Option<i64> {
    let mut min: Option<i64> = None;
    for pem in Pem::iter_from_buffer(payload) {
        let Ok(pem) = pem else { continue };
        if pem.label != "CERTIFICATE" {
            continue;
        }
        if let Ok(cert) = pem.parse_x509() {
            let not_after = cert.validity().not_after.timestamp();
            min = Some(min.map_or(not_after, |m: i64| m.min(not_after)));
        }
        der_certs.push(pem.contents);
    }
    min
}

fn min_not_after_der(payload: &[u8], der_certs: &mut Vec<Vec<u8>>) -> Option<i64> {
    let (_, cert) = x509_parser::certificate::X509Certificate::from_der(payload).ok()?;
    der_certs.push(payload.to_vec());
    Some(cert.validity().not_after.timestamp())
}

/// Recover the minimum `notAfter` from a set of already-decoded DER
/// certificates (used by the PKCS#12 and JKS/JCEKS paths, which hand back
/// bare DER bytes rather than a PEM/DER payload).
pub fn min_not_after_of_der_certs(der_certs: &[Vec<u8>]) -> ExtractOutcome {
    let mut min: Option<i64> = None;
    let mut any_parsed = false;
    for der in der_certs {
        if let Ok((_, cert)) = x509_parser::certificate::X509Certificate::from_der(der) {
            any_parsed = true;
            let not_after = cert.validity().not_after.timestamp();
            min = Some(min.map_or(not_after, |m: i64| m.min(not_after)));
        }
    }
    match min {
        Some(t) => ExtractOutcome::Found(t),
        None if any_parsed => ExtractOutcome::Failed,
        None => ExtractOutcome::Failed,
    }
}
