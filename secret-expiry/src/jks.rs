//! JKS / JCEKS (`.jks`, `.jceks`) expiry.
//!
//! No maintained crate in the registry parses this container (the one
//! published crate, `jks`, is built against an incompatible version of its
//! own declared `p12-keystore` dependency and does not compile — see
//! `DESIGN.md`). This module hand-rolls the container format directly from
//! the public JKS/JCEKS binary layout:
//!
//! ```text
//! magic:   u32        (0xFEEDFEED for JKS, 0xCECECECE for JCEKS)
//! version: u32
//! count:   u32
//! count * {
//!   tag:       u32    (1 = private key entry, 2 = trusted certificate entry)
//!   alias:     utf    (u16 length prefix + bytes)
//!   timestamp: i64
//!   if tag == 1 {
//!     encrypted_key: u32 length prefix + bytes
//!     chain_len:     u32
//!     chain_len * { cert_type: utf, cert: u32 length prefix + bytes }
//!   }
//!   if tag == 2 {
//!     cert_type: utf
//!     cert:      u32 length prefix + bytes
//!   }
//! }
//! integrity_digest: 20 bytes  (SHA-1 over password(UTF-16BE) || "Mighty Aphrodite" || the bytes above)
//! ```
//!
//! Certificate bytes (both the trusted-certificate entries and the chain
//! carried alongside a private key) are stored as plain DER, unencrypted,
//! in both JKS and JCEKS — only the private key material itself is
//! encrypted. So certificates can be recovered without a correct password;
//! the password list is used only to decide whether the store's integrity
//! digest verifies, matching the PKCS#12 path's "first password that opens
//! wins" contract.

use sha1::{Digest, Sha1};

use crate::outcome::ExtractOutcome;
use crate::pkcs12::candidate_passwords;
use crate::x509;

const JKS_MAGIC: u32 = 0xFEED_FEED;
const JCEKS_MAGIC: u32 = 0xCECE_CECE;

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn u32(&mut self) -> Option<u32> {
        let b = self.bytes(4)?;
        Some(u32::from_be_bytes(b.try_into().ok()?))
    }

    fn i64(&mut self) -> Option<i64> {
        let b = self.bytes(8)?;
        Some(i64::from_be_bytes(b.try_into().ok()?))
    }

    fn bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return None;
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(out)
    }

    fn utf(&mut self) -> Option<&'a [u8]> {
        let len = self.bytes(2)?;
        let len = u16::from_be_bytes(len.try_into().ok()?) as usize;
        self.bytes(len)
    }
}

struct ParsedStore {
    der_certs: Vec<Vec<u8>>,
    header_and_entries: Vec<u8>,
}

fn parse(payload: &[u8]) -> Option<ParsedStore> {
    let mut r = Reader::new(payload);
    let magic = r.u32()?;
    if magic != JKS_MAGIC && magic != JCEKS_MAGIC {
        return None;
    }
    let _version = r.u32()?;
    let count = r.u32()?;

    let mut der_certs = Vec::new();

    for _ in 0..count {
        let tag = r.u32()?;
        let _alias = r.utf()?;
        let _timestamp = r.i64()?;

        match tag {
            1 => {
                let klen = r.u32()? as usize;
                let _encrypted_key = r.bytes(klen)?;
                let chain_len = r.u32()?;
                for _ in 0..chain_len {
                    let _cert_type = r.utf()?;
                    let clen = r.u32()? as usize;
                    der_certs.push(r.bytes(clen)?.to_vec());
                }
            }
            2 => {
                let _cert_type = r.utf()?;
                let clen = r.u32()? as usize;
                der_certs.push(r.bytes(clen)?.to_vec());
            }
            _ => return None,
        }
    }

    let header_and_entries = payload[..r.pos].to_vec();
    Some(ParsedStore {
        der_certs,
        header_and_entries,
    })
}

fn integrity_digest(payload: &[u8], header_and_entries: &[u8]) -> Option<[u8; 20]> {
    let digest_start = header_and_entries.len();
    let digest_bytes = payload.get(digest_start..digest_start + 20)?;
    digest_bytes.try_into().ok()
}

fn verifies(password: &str, header_and_entries: &[u8], expected: &[u8; 20]) -> bool {
    let mut hasher = Sha1::new();
    for unit in password.encode_utf16() {
        hasher.update(unit.to_be_bytes());
    }
    hasher.update(b"Mighty Aphrodite");
    hasher.update(header_and_entries);
    let digest = hasher.finalize();
    digest.as_slice() == expected
}

pub fn min_expiry(payload: &[u8], passwords: &[String]) -> ExtractOutcome {
    let Some(store) = parse(payload) else {
        return ExtractOutcome::Failed;
    };

    let Some(expected) = integrity_digest(payload, &store.header_and_entries) else {
        return ExtractOutcome::Failed;
    };

    let opens = candidate_passwords(passwords)
        .iter()
        .any(|pw| verifies(pw, &store.header_and_entries, &expected));

    if !opens {
        return ExtractOutcome::Failed;
    }

    x509::min_not_after_of_der_certs(&store.der_certs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JKS: &[u8] = include_bytes!("../tests/fixtures/test.jks");

    #[test]
    fn rejects_bad_magic() {
        assert!(parse(b"not a keystore").is_none());
    }

    #[test]
    fn correct_password_extracts_expiry() {
        match min_expiry(JKS, &["testpass".to_string()]) {
            ExtractOutcome::Found(t) => assert!(t > 0),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn wrong_password_fails() {
        assert_eq!(
            min_expiry(JKS, &["wrong".to_string()]),
            ExtractOutcome::Failed
        );
    }
}
