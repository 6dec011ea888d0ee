//! OpenPGP key expiry: `.gpg`, `.pgp` — primary key and subkey expiration.
//!
//! A transferable public key carries expiration as a *relative* duration
//! in a `KeyExpirationTime` signature subpacket; the absolute instant is
//! the key's creation time plus that duration. A key (or subkey) with no
//! such subpacket anywhere has no expiry — that's a valid state, not a
//! parse failure.

use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

use pgp::composed::{Deserializable, SignedPublicKey};
use pgp::types::KeyDetails;

use crate::outcome::ExtractOutcome;

fn unix_seconds(created_at: pgp::types::Timestamp, expires_in: std::time::Duration) -> i64 {
    let created: SystemTime = created_at.into();
    let absolute = created + expires_in;
    absolute
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn min_expiry(payload: &[u8]) -> ExtractOutcome {
    let key = SignedPublicKey::from_bytes(Cursor::new(payload))
        .or_else(|_| SignedPublicKey::from_armor_single(Cursor::new(payload)).map(|(k, _)| k));

    let key = match key {
        Ok(key) => key,
        Err(_) => return ExtractOutcome::Failed,
    };

    let created = key.primary_key.created_at();
    let mut min: Option<i64> = None;

    let mut consider = |expires_in: Option<pgp::types::Duration>| {
        if let Some(d) = expires_in {
            let t = unix_seconds(created, d.into());
            min = Some(min.map_or(t, |m: i64| m.min(t)));
        }
    };

    for sig in &key.details.direct_signatures {
        consider(sig.key_expiration_time());
    }
    for user in &key.details.users {
        for sig in &user.signatures {
            consider(sig.key_expiration_time());
        }
    }
    for subkey in &key.public_subkeys {
        for sig in &subkey.signatures {
            consider(sig.key_expiration_time());
        }
    }

    match min {
        Some(t) => ExtractOutcome::Found(t),
        None => ExtractOutcome::Failed,
    }
}
