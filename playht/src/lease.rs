//! PlayHT API lease tokens.
//!
//! A lease is a short-lived signed authorization token handed out by the
//! lease HTTP endpoint. The client never creates or signs one; it only
//! decodes the validity window and routing metadata the server embedded.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Fixed-size header length of a lease token, in bytes.
///
/// Bytes `[0..64)` are an opaque signature/padding block, bytes `[64..72)`
/// are two big-endian u32 fields (created offset and duration, in seconds
/// relative to [`lease_epoch`]). Everything after the header is a UTF-8
/// JSON metadata object.
pub const LEASE_HEADER_LEN: usize = 72;

/// Expiry tolerance, in seconds.
///
/// Expiry is enforced by this client and by the remote backend alike; the
/// shared window keeps a token that expires mid-call from being rejected
/// while an in-flight request still holds it.
pub const LEASE_GRACE_SECS: i64 = 300;

/// Metadata key for the premium inference backend address.
const META_PREMIUM_ADDRESS: &str = "premium_inference_address";

/// Metadata key for the standard inference backend address.
const META_ADDRESS: &str = "inference_address";

/// Reference instant the lease header offsets count from:
/// 2018-02-21T18:58:00Z.
pub fn lease_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 2, 21, 18, 58, 0).unwrap()
}

/// A decoded PlayHT lease token.
///
/// Holds the raw signed bytes verbatim (the server revalidates them) next
/// to the decoded expiry and routing metadata. Immutable; `Session`
/// replaces a stale lease with a fresh one, it never mutates it.
#[derive(Debug, Clone)]
pub struct Lease {
    token: Vec<u8>,
    created: u32,
    duration: u32,
    expires: DateTime<Utc>,
    meta: Map<String, Value>,
}

impl Lease {
    /// Decodes a raw lease token.
    ///
    /// Fails with [`Error::MalformedLease`] on a short header or invalid
    /// trailing JSON, and with [`Error::ExpiredLease`] when the embedded
    /// validity window is already over — a fresh token arriving expired
    /// means a clock or transport problem, not normal aging.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        Self::decode_at(raw, Utc::now())
    }

    /// Decodes a raw lease token against an explicit current time.
    pub(crate) fn decode_at(raw: &[u8], now: DateTime<Utc>) -> Result<Self> {
        if raw.len() < LEASE_HEADER_LEN {
            return Err(Error::MalformedLease(format!(
                "token is {} bytes, want at least {LEASE_HEADER_LEN}",
                raw.len()
            )));
        }

        // The two trailing header fields; bytes [0..64) stay opaque.
        let created = u32::from_be_bytes(raw[64..68].try_into().unwrap());
        let duration = u32::from_be_bytes(raw[68..72].try_into().unwrap());

        let meta: Map<String, Value> = serde_json::from_slice(&raw[LEASE_HEADER_LEN..])
            .map_err(|e| Error::MalformedLease(format!("metadata: {e}")))?;

        let expires = lease_epoch()
            + Duration::seconds(i64::from(created))
            + Duration::seconds(i64::from(duration));

        let lease = Self {
            token: raw.to_vec(),
            created,
            duration,
            expires,
            meta,
        };

        if lease.is_expired_at(now) {
            return Err(Error::ExpiredLease { expires });
        }

        Ok(lease)
    }

    /// Technical expiry instant (`epoch + created + duration`).
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires
    }

    /// Created offset from the lease epoch, in seconds.
    pub fn created(&self) -> u32 {
        self.created
    }

    /// Validity duration, in seconds.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Returns true once the lease is past its expiry plus the grace
    /// window.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Expiry check against an explicit current time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.expires) > Duration::seconds(LEASE_GRACE_SECS)
    }

    /// Returns the raw signed token bytes for use in a request.
    ///
    /// Fails with [`Error::ExpiredLease`] if the lease went stale since it
    /// was decoded.
    pub fn token(&self) -> Result<&[u8]> {
        if self.is_expired() {
            return Err(Error::ExpiredLease {
                expires: self.expires,
            });
        }
        Ok(&self.token)
    }

    /// Network address of the synthesis backend this lease routes to.
    ///
    /// Premium accounts get a dedicated backend; the premium address wins
    /// when both are present.
    pub fn routing_address(&self) -> Result<&str> {
        self.meta
            .get(META_PREMIUM_ADDRESS)
            .or_else(|| self.meta.get(META_ADDRESS))
            .and_then(Value::as_str)
            .ok_or(Error::RoutingUnavailable)
    }

    /// Returns true when the lease routes to a premium backend.
    pub fn is_premium(&self) -> bool {
        self.meta.contains_key(META_PREMIUM_ADDRESS)
    }

    /// Raw metadata object returned by the lease endpoint.
    ///
    /// Beyond the inference addresses the keys are undocumented and
    /// implementation-defined.
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.meta
    }
}
