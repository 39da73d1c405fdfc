//! Sensitive field masking for flat JSON bodies.
//!
//! # Example
//!
//! ```rust,ignore
//! use redactlog::Redactor;
//!
//! let redactor = Redactor::new(["password", "token"]);
//! let masked = redactor.redact(br#"{"user":"ann","password":"hunter2"}"#);
//! assert_eq!(&*masked, br#"{"password":"****","user":"ann"}"#);
//! ```

use crate::codec::{self, BodyMap, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{trace, warn};

/// Replacement written over every sensitive value.
pub const MASK: &str = "****";

/// Masks configured fields in request and response bodies.
///
/// Cloning is cheap; the field list is shared.
#[derive(Debug, Clone)]
pub struct Redactor {
    fields: Arc<[String]>,
}

impl Redactor {
    /// Create a redactor for the given field names (exact match).
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Configured field names, in construction order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Overwrite every configured field present in `map` with [`MASK`].
    ///
    /// Returns how many values actually changed; a field that already holds
    /// the mask does not count.
    pub fn mask(&self, map: &mut BodyMap) -> usize {
        let mut changed = 0;
        for field in self.fields.iter() {
            if let Some(value) = map.get_mut(field) {
                if value.as_str() != Some(MASK) {
                    *value = Value::String(MASK.to_string());
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Redact a body.
    ///
    /// Bodies that are not a flat JSON object, or that contain nothing to
    /// mask, come back borrowed and byte-identical. A masked body is
    /// re-encoded with keys in ascending order.
    pub fn redact<'b>(&self, body: &'b [u8]) -> Cow<'b, [u8]> {
        if self.fields.is_empty() || body.is_empty() {
            return Cow::Borrowed(body);
        }

        let mut map = match codec::decode(body) {
            Ok(map) => map,
            Err(err) => {
                trace!(error = %err, "body is not a flat JSON object, passing through");
                return Cow::Borrowed(body);
            }
        };

        if self.mask(&mut map) == 0 {
            return Cow::Borrowed(body);
        }

        match codec::encode(&codec::pairs_from_map(map)) {
            Ok(encoded) => Cow::Owned(encoded.into_bytes()),
            Err(err) => {
                warn!(error = %err, "failed to re-encode redacted body, logging it unredacted");
                Cow::Borrowed(body)
            }
        }
    }
}
