//! One-way rater pseudonyms.
//!
//! A [`RaterToken`] is `HMAC-SHA256(secret, rater_id ‖ round_id)`, hex-encoded.
//! The same rater in the same round always yields the same token, the same
//! rater in another round yields an unrelated one, and nothing in the system
//! maps a token back to a person. Rotating the secret invalidates every token
//! ever issued.

use std::fmt;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Opaque per-round rater identity stored on 360 assignments and feedback.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RaterToken(String);

impl RaterToken {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl From<String> for RaterToken {
  fn from(s: String) -> Self { Self(s) }
}

impl fmt::Display for RaterToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Pseudonymized rater attribute (department, role, ...) stored with each
/// answer. Bound to the rater and round like [`RaterToken`].
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AttributeToken(String);

impl AttributeToken {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl From<String> for AttributeToken {
  fn from(s: String) -> Self { Self(s) }
}

/// Keyed pseudonymizer. Construct once from configuration and share.
#[derive(Clone)]
pub struct Pseudonymizer {
  keyed: HmacSha256,
}

impl fmt::Debug for Pseudonymizer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Pseudonymizer").finish_non_exhaustive()
  }
}

impl Pseudonymizer {
  pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
    let secret = secret.as_ref();
    if secret.is_empty() {
      return Err(Error::EmptySecret);
    }
    let keyed =
      HmacSha256::new_from_slice(secret).map_err(|_| Error::EmptySecret)?;
    Ok(Self { keyed })
  }

  /// The rater's token for `round_id`.
  pub fn token(&self, rater_id: Uuid, round_id: Uuid) -> RaterToken {
    RaterToken(self.digest(&[rater_id.as_bytes(), round_id.as_bytes()]))
  }

  /// Token for one attribute of a rater within a round.
  pub fn attribute_token(
    &self,
    rater_id: Uuid,
    round_id: Uuid,
    name: &str,
    value: &str,
  ) -> AttributeToken {
    AttributeToken(self.digest(&[
      rater_id.as_bytes(),
      round_id.as_bytes(),
      name.as_bytes(),
      value.as_bytes(),
    ]))
  }

  fn digest(&self, parts: &[&[u8]]) -> String {
    let mut mac = self.keyed.clone();
    // Length-prefix every part so distinct tuples never share an encoding.
    for part in parts {
      mac.update(&(part.len() as u64).to_le_bytes());
      mac.update(part);
    }
    hex::encode(mac.finalize().into_bytes())
  }
}
