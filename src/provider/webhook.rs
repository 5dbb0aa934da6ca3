// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Verification of inbound provider webhooks
//!
//! The provider signs the raw request body with HMAC-SHA256 keyed by a shared
//! secret and sends `sha256=<lowercase hex digest>`. Without a configured secret
//! the verifier runs in `Bypass` mode and accepts every delivery; that mode is
//! logged as a warning at construction and on each accepted delivery.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookMode {
    /// Signatures are checked against the shared secret
    Enforced,
    /// No secret configured: every delivery is accepted
    Bypass,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<Vec<u8>>,
}

impl WebhookVerifier {
    pub fn new(secret: Option<&str>) -> Self {
        let secret = secret
            .filter(|s| !s.is_empty())
            .map(|s| s.as_bytes().to_vec());
        if secret.is_none() {
            warn!(
                "No webhook secret configured: webhook signatures will NOT be verified. \
                 Set REPLICATE_WEBHOOK_SECRET in production."
            );
        }
        Self { secret }
    }

    pub fn mode(&self) -> WebhookMode {
        if self.secret.is_some() {
            WebhookMode::Enforced
        } else {
            WebhookMode::Bypass
        }
    }

    /// Constant-time check of `signature` against the HMAC of `raw_body`
    pub fn verify(&self, signature: &str, raw_body: &[u8]) -> bool {
        let Some(secret) = &self.secret else {
            warn!("Webhook accepted without signature check (bypass mode)");
            return true;
        };

        let signature = signature.trim();
        let digest_hex = signature.strip_prefix(SIGNATURE_PREFIX).unwrap_or(signature);
        if digest_hex.is_empty()
            || !digest_hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            debug!("Rejecting webhook: signature is not lowercase hex");
            return false;
        }
        let expected = match hex::decode(digest_hex) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Rejecting webhook: {}", e);
                return false;
            }
        };
        let mut mac = match HmacSha256::new_from_slice(secret) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(raw_body);
        let ok = mac.verify_slice(&expected).is_ok();
        if !ok {
            warn!("Rejecting webhook: signature mismatch");
        }
        ok
    }

    /// `sha256=<hex>` for `raw_body`, or `None` in bypass mode
    pub fn sign(&self, raw_body: &[u8]) -> Option<String> {
        let secret = self.secret.as_ref()?;
        let mut mac = HmacSha256::new_from_slice(secret).ok()?;
        mac.update(raw_body);
        Some(format!(
            "{}{}",
            SIGNATURE_PREFIX,
            hex::encode(mac.finalize().into_bytes())
        ))
    }
}
