//! Registry of codecs keyed by media type, with content negotiation.

use rpcmux_core::{Codec, RpcError};
use std::{collections::HashMap, fmt, sync::Arc};

/// Codecs by lower-cased media-type token.
#[derive(Default, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `codec` for the media type `token`.
    ///
    /// Tokens are case-insensitive. A codec already registered under the same
    /// token is replaced and returned.
    pub fn register<C: Codec>(&mut self, codec: C, token: &str) -> Option<Arc<dyn Codec>> {
        let token = token.trim().to_ascii_lowercase();

        #[cfg(feature = "tracing")]
        tracing::debug!(%token, "registered rpc codec");

        self.codecs.insert(token, Arc::new(codec))
    }

    /// Pick the codec for a `Content-Type` header value.
    ///
    /// An empty value selects the sole registered codec. Otherwise everything
    /// from the first `;` on is ignored and the rest is matched
    /// case-insensitively.
    pub fn select(&self, content_type: &str) -> Result<&dyn Codec, RpcError> {
        if content_type.is_empty() {
            let mut all = self.codecs.values();
            return match (all.next(), all.next()) {
                (Some(codec), None) => Ok(&**codec),
                _ => Err(RpcError::MissingContentType),
            };
        }

        let token = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.codecs
            .get(&token)
            .map(|codec| &**codec)
            .ok_or_else(|| RpcError::UnrecognizedContentType(content_type.to_owned()))
    }

    /// Whether a codec is registered for `token`.
    pub fn contains(&self, token: &str) -> bool {
        self.codecs
            .contains_key(&token.trim().to_ascii_lowercase())
    }

    /// Number of registered codecs.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Whether no codec is registered.
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.codecs.keys()).finish()
    }
}
