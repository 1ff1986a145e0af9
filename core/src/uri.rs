//! Named-information URIs for conditions.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::condition::{Anon, Condition};
use crate::registry::TypeId;
use crate::Result;

impl Anon {
    /// `ni:///sha-256;<fingerprint>?fpt=<type>&cost=<cost>`, with a
    /// `subtypes` list for compound types.
    pub fn uri(&self) -> String {
        let mut uri = format!(
            "ni:///sha-256;{}?fpt={}&cost={}",
            URL_SAFE_NO_PAD.encode(self.fingerprint),
            self.condition_type.name,
            self.cost
        );
        if self.condition_type.has_subtypes {
            let names: Vec<&str> = TypeId::from_mask(self.subtypes & !self.condition_type.id.bit())
                .map(|t| t.cond_type().name)
                .collect();
            uri.push_str("&subtypes=");
            uri.push_str(&names.join(","));
        }
        uri
    }
}

impl Condition {
    pub fn uri(&self) -> Result<String> {
        Ok(self.to_anon()?.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preimage_uri() {
        let uri = Condition::preimage(Vec::new()).uri().unwrap();
        assert_eq!(
            uri,
            "ni:///sha-256;47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU?fpt=preimage-sha-256&cost=0"
        );
    }

    #[test]
    fn compound_uri_lists_subtypes() {
        let tree = Condition::threshold(
            1,
            vec![
                Condition::ed25519([1; 32]),
                Condition::prefix(b"p".to_vec(), 0, Condition::preimage(b"x".to_vec())),
            ],
        );
        let uri = tree.uri().unwrap();
        assert!(uri.contains("?fpt=threshold-sha-256&cost="));
        assert!(uri.ends_with("&subtypes=preimage-sha-256,prefix-sha-256,ed25519-sha-256"));
    }
}
