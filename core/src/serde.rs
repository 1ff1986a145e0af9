/// Serde helper to (de)serialize byte fields as unpadded base64url.
///
/// Works for any field type built from a `Vec<u8>`, so both `Vec<u8>`
/// and fixed arrays such as `[u8; 32]` go through it.
pub mod b64 {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S, T>(bytes: &T, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        s.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<Vec<u8>>,
    {
        let encoded = String::deserialize(d)?;
        decode(&encoded).map_err(de::Error::custom)
    }

    pub(super) fn decode<T: TryFrom<Vec<u8>>>(encoded: &str) -> Result<T, String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| format!("invalid base64url: {e}"))?;
        let len = bytes.len();
        T::try_from(bytes).map_err(|_| format!("unexpected length {len}"))
    }
}

/// Same as [`b64`] for optional fields; `null` maps to `None`.
pub mod b64_opt {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S, T>(value: &Option<T>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        match value {
            Some(bytes) => s.serialize_some(&URL_SAFE_NO_PAD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<Vec<u8>>,
    {
        Option::<String>::deserialize(d)?
            .map(|encoded| super::b64::decode(&encoded).map_err(de::Error::custom))
            .transpose()
    }
}

/// Serde helper to (de)serialize a registry entry as its type name.
pub mod cond_type_serde {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::registry::{self, CondType};

    pub fn serialize<S>(value: &&'static CondType, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(value.name)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<&'static CondType, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(d)?;
        registry::lookup_name(&name)
            .ok_or_else(|| de::Error::custom(format!("unknown condition type {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::{b64, b64_opt, cond_type_serde};
    use crate::registry::{CondType, TypeId};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct BytesWrapper(#[serde(with = "b64")] Vec<u8>);

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct ArrayWrapper(#[serde(with = "b64")] [u8; 4]);

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct OptWrapper {
        #[serde(default, with = "b64_opt", skip_serializing_if = "Option::is_none")]
        sig: Option<[u8; 2]>,
    }

    #[test]
    fn bytes_are_unpadded_base64url() {
        let wrapped = BytesWrapper(vec![0xfb, 0xff]);
        let ser = serde_json::to_string(&wrapped).unwrap();
        assert_eq!(ser, "\"-_8\"");
        let de: BytesWrapper = serde_json::from_str(&ser).unwrap();
        assert_eq!(de, wrapped);
    }

    #[test]
    fn padded_or_standard_alphabet_is_rejected() {
        assert!(serde_json::from_str::<BytesWrapper>("\"-_8=\"").is_err());
        assert!(serde_json::from_str::<BytesWrapper>("\"+/8\"").is_err());
        assert!(serde_json::from_str::<BytesWrapper>("[251, 255]").is_err());
    }

    #[test]
    fn fixed_arrays_check_length() {
        let wrapped = ArrayWrapper([1, 2, 3, 4]);
        let ser = serde_json::to_string(&wrapped).unwrap();
        assert_eq!(ser, "\"AQIDBA\"");
        assert_eq!(serde_json::from_str::<ArrayWrapper>(&ser).unwrap(), wrapped);
        assert!(serde_json::from_str::<ArrayWrapper>("\"AQID\"").is_err());
    }

    #[test]
    fn optional_bytes() {
        let none = OptWrapper { sig: None };
        assert_eq!(serde_json::to_string(&none).unwrap(), "{}");
        assert_eq!(serde_json::from_str::<OptWrapper>("{}").unwrap(), none);
        assert_eq!(
            serde_json::from_str::<OptWrapper>("{\"sig\":null}").unwrap(),
            none
        );

        let some = OptWrapper {
            sig: Some([0xfb, 0xff]),
        };
        let ser = serde_json::to_string(&some).unwrap();
        assert_eq!(ser, "{\"sig\":\"-_8\"}");
        assert_eq!(serde_json::from_str::<OptWrapper>(&ser).unwrap(), some);
        assert!(serde_json::from_str::<OptWrapper>("{\"sig\":\"AQID\"}").is_err());
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TypeWrapper(#[serde(with = "cond_type_serde")] &'static CondType);

    #[test]
    fn cond_type_by_name() {
        let wrapped = TypeWrapper(TypeId::Threshold.cond_type());
        let ser = serde_json::to_string(&wrapped).unwrap();
        assert_eq!(ser, "\"threshold-sha-256\"");
        let de: TypeWrapper = serde_json::from_str(&ser).unwrap();
        assert_eq!(de, wrapped);

        assert!(serde_json::from_str::<TypeWrapper>("\"rsa-sha-256\"").is_err());
    }
}
