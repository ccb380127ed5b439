use serde::{de::Error, Deserialize, Deserializer, Serializer};

pub fn serde_serialize_string<S>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    // trailing zero padding is not part of the value
    let s = String::from_utf8_lossy(bytes)
        .trim_end_matches(char::from(0))
        .to_string();
    serializer.serialize_str(&s)
}

pub fn serde_deserialize_string<'de, D, const N: usize>(
    deserializer: D,
) -> std::result::Result<[u8; N], D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = <String as Deserialize>::deserialize(deserializer)?;
    if s.len() > N {
        return Err(D::Error::custom(format!(
            "string of length {} doesn't fit in {} bytes",
            s.len(),
            N
        )));
    }
    if s.contains('\0') {
        return Err(D::Error::custom("string contains a NUL byte"));
    }
    let mut bytes = [0u8; N];
    bytes[..s.len()].copy_from_slice(s.as_bytes());
    Ok(bytes)
}
