//! Structured input binding for `application/x-www-form-urlencoded`
//! bodies and query strings.
//!
//! Binding goes through serde: the target's own field list drives the
//! lookup, so field names match case-insensitively, unknown keys are
//! ignored, and container defaults fill whatever the caller left out.
//!
//! - repeated keys populate sequence fields; scalars take the first value
//! - `field.key=value` populates map fields, keeping the key's case
//! - booleans accept `true`, `false`, `1` and `0`

use std::fmt;

use percent_encoding::percent_decode;
use provctl_core::error::{ProvError, ProvResult};
use provctl_core::models::resource::Resource;
use serde::de::value::{MapDeserializer, SeqDeserializer, StrDeserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use serde_json::Value;
use thiserror::Error;

/// A form could not be decoded. The message is the decoder's own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BindError {
    message: String,
    /// Set when a non-map field was offered only `field.key` entries.
    nested_only: Option<String>,
}

impl BindError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            nested_only: None,
        }
    }
}

impl de::Error for BindError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BindError::new(msg.to_string())
    }
}

impl From<BindError> for ProvError {
    fn from(err: BindError) -> Self {
        ProvError::InvalidInput(err.message)
    }
}

/// Decoded key/value pairs, in the order the caller sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pairs: Vec<(String, String)>,
}

impl FormInput {
    /// Decode a urlencoded byte string. Malformed escapes and invalid
    /// UTF-8 are errors, not replacement characters.
    pub fn parse(raw: &[u8]) -> Result<Self, BindError> {
        let mut pairs = Vec::new();
        for segment in raw.split(|b| *b == b'&') {
            if segment.is_empty() {
                continue;
            }
            let (key, value) = match segment.iter().position(|b| *b == b'=') {
                Some(at) => (&segment[..at], &segment[at + 1..]),
                None => (segment, &[][..]),
            };
            let key = decode_component(key)?;
            if key.is_empty() {
                continue;
            }
            pairs.push((key, decode_component(value)?));
        }
        Ok(Self { pairs })
    }

    /// Snapshot for the audit trail: each key in the caller's spelling,
    /// mapped to its value, or to a list when the key was repeated.
    pub fn custom_data(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.pairs {
            let value = Value::String(value.clone());
            match map.get_mut(key) {
                None => {
                    map.insert(key.clone(), value);
                }
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }
        Value::Object(map)
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        // Dotted keys aimed at a non-map field are unknown keys: drop
        // them and decode again.
        let mut flat = Vec::new();
        loop {
            let form = FormDeserializer {
                pairs: &self.pairs,
                flat: &flat,
            };
            match T::deserialize(form) {
                Err(BindError {
                    nested_only: Some(field),
                    ..
                }) if !flat.contains(&field) => flat.push(field),
                result => return result,
            }
        }
    }

    /// Decode a descriptor and run its own validation.
    pub fn bind<R: Resource>(&self) -> ProvResult<R> {
        let resource: R = self.deserialize()?;
        resource.validate()?;
        Ok(resource)
    }
}

fn decode_component(raw: &[u8]) -> Result<String, BindError> {
    let bytes: Vec<u8> = raw
        .iter()
        .map(|b| if *b == b'+' { b' ' } else { *b })
        .collect();

    let mut from = 0;
    while let Some(offset) = bytes[from..].iter().position(|b| *b == b'%') {
        let at = from + offset;
        let escape = bytes.get(at + 1..at + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            let end = (at + 3).min(bytes.len());
            return Err(BindError::new(format!(
                "invalid URL escape {:?}",
                String::from_utf8_lossy(&bytes[at..end])
            )));
        }
        from = at + 3;
    }

    percent_decode(&bytes)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| BindError::new(e.to_string()))
}

// ---------------------------------------------------------------------------
// Deserializer
// ---------------------------------------------------------------------------

/// Everything the caller sent for one target field.
struct Field<'de> {
    name: &'de str,
    values: Vec<&'de str>,
    entries: Vec<(&'de str, &'de str)>,
}

struct FormDeserializer<'de> {
    pairs: &'de [(String, String)],
    /// Fields whose `field.key` entries are ignored.
    flat: &'de [String],
}

impl<'de> FormDeserializer<'de> {
    /// Group pairs by exact key, in first-seen order.
    fn group_exact(&self) -> Vec<Field<'de>> {
        let mut grouped: Vec<Field<'de>> = Vec::new();
        for (key, value) in self.pairs {
            match grouped.iter_mut().find(|f| f.name == key.as_str()) {
                Some(field) => field.values.push(value.as_str()),
                None => grouped.push(Field {
                    name: key.as_str(),
                    values: vec![value.as_str()],
                    entries: Vec::new(),
                }),
            }
        }
        grouped
    }
}

impl<'de> Deserializer<'de> for FormDeserializer<'de> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_map(FieldMap::new(self.group_exact()))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        let mut grouped = Vec::new();
        for &name in fields {
            let mut field = Field {
                name,
                values: Vec::new(),
                entries: Vec::new(),
            };
            let nested = !self.flat.iter().any(|flat| flat == name);
            for (key, value) in self.pairs {
                if key.eq_ignore_ascii_case(name) {
                    field.values.push(value.as_str());
                } else if let Some((head, sub)) = key.split_once('.') {
                    if nested && head.eq_ignore_ascii_case(name) {
                        field.entries.push((sub, value.as_str()));
                    }
                }
            }
            if !field.values.is_empty() || !field.entries.is_empty() {
                grouped.push(field);
            }
        }
        visitor.visit_map(FieldMap::new(grouped))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

struct FieldMap<'de> {
    fields: std::vec::IntoIter<Field<'de>>,
    current: Option<Field<'de>>,
}

impl<'de> FieldMap<'de> {
    fn new(fields: Vec<Field<'de>>) -> Self {
        Self {
            fields: fields.into_iter(),
            current: None,
        }
    }
}

impl<'de> MapAccess<'de> for FieldMap<'de> {
    type Error = BindError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, BindError> {
        let Some(field) = self.fields.next() else {
            return Ok(None);
        };
        let key: StrDeserializer<'de, BindError> = field.name.into_deserializer();
        self.current = Some(field);
        seed.deserialize(key).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, BindError> {
        let field = self
            .current
            .take()
            .ok_or_else(|| BindError::new("value requested before key"))?;
        seed.deserialize(FieldDeserializer(field))
    }
}

struct FieldDeserializer<'de>(Field<'de>);

impl<'de> FieldDeserializer<'de> {
    fn scalar(&self) -> Result<Scalar<'de>, BindError> {
        self.0
            .values
            .first()
            .copied()
            .map(|value| Scalar {
                field: self.0.name,
                value,
            })
            .ok_or_else(|| BindError {
                message: format!("{}: expected a value, found nested keys", self.0.name),
                nested_only: Some(self.0.name.to_string()),
            })
    }
}

macro_rules! forward_to_scalar {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
            self.scalar()?.$method(visitor)
        }
    )*};
}

impl<'de> Deserializer<'de> for FieldDeserializer<'de> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        if !self.0.entries.is_empty() {
            self.deserialize_map(visitor)
        } else if self.0.values.len() > 1 {
            self.deserialize_seq(visitor)
        } else {
            self.scalar()?.deserialize_any(visitor)
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        let field = self.0.name;
        let mut seq: SeqDeserializer<_, BindError> = SeqDeserializer::new(
            self.0
                .values
                .into_iter()
                .map(move |value| Scalar { field, value }),
        );
        let value = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(value)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        let field = self.0.name;
        if self.0.entries.is_empty() {
            return Err(BindError::new(format!(
                "{field}: expected {field}.<key>=<value> entries"
            )));
        }
        let mut map: MapDeserializer<'de, _, BindError> = MapDeserializer::new(
            self.0
                .entries
                .into_iter()
                .map(move |(key, value)| (key, Scalar { field, value })),
        );
        let value = visitor.visit_map(&mut map)?;
        map.end()?;
        Ok(value)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.scalar()?.deserialize_enum(name, variants, visitor)
    }

    forward_to_scalar! {
        deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32
        deserialize_i64 deserialize_u8 deserialize_u16 deserialize_u32
        deserialize_u64 deserialize_f32 deserialize_f64 deserialize_char
        deserialize_str deserialize_string deserialize_option deserialize_unit
        deserialize_identifier
    }

    forward_to_deserialize_any! {
        i128 u128 bytes byte_buf unit_struct tuple tuple_struct struct
        ignored_any
    }
}

/// One raw value, tagged with the field it was sent for.
#[derive(Clone, Copy)]
struct Scalar<'de> {
    field: &'de str,
    value: &'de str,
}

impl Scalar<'_> {
    fn invalid(self, err: impl fmt::Display) -> BindError {
        BindError::new(format!("{}: {err}", self.field))
    }
}

macro_rules! parse_number {
    ($($method:ident => $visit:ident($ty:ty))*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
            let number = self
                .value
                .trim()
                .parse::<$ty>()
                .map_err(|e| self.invalid(e))?;
            visitor.$visit(number)
        }
    )*};
}

impl<'de> Deserializer<'de> for Scalar<'de> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_borrowed_str(self.value)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value.trim() {
            v if v.eq_ignore_ascii_case("true") || v == "1" => visitor.visit_bool(true),
            v if v.eq_ignore_ascii_case("false") || v == "0" => visitor.visit_bool(false),
            other => Err(self.invalid(format_args!("invalid boolean {other:?}"))),
        }
    }

    parse_number! {
        deserialize_i8 => visit_i8(i8)
        deserialize_i16 => visit_i16(i16)
        deserialize_i32 => visit_i32(i32)
        deserialize_i64 => visit_i64(i64)
        deserialize_u8 => visit_u8(u8)
        deserialize_u16 => visit_u16(u16)
        deserialize_u32 => visit_u32(u32)
        deserialize_u64 => visit_u64(u64)
        deserialize_f32 => visit_f32(f32)
        deserialize_f64 => visit_f64(f64)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        if self.value.is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        let access: StrDeserializer<'de, BindError> = self.value.into_deserializer();
        visitor.visit_enum(access)
    }

    forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, BindError> for Scalar<'de> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}
