use serde::de::value::StringDeserializer;
use serde::de::{self, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::forward_to_deserialize_any;
use serde_json::{map, Map, Value};

/// Deserializer over a `serde_json::Value` that matches struct field names
/// ignoring ASCII case.
///
/// When the target is a struct, each object key is rewritten to the struct's
/// own spelling of the field before serde sees it. Nested objects, arrays and
/// options are wrapped again, so the rule holds at every depth. An exact
/// match wins over a case-insensitive one. A `null` struct member is treated
/// as missing, so `#[serde(default)]` fills it in. Enum payloads are handed to
/// `serde_json` unchanged.
pub struct CaseInsensitive(Value);

impl CaseInsensitive {
    pub fn new(value: Value) -> Self {
        Self(value)
    }
}

impl<'de> Deserializer<'de> for CaseInsensitive {
    type Error = serde_json::Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::Object(object) => visitor.visit_map(FieldMap::new(object, None)),
            Value::Array(items) => visitor.visit_seq(Elements::new(items)),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(CaseInsensitive(other)),
        }
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.0 {
            Value::Object(object) => visitor.visit_map(FieldMap::new(object, Some(fields))),
            other => other.deserialize_struct(name, fields, visitor),
        }
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.0.deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
        ignored_any
    }
}

struct FieldMap {
    entries: map::IntoIter,
    fields: Option<&'static [&'static str]>,
    pending: Option<Value>,
}

impl FieldMap {
    fn new(object: Map<String, Value>, fields: Option<&'static [&'static str]>) -> Self {
        Self {
            entries: object.into_iter(),
            fields,
            pending: None,
        }
    }

    fn canonical(&self, key: String) -> String {
        let Some(fields) = self.fields else {
            return key;
        };
        if fields.contains(&key.as_str()) {
            return key;
        }
        fields
            .iter()
            .find(|field| field.eq_ignore_ascii_case(&key))
            .map(|field| field.to_string())
            .unwrap_or(key)
    }
}

impl<'de> MapAccess<'de> for FieldMap {
    type Error = serde_json::Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        // A null struct member reads as absent, so the field default applies
        let (key, value) = loop {
            match self.entries.next() {
                None => return Ok(None),
                Some((_, Value::Null)) if self.fields.is_some() => continue,
                Some(entry) => break entry,
            }
        };
        self.pending = Some(value);
        let key: StringDeserializer<serde_json::Error> = self.canonical(key).into_deserializer();
        seed.deserialize(key).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        match self.pending.take() {
            Some(value) => seed.deserialize(CaseInsensitive(value)),
            None => Err(de::Error::custom("value requested before key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct Elements {
    items: std::vec::IntoIter<Value>,
}

impl Elements {
    fn new(items: Vec<Value>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl<'de> SeqAccess<'de> for Elements {
    type Error = serde_json::Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        self.items
            .next()
            .map(|item| seed.deserialize(CaseInsensitive(item)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}
