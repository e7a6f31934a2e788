//! Conversion between domain values, BSON documents and plain JSON.
//!
//! MongoDB stores values that plain JSON cannot express directly (ObjectIds,
//! dates, binary data). The JSON form produced here is relaxed extended JSON,
//! so an `ObjectId` becomes `{"$oid": "..."}` and a date
//! `{"$date": "2024-01-01T00:00:00Z"}`.

use crate::{Error, Result};
use mongodb::bson::{self, Bson, Document, oid::ObjectId};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// A value with a MongoDB document form and a plain JSON form.
///
/// Implementors provide the document conversions; the JSON conversions go
/// through the document form by default.
///
/// ```
/// use devkit_mongo::{ExternalFormatConvertible, Result, from_document, to_document};
/// use mongodb::bson::{Document, oid::ObjectId};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Note {
///     #[serde(rename = "_id")]
///     id: ObjectId,
///     text: String,
/// }
///
/// impl ExternalFormatConvertible for Note {
///     fn to_mongo(&self) -> Result<Document> {
///         to_document(self)
///     }
///
///     fn from_mongo(document: Document) -> Result<Self> {
///         from_document(document)
///     }
/// }
///
/// let note = Note { id: ObjectId::new(), text: "hi".into() };
/// let json = note.to_json().unwrap();
/// assert_eq!(json["_id"]["$oid"], note.id.to_hex());
/// assert_eq!(Note::from_json(json).unwrap(), note);
/// ```
pub trait ExternalFormatConvertible: Sized {
    /// Returns the document stored in MongoDB for this value.
    fn to_mongo(&self) -> Result<Document>;

    /// Restores a value from its stored document.
    fn from_mongo(document: Document) -> Result<Self>;

    /// Converts a stored document into its JSON form.
    fn mongo_to_json(document: Document) -> Result<Value> {
        document_to_json(document)
    }

    /// Converts a JSON form into the document stored in MongoDB.
    fn json_to_mongo(value: Value) -> Result<Document> {
        json_to_document(value)
    }

    fn to_json(&self) -> Result<Value> {
        Self::mongo_to_json(self.to_mongo()?)
    }

    fn from_json(value: Value) -> Result<Self> {
        Self::from_mongo(Self::json_to_mongo(value)?)
    }
}

/// Serializes `value` into a document.
///
/// # Errors
///
/// Returns [`Error::Serialize`] if `value` does not serialize to a document.
pub fn to_document<T>(value: &T) -> Result<Document>
where
    T: Serialize + ?Sized,
{
    Ok(bson::to_document(value)?)
}

/// Deserializes a `T` from `document`.
///
/// # Errors
///
/// Returns [`Error::Deserialize`] if the document does not match `T`.
pub fn from_document<T>(document: Document) -> Result<T>
where
    T: DeserializeOwned,
{
    Ok(bson::from_document(document)?)
}

/// Renders `document` as relaxed extended JSON.
pub fn document_to_json(document: Document) -> Result<Value> {
    Ok(Bson::Document(document).into_relaxed_extjson())
}

/// Parses an extended JSON object into a document.
///
/// # Errors
///
/// Returns an error if `value` is malformed extended JSON or not an object.
pub fn json_to_document(value: Value) -> Result<Document> {
    match Bson::try_from(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(Error::NotADocument {
            found: format!("{:?}", other.element_type()),
        }),
    }
}

/// Document identifier given either as an [`ObjectId`] or its hex string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Identifier<'a> {
    ObjectId(ObjectId),
    Hex(&'a str),
}

impl Identifier<'_> {
    /// Returns the [`ObjectId`], parsing the hex form if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidObjectId`] if the hex string is malformed.
    pub fn resolve(self) -> Result<ObjectId> {
        match self {
            Self::ObjectId(id) => Ok(id),
            Self::Hex(hex) => ObjectId::parse_str(hex).map_err(|source| Error::InvalidObjectId {
                value: hex.to_owned(),
                source,
            }),
        }
    }
}

impl From<ObjectId> for Identifier<'_> {
    fn from(id: ObjectId) -> Self {
        Self::ObjectId(id)
    }
}

impl<'a> From<&'a str> for Identifier<'a> {
    fn from(hex: &'a str) -> Self {
        Self::Hex(hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{DateTime, doc};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Reading {
        #[serde(rename = "_id")]
        id: ObjectId,
        sensor: String,
        value: f64,
        taken: DateTime,
    }

    impl ExternalFormatConvertible for Reading {
        fn to_mongo(&self) -> Result<Document> {
            to_document(self)
        }

        fn from_mongo(document: Document) -> Result<Self> {
            from_document(document)
        }
    }

    /// Stores its name upper-cased in JSON only.
    #[derive(Debug, PartialEq)]
    struct Shouty {
        name: String,
    }

    impl ExternalFormatConvertible for Shouty {
        fn to_mongo(&self) -> Result<Document> {
            Ok(doc! { "name": self.name.as_str() })
        }

        fn from_mongo(document: Document) -> Result<Self> {
            Ok(Self {
                name: document.get_str("name").unwrap_or_default().to_owned(),
            })
        }

        fn mongo_to_json(document: Document) -> Result<Value> {
            let mut value = document_to_json(document)?;
            if let Some(name) = value["name"].as_str().map(str::to_uppercase) {
                value["name"] = Value::String(name);
            }
            Ok(value)
        }

        fn json_to_mongo(value: Value) -> Result<Document> {
            let mut document = json_to_document(value)?;
            if let Ok(name) = document.get_str("name") {
                let lower = name.to_lowercase();
                document.insert("name", lower);
            }
            Ok(document)
        }
    }

    fn reading() -> Reading {
        Reading {
            id: ObjectId::parse_str("65a1b2c3d4e5f60718293a4b").unwrap(),
            sensor: "t-1".into(),
            value: 21.5,
            taken: DateTime::from_millis(1_704_067_200_000),
        }
    }

    #[test]
    fn json_uses_relaxed_extended_json() {
        let json = reading().to_json().unwrap();
        assert_eq!(
            json,
            json!({
                "_id": { "$oid": "65a1b2c3d4e5f60718293a4b" },
                "sensor": "t-1",
                "value": 21.5,
                "taken": { "$date": "2024-01-01T00:00:00Z" },
            })
        );
    }

    #[test]
    fn json_converts_back() {
        let original = reading();
        let restored = Reading::from_json(original.to_json().unwrap()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn custom_hooks_are_used() {
        let value = Shouty { name: "quiet".into() };
        let json = value.to_json().unwrap();
        assert_eq!(json, json!({ "name": "QUIET" }));
        assert_eq!(Shouty::from_json(json).unwrap(), value);
    }

    #[test]
    fn non_objects_are_rejected() {
        let err = json_to_document(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, Error::NotADocument { .. }));
    }

    #[test]
    fn malformed_documents_fail_to_deserialize() {
        let err = Reading::from_mongo(doc! { "sensor": 12 }).unwrap_err();
        assert!(matches!(err, Error::Deserialize(_)));
    }

    #[test]
    fn identifiers_resolve() {
        let id = ObjectId::new();
        assert_eq!(Identifier::from(id).resolve().unwrap(), id);
        assert_eq!(Identifier::from(id.to_hex().as_str()).resolve().unwrap(), id);

        let err = Identifier::from("not-an-id").resolve().unwrap_err();
        assert!(matches!(err, Error::InvalidObjectId { ref value, .. } if value == "not-an-id"));
    }
}
