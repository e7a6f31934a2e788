use core::fmt;
use mongodb::bson;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// What a rejected name was meant to identify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NameKind {
    Database,
    Collection,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => f.write_str("database"),
            Self::Collection => f.write_str("collection"),
        }
    }
}

/// Unified error type for `devkit-mongo`.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// An operation failed inside the MongoDB driver.
    #[error("MongoDB operation failed: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// No server answered the connection check.
    #[error("Cannot connect to MongoDB at {address}: {source}")]
    NotConnected {
        address: String,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("Invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: NameKind,
        name: String,
        reason: &'static str,
    },

    #[error("Invalid ObjectId {value:?}: {source}")]
    InvalidObjectId {
        value: String,
        #[source]
        source: bson::oid::Error,
    },

    #[error("Failed to convert value to BSON: {0}")]
    Serialize(#[from] bson::ser::Error),

    #[error("Failed to convert BSON to value: {0}")]
    Deserialize(#[from] bson::de::Error),

    #[error("Invalid extended JSON: {0}")]
    ExtendedJson(#[from] bson::extjson::de::Error),

    /// The value is valid BSON but not a document.
    #[error("Expected a document, found {found}")]
    NotADocument { found: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = Error::InvalidName {
            kind: NameKind::Collection,
            name: "a$b".into(),
            reason: "must not contain '$'",
        };
        assert_eq!(
            err.to_string(),
            "Invalid collection name \"a$b\": must not contain '$'"
        );
        assert_eq!(
            Error::NotADocument {
                found: "Int32".into()
            }
            .to_string(),
            "Expected a document, found Int32"
        );
    }
}
