//! Thin MongoDB access layer on top of the synchronous `mongodb` driver.
//!
//! - [`connection`]: cached clients, databases and collections, connection
//!   checks and name validation.
//! - [`ExternalFormatConvertible`]: conversion of domain values to stored
//!   documents and relaxed extended JSON.
//! - [`ServerDescriptor`], [`DatabaseDescriptor`], [`CollectionDescriptor`]
//!   and [`DevCollectionDescriptor`]: typed access to one collection.
//! - [`autoretry`]: a single retry after a transient connectivity failure.
//!
//! ```no_run
//! use devkit_mongo::{
//!     CollectionDescriptor, DatabaseDescriptor, ExternalFormatConvertible, Result,
//!     ServerDescriptor, from_document, to_document,
//! };
//! use mongodb::bson::{Document, doc, oid::ObjectId};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     #[serde(rename = "_id")]
//!     id: ObjectId,
//!     name: String,
//! }
//!
//! impl ExternalFormatConvertible for User {
//!     fn to_mongo(&self) -> Result<Document> {
//!         to_document(self)
//!     }
//!
//!     fn from_mongo(document: Document) -> Result<Self> {
//!         from_document(document)
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let server = ServerDescriptor::new("localhost", 27017);
//!     let database = DatabaseDescriptor::new(server, "app")?;
//!     let users = CollectionDescriptor::<User>::new(database, "users")?;
//!
//!     users.insert_one(&User { id: ObjectId::new(), name: "ada".into() })?;
//!     let ada = users.find_one(doc! { "name": "ada" })?;
//!     assert!(ada.is_some());
//!     Ok(())
//! }
//! ```

mod cache;
pub mod connection;
mod descriptor;
mod document;
mod error;
mod retry;

pub use crate::connection::{
    Credentials, check_connection, clear_caches, get_client, get_collection, get_database,
    is_connected,
};
pub use crate::descriptor::*;
pub use crate::document::*;
pub use crate::error::*;
pub use crate::retry::*;
