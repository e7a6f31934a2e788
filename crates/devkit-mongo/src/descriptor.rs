//! Descriptors naming a server, a database on it, or a typed collection in
//! that database.
//!
//! Descriptors are plain values: they validate names up front but only
//! connect when a handle is first needed, then reuse the cached handles from
//! [`connection`](crate::connection). Every collection operation runs under
//! [`autoretry`].

use crate::connection::{self, Credentials, ServerKey};
use crate::{ExternalFormatConvertible, Identifier, Result, autoretry};
use core::marker::PhantomData;
use core::ops::Deref;
use mongodb::IndexModel;
use mongodb::bson::{Document, doc};
use mongodb::results::{InsertManyResult, InsertOneResult};
use mongodb::sync::{Client, Collection, Database};

/// Location of a MongoDB server and the credentials used to access it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerDescriptor {
    url: String,
    port: u16,
    credentials: Option<Credentials>,
}

impl ServerDescriptor {
    pub fn new(url: impl Into<String>, port: u16) -> Self {
        Self {
            url: url.into(),
            port,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns the cached client for this server, connecting if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`](crate::Error::NotConnected) if the
    /// server cannot be reached.
    pub fn client(&self) -> Result<Client> {
        connection::client_for(&self.key())
    }

    pub fn is_connected(&self) -> bool {
        self.client().is_ok_and(|client| connection::is_connected(&client))
    }

    fn key(&self) -> ServerKey {
        ServerKey::new(&self.url, self.port, self.credentials.as_ref())
    }
}

/// A database on a [`ServerDescriptor`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatabaseDescriptor {
    server: ServerDescriptor,
    name: String,
}

impl DatabaseDescriptor {
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`](crate::Error::InvalidName) if `name` is
    /// not a valid database name.
    pub fn new(server: ServerDescriptor, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        connection::validate_database_name(&name)?;
        Ok(Self { server, name })
    }

    pub fn server(&self) -> &ServerDescriptor {
        &self.server
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cached database handle, connecting if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached.
    pub fn database(&self) -> Result<Database> {
        connection::database_for(&self.server.key(), &self.name)
    }

    pub fn is_connected(&self) -> bool {
        self.server.is_connected()
    }
}

/// A collection of `D` documents in a [`DatabaseDescriptor`].
pub struct CollectionDescriptor<D> {
    database: DatabaseDescriptor,
    name: String,
    _document: PhantomData<fn() -> D>,
}

impl<D> CollectionDescriptor<D>
where
    D: ExternalFormatConvertible,
{
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`](crate::Error::InvalidName) if `name` is
    /// not a valid collection name.
    pub fn new(database: DatabaseDescriptor, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        connection::validate_collection_name(&name)?;
        Ok(Self {
            database,
            name,
            _document: PhantomData,
        })
    }

    pub fn database(&self) -> &DatabaseDescriptor {
        &self.database
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cached collection handle, connecting if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached.
    pub fn collection(&self) -> Result<Collection<Document>> {
        connection::collection_for(
            &self.database.server.key(),
            &self.database.name,
            &self.name,
        )
    }

    pub fn is_connected(&self) -> bool {
        self.database.is_connected()
    }

    /// Returns the first document matching `filter`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails twice or the document cannot be
    /// converted into `D`.
    pub fn find_one(&self, filter: Document) -> Result<Option<D>> {
        let found = autoretry(|| -> Result<Option<Document>> {
            Ok(self.collection()?.find_one(filter.clone()).run()?)
        })?;
        found.map(D::from_mongo).transpose()
    }

    /// Returns the document whose `_id` is `id`, if any.
    ///
    /// ```no_run
    /// # use devkit_mongo::{CollectionDescriptor, ExternalFormatConvertible};
    /// # fn demo<D: ExternalFormatConvertible>(users: &CollectionDescriptor<D>) -> devkit_mongo::Result<()> {
    /// let user = users.find_by_id("65a1b2c3d4e5f60718293a4b")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidObjectId`](crate::Error::InvalidObjectId) for a
    /// malformed hex id, otherwise see [`CollectionDescriptor::find_one`].
    pub fn find_by_id<'a>(&self, id: impl Into<Identifier<'a>>) -> Result<Option<D>> {
        let id = id.into().resolve()?;
        self.find_one(doc! { "_id": id })
    }

    /// Inserts `item`.
    ///
    /// # Errors
    ///
    /// Returns an error if `item` cannot be converted or the insert fails
    /// twice.
    pub fn insert_one(&self, item: &D) -> Result<InsertOneResult> {
        let document = item.to_mongo()?;
        autoretry(|| Ok(self.collection()?.insert_one(&document).run()?))
    }

    /// Inserts all `items` in one request.
    ///
    /// # Errors
    ///
    /// Returns an error if an item cannot be converted or the insert fails
    /// twice.
    pub fn insert_many(&self, items: &[D]) -> Result<InsertManyResult> {
        let documents = items
            .iter()
            .map(D::to_mongo)
            .collect::<Result<Vec<_>>>()?;
        autoretry(|| Ok(self.collection()?.insert_many(&documents).run()?))
    }
}

impl<D> Clone for CollectionDescriptor<D> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            name: self.name.clone(),
            _document: PhantomData,
        }
    }
}

impl<D> core::fmt::Debug for CollectionDescriptor<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CollectionDescriptor")
            .field("database", &self.database)
            .field("name", &self.name)
            .finish()
    }
}

/// [`CollectionDescriptor`] with schema management operations, meant for
/// development and test setups.
pub struct DevCollectionDescriptor<D> {
    inner: CollectionDescriptor<D>,
}

impl<D> DevCollectionDescriptor<D>
where
    D: ExternalFormatConvertible,
{
    /// # Errors
    ///
    /// See [`CollectionDescriptor::new`].
    pub fn new(database: DatabaseDescriptor, name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            inner: CollectionDescriptor::new(database, name)?,
        })
    }

    /// Creates `index` and returns its name.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails twice.
    pub fn create_index(&self, index: IndexModel) -> Result<String> {
        autoretry(|| {
            let created = self.collection()?.create_index(index.clone()).run()?;
            Ok(created.index_name)
        })
    }

    /// Creates all `indexes` and returns their names.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails twice.
    pub fn create_indexes(&self, indexes: Vec<IndexModel>) -> Result<Vec<String>> {
        autoretry(|| {
            let created = self.collection()?.create_indexes(indexes.clone()).run()?;
            Ok(created.index_names)
        })
    }

    /// Drops the collection together with its indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails twice.
    pub fn drop(&self) -> Result<()> {
        autoretry(|| Ok(self.collection()?.drop().run()?))
    }

    /// Drops every index of the collection except the one on `_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails twice.
    pub fn drop_indexes(&self) -> Result<()> {
        autoretry(|| Ok(self.collection()?.drop_indexes().run()?))
    }

    pub fn into_inner(self) -> CollectionDescriptor<D> {
        self.inner
    }
}

impl<D> Deref for DevCollectionDescriptor<D> {
    type Target = CollectionDescriptor<D>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<D> Clone for DevCollectionDescriptor<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D> core::fmt::Debug for DevCollectionDescriptor<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("DevCollectionDescriptor")
            .field(&self.inner)
            .finish()
    }
}
