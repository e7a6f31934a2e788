//! Cached access to MongoDB clients, databases and collections.
//!
//! Handles are resolved through three small LRU caches keyed by the
//! arguments that produced them:
//!
//! | function           | capacity |
//! |--------------------|----------|
//! | [`get_client`]     | 3        |
//! | [`get_database`]   | 9        |
//! | [`get_collection`] | 27       |
//!
//! A client only enters the cache after it answered a `ping`, so a server
//! that was down is contacted again on the next call.

use crate::cache::LruCache;
use crate::{Error, NameKind, Result};
use core::fmt;
use core::time::Duration;
use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::sync::{Client, Collection, Database};

pub const CLIENT_CACHE_CAPACITY: usize = 3;
pub const DATABASE_CACHE_CAPACITY: usize = 9;
pub const COLLECTION_CACHE_CAPACITY: usize = 27;

/// How long a new client looks for a reachable server before giving up.
pub const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

static CLIENTS: LruCache<ServerKey, Client> = LruCache::new(CLIENT_CACHE_CAPACITY);
static DATABASES: LruCache<(ServerKey, String), Database> =
    LruCache::new(DATABASE_CACHE_CAPACITY);
static COLLECTIONS: LruCache<(ServerKey, String, String), Collection<Document>> =
    LruCache::new(COLLECTION_CACHE_CAPACITY);

/// Username and password used to authenticate against a server.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Database holding the user; the driver's default (`admin`) if `None`.
    pub source: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ServerKey {
    pub(crate) url: String,
    pub(crate) port: u16,
    pub(crate) credentials: Option<Credentials>,
}

impl ServerKey {
    pub(crate) fn new(url: &str, port: u16, credentials: Option<&Credentials>) -> Self {
        Self {
            url: url.to_owned(),
            port,
            credentials: credentials.cloned(),
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.url, self.port)
    }

    fn options(&self) -> ClientOptions {
        let mut options = ClientOptions::default();
        options.hosts = vec![ServerAddress::Tcp {
            host: self.url.clone(),
            port: Some(self.port),
        }];
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        options.app_name = Some(String::from("devkit"));

        if let Some(credentials) = &self.credentials {
            let mut credential = Credential::default();
            credential.username = Some(credentials.username.clone());
            credential.password = Some(credentials.password.clone());
            credential.source = credentials.source.clone();
            options.credential = Some(credential);
        }
        options
    }
}

/// Checks that `client` can reach its server.
///
/// # Errors
///
/// Returns the driver error if the `ping` command fails.
pub fn check_connection(client: &Client) -> Result<()> {
    // "admin" always exists and "ping" needs no authentication.
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .run()?;
    Ok(())
}

/// Returns whether `client` can reach its server.
pub fn is_connected(client: &Client) -> bool {
    check_connection(client).is_ok()
}

/// Returns a client connected to `url:port`.
///
/// Blocks until the server answers or [`SERVER_SELECTION_TIMEOUT`] passes.
///
/// # Errors
///
/// Returns [`Error::NotConnected`] if the server cannot be reached.
pub fn get_client(url: &str, port: u16) -> Result<Client> {
    client_for(&ServerKey::new(url, port, None))
}

/// Returns a handle to database `database_name` on `url:port`.
///
/// # Errors
///
/// Returns an error if the name is invalid or the server cannot be reached.
pub fn get_database(url: &str, port: u16, database_name: &str) -> Result<Database> {
    database_for(&ServerKey::new(url, port, None), database_name)
}

/// Returns a handle to collection `collection_name` of database
/// `database_name` on `url:port`.
///
/// # Errors
///
/// Returns an error if a name is invalid or the server cannot be reached.
pub fn get_collection(
    url: &str,
    port: u16,
    database_name: &str,
    collection_name: &str,
) -> Result<Collection<Document>> {
    collection_for(
        &ServerKey::new(url, port, None),
        database_name,
        collection_name,
    )
}

/// Drops every cached client, database and collection handle.
pub fn clear_caches() {
    COLLECTIONS.clear();
    DATABASES.clear();
    CLIENTS.clear();
}

pub(crate) fn client_for(server: &ServerKey) -> Result<Client> {
    CLIENTS.get_or_try_insert_with(server.clone(), |server| {
        let address = server.address();
        #[cfg(feature = "tracing")]
        tracing::debug!("Connecting to MongoDB at {address}");

        let client = Client::with_options(server.options())?;
        check_connection(&client).map_err(|e| match e {
            Error::Driver(source) => Error::NotConnected { address, source },
            other => other,
        })?;
        Ok(client)
    })
}

pub(crate) fn database_for(server: &ServerKey, database_name: &str) -> Result<Database> {
    validate_database_name(database_name)?;
    DATABASES.get_or_try_insert_with((server.clone(), database_name.to_owned()), |(server, name)| {
        Ok(client_for(server)?.database(name))
    })
}

pub(crate) fn collection_for(
    server: &ServerKey,
    database_name: &str,
    collection_name: &str,
) -> Result<Collection<Document>> {
    validate_collection_name(collection_name)?;
    COLLECTIONS.get_or_try_insert_with(
        (
            server.clone(),
            database_name.to_owned(),
            collection_name.to_owned(),
        ),
        |(server, database, collection)| {
            Ok(database_for(server, database)?.collection::<Document>(collection))
        },
    )
}

const DATABASE_FORBIDDEN: &[char] = &['/', '\\', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '?', '\0'];
const DATABASE_NAME_MAX_BYTES: usize = 63;

/// Checks `name` against the server's database naming rules.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] describing the first broken rule.
pub fn validate_database_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.len() > DATABASE_NAME_MAX_BYTES {
        Some("must be shorter than 64 bytes")
    } else if name.contains(DATABASE_FORBIDDEN) {
        Some("must not contain any of /\\. \"$*<>:|? or NUL")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidName {
            kind: NameKind::Database,
            name: name.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Checks `name` against the server's collection naming rules.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] describing the first broken rule.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.contains('$') {
        Some("must not contain '$'")
    } else if name.contains('\0') {
        Some("must not contain NUL")
    } else if name.starts_with("system.") {
        Some("must not start with 'system.'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidName {
            kind: NameKind::Collection,
            name: name.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_regular_names() {
        validate_database_name("inventory").unwrap();
        validate_database_name("test_db-2").unwrap();
        validate_collection_name("users").unwrap();
        validate_collection_name("logs.2024").unwrap();
    }

    #[test]
    fn rejects_bad_database_names() {
        let long = "x".repeat(64);
        for name in ["", "my.db", "a b", "a/b", "cost$", long.as_str()] {
            let err = validate_database_name(name).unwrap_err();
            assert!(
                matches!(err, Error::InvalidName { kind: NameKind::Database, .. }),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_collection_names() {
        for name in ["", "a$b", "nul\0", "system.users"] {
            let err = validate_collection_name(name).unwrap_err();
            assert!(
                matches!(err, Error::InvalidName { kind: NameKind::Collection, .. }),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn invalid_names_fail_before_connecting() {
        // Port 1 is never a MongoDB server; validation must fail first.
        assert!(matches!(
            get_database("localhost", 1, "bad.name"),
            Err(Error::InvalidName { .. })
        ));
        assert!(matches!(
            get_collection("localhost", 1, "db", "bad$name"),
            Err(Error::InvalidName { .. })
        ));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials::new("reader", "hunter2").with_source("admin");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("reader"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn options_target_one_server() {
        let key = ServerKey::new(
            "db.internal",
            27018,
            Some(&Credentials::new("app", "secret")),
        );
        let options = key.options();

        assert_eq!(
            options.hosts,
            vec![ServerAddress::Tcp {
                host: "db.internal".into(),
                port: Some(27018),
            }]
        );
        assert_eq!(options.server_selection_timeout, Some(SERVER_SELECTION_TIMEOUT));
        let credential = options.credential.unwrap();
        assert_eq!(credential.username.as_deref(), Some("app"));
        assert_eq!(credential.password.as_deref(), Some("secret"));
        assert_eq!(key.address(), "db.internal:27018");
    }

    #[test]
    #[ignore = "waits for the server selection timeout"]
    fn unreachable_server_is_not_cached() {
        let key = ServerKey::new("127.0.0.1", 1, None);
        assert!(matches!(client_for(&key), Err(Error::NotConnected { .. })));
        assert!(CLIENTS.get(&key).is_none());
    }

    #[test]
    #[ignore = "needs a MongoDB server on localhost:27017"]
    fn handles_are_cached() {
        let client = get_client("localhost", 27017).unwrap();
        assert!(is_connected(&client));

        let first = get_collection("localhost", 27017, "devkit_test", "cached").unwrap();
        let second = get_collection("localhost", 27017, "devkit_test", "cached").unwrap();
        assert_eq!(first.name(), second.name());
        assert!(CLIENTS.get(&ServerKey::new("localhost", 27017, None)).is_some());
    }
}
