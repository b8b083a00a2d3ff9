use thiserror::Error;

/// Crate-wide error type.
///
/// Variants are sentinel-discriminated (spec'd by identity, not message
/// text) so callers can classify failures with `matches!`/equality rather
/// than string inspection. Routing variants (`NotFoundRoute`,
/// `NotFoundEndpoint`, `NotFoundEvent`, `NotFoundUserLocation`) are warnings
/// by convention; everything else is logged as an error by the caller.
#[derive(Error, Debug)]
pub enum GateMeshError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid message")]
    InvalidMessage,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("connection hanged")]
    ConnectionHanged,

    #[error("connection not opened")]
    ConnectionNotOpened,

    #[error("connection not hanged")]
    ConnectionNotHanged,

    #[error("no route for id {0}")]
    NotFoundRoute(i32),

    #[error("no endpoint for route {0}")]
    NotFoundEndpoint(i32),

    #[error("no subscriber for event {0}")]
    NotFoundEvent(i32),

    #[error("no location for user {0}")]
    NotFoundUserLocation(i64),

    #[error("no session for {0}")]
    NotFoundSession(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("backend unavailable: {0}")]
    Backend(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GateMeshError {
    /// True for the routing-class errors the spec requires be logged as
    /// warnings and never treated as fatal to the caller's connection.
    pub fn is_routing_warning(&self) -> bool {
        matches!(
            self,
            GateMeshError::NotFoundRoute(_)
                | GateMeshError::NotFoundEndpoint(_)
                | GateMeshError::NotFoundEvent(_)
                | GateMeshError::NotFoundUserLocation(_)
        )
    }
}

impl Clone for GateMeshError {
    fn clone(&self) -> Self {
        match self {
            GateMeshError::Io(e) => GateMeshError::Internal(e.to_string()),
            GateMeshError::InvalidMessage => GateMeshError::InvalidMessage,
            GateMeshError::ConnectionClosed => GateMeshError::ConnectionClosed,
            GateMeshError::ConnectionHanged => GateMeshError::ConnectionHanged,
            GateMeshError::ConnectionNotOpened => GateMeshError::ConnectionNotOpened,
            GateMeshError::ConnectionNotHanged => GateMeshError::ConnectionNotHanged,
            GateMeshError::NotFoundRoute(id) => GateMeshError::NotFoundRoute(*id),
            GateMeshError::NotFoundEndpoint(id) => GateMeshError::NotFoundEndpoint(*id),
            GateMeshError::NotFoundEvent(id) => GateMeshError::NotFoundEvent(*id),
            GateMeshError::NotFoundUserLocation(uid) => GateMeshError::NotFoundUserLocation(*uid),
            GateMeshError::NotFoundSession(s) => GateMeshError::NotFoundSession(s.clone()),
            GateMeshError::Unauthorized => GateMeshError::Unauthorized,
            GateMeshError::Backend(s) => GateMeshError::Backend(s.clone()),
            GateMeshError::Internal(s) => GateMeshError::Internal(s.clone()),
            GateMeshError::Config(s) => GateMeshError::Config(s.clone()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GateMeshError>;
