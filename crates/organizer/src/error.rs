use std::fmt;

/// Failure talking to the remote music catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Http { status: u16, body: String },
    Transport(String),
    Decode(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Http { status, body } => {
                write!(f, "catalog returned status {}: {}", status, body)
            }
            CatalogError::Transport(message) => write!(f, "catalog request failed: {}", message),
            CatalogError::Decode(message) => write!(f, "catalog response invalid: {}", message),
        }
    }
}

impl std::error::Error for CatalogError {}

pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug)]
pub enum OrganizerError {
    InvalidPlaylistCount { requested: i64, min: usize, max: usize },
    InvalidTemplate(String),
    Catalog(CatalogError),
    Store(StoreError),
    UnknownPlaylistGenre(String),
    PlaylistNotFound(String),
}

impl OrganizerError {
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        OrganizerError::Store(Box::new(err))
    }

    /// True for errors caused by the caller's input rather than a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            OrganizerError::InvalidPlaylistCount { .. }
                | OrganizerError::InvalidTemplate(_)
                | OrganizerError::UnknownPlaylistGenre(_)
                | OrganizerError::PlaylistNotFound(_)
        )
    }
}

impl From<CatalogError> for OrganizerError {
    fn from(err: CatalogError) -> Self {
        OrganizerError::Catalog(err)
    }
}

impl fmt::Display for OrganizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizerError::InvalidPlaylistCount { requested, min, max } => write!(
                f,
                "playlist count must be between {} and {} (got {})",
                min, max, requested
            ),
            OrganizerError::InvalidTemplate(template) => {
                write!(f, "name template must contain {{genre}}: {:?}", template)
            }
            OrganizerError::Catalog(err) => write!(f, "{}", err),
            OrganizerError::Store(err) => write!(f, "settings store error: {}", err),
            OrganizerError::UnknownPlaylistGenre(id) => {
                write!(f, "could not determine genre for playlist {}", id)
            }
            OrganizerError::PlaylistNotFound(id) => write!(f, "playlist not found: {}", id),
        }
    }
}

impl std::error::Error for OrganizerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrganizerError::Catalog(err) => Some(err),
            OrganizerError::Store(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
