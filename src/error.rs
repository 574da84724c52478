/// Failures that escape [`Resolver::resolve`](crate::resolver::Resolver::resolve).
///
/// Missing keys, store outages and explorer failures all degrade to an
/// unresolved log instead. What is left here means the cache itself holds
/// data the resolver cannot use.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("cached ABI member at {key} is malformed: {source}")]
    MalformedMember {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a cache write did not happen.
#[derive(Debug, thiserror::Error)]
pub(crate) enum PersistError {
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}
