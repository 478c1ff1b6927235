//! Demo driver for fragments-core.
//!
//! Wires the repository and conversion engine to the in-memory backend and
//! walks through a store -> list -> fetch -> convert session, the same flow
//! the HTTP service runs per request.

use std::sync::Arc;

use fragments_core::{
    Clock, ContentTypeRegistry, ConversionEngine, Fragment, FragmentRepository, InMemoryBackend,
    Listing, OwnerId, SystemClock,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // LOG_LEVEL picks the verbosity, defaulting to info.
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let clock = Arc::new(SystemClock);
    let backend = Arc::new(InMemoryBackend::new());
    let repo = FragmentRepository::new(backend, clock.clone());
    let registry = ContentTypeRegistry::default();
    let engine = ConversionEngine::new(registry.clone());

    let owner = OwnerId::new("demo-user")?;

    let mut fragment = Fragment::new(owner.clone(), "text/markdown", &registry, clock.now())?;
    repo.set_data(&mut fragment, b"# Hello World\n\nStored as a fragment.")
        .await?;
    info!(id = %fragment.id(), size = fragment.size(), "stored markdown fragment");

    if let Listing::Ids(ids) = repo.list_by_owner(&owner, false).await? {
        println!("fragments for {owner}: {}", serde_json::to_string(&ids)?);
    }

    let fetched = repo.get_by_id(&owner, fragment.id()).await?;
    println!(
        "fragment {} is {} ({} bytes), serves as: {}",
        fetched.id(),
        fetched.mime_type(),
        fetched.size(),
        fetched.formats(&registry).join(", ")
    );

    let data = repo.get_data(&fetched).await?;
    let converted = engine.convert(&fetched, &data, Some("html"))?;
    println!(
        "as {}:\n{}",
        converted.content_type,
        String::from_utf8_lossy(&converted.bytes)
    );

    repo.delete_by_id(&owner, fetched.id()).await?;
    info!(id = %fetched.id(), "fragment deleted");

    Ok(())
}
