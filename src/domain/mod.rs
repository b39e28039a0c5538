pub mod extractor;
pub mod job;
pub mod profile_link;
pub mod record;
pub mod snapshot;
