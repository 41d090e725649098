//! Dataset persistence and publication.

pub mod publish;
pub mod writer;

pub use publish::{GitPublisher, NoopPublisher, PublishSink};
pub use writer::{load_dataset, write_dataset, WrittenArtifacts, CSV_FILE, JSON_FILE};
