pub mod attachment_service;
pub mod case_service;
pub mod filter_service;
pub mod schema_service;
pub mod sequence_service;
pub mod storage;
pub mod validation;

pub use attachment_service::AttachmentService;
pub use case_service::{CaseCreated, CaseService, CaseStatistics};
pub use filter_service::{CaseFilter, CasePage, CaseView, FilterService};
pub use schema_service::{NewSchema, SchemaService, SchemaUpdate};
pub use sequence_service::{ReassignSummary, SequenceService};
pub use storage::{BlobStore, LocalBlobStore};
pub use validation::ValidationService;
