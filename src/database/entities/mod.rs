pub mod attachments;
pub mod form_entries;
pub mod form_schemas;
pub mod organizations;
pub mod users;
