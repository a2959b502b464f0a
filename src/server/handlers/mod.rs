pub mod attachments;
pub mod cases;
pub mod health;
pub mod schemas;
