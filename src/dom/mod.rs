pub mod document;
pub mod form;
pub mod resolver;

pub use document::Document;
pub use form::FormSubmission;
pub use resolver::{field_candidates, Resolution, Resolver, Strategy};
