pub mod fetcher;
pub mod fields;
pub mod parser;
pub mod pipeline;
pub mod validation;

pub use fetcher::{FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use fields::{normalize, FieldTable};
pub use pipeline::{IngestError, Pipeline, Submission};
pub use validation::{validate, ValidationError};
