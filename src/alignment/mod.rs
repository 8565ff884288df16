pub mod estimation;
pub mod locator;
pub mod payload;
pub mod report;
pub mod segments;
pub mod store;
pub mod tokenization;
