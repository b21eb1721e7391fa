// Library management module
// This module handles scanning and indexing the directory of post files

pub mod scanner;
pub mod indexer;

pub use scanner::DirectoryScanner;
pub use indexer::{IndexingResult, LibraryIndexer};
