pub mod descriptor;
pub mod document;
pub mod filter;
pub mod manifest;
pub mod merge;
pub mod plan;
pub mod policy;
pub mod repository;
pub mod resolver;
pub mod secrets;
pub mod stack;
pub mod writer;

pub use descriptor::ResolvedConfig;
pub use resolver::{resolve, resolve_with_options, ResolveOptions, Resolver};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Document(#[from] document::Error),

    #[error(transparent)]
    Stack(#[from] stack::Error),

    #[error(transparent)]
    Resolve(#[from] resolver::Error),

    #[error(transparent)]
    Manifest(#[from] manifest::Error),

    #[error(transparent)]
    Writer(#[from] writer::Error),
}
