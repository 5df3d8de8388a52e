pub mod project_parser;

pub use project_parser::{
    PackageReference, ParsedProject, ProjectFileParser, ProjectFilePath, ReferenceDialect,
};
