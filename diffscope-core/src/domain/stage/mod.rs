//! Stage contract: the unit of work the workflow engine sequences

pub mod traits;
pub mod value_objects;

pub use traits::Stage;
pub use value_objects::{StageContext, StageError, StageErrorKind, StageFailure, StageName};
