pub mod action;
pub mod envelope;
pub mod error;
pub mod store;

pub use action::{Action, ActionExecutor, Operation, StubAction};
pub use envelope::{Parameters, Request, Response, SUCCESS_MESSAGE, Status, param};
pub use error::{ActionError, ErrorKind, StoreError};
pub use store::{ArtifactReference, ArtifactStore};
