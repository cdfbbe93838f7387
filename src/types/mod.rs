mod exit_code;
mod identifiers;
mod request;
mod response;

pub use exit_code::ExitCode;
pub use identifiers::{Credentials, Identity, ScriptId};
pub use request::Request;
pub use response::{Response, ResponseError};
