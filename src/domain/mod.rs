mod ledger;
mod money;
mod operation;
mod request;
mod user;

pub use ledger::*;
pub use money::*;
pub use operation::*;
pub use request::*;
pub use user::*;
