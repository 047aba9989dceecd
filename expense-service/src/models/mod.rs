pub mod access_request;
pub mod branch;
pub mod email_proposal;
pub mod group;
pub mod membership;
pub mod session;
pub mod validation;

pub use access_request::{AccessRequest, RequestStatus};
pub use branch::Branch;
pub use email_proposal::{ProposalStatus, UnitEmailProposal};
pub use group::Group;
pub use membership::{Role, UserBranchRole};
pub use session::UserSession;
pub use validation::{Decision, Validation};
