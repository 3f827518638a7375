//! Account layouts of the ACCESS staking program.
//!
//! The widget never owns these accounts; it only decodes what the program
//! wrote. Layouts are fixed: a tag byte followed by fixed-width fields.

pub mod bond_account;
pub mod central_state;
pub mod layout;
pub mod stake_account;
pub mod stake_pool;
pub mod tag;

pub use bond_account::*;
pub use central_state::*;
pub use stake_account::*;
pub use stake_pool::*;
pub use tag::*;
