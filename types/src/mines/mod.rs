mod constants;
mod game;
mod money;
mod user;

pub use constants::*;
pub use game::*;
pub use money::*;
pub use user::*;
