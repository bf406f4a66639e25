//! Session persistence and login port traits.

use crate::domain::error::TradeDeskError;
use crate::domain::session::SessionCookies;

pub trait SessionStore {
    /// The stored session, or `None` when nothing usable is stored.
    fn load(&self) -> Result<Option<SessionCookies>, TradeDeskError>;

    fn save(&self, session: &SessionCookies) -> Result<(), TradeDeskError>;
}

pub trait LoginPort {
    /// Log in from scratch and return the cookies of the new session.
    fn login(&self) -> Result<SessionCookies, TradeDeskError>;
}
