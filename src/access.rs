use crate::state::Session;
use crate::types::Role;

pub const SHOPPER_ROLES: [Role; 2] = [Role::User, Role::Admin];
pub const ADMIN_ROLES: [Role; 1] = [Role::Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Nobody is signed in; send the shopper to login.
    LoginRequired,
    /// Signed in, but the role is not allowed here.
    Forbidden,
}

pub fn authorize(session: &Session, allowed: &[Role]) -> Access {
    match session.role() {
        None => Access::LoginRequired,
        Some(role) if allowed.contains(&role) => Access::Granted,
        Some(_) => Access::Forbidden,
    }
}
