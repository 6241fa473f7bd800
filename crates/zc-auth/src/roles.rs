//! Actor roles carried in the `roles` claim.
//!
//! A staff member carries both `user` and `staff`; a calling service only
//! carries `service`.

pub const USER_ACTOR: &str = "user";
pub const STAFF_ACTOR: &str = "staff";
pub const SERVICE_ACTOR: &str = "service";
pub const ANONYMOUS_ACTOR: &str = "anonymous";

pub const USER_ROLES: &[&str] = &[USER_ACTOR];
pub const STAFF_ROLES: &[&str] = &[USER_ACTOR, STAFF_ACTOR];
pub const SERVICE_ROLES: &[&str] = &[SERVICE_ACTOR];
pub const ANONYMOUS_ROLES: &[&str] = &[ANONYMOUS_ACTOR];

/// Owned copy of a role set, as it goes into a claim set.
pub fn to_owned(roles: &[&str]) -> Vec<String> {
    roles.iter().map(|r| r.to_string()).collect()
}

pub fn has_role<S: AsRef<str>>(roles: &[S], role: &str) -> bool {
    roles.iter().any(|r| r.as_ref() == role)
}

pub fn is_staff<S: AsRef<str>>(roles: &[S]) -> bool {
    has_role(roles, USER_ACTOR) && has_role(roles, STAFF_ACTOR)
}

pub fn is_user<S: AsRef<str>>(roles: &[S]) -> bool {
    has_role(roles, USER_ACTOR)
}

pub fn is_service<S: AsRef<str>>(roles: &[S]) -> bool {
    has_role(roles, SERVICE_ACTOR)
}

pub fn is_anonymous<S: AsRef<str>>(roles: &[S]) -> bool {
    has_role(roles, ANONYMOUS_ACTOR)
}
