/// Router Module Index
///
/// Routes are split by the access level they require. The access check is applied
/// as a route layer on each router in `create_router`, so a path registered here
/// cannot be reached without it.

/// Routes open to anonymous clients: health, signup/login and catalog reads.
pub mod public;

/// Routes behind `auth_middleware`. Any active user.
pub mod authenticated;

/// Routes behind `staff_middleware`. Staff only.
pub mod admin;
