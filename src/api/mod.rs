pub mod leave_request;
pub mod leave_type;
pub mod substitute_grant;
