pub mod accounts;
pub mod secure;
