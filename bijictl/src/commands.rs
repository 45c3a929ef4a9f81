pub(crate) mod locations;
pub(crate) mod session;
