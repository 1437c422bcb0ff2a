pub(crate) mod driver;
pub(crate) mod rule;
pub(crate) mod surface_convert;
pub(crate) mod surface_create;
