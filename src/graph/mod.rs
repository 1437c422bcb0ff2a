pub(crate) mod dag;
pub(crate) mod surface;
pub(crate) mod task;
