pub(crate) mod atom;
pub(crate) mod document;
pub(crate) mod field;
pub(crate) mod primary;
pub(crate) mod query;
pub(crate) mod range;
