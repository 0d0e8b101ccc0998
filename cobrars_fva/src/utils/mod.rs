//! Small numerical helpers shared by the analysis modules
pub(crate) mod linalg;
