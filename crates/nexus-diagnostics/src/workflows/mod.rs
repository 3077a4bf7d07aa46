pub mod diagnostic;
pub mod ssn;
