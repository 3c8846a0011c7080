pub mod patients;
pub mod shell;
