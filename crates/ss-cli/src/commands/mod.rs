pub mod check;
pub mod functions;
pub mod run;
