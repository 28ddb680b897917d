pub mod publish;
pub mod read;
