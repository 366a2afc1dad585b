pub mod approval;
pub mod ticket;
