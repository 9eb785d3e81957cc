pub mod collapsed;
pub mod contacts;
