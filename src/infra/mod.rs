pub mod cache;
pub mod comtrade;
pub mod extract;
pub mod output;
