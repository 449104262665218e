pub mod parish;
