pub mod error_pages;
