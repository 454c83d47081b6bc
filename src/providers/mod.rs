pub mod dolarapi;
pub mod pdf_text;
pub mod yahoo_finance;
