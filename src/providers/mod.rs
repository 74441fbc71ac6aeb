pub mod coinbase;
pub mod util;
pub mod yahoo_chart;
pub mod yahoo_page;
pub mod yahoo_quote;
pub mod yahoo_summary;
