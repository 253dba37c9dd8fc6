//! Client and parser for the `DataForSEO` ranked-keywords API.

pub mod client;
pub mod error;
pub mod parse;
pub mod types;

pub use client::{DataForSeoClient, RankedKeywordsQuery};
pub use error::DataForSeoError;
pub use parse::{parse_ranked_keywords, ParsedKeywords, AI_OVERVIEW_FEATURE};
