//! JWT decoding and signature verification
//!
//! - `decoder` - [`SignedDecoder`], the algorithm-pinned verifier (HS256 / RS256)
//! - `token` - [`DecodedToken`], the lenient claim view handed to the claim validator

mod decoder;
mod token;

pub use decoder::SignedDecoder;
pub use token::DecodedToken;
