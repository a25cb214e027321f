//! Adapters to external libraries the poll loop treats as black boxes:
//! libcurl for HTTP (spec.md §6 "CurlPerform") and serde_json for the
//! "pure function bytes → Value" parse step (spec.md §6 "ParseJsonValue").

pub mod curl;
pub mod json;
