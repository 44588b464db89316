// ==========================================
// School Closure - API layer
// ==========================================
// Input checks + error mapping in front of the engines
// ==========================================

pub mod closure_api;
pub mod error;

pub use closure_api::ClosureApi;
pub use error::{ApiError, ApiResult};
